use crate::envelope::Envelope;
use crate::error::StageError;
use crate::signal::CancellationSignal;
use crate::stream::{Recv, StreamReceiver};

/// What the consumer does with one failed envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorAction {
    /// Drop the failure and keep draining.
    Continue,
    /// Keep the failure for the final report and keep draining.
    Accumulate,
    /// Keep the failure, fire the signal and stop draining.
    Abort,
}

/// Result of [`drain_envelopes`].
#[derive(Debug)]
pub struct SinkReport<T, E = StageError> {
    /// Values of successful envelopes, in arrival order.
    pub values: Vec<T>,
    /// Failed envelopes kept by `Accumulate` or `Abort`.
    pub failures: Vec<Envelope<T, E>>,
    /// Failed envelopes dropped by `Continue`.
    pub skipped: usize,
    /// True if the consumer fired the signal itself.
    pub aborted: bool,
    /// True if draining stopped because the signal fired elsewhere.
    pub cancelled: bool,
}

impl<T, E> SinkReport<T, E> {
    /// Number of envelopes received.
    pub fn received(&self) -> usize {
        self.values.len() + self.failures.len() + self.skipped
    }
}

/// Drains `rx` until it is exhausted or the signal fires.
pub async fn collect<T>(mut rx: StreamReceiver<T>, signal: &CancellationSignal) -> Vec<T> {
    let mut out = Vec::new();
    while let Recv::Item(item) = rx.recv(signal).await {
        out.push(item);
    }
    out
}

/// Receives at most `n` items, then fires the signal.
///
/// The signal is also fired when `n == 0`. If the stream ends first, the signal is left
/// untouched and fewer than `n` items are returned.
pub async fn take<T>(
    mut rx: StreamReceiver<T>,
    n: usize,
    signal: &CancellationSignal,
) -> Vec<T> {
    let mut out = Vec::with_capacity(n.min(1024));
    while out.len() < n {
        match rx.recv(signal).await {
            Recv::Item(item) => out.push(item),
            Recv::Exhausted | Recv::Cancelled => return out,
        }
    }
    signal.close();
    out
}

/// Drains a stream of envelopes, asking `on_error` what to do with each failure.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use stagevisor::{sink, stream, CancellationSignal, Envelope, ErrorAction, Origin, StageError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let signal = CancellationSignal::new();
/// let (tx, rx) = stream::bounded::<Envelope<u32>>(4);
/// let at = |position| Origin { stage: Arc::from("parse"), position, worker: 0 };
///
/// tx.send(Envelope::ok(1, at(0)), &signal).await.unwrap();
/// tx.send(Envelope::failed(0, StageError::fail("nan"), at(1)), &signal).await.unwrap();
/// tx.close();
///
/// let report = sink::drain_envelopes(rx, &signal, |_| ErrorAction::Accumulate).await;
/// assert_eq!(report.values, vec![1]);
/// assert_eq!(report.failures.len(), 1);
/// # }
/// ```
pub async fn drain_envelopes<T, E, F>(
    mut rx: StreamReceiver<Envelope<T, E>>,
    signal: &CancellationSignal,
    mut on_error: F,
) -> SinkReport<T, E>
where
    F: FnMut(&Envelope<T, E>) -> ErrorAction,
{
    let mut report = SinkReport {
        values: Vec::new(),
        failures: Vec::new(),
        skipped: 0,
        aborted: false,
        cancelled: false,
    };

    loop {
        let env = match rx.recv(signal).await {
            Recv::Item(env) => env,
            Recv::Exhausted => break,
            Recv::Cancelled => {
                report.cancelled = true;
                break;
            }
        };
        if env.is_ok() {
            report.values.push(env.value);
            continue;
        }
        match on_error(&env) {
            ErrorAction::Continue => report.skipped += 1,
            ErrorAction::Accumulate => report.failures.push(env),
            ErrorAction::Abort => {
                report.failures.push(env);
                report.aborted = signal.close();
                break;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Origin;
    use crate::stream::bounded;
    use std::sync::Arc;

    fn at(position: u64) -> Origin {
        Origin {
            stage: Arc::from("t"),
            position,
            worker: 0,
        }
    }

    #[tokio::test]
    async fn test_take_fires_signal() {
        let signal = CancellationSignal::new();
        let (tx, rx) = bounded::<u32>(8);
        for i in 0..5 {
            tx.send(i, &signal).await.unwrap();
        }

        let got = take(rx, 3, &signal).await;
        assert_eq!(got, vec![0, 1, 2]);
        assert!(signal.is_closed());
    }

    #[tokio::test]
    async fn test_take_short_stream_leaves_signal() {
        let signal = CancellationSignal::new();
        let (tx, rx) = bounded::<u32>(8);
        tx.send(1, &signal).await.unwrap();
        tx.close();

        assert_eq!(take(rx, 3, &signal).await, vec![1]);
        assert!(!signal.is_closed());
    }

    #[tokio::test]
    async fn test_abort_stops_and_fires() {
        let signal = CancellationSignal::new();
        let (tx, rx) = bounded::<Envelope<u32>>(8);
        tx.send(Envelope::ok(1, at(0)), &signal).await.unwrap();
        tx.send(Envelope::failed(0, StageError::fail("x"), at(1)), &signal)
            .await
            .unwrap();
        tx.send(Envelope::ok(3, at(2)), &signal).await.unwrap();
        tx.close();

        let report = drain_envelopes(rx, &signal, |_| ErrorAction::Abort).await;
        assert!(report.aborted);
        assert!(!report.cancelled);
        assert_eq!(report.values, vec![1]);
        assert_eq!(report.failures[0].context.position, 1);
        assert!(signal.is_closed());
    }

    #[tokio::test]
    async fn test_continue_counts_skipped() {
        let signal = CancellationSignal::new();
        let (tx, rx) = bounded::<Envelope<u32>>(8);
        for i in 0..4u64 {
            let env = if i % 2 == 0 {
                Envelope::ok(i as u32, at(i))
            } else {
                Envelope::failed(0, StageError::fail("odd"), at(i))
            };
            tx.send(env, &signal).await.unwrap();
        }
        tx.close();

        let report = drain_envelopes(rx, &signal, |_| ErrorAction::Continue).await;
        assert_eq!(report.values, vec![0, 2]);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.received(), 4);
        assert!(!signal.is_closed());
    }
}

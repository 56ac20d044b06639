//! # Bounded stream with capability handles.
//!
//! A stream is a bounded [`tokio::sync::mpsc`] channel split into a write capability
//! ([`StreamSender`]) and a read capability ([`StreamReceiver`]).
//!
//! ```text
//!   owner ──► StreamSender::send(item, &signal) ──► [ buffer: capacity ] ──► StreamReceiver::recv(&signal)
//!      │                                                                          │
//!      └─ close() / drop  ─────────────────────────────────────────────►  Recv::Exhausted (sticky)
//! ```
//!
//! ## Rules
//! - The sender is not `Clone`: one owner writes and closes. Fan-in delegates writes
//!   internally to the multiplexers it joins.
//! - Closing is dropping the sender; a panicking owner closes its stream while unwinding.
//! - Both `send` and `recv` are biased towards the signal: once it fired, they report
//!   cancellation even if the operation could also complete.
//! - After the first `Recv::Exhausted`, every further `recv` returns `Exhausted` again.

use tokio::sync::mpsc;

use crate::signal::CancellationSignal;

/// Outcome of a cancellation-aware read.
#[derive(Debug, PartialEq, Eq)]
pub enum Recv<T> {
    /// Next item of the stream.
    Item(T),
    /// Upstream closed and every buffered item was consumed.
    Exhausted,
    /// The signal fired before an item arrived.
    Cancelled,
}

impl<T> Recv<T> {
    /// Returns the item, if any.
    pub fn into_item(self) -> Option<T> {
        match self {
            Recv::Item(item) => Some(item),
            Recv::Exhausted | Recv::Cancelled => None,
        }
    }
}

/// Reason a write did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The signal fired while waiting for buffer space.
    Cancelled,
    /// The receiving side was dropped; nobody will ever read the item.
    Disconnected,
}

/// Creates a bounded stream. Capacity is clamped to a minimum of 1.
///
/// # Example
/// ```
/// use stagevisor::{stream, CancellationSignal, Recv};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let signal = CancellationSignal::new();
/// let (tx, mut rx) = stream::bounded::<u32>(4);
///
/// tx.send(7, &signal).await.unwrap();
/// tx.close();
///
/// assert_eq!(rx.recv(&signal).await, Recv::Item(7));
/// assert_eq!(rx.recv(&signal).await, Recv::Exhausted);
/// assert_eq!(rx.recv(&signal).await, Recv::Exhausted);
/// # }
/// ```
pub fn bounded<T>(capacity: usize) -> (StreamSender<T>, StreamReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        StreamSender { tx },
        StreamReceiver {
            rx,
            received: 0,
            exhausted: false,
        },
    )
}

/// Write capability of a stream.
#[derive(Debug)]
pub struct StreamSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> StreamSender<T> {
    /// Sends one item, waiting for buffer space unless the signal fires first.
    ///
    /// On [`Halt`] the item is dropped.
    pub async fn send(&self, item: T, signal: &CancellationSignal) -> Result<(), Halt> {
        tokio::select! {
            biased;
            _ = signal.observe() => Err(Halt::Cancelled),
            res = self.tx.send(item) => res.map_err(|_| Halt::Disconnected),
        }
    }

    /// Closes the stream. Readers drain what is buffered, then see `Exhausted`.
    pub fn close(self) {
        drop(self);
    }

    /// Hands out an extra write handle to a worker managed by this owner.
    ///
    /// The stream closes once the owner and every delegate have dropped their handles.
    pub(crate) fn delegate(&self) -> StreamSender<T> {
        StreamSender {
            tx: self.tx.clone(),
        }
    }
}

/// Read capability of a stream.
#[derive(Debug)]
pub struct StreamReceiver<T> {
    rx: mpsc::Receiver<T>,
    received: u64,
    exhausted: bool,
}

impl<T> StreamReceiver<T> {
    /// Receives the next item unless the signal fires first.
    pub async fn recv(&mut self, signal: &CancellationSignal) -> Recv<T> {
        match self.recv_indexed(signal).await {
            Recv::Item((_, item)) => Recv::Item(item),
            Recv::Exhausted => Recv::Exhausted,
            Recv::Cancelled => Recv::Cancelled,
        }
    }

    /// Like [`recv`](Self::recv), paired with the item's zero-based position in the stream.
    pub(crate) async fn recv_indexed(&mut self, signal: &CancellationSignal) -> Recv<(u64, T)> {
        if self.exhausted {
            return Recv::Exhausted;
        }
        tokio::select! {
            biased;
            _ = signal.observe() => Recv::Cancelled,
            item = self.rx.recv() => match item {
                Some(item) => {
                    let position = self.received;
                    self.received += 1;
                    Recv::Item((position, item))
                }
                None => {
                    self.exhausted = true;
                    Recv::Exhausted
                }
            },
        }
    }

    /// Number of items received so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// True once the stream reported `Exhausted`.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_and_positions() {
        let signal = CancellationSignal::new();
        let (tx, mut rx) = bounded::<&str>(4);
        tx.send("a", &signal).await.unwrap();
        tx.send("b", &signal).await.unwrap();
        tx.close();

        assert_eq!(rx.recv_indexed(&signal).await, Recv::Item((0, "a")));
        assert_eq!(rx.recv_indexed(&signal).await, Recv::Item((1, "b")));
        assert_eq!(rx.recv_indexed(&signal).await, Recv::Exhausted);
        assert_eq!(rx.received(), 2);
    }

    #[tokio::test]
    async fn test_second_drain_is_empty_and_quiet() {
        let signal = CancellationSignal::new();
        let (tx, mut rx) = bounded::<u8>(2);
        tx.send(1, &signal).await.unwrap();
        drop(tx);

        let mut first = Vec::new();
        while let Recv::Item(v) = rx.recv(&signal).await {
            first.push(v);
        }
        assert_eq!(first, vec![1]);
        assert!(rx.is_exhausted());

        for _ in 0..3 {
            assert_eq!(rx.recv(&signal).await, Recv::Exhausted);
        }
    }

    #[tokio::test]
    async fn test_blocked_send_unblocks_on_cancel() {
        let signal = CancellationSignal::new();
        let (tx, _rx) = bounded::<u8>(1);
        tx.send(1, &signal).await.unwrap();

        let s = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            s.close();
        });

        let res = tokio::time::timeout(Duration::from_secs(1), tx.send(2, &signal))
            .await
            .expect("send stayed blocked after cancel");
        assert_eq!(res, Err(Halt::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_wins_over_buffered_items() {
        let signal = CancellationSignal::new();
        let (tx, mut rx) = bounded::<u8>(4);
        tx.send(1, &signal).await.unwrap();
        signal.close();
        assert_eq!(rx.recv(&signal).await, Recv::Cancelled);
    }

    #[tokio::test]
    async fn test_send_to_dropped_receiver_is_disconnected() {
        let signal = CancellationSignal::new();
        let (tx, rx) = bounded::<u8>(1);
        drop(rx);
        assert_eq!(tx.send(1, &signal).await, Err(Halt::Disconnected));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (tx, _rx) = bounded::<u8>(0);
        assert_eq!(tx.tx.max_capacity(), 1);
    }
}

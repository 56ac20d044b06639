//! Source worker: turns an iterator into a stream.
//!
//! With no consumer draining the stream the generator blocks on a full buffer, so each
//! write races the signal. Without that race a never-drained generator is a leaked task.

use crate::core::report::WorkerExit;
use crate::signal::CancellationSignal;
use crate::stream::StreamSender;

pub(crate) async fn generate_loop<I>(
    items: I,
    output: StreamSender<I::Item>,
    signal: CancellationSignal,
) -> WorkerExit
where
    I: IntoIterator,
{
    for item in items {
        if let Err(halt) = output.send(item, &signal).await {
            return halt.into();
        }
    }
    WorkerExit::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{bounded, Recv};
    use std::time::Duration;

    #[tokio::test]
    async fn test_unconsumed_generator_exits_on_cancel() {
        let signal = CancellationSignal::new();
        let (tx, _rx) = bounded::<u64>(2);
        let task = tokio::spawn(generate_loop(0.., tx, signal.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!task.is_finished());

        signal.close();
        let exit = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("generator leaked")
            .unwrap();
        assert_eq!(exit, WorkerExit::Cancelled);
    }

    #[tokio::test]
    async fn test_finite_generator_closes_stream() {
        let signal = CancellationSignal::new();
        let (tx, mut rx) = bounded::<&str>(4);
        let exit = generate_loop(["a", "b"], tx, signal.clone()).await;
        assert_eq!(exit, WorkerExit::Exhausted);

        assert_eq!(rx.recv(&signal).await, Recv::Item("a"));
        assert_eq!(rx.recv(&signal).await, Recv::Item("b"));
        assert_eq!(rx.recv(&signal).await, Recv::Exhausted);
    }
}

//! Read side shared by the replicas of a fanned-out stage.
//!
//! The receiver sits behind an async mutex so each item is handed to exactly one
//! replica. Waiting for the lock is itself raced against the signal.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::{Recv, StreamReceiver};
use crate::signal::CancellationSignal;

pub(crate) struct SharedReceiver<T> {
    inner: Arc<Mutex<StreamReceiver<T>>>,
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedReceiver<T> {
    pub(crate) fn new(rx: StreamReceiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rx)),
        }
    }

    /// Receives the next item with its upstream position; positions stay unique
    /// across replicas because they are assigned under the lock.
    pub(crate) async fn recv_indexed(&self, signal: &CancellationSignal) -> Recv<(u64, T)> {
        tokio::select! {
            biased;
            _ = signal.observe() => Recv::Cancelled,
            mut rx = self.inner.lock() => rx.recv_indexed(signal).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::bounded;
    use std::collections::HashSet;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_item_reaches_one_reader() {
        let signal = CancellationSignal::new();
        let (tx, rx) = bounded::<u32>(8);
        let shared = SharedReceiver::new(rx);

        let mut readers = Vec::new();
        for _ in 0..4 {
            let shared = shared.clone();
            let signal = signal.clone();
            readers.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Recv::Item((pos, v)) = shared.recv_indexed(&signal).await {
                    assert_eq!(pos, u64::from(v));
                    got.push(v);
                }
                got
            }));
        }

        for i in 0..200u32 {
            tx.send(i, &signal).await.unwrap();
        }
        tx.close();

        let mut all = Vec::new();
        for r in readers {
            all.extend(r.await.unwrap());
        }
        assert_eq!(all.len(), 200);
        let unique: HashSet<u32> = all.into_iter().collect();
        assert_eq!(unique.len(), 200);
    }
}

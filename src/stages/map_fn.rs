//! # Closure-backed infallible transform (`MapFn`).
//!
//! [`MapFn`] wraps `F: Fn(In) -> Fut`, producing a fresh future per item. There is no hidden
//! state between items; share state explicitly through `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use stagevisor::{MapFn, Transform};
//!
//! let square = MapFn::arc("square", |x: u64| async move { x * x });
//! assert_eq!(square.name(), "square");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::transform::{ItemContext, Transform};

/// Function-backed transform that cannot fail.
pub struct MapFn<F, I> {
    name: Cow<'static, str>,
    f: F,
    _input: PhantomData<fn(I)>,
}

impl<F, I> MapFn<F, I> {
    /// Creates a new closure-backed transform.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _input: PhantomData,
        }
    }

    /// Creates the transform behind an `Arc`.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, I, Fut> Transform for MapFn<F, I>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
    I: Send + 'static,
{
    type In = I;
    type Out = Fut::Output;

    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, item: I, _cx: ItemContext) -> BoxFuture<'a, Self::Out> {
        Box::pin((self.f)(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Origin;
    use crate::events::Bus;
    use crate::signal::CancellationSignal;

    #[tokio::test]
    async fn test_applies_closure() {
        let t = MapFn::new("inc", |x: i32| async move { x + 1 });
        let cx = ItemContext::new(
            Origin {
                stage: Arc::from("inc"),
                position: 0,
                worker: 0,
            },
            CancellationSignal::new(),
            Bus::new(4),
        );
        assert_eq!(t.apply(41, cx).await, 42);
        assert_eq!(t.name(), "inc");
    }
}

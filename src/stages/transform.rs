//! # Transform abstraction.
//!
//! A [`Transform`] is the per-item work of a stage. The runtime owns everything around it
//! (reading input, racing the signal, writing output, closing streams); the transform only
//! turns one `In` into one `Out`.
//!
//! Expected failures belong in the output type (see [`TryMapFn`](crate::TryMapFn), which
//! produces [`Envelope`](crate::Envelope)s). A panic inside `apply` is an unrecoverable fault:
//! the replica exits abnormally and its output stream is closed while unwinding.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::envelope::Origin;
use crate::events::{Bus, Event};
use crate::signal::CancellationSignal;

/// Per-item information handed to [`Transform::apply`].
#[derive(Clone, Debug)]
pub struct ItemContext {
    origin: Origin,
    signal: CancellationSignal,
    bus: Bus,
}

impl ItemContext {
    pub(crate) fn new(origin: Origin, signal: CancellationSignal, bus: Bus) -> Self {
        Self {
            origin,
            signal,
            bus,
        }
    }

    /// Stage name, input position and replica index of the item.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// The pipeline-wide signal; long transforms should race their own waits against it.
    pub fn signal(&self) -> &CancellationSignal {
        &self.signal
    }

    /// Publishes an event tagged with this item's stage and position.
    pub fn publish(&self, ev: Event) {
        self.bus.publish(
            ev.with_stage(self.origin.stage.clone())
                .with_position(self.origin.position),
        );
    }
}

/// # Per-item work of a stage.
///
/// # Example
/// ```
/// use futures::future::BoxFuture;
/// use stagevisor::{ItemContext, Transform};
///
/// struct Double;
///
/// impl Transform for Double {
///     type In = u64;
///     type Out = u64;
///
///     fn name(&self) -> &str { "double" }
///
///     fn apply<'a>(&'a self, item: u64, _cx: ItemContext) -> BoxFuture<'a, u64> {
///         Box::pin(async move { item * 2 })
///     }
/// }
/// ```
pub trait Transform: Send + Sync + 'static {
    /// Element type of the input stream.
    type In: Send + 'static;
    /// Element type of the output stream.
    type Out: Send + 'static;

    /// Stable, human-readable stage name.
    fn name(&self) -> &str;

    /// Transforms one item.
    fn apply<'a>(&'a self, item: Self::In, cx: ItemContext) -> BoxFuture<'a, Self::Out>;
}

/// A shared transform is a transform; lets one instance back several stages.
impl<T: Transform> Transform for Arc<T> {
    type In = T::In;
    type Out = T::Out;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply<'a>(&'a self, item: Self::In, cx: ItemContext) -> BoxFuture<'a, Self::Out> {
        (**self).apply(item, cx)
    }
}

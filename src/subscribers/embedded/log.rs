//! # LogWriter: one-line event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout. Meant for demos and
//! debugging.
//!
//! ## Example output
//! ```text
//! [worker-started] stage="parse" role=replica worker=0
//! [item-retrying] stage="parse" pos=3 attempt=1 delay=10ms err="item failed: nan"
//! [item-failed] stage="parse" pos=3 attempt=3 err="item failed: nan"
//! [worker-exited] stage="parse" role=replica worker=0 reason=exhausted
//! [merge-closed] stage="square" replicas=4
//! [cancel-requested]
//! [all-stopped-within-grace]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn stage(e: &Event) -> &str {
    e.stage.as_deref().unwrap_or("?")
}

fn reason(e: &Event) -> &str {
    e.reason.as_deref().unwrap_or("")
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let role = e.role.map(|r| r.as_label()).unwrap_or("?");
        match e.kind {
            EventKind::WorkerStarted => {
                println!(
                    "[worker-started] stage={:?} role={} worker={:?}",
                    stage(e),
                    role,
                    e.worker
                );
            }
            EventKind::WorkerExited => {
                println!(
                    "[worker-exited] stage={:?} role={} worker={:?} reason={}",
                    stage(e),
                    role,
                    e.worker,
                    reason(e)
                );
            }
            EventKind::WorkerPanicked => {
                println!(
                    "[worker-panicked] stage={:?} role={} worker={:?} info={:?}",
                    stage(e),
                    role,
                    e.worker,
                    reason(e)
                );
            }
            EventKind::MergeClosed => {
                println!("[merge-closed] stage={:?} replicas={:?}", stage(e), e.replicas);
            }
            EventKind::ItemRetrying => {
                println!(
                    "[item-retrying] stage={:?} pos={:?} attempt={:?} delay={:?}ms err={:?}",
                    stage(e),
                    e.position,
                    e.attempt,
                    e.delay_ms,
                    reason(e)
                );
            }
            EventKind::ItemFailed => {
                println!(
                    "[item-failed] stage={:?} pos={:?} attempt={:?} err={:?}",
                    stage(e),
                    e.position,
                    e.attempt,
                    reason(e)
                );
            }
            EventKind::CancelRequested => println!("[cancel-requested]"),
            EventKind::PipelineDrained => println!("[pipeline-drained]"),
            EventKind::AllStoppedWithin => println!("[all-stopped-within-grace]"),
            EventKind::GraceExceeded => println!("[grace-exceeded]"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

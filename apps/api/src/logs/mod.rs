//! Process-wide log fan-out. Every pipeline step reports through `LogHub`,
//! and any number of SSE subscribers tail the stream live.

pub mod handlers;

use tokio::sync::broadcast;
use tracing::info;

/// Capacity of the fan-out channel. A subscriber that falls further behind
/// than this loses the oldest lines — delivery is best-effort, not buffered.
const CHANNEL_CAPACITY: usize = 256;

/// Fan-out hub for pipeline log lines.
///
/// Owned by `AppState` and cloned into the pipeline task and every SSE
/// subscription. A line is delivered at most once to each subscriber
/// registered at emission time; there is no history, so a late subscriber
/// misses everything emitted before it registered.
#[derive(Clone, Debug)]
pub struct LogHub {
    tx: broadcast::Sender<String>,
}

impl LogHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Emits one line: mirrored to the server log, then fanned out to every
    /// live subscriber. A closed or lagging subscriber is skipped silently;
    /// this never reports an error to the caller.
    pub fn broadcast(&self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        let _ = self.tx.send(line);
    }

    /// Registers a new subscriber. The receiver only observes lines
    /// broadcast after this call.
    pub fn register(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LogHub {
    fn default() -> Self {
        Self::new()
    }
}

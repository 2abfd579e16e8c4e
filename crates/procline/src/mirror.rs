//! In-process fan-out of child output lines
//!
//! A second OS-level reader on the stdout pipe would steal bytes from the
//! primary read loop, so mirroring is done after the fact: the single real
//! reader publishes every completed line to a broadcast channel, and any
//! number of subscribers receive their own copy.

use tokio::sync::broadcast;
use tracing::info;

/// Buffered lines per subscriber before the oldest are dropped
const CHANNEL_CAPACITY: usize = 1024;

/// Line fan-out hub, one per supervisor handle.
///
/// Subscribers that lag past [`CHANNEL_CAPACITY`] lines lose the oldest
/// entries; they never block or fail the reader.
#[derive(Debug)]
pub struct MirrorHub {
    sender: broadcast::Sender<String>,
    echo: bool,
}

impl MirrorHub {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, echo: false }
    }

    /// Subscribe to every line the supervisor reads from the child.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Enable or disable echoing each line to the log for human observation
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Publish one completed line to all consumers
    pub(crate) fn publish(&self, line: &str) {
        if self.echo {
            info!(target: "procline::mirror", ">> {line}");
        }
        // A send error only means nobody is subscribed right now.
        if self.sender.receiver_count() > 0 {
            let _ = self.sender.send(line.to_owned());
        }
    }
}

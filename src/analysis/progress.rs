//! Progress notifications
//!
//! One-way and fire-and-forget: sinks never block the pipeline and a dropped
//! receiver is not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A single progress update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0..=100
    pub percentage: u8,
    pub message: String,
    pub processed: usize,
    pub total: usize,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(percentage: u8, message: impl Into<String>, processed: usize, total: usize) -> Self {
        Self {
            percentage: percentage.min(100),
            message: message.into(),
            processed,
            total,
            timestamp: Utc::now(),
        }
    }
}

/// `done / total` as a whole percentage; an empty total counts as complete
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events to `tracing` at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        tracing::info!(
            percentage = event.percentage,
            processed = event.processed,
            total = event.total,
            "{}",
            event.message
        );
    }
}

/// Sends events over an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Create a sink and the receiver that observes it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        // receiver may be gone; progress is advisory
        let _ = self.sender.send(event);
    }
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn percent_handles_edges() {
        assert_eq!(percent(0, 4), 0);
        assert_eq!(percent(1, 4), 25);
        assert_eq!(percent(4, 4), 100);
        assert_eq!(percent(9, 4), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelProgress::new();
        sink.report(ProgressEvent::new(10, "a", 1, 10));
        sink.report(ProgressEvent::new(20, "b", 2, 10));
        assert_eq!(rx.try_recv().unwrap().message, "a");
        assert_eq!(rx.try_recv().unwrap().percentage, 20);
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelProgress::new();
        drop(rx);
        sink.report(ProgressEvent::new(50, "ignored", 0, 0));
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let sink = move |event: ProgressEvent| captured.lock().unwrap().push(event.percentage);
        sink.report(ProgressEvent::new(150, "clamped", 0, 0));
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }
}

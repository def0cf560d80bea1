//! Message delivery.

use crate::error::SinkError;
use async_trait::async_trait;
use parking_lot::Mutex;

#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), SinkError>;
}

/// Prints each message to stdout, separated by a rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

#[async_trait]
impl MessageSink for StdoutSink {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        println!("{text}");
        println!("────────────────────────────────────────");
        Ok(())
    }
}

/// Keeps every message in memory, in delivery order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        self.messages.lock().push(text.to_string());
        Ok(())
    }
}

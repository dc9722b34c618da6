//! Engine messages as log lines.

use mud_core::messaging::{Message, MessageSink};

/// Writes every message to `tracing` under the `mud::act` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn deliver(&mut self, message: Message) {
        tracing::info!(
            target: "mud::act",
            pulse = message.pulse,
            room = message.room.map(|r| r.raw()),
            actor = message.actor.map(|c| c.raw()),
            audience = ?message.audience,
            "{}",
            message.text
        );
    }
}

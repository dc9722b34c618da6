//! Player feedback.
//!
//! The engine renders `act`-style templates and hands the result to a
//! [`MessageSink`]. Sinks never influence game state; [`NullSink`] discards
//! everything and [`RecordingSink`] keeps a shared log for inspection.
//!
//! Template codes: `$n` actor name, `$N` target name, `$e`/`$E` subject
//! pronoun, `$m`/`$M` object pronoun, `$s`/`$S` possessive pronoun.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::components::{CharId, RoomId};

/// Who receives a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Audience {
    /// The actor only.
    Actor,
    /// The target only.
    Target,
    /// Everyone in the room except actor and target.
    Bystanders,
    /// Everyone in the room except the actor.
    Room,
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Pulse on which it was produced.
    pub pulse: u64,
    /// Room it was produced in.
    pub room: Option<RoomId>,
    /// Acting character.
    pub actor: Option<CharId>,
    /// Targeted character.
    pub target: Option<CharId>,
    /// Receivers.
    pub audience: Audience,
    /// Rendered text.
    pub text: String,
}

/// Destination for rendered messages.
pub trait MessageSink: Send {
    /// Accept one message.
    fn deliver(&mut self, message: Message);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn deliver(&mut self, _message: Message) {}
}

/// Shared, clonable message log.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    inner: Arc<Mutex<Vec<Message>>>,
}

impl MessageLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Vec<Message>) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Copy of every message so far.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.with(|m| m.clone())
    }

    /// Remove and return every message so far.
    pub fn drain(&self) -> Vec<Message> {
        self.with(std::mem::take)
    }

    /// Number of messages whose text contains `needle`.
    #[must_use]
    pub fn count_containing(&self, needle: &str) -> usize {
        self.with(|m| m.iter().filter(|msg| msg.text.contains(needle)).count())
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.with(|m| m.len())
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.with(Vec::clear);
    }
}

/// Appends to a [`MessageLog`].
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: MessageLog,
}

impl RecordingSink {
    /// A sink and the log it writes to.
    #[must_use]
    pub fn new() -> (Self, MessageLog) {
        let log = MessageLog::new();
        (Self { log: log.clone() }, log)
    }
}

impl MessageSink for RecordingSink {
    fn deliver(&mut self, message: Message) {
        self.log.with(|m| m.push(message));
    }
}

/// Substitute template codes.
#[must_use]
pub fn render(template: &str, actor: Option<&str>, target: Option<&str>) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push_str(actor.unwrap_or("someone")),
            Some('N') => out.push_str(target.unwrap_or("someone")),
            Some('e' | 'E') => out.push_str("they"),
            Some('m' | 'M') => out.push_str("them"),
            Some('s' | 'S') => out.push_str("their"),
            Some(other) => {
                out.push('$');
                out.push(other);
            }
            None => out.push('$'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_codes() {
        let text = render("$n hits $N and $s sword glows.", Some("Ayla"), Some("the orc"));
        assert_eq!(text, "Ayla hits the orc and their sword glows.");
        assert_eq!(render("cost $5", None, None), "cost $5");
        assert_eq!(render("trailing $", None, None), "trailing $");
    }

    #[test]
    fn test_recording_sink_shares_log() {
        let (mut sink, log) = RecordingSink::new();
        sink.deliver(Message {
            pulse: 1,
            room: None,
            actor: None,
            target: None,
            audience: Audience::Actor,
            text: "You feel righteous.".into(),
        });
        assert_eq!(log.len(), 1);
        assert_eq!(log.count_containing("righteous"), 1);
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }
}

//! Greedy packing of report entries into size-bounded messages.
//!
//! Two caps apply at once: entries per message and characters per message. Entries are
//! never split or reordered; every message repeats the same header.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Separator between the header and the first entry.
pub const HEADER_SEPARATOR: &str = "\n\n";

/// Separator between consecutive entries.
pub const ENTRY_SEPARATOR: &str = "\n\n";

/// Per-message capacity.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct MessageLimits {
    /// Maximum characters per message, header included.
    pub max_chars: usize,
    /// Maximum entries per message, `None` for unbounded.
    pub max_entries: Option<usize>,
}

impl Default for MessageLimits {
    /// Conservative bound below Telegram's 4096 character limit to leave headroom for markup.
    fn default() -> Self {
        Self {
            max_chars: 3500,
            max_entries: None,
        }
    }
}

/// Outcome of [`MessageBuffer::try_append`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Append {
    /// Entry was appended.
    Fits,
    /// Entry was not appended: the buffer must be finalized first.
    Overflow,
}

/// Accumulates entries under a repeated header until either cap would be exceeded.
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    header: String,
    header_chars: usize,
    body: String,
    chars: usize,
    entries: usize,
    limits: MessageLimits,
}

impl MessageBuffer {
    pub fn new(header: impl Into<String>, limits: MessageLimits) -> Self {
        let header = header.into();
        let header_chars = header.chars().count();
        Self {
            header,
            header_chars,
            body: String::new(),
            chars: header_chars,
            entries: 0,
            limits,
        }
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Characters the finalized message would currently contain.
    pub fn char_len(&self) -> usize {
        self.chars
    }

    /// Append `entry` if neither cap would be exceeded.
    ///
    /// An empty buffer always accepts: an entry larger than the character cap on its own is
    /// sent alone rather than split or dropped.
    pub fn try_append(&mut self, entry: &str) -> Append {
        let separator = if self.entries == 0 {
            HEADER_SEPARATOR
        } else {
            ENTRY_SEPARATOR
        };
        let added = separator.chars().count() + entry.chars().count();

        let entries_full = self
            .limits
            .max_entries
            .is_some_and(|max_entries| self.entries >= max_entries);
        let chars_full = self.chars + added > self.limits.max_chars;

        if self.entries > 0 && (entries_full || chars_full) {
            return Append::Overflow;
        }

        if chars_full {
            warn!(
                entry_chars = added - separator.chars().count(),
                max_chars = self.limits.max_chars,
                "report entry exceeds the message character cap, sending it alone"
            );
        }

        if self.entries > 0 {
            self.body.push_str(ENTRY_SEPARATOR);
        }
        self.body.push_str(entry);
        self.chars += added;
        self.entries += 1;
        Append::Fits
    }

    /// Take the finished message text and reset to an empty buffer with the same header.
    ///
    /// Returns `None` when no entry was appended: header-only messages are never sent.
    pub fn finalize(&mut self) -> Option<String> {
        if self.entries == 0 {
            return None;
        }

        let text = format!("{}{}{}", self.header, HEADER_SEPARATOR, self.body);
        self.body.clear();
        self.chars = self.header_chars;
        self.entries = 0;

        Some(text.trim_end().to_string())
    }
}

/// Pack `entries` in order into messages that each start with `header`.
pub fn chunk_messages<I, S>(header: &str, entries: I, limits: MessageLimits) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut buffer = MessageBuffer::new(header, limits);
    let mut messages = Vec::new();

    for entry in entries {
        let entry = entry.as_ref();
        match buffer.try_append(entry) {
            Append::Fits => {}
            Append::Overflow => {
                messages.extend(buffer.finalize());
                let retried = buffer.try_append(entry);
                debug_assert_eq!(retried, Append::Fits, "an empty buffer accepts any entry");
            }
        }
    }

    messages.extend(buffer.finalize());
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "📈 2024-03-09 session (05:00→04:59) performance ranking";

    fn entries(count: usize) -> Vec<String> {
        (1..=count)
            .map(|rank| {
                let symbol = "X".repeat(rank % 7 + 3);
                format!(
                    "{rank}.  {symbol}_USDT ⚡️  {:.2}%\n      +0.{rank:02}% | -1.50% | +2.10% 🚀 | 0.00%",
                    rank as f64 * 0.37
                )
            })
            .collect()
    }

    fn strip_header(message: &str) -> Vec<String> {
        message
            .strip_prefix(HEADER)
            .and_then(|rest| rest.strip_prefix(HEADER_SEPARATOR))
            .unwrap_or_else(|| panic!("message without header: {message}"))
            .split(ENTRY_SEPARATOR)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_try_append() {
        struct TestCase {
            limits: MessageLimits,
            appends: Vec<&'static str>,
            expected: Vec<Append>,
        }

        let header_chars = HEADER.chars().count();

        let tests = vec![
            TestCase {
                // TC0: entry cap of two
                limits: MessageLimits {
                    max_chars: 10_000,
                    max_entries: Some(2),
                },
                appends: vec!["a", "b", "c"],
                expected: vec![Append::Fits, Append::Fits, Append::Overflow],
            },
            TestCase {
                // TC1: character cap reached exactly, then exceeded
                limits: MessageLimits {
                    max_chars: header_chars + 2 + 4 + 2 + 4,
                    max_entries: None,
                },
                appends: vec!["abcd", "efgh", "i"],
                expected: vec![Append::Fits, Append::Fits, Append::Overflow],
            },
            TestCase {
                // TC2: oversized entry accepted alone, nothing after it
                limits: MessageLimits {
                    max_chars: header_chars + 5,
                    max_entries: None,
                },
                appends: vec!["far too long for the cap", "x"],
                expected: vec![Append::Fits, Append::Overflow],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let mut buffer = MessageBuffer::new(HEADER, test.limits);
            let actual: Vec<Append> = test
                .appends
                .iter()
                .map(|entry| buffer.try_append(entry))
                .collect();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_finalize_resets_and_repeats_header() {
        let mut buffer = MessageBuffer::new(HEADER, MessageLimits::default());
        assert_eq!(buffer.finalize(), None);

        let entry = "🥇   A ⚡️  20.00%";
        assert_eq!(buffer.try_append(entry), Append::Fits);
        assert_eq!(
            buffer.char_len(),
            HEADER.chars().count() + 2 + entry.chars().count()
        );
        let first = buffer.finalize().unwrap();
        assert_eq!(first, format!("{HEADER}\n\n{entry}"));
        assert_eq!(buffer.char_len(), HEADER.chars().count());

        assert!(buffer.is_empty());
        assert_eq!(buffer.try_append("🥈   B ⚡️  0.00%"), Append::Fits);
        assert!(buffer.finalize().unwrap().starts_with(HEADER));
    }

    #[test]
    fn test_chunk_messages_respects_char_cap_and_order() {
        let entries = entries(60);
        let limits = MessageLimits {
            max_chars: 600,
            max_entries: None,
        };

        let messages = chunk_messages(HEADER, &entries, limits);

        assert!(messages.len() > 1);
        for message in &messages {
            assert!(message.chars().count() <= limits.max_chars, "{message}");
        }

        let rejoined: Vec<String> = messages.iter().flat_map(|m| strip_header(m)).collect();
        assert_eq!(rejoined, entries);
    }

    #[test]
    fn test_chunk_messages_respects_entry_cap() {
        let entries = entries(7);
        let limits = MessageLimits {
            max_chars: 100_000,
            max_entries: Some(3),
        };

        let messages = chunk_messages(HEADER, &entries, limits);
        let sizes: Vec<usize> = messages.iter().map(|m| strip_header(m).len()).collect();

        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_chunk_messages_oversized_entry_sent_alone() {
        let long = "L".repeat(40);
        let entries = vec!["a".to_string(), long.clone(), "b".to_string()];
        let limits = MessageLimits {
            max_chars: HEADER.chars().count() + 10,
            max_entries: None,
        };

        let messages = chunk_messages(HEADER, &entries, limits);

        let bodies: Vec<Vec<String>> = messages.iter().map(|m| strip_header(m)).collect();
        assert_eq!(
            bodies,
            vec![vec!["a".to_string()], vec![long], vec!["b".to_string()]]
        );
    }

    #[test]
    fn test_chunk_messages_empty() {
        let messages = chunk_messages(HEADER, Vec::<String>::new(), MessageLimits::default());
        assert!(messages.is_empty());
    }
}

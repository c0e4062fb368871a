//! Conversation log
//!
//! Append-only record of user and assistant turns. The controller is the only
//! writer; everything else reads.

mod render;

pub use render::format_extracted;

use chrono::{DateTime, Utc};

/// Structured data extracted by the service from uploaded documents
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    /// Server-assigned filename of the stored upload
    pub filename: String,

    /// Document categories detected by the service
    pub document_types: Vec<String>,

    /// Arbitrary nested extraction payload
    pub data: serde_json::Value,
}

/// One message in the conversation
#[derive(Debug, Clone)]
pub enum Turn {
    /// A message from the user
    User {
        text: String,
        at: DateTime<Utc>,
    },

    /// A message from the assistant, optionally carrying extraction results
    /// and a reference to synthesized speech for this turn
    Assistant {
        text: String,
        extracted: Option<ExtractedDocument>,
        audio_url: Option<String>,
        at: DateTime<Utc>,
    },
}

impl Turn {
    /// The message text regardless of sender
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::User { text, .. } | Self::Assistant { text, .. } => text,
        }
    }

    /// Whether this turn came from the assistant
    #[must_use]
    pub const fn is_assistant(&self) -> bool {
        matches!(self, Self::Assistant { .. })
    }
}

/// Append-only ordered record of conversation turns.
///
/// Indices are stable for the lifetime of a session; `clear` is the only way
/// to remove turns and empties the log in one step.
#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::User {
            text: text.into(),
            at: Utc::now(),
        });
    }

    /// Append an assistant turn
    pub fn push_assistant(
        &mut self,
        text: impl Into<String>,
        extracted: Option<ExtractedDocument>,
        audio_url: Option<String>,
    ) {
        self.turns.push(Turn::Assistant {
            text: text.into(),
            extracted,
            audio_url,
            at: Utc::now(),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    /// Lazy rendering of the log as display lines, oldest first.
    ///
    /// Assistant turns with extraction payloads render the extracted tree
    /// under the message via [`format_extracted`].
    pub fn render_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.turns.iter().map(|turn| match turn {
            Turn::User { text, at } => {
                format!("[{}] you> {text}", at.format("%H:%M:%S"))
            }
            Turn::Assistant {
                text,
                extracted,
                at,
                ..
            } => {
                let stamp = at.format("%H:%M:%S");
                match extracted {
                    Some(doc) => format!(
                        "[{stamp}] assistant> {text}\n  [{} | {}]\n{}",
                        doc.filename,
                        doc.document_types.join(", "),
                        format_extracted(&doc.data)
                    ),
                    None => format!("[{stamp}] assistant> {text}"),
                }
            }
        })
    }

    /// Remove all turns. Readers never observe a partially cleared log.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

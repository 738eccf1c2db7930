//! Transcript aggregation.
//!
//! Upstream sends user transcription as cumulative text (each partial
//! supersedes the last) and model text as deltas. The aggregator keeps one
//! open utterance per speaker and reports every change as a
//! [`TranscriptUpdate`] for whatever renders the conversation.

use serde::{Deserialize, Serialize};

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Model,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Model => write!(f, "model"),
        }
    }
}

/// How new text combines with the open utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// Replace the utterance text (cumulative transcripts)
    Replace,
    /// Append to the utterance text (incremental deltas)
    Append,
}

/// Current state of one utterance, emitted on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptUpdate {
    /// Stable id of the utterance; a new id means a new transcript entry
    pub entry_id: u64,
    pub speaker: Speaker,
    /// Full text of the utterance so far
    pub text: String,
    /// True once the utterance has been committed
    pub is_final: bool,
}

#[derive(Debug, Clone)]
struct Utterance {
    entry_id: u64,
    text: String,
}

/// Keeps the open user and model utterances.
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    user: Option<Utterance>,
    model: Option<Utterance>,
    next_entry_id: u64,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the open user utterance with the latest cumulative text.
    pub fn update_user(&mut self, text: &str) -> Option<TranscriptUpdate> {
        self.write(Speaker::User, text, TextMode::Replace)
    }

    /// Add model text, replacing or appending per `mode`.
    pub fn append_model(&mut self, text: &str, mode: TextMode) -> Option<TranscriptUpdate> {
        self.write(Speaker::Model, text, mode)
    }

    /// Close the user utterance. Returns its final state if one was open.
    pub fn commit_user(&mut self) -> Option<TranscriptUpdate> {
        Self::commit(Speaker::User, &mut self.user)
    }

    /// Close the model utterance. Returns its final state if one was open.
    pub fn commit_model(&mut self) -> Option<TranscriptUpdate> {
        Self::commit(Speaker::Model, &mut self.model)
    }

    /// Close both utterances without reporting them.
    pub fn reset(&mut self) {
        self.user = None;
        self.model = None;
    }

    /// Text of the open utterance for `speaker`, if any
    pub fn current_text(&self, speaker: Speaker) -> Option<&str> {
        self.cursor(speaker).as_ref().map(|u| u.text.as_str())
    }

    /// Whether `speaker` has an open utterance
    pub fn is_open(&self, speaker: Speaker) -> bool {
        self.cursor(speaker).is_some()
    }

    fn cursor(&self, speaker: Speaker) -> &Option<Utterance> {
        match speaker {
            Speaker::User => &self.user,
            Speaker::Model => &self.model,
        }
    }

    fn write(&mut self, speaker: Speaker, text: &str, mode: TextMode) -> Option<TranscriptUpdate> {
        if text.is_empty() {
            return None;
        }

        let next_entry_id = &mut self.next_entry_id;
        let cursor = match speaker {
            Speaker::User => &mut self.user,
            Speaker::Model => &mut self.model,
        };

        let utterance = cursor.get_or_insert_with(|| {
            let entry_id = *next_entry_id;
            *next_entry_id += 1;
            Utterance {
                entry_id,
                text: String::new(),
            }
        });

        match mode {
            TextMode::Replace => {
                utterance.text.clear();
                utterance.text.push_str(text);
            }
            TextMode::Append => utterance.text.push_str(text),
        }

        Some(TranscriptUpdate {
            entry_id: utterance.entry_id,
            speaker,
            text: utterance.text.clone(),
            is_final: false,
        })
    }

    fn commit(speaker: Speaker, cursor: &mut Option<Utterance>) -> Option<TranscriptUpdate> {
        cursor.take().map(|utterance| TranscriptUpdate {
            entry_id: utterance.entry_id,
            speaker,
            text: utterance.text,
            is_final: true,
        })
    }
}

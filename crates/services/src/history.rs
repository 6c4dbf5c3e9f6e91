//! Prompt history: the ordered list of prompts shown in the sidebar.
//!
//! The in-memory list is the source of truth and every mutation writes the
//! whole list back under [`HISTORY_KEY`]. A failed write is logged; the next
//! successful one resynchronizes storage.

use crate::storage::KeyValueStore;
use shared::ChatError;
use std::sync::Arc;

pub const HISTORY_KEY: &str = "prompt_history";

/// What an edit did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEdit {
    Replaced,
    Removed,
}

pub struct PromptHistory {
    entries: Vec<String>,
    store: Arc<dyn KeyValueStore>,
}

impl PromptHistory {
    /// Load saved history. Missing, unreadable or corrupt data yields an
    /// empty list instead of an error.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("discarding corrupt prompt history: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("could not read prompt history: {}", e);
                Vec::new()
            }
        };
        tracing::debug!(count = entries.len(), "prompt history loaded");
        Self { entries, store }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, prompt: impl Into<String>) {
        self.entries.push(prompt.into());
        self.persist();
    }

    /// Replace the entry in place. Text that trims to empty deletes it.
    pub fn edit(&mut self, index: usize, text: &str) -> Result<HistoryEdit, ChatError> {
        self.check_index(index)?;
        let value = text.trim();
        let outcome = if value.is_empty() {
            self.entries.remove(index);
            HistoryEdit::Removed
        } else {
            self.entries[index] = value.to_string();
            HistoryEdit::Replaced
        };
        self.persist();
        Ok(outcome)
    }

    pub fn delete(&mut self, index: usize) -> Result<String, ChatError> {
        self.check_index(index)?;
        let removed = self.entries.remove(index);
        self.persist();
        Ok(removed)
    }

    fn check_index(&self, index: usize) -> Result<(), ChatError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(ChatError::HistoryIndex {
                index,
                len: self.entries.len(),
            })
        }
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to serialize prompt history: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(HISTORY_KEY, &json) {
            tracing::warn!("failed to save prompt history: {}", e);
        }
    }
}

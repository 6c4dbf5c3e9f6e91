//! Error types shared across the workspace.

/// Why the store refused a submission. Nothing is mutated when this is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("A response is still being generated")]
    Busy,

    #[error("Nothing to send: type a prompt or attach an image")]
    EmptyPrompt,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No Gemini API key configured. Set GEMINI_API_KEY or add one to settings.json")]
    MissingApiKey,

    #[error("gemini error: {status}\n{body}")]
    Api { status: u16, body: String },

    #[error("gemini stream error: {0}")]
    Stream(String),

    #[error("History entry {index} does not exist ({len} entries)")]
    HistoryIndex { index: usize, len: usize },

    #[error("Attachment {index} does not exist ({len} attached)")]
    AttachmentIndex { index: usize, len: usize },
}

pub mod config;
pub mod history;
pub mod markdown;
pub mod storage;
pub mod theme;

pub use history::{HistoryEdit, PromptHistory};
pub use markdown::{highlight_code_lines, render_html, MarkdownRenderer};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

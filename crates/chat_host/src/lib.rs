//! Chat host - the prompt/response lifecycle behind the UI
//!
//! - [`store`]: conversation state, composer and prompt history
//! - [`reveal`]: word-by-word display of a finished response
//! - [`voice`]: dictation transcript handling

pub mod reveal;
pub mod store;
pub mod voice;

pub use reveal::{spawn_reveal, RevealFrame, RevealPlan};
pub use store::{ConversationStore, ResponseView, TurnStatus, APP_TITLE};
pub use voice::{VoiceAction, VoiceEvent, VoiceInput};

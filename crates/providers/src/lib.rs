pub mod gemini;
pub mod model;
pub mod sse;

pub use gemini::GeminiClient;
pub use model::{collect_response, send, FragmentStream, GenerativeModel};

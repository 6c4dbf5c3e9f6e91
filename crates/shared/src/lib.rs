pub mod attachment;
pub mod error;
pub mod identity;
pub mod theme;

pub use attachment::{Attachment, PreviewRef};
pub use error::{ChatError, SubmitError};
pub use identity::Identity;
pub use theme::Theme;

pub mod settings {
    use serde::{Deserialize, Serialize};

    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    pub const DEFAULT_REVEAL_INTERVAL_MS: u64 = 75;

    fn default_model() -> String {
        DEFAULT_MODEL.to_string()
    }

    fn default_base_url() -> String {
        DEFAULT_BASE_URL.to_string()
    }

    fn default_interval_ms() -> u64 {
        DEFAULT_REVEAL_INTERVAL_MS
    }

    fn default_words_per_tick() -> usize {
        1
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct ProviderAuth {
        pub api_key: Option<String>,
    }

    /// Optional knobs forwarded as `generationConfig`. All unset means the
    /// request carries no generation config at all.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct GenerationSettings {
        #[serde(default)]
        pub temperature: Option<f32>,
        #[serde(default)]
        pub max_output_tokens: Option<u32>,
        #[serde(default)]
        pub thinking_budget: Option<i32>,
    }

    impl GenerationSettings {
        pub fn is_empty(&self) -> bool {
            self.temperature.is_none()
                && self.max_output_tokens.is_none()
                && self.thinking_budget.is_none()
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ModelProvider {
        #[serde(default = "default_model")]
        pub model: String, // e.g., "gemini-2.5-flash"
        #[serde(default = "default_base_url")]
        pub base_url: String,
        #[serde(default)]
        pub auth: ProviderAuth,
        #[serde(default)]
        pub generation: GenerationSettings,
    }

    impl Default for ModelProvider {
        fn default() -> Self {
            Self {
                model: default_model(),
                base_url: default_base_url(),
                auth: ProviderAuth::default(),
                generation: GenerationSettings::default(),
            }
        }
    }

    /// Timing of the word-by-word response reveal
    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct RevealSettings {
        #[serde(default = "default_interval_ms")]
        pub interval_ms: u64,
        #[serde(default = "default_words_per_tick")]
        pub words_per_tick: usize,
    }

    impl Default for RevealSettings {
        fn default() -> Self {
            Self {
                interval_ms: default_interval_ms(),
                words_per_tick: default_words_per_tick(),
            }
        }
    }

    /// What the identity collaborator tells us about the user
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct UserProfile {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub signed_in: bool,
        #[serde(default)]
        pub avatar_path: Option<String>,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct AppSettings {
        #[serde(default)]
        pub model: ModelProvider,
        #[serde(default)]
        pub reveal: RevealSettings,
        #[serde(default)]
        pub user_profile: UserProfile,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_partial_settings_fill_defaults() {
            let json = r#"{"model":{"auth":{"api_key":"k"}}}"#;
            let settings: AppSettings = serde_json::from_str(json).unwrap();
            assert_eq!(settings.model.model, DEFAULT_MODEL);
            assert_eq!(settings.model.base_url, DEFAULT_BASE_URL);
            assert_eq!(settings.model.auth.api_key.as_deref(), Some("k"));
            assert_eq!(settings.reveal.interval_ms, 75);
            assert_eq!(settings.reveal.words_per_tick, 1);
            assert!(settings.model.generation.is_empty());
        }
    }
}

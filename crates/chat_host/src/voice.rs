//! Transcript lifecycle for dictated prompts.
//!
//! The speech backend itself lives outside this crate; it feeds
//! [`VoiceEvent`]s in and acts on the returned [`VoiceAction`]. A dictated
//! prompt is sent exactly once, when the backend reports `Ended` with a
//! non-blank final transcript.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Started,
    Interim(String),
    Final(String),
    UserStopped,
    Ended,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceAction {
    None,
    /// Ask the backend to stop listening
    StopBackend,
    /// Submit this transcript as the prompt
    Send(String),
}

#[derive(Debug, Clone, Default)]
pub struct VoiceInput {
    available: bool,
    recording: bool,
    finals: String,
    interim: String,
    last_error: Option<String>,
}

impl VoiceInput {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            ..Self::default()
        }
    }

    /// No backend: the mic control stays disabled.
    pub fn unavailable() -> Self {
        Self::new(false)
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// What the input field shows while dictating.
    pub fn display_text(&self) -> String {
        let finals = self.finals.trim_end();
        let interim = self.interim.trim();
        match (finals.is_empty(), interim.is_empty()) {
            (false, false) => format!("{finals} {interim}"),
            (true, _) => interim.to_string(),
            (false, true) => finals.to_string(),
        }
    }

    pub fn handle(&mut self, event: VoiceEvent) -> VoiceAction {
        if !self.available {
            return VoiceAction::None;
        }
        match event {
            VoiceEvent::Started => {
                self.recording = true;
                self.finals.clear();
                self.interim.clear();
                self.last_error = None;
                VoiceAction::None
            }
            VoiceEvent::Interim(text) if self.recording => {
                self.interim = text;
                VoiceAction::None
            }
            VoiceEvent::Final(text) if self.recording => {
                self.finals.push_str(&text);
                self.interim.clear();
                VoiceAction::None
            }
            VoiceEvent::UserStopped if self.recording => VoiceAction::StopBackend,
            VoiceEvent::Ended if self.recording => {
                self.recording = false;
                self.interim.clear();
                let transcript = std::mem::take(&mut self.finals);
                let transcript = transcript.trim();
                if transcript.is_empty() {
                    VoiceAction::None
                } else {
                    tracing::debug!(chars = transcript.len(), "voice transcript ready");
                    VoiceAction::Send(transcript.to_string())
                }
            }
            VoiceEvent::Error(message) => {
                tracing::warn!("voice input disabled: {}", message);
                self.recording = false;
                self.available = false;
                self.finals.clear();
                self.interim.clear();
                self.last_error = Some(message);
                VoiceAction::None
            }
            _ => VoiceAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(voice: &mut VoiceInput, events: Vec<VoiceEvent>) -> Vec<VoiceAction> {
        events.into_iter().map(|e| voice.handle(e)).collect()
    }

    #[test]
    fn test_sends_once_on_end() {
        let mut voice = VoiceInput::new(true);
        let actions = run(
            &mut voice,
            vec![
                VoiceEvent::Started,
                VoiceEvent::Interim("what is".into()),
                VoiceEvent::Final("what is rust ".into()),
                VoiceEvent::Interim("ownership".into()),
            ],
        );
        assert!(actions.iter().all(|a| *a == VoiceAction::None));
        assert_eq!(voice.display_text(), "what is rust ownership");

        assert_eq!(voice.handle(VoiceEvent::UserStopped), VoiceAction::StopBackend);
        assert_eq!(
            voice.handle(VoiceEvent::Ended),
            VoiceAction::Send("what is rust".into())
        );
        // A duplicate end from the backend must not send again
        assert_eq!(voice.handle(VoiceEvent::Ended), VoiceAction::None);
        assert!(!voice.is_recording());
    }

    #[test]
    fn test_display_separates_finals_from_interim() {
        let mut voice = VoiceInput::new(true);
        voice.handle(VoiceEvent::Started);
        voice.handle(VoiceEvent::Interim("what".into()));
        assert_eq!(voice.display_text(), "what");

        voice.handle(VoiceEvent::Final("what is rust".into()));
        assert_eq!(voice.display_text(), "what is rust");
        voice.handle(VoiceEvent::Interim("ownership".into()));
        assert_eq!(voice.display_text(), "what is rust ownership");
    }

    #[test]
    fn test_blank_transcript_sends_nothing() {
        let mut voice = VoiceInput::new(true);
        voice.handle(VoiceEvent::Started);
        voice.handle(VoiceEvent::Interim("uh".into()));
        assert_eq!(voice.handle(VoiceEvent::Ended), VoiceAction::None);
    }

    #[test]
    fn test_error_disables_without_sending() {
        let mut voice = VoiceInput::new(true);
        voice.handle(VoiceEvent::Started);
        voice.handle(VoiceEvent::Final("half a thought".into()));
        assert_eq!(
            voice.handle(VoiceEvent::Error("not-allowed".into())),
            VoiceAction::None
        );
        assert!(!voice.is_available());
        assert_eq!(voice.last_error(), Some("not-allowed"));
        assert_eq!(voice.handle(VoiceEvent::Ended), VoiceAction::None);
    }

    #[test]
    fn test_unavailable_ignores_everything() {
        let mut voice = VoiceInput::unavailable();
        assert_eq!(voice.handle(VoiceEvent::Started), VoiceAction::None);
        assert!(!voice.is_recording());
    }
}

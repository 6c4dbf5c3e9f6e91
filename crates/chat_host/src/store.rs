//! The conversation store: one active turn, the composer, and prompt history.
//!
//! The store lives on the UI thread. Network calls and reveal timers run on
//! the tokio runtime and report back over a channel that [`ConversationStore::poll`]
//! drains once per frame. Every background event carries the turn id it was
//! started for; anything from an older turn is dropped.

use crate::reveal::{spawn_reveal, RevealFrame, RevealPlan};
use futures::future::{AbortHandle, Abortable};
use providers::GenerativeModel;
use services::theme::{load_theme, save_theme};
use services::{HistoryEdit, KeyValueStore, MarkdownRenderer, PromptHistory};
use shared::settings::RevealSettings;
use shared::{Attachment, ChatError, PreviewRef, SubmitError, Theme};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const APP_TITLE: &str = "Gemchat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Idle,
    Sending,
    Rendering,
}

/// What the result area currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseView {
    pub markdown: String,
    pub html: String,
}

enum StoreEvent {
    Response {
        turn: u64,
        result: Result<String, String>,
    },
    Frame {
        turn: u64,
        frame: RevealFrame,
    },
}

struct InFlight {
    /// Input text at submit time, when the prompt came from the input field
    submitted_input: Option<String>,
    attachments: Vec<Attachment>,
    abort: AbortHandle,
}

pub struct ConversationStore {
    runtime: Handle,
    model: Option<Arc<dyn GenerativeModel>>,
    kv: Arc<dyn KeyValueStore>,
    history: PromptHistory,
    renderer: MarkdownRenderer,
    reveal_settings: RevealSettings,

    input: String,
    attachments: Vec<Attachment>,
    next_preview: u64,
    released: Vec<PreviewRef>,

    turn: u64,
    status: TurnStatus,
    recent_prompt: String,
    response: String,
    output: ResponseView,
    show_result: bool,
    last_error: Option<String>,
    in_flight: Option<InFlight>,
    reveal_abort: Option<AbortHandle>,

    tx: UnboundedSender<StoreEvent>,
    rx: UnboundedReceiver<StoreEvent>,
}

impl ConversationStore {
    /// `model` is `None` when no client could be configured; sends then fail
    /// with the configuration error instead of reaching the network.
    pub fn new(
        runtime: Handle,
        model: Option<Arc<dyn GenerativeModel>>,
        kv: Arc<dyn KeyValueStore>,
        reveal_settings: RevealSettings,
        os_prefers_dark: Option<bool>,
    ) -> Self {
        let history = PromptHistory::load(kv.clone());
        let theme = Theme::resolve(load_theme(kv.as_ref()), os_prefers_dark);
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            model,
            kv,
            history,
            renderer: MarkdownRenderer::new(theme),
            reveal_settings,
            input: String::new(),
            attachments: Vec::new(),
            next_preview: 0,
            released: Vec::new(),
            turn: 0,
            status: TurnStatus::Idle,
            recent_prompt: String::new(),
            response: String::new(),
            output: ResponseView::default(),
            show_result: false,
            last_error: None,
            in_flight: None,
            reveal_abort: None,
            tx,
            rx,
        }
    }

    // --- composer ---

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Takes ownership of the attachment and hands back its preview handle.
    pub fn add_attachment(&mut self, mut attachment: Attachment) -> PreviewRef {
        self.next_preview += 1;
        let preview = PreviewRef(self.next_preview);
        attachment.preview = Some(preview);
        self.attachments.push(attachment);
        preview
    }

    pub fn remove_attachment(&mut self, index: usize) -> Result<Attachment, ChatError> {
        if index >= self.attachments.len() {
            return Err(ChatError::AttachmentIndex {
                index,
                len: self.attachments.len(),
            });
        }
        let removed = self.attachments.remove(index);
        self.release(&removed);
        Ok(removed)
    }

    /// Preview handles released since the last call. The UI frees the
    /// matching textures.
    pub fn take_released_previews(&mut self) -> Vec<PreviewRef> {
        std::mem::take(&mut self.released)
    }

    // --- turns ---

    /// Start a turn. `None` sends the composer's input; `Some(prompt)` replays
    /// that text and leaves the input alone. Pending attachments go out with
    /// either one.
    pub fn submit(&mut self, prompt: Option<String>) -> Result<(), SubmitError> {
        if self.status == TurnStatus::Sending {
            return Err(SubmitError::Busy);
        }
        let from_input = prompt.is_none();
        let text = prompt.unwrap_or_else(|| self.input.clone());
        if text.trim().is_empty() && self.attachments.is_empty() {
            return Err(SubmitError::EmptyPrompt);
        }

        self.cancel_reveal();

        let attachments = std::mem::take(&mut self.attachments);
        if from_input && !text.trim().is_empty() {
            self.history.append(text.clone());
        }

        self.turn += 1;
        let turn = self.turn;
        tracing::debug!(turn, attachments = attachments.len(), "submitting prompt");

        self.recent_prompt = text.clone();
        self.response.clear();
        self.output = ResponseView::default();
        self.show_result = true;
        self.last_error = None;
        self.status = TurnStatus::Sending;

        let (abort, registration) = AbortHandle::new_pair();
        let model = self.model.clone();
        let tx = self.tx.clone();
        let prompt = text.clone();
        let snapshot = attachments.clone();
        self.runtime.spawn(async move {
            let request = async {
                match model.as_deref() {
                    Some(model) => providers::send(model, &prompt, &snapshot).await,
                    None => Err(anyhow::Error::from(ChatError::MissingApiKey)),
                }
            };
            let result = match Abortable::new(request, registration).await {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(_aborted) => return,
            };
            let _ = tx.send(StoreEvent::Response { turn, result });
        });

        self.in_flight = Some(InFlight {
            submitted_input: from_input.then_some(text),
            attachments,
            abort,
        });
        Ok(())
    }

    /// Apply everything background tasks reported since the last call.
    /// Returns true when visible state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            changed |= self.apply(event);
        }
        changed
    }

    /// Abandon the current turn and go back to the greeting.
    pub fn new_chat(&mut self) {
        self.cancel_reveal();
        if let Some(flight) = self.in_flight.take() {
            flight.abort.abort();
            for attachment in &flight.attachments {
                self.release(attachment);
            }
        }
        self.turn += 1;
        self.status = TurnStatus::Idle;
        self.show_result = false;
        self.recent_prompt.clear();
        self.response.clear();
        self.output = ResponseView::default();
        self.last_error = None;
    }

    fn apply(&mut self, event: StoreEvent) -> bool {
        match event {
            StoreEvent::Response { turn, result } if turn == self.turn => {
                self.finish_send(result);
                true
            }
            StoreEvent::Frame { turn, frame }
                if turn == self.turn && self.status == TurnStatus::Rendering =>
            {
                self.output = ResponseView {
                    html: self.renderer.render(&frame.markdown),
                    markdown: frame.markdown,
                };
                if frame.done {
                    self.reveal_abort = None;
                    self.status = TurnStatus::Idle;
                    tracing::debug!(turn, "turn complete");
                }
                true
            }
            _ => {
                tracing::trace!("dropping event from a superseded turn");
                false
            }
        }
    }

    fn finish_send(&mut self, result: Result<String, String>) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        match result {
            Ok(text) => {
                for attachment in &flight.attachments {
                    self.release(attachment);
                }
                if flight.submitted_input.as_deref() == Some(self.input.as_str()) {
                    self.input.clear();
                }
                self.response = text.clone();
                self.status = TurnStatus::Rendering;

                let tx = self.tx.clone();
                let turn = self.turn;
                self.reveal_abort = Some(spawn_reveal(
                    &self.runtime,
                    RevealPlan::new(text),
                    self.reveal_settings,
                    move |frame| {
                        let _ = tx.send(StoreEvent::Frame { turn, frame });
                    },
                ));
            }
            Err(message) => {
                tracing::error!("send failed: {}", message);
                // Put the snapshot back ahead of anything attached meanwhile
                let mut restored = flight.attachments;
                restored.append(&mut self.attachments);
                self.attachments = restored;
                self.last_error = Some(message);
                self.status = TurnStatus::Idle;
            }
        }
    }

    fn cancel_reveal(&mut self) {
        if let Some(handle) = self.reveal_abort.take() {
            handle.abort();
        }
        if self.status == TurnStatus::Rendering {
            self.status = TurnStatus::Idle;
        }
    }

    fn release(&mut self, attachment: &Attachment) {
        if let Some(preview) = attachment.preview {
            self.released.push(preview);
        }
    }

    // --- history ---

    pub fn history(&self) -> &[String] {
        self.history.entries()
    }

    pub fn edit_history(&mut self, index: usize, text: &str) -> Result<HistoryEdit, ChatError> {
        self.history.edit(index, text)
    }

    pub fn delete_history(&mut self, index: usize) -> Result<String, ChatError> {
        self.history.delete(index)
    }

    // --- theme ---

    pub fn theme(&self) -> Theme {
        self.renderer.theme()
    }

    pub fn set_theme(&mut self, theme: Theme) {
        save_theme(self.kv.as_ref(), theme);
        if theme == self.renderer.theme() {
            return;
        }
        self.renderer.set_theme(theme);
        if !self.output.markdown.is_empty() {
            self.output.html = self.renderer.render(&self.output.markdown);
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let next = self.theme().toggled();
        self.set_theme(next);
        next
    }

    // --- read-only view ---

    pub fn status(&self) -> TurnStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == TurnStatus::Sending
    }

    pub fn show_result(&self) -> bool {
        self.show_result
    }

    pub fn recent_prompt(&self) -> &str {
        &self.recent_prompt
    }

    pub fn output(&self) -> &ResponseView {
        &self.output
    }

    /// The complete response text, even while it is still being revealed.
    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn window_title(&self) -> String {
        match self.recent_prompt.trim().lines().next() {
            Some(line) if !line.trim().is_empty() => format!("{} - {}", line.trim(), APP_TITLE),
            _ => APP_TITLE.to_string(),
        }
    }
}

use anyhow::anyhow;
use chat_host::{ConversationStore, TurnStatus, VoiceInput, APP_TITLE};
use eframe::egui;
use parking_lot::Mutex;
use providers::{GeminiClient, GenerativeModel};
use services::config::{load_settings_or_default, save_settings, state_dir};
use services::{FileStore, KeyValueStore, MemoryStore};
use shared::{Identity, Theme};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod attachments;
mod chat_panel;
mod sidebar;
mod simple_md;

use attachments::PreviewTextures;
use sidebar::SidebarState;

/// Everything the UI reads and mutates each frame.
pub struct AppState {
    pub store: ConversationStore,
    pub identity: Identity,
    pub voice: VoiceInput,
    pub previews: PreviewTextures,
    pub sidebar: SidebarState,
    /// Last refusal or attach failure, shown under the composer
    pub notice: Option<String>,
    window_title: String,
}

impl AppState {
    pub fn submit(&mut self, prompt: Option<String>) {
        match self.store.submit(prompt) {
            Ok(()) => self.notice = None,
            Err(e) => {
                tracing::debug!("submit refused: {}", e);
                self.notice = Some(e.to_string());
            }
        }
    }
}

fn open_state_store() -> Arc<dyn KeyValueStore> {
    let Some(dir) = state_dir() else {
        tracing::warn!("no config directory; history will not be saved");
        return Arc::new(MemoryStore::new());
    };
    match FileStore::open(&dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("falling back to in-memory state: {}", e);
            Arc::new(MemoryStore::new())
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (settings, fresh) = load_settings_or_default();
    if fresh {
        save_settings(&settings);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let kv = open_state_store();
    let model: Option<Arc<dyn GenerativeModel>> = match GeminiClient::from_settings(&settings.model) {
        Ok(client) => {
            tracing::info!(model = %settings.model.model, "gemini client ready");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    };
    let identity = Identity::from_profile(&settings.user_profile);
    let reveal = settings.reveal;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([640.0, 480.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |cc| {
            let os_prefers_dark = cc
                .integration_info
                .system_theme
                .map(|t| t == eframe::Theme::Dark);
            let store = ConversationStore::new(
                runtime.handle().clone(),
                model,
                kv,
                reveal,
                os_prefers_dark,
            );
            Box::new(GemchatApp {
                state: Arc::new(Mutex::new(AppState {
                    store,
                    identity,
                    voice: VoiceInput::unavailable(),
                    previews: PreviewTextures::default(),
                    sidebar: SidebarState {
                        extended: true,
                        editing: None,
                    },
                    notice: None,
                    window_title: String::new(),
                })),
                _runtime: runtime,
            })
        }),
    )
    .map_err(|e| anyhow!("{e}"))
}

struct GemchatApp {
    state: Arc<Mutex<AppState>>,
    // Background sends and reveal timers run here
    _runtime: tokio::runtime::Runtime,
}

fn apply_theme(ctx: &egui::Context, theme: Theme) {
    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 8.0);
    if theme.is_dark() {
        style.visuals = egui::Visuals::dark();
        style.visuals.panel_fill = egui::Color32::from_rgb(19, 19, 20);
        style.visuals.faint_bg_color = egui::Color32::from_rgb(40, 42, 44);
    } else {
        style.visuals = egui::Visuals::light();
        style.visuals.panel_fill = egui::Color32::WHITE;
        style.visuals.faint_bg_color = egui::Color32::from_rgb(240, 244, 249);
    }
    ctx.set_style(style);
}

impl eframe::App for GemchatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut guard = self.state.lock();
        let s = &mut *guard;

        // Drain background results (non-blocking)
        s.store.poll();
        for preview in s.store.take_released_previews() {
            s.previews.release(preview);
        }
        if s.store.status() != TurnStatus::Idle {
            ctx.request_repaint_after(Duration::from_millis(30));
        }

        apply_theme(ctx, s.store.theme());

        let title = s.store.window_title();
        if title != s.window_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            s.window_title = title;
        }

        sidebar::render_sidebar(ctx, s);
        chat_panel::render_top_bar(ctx, s);
        chat_panel::render_composer(ctx, s);
        chat_panel::render_main(ctx, s);
    }
}

//! Collapsible history sidebar: new chat, recent prompts, edit and delete.

use crate::AppState;
use eframe::egui;

const ENTRY_PREVIEW_CHARS: usize = 24;

#[derive(Debug, Default)]
pub struct SidebarState {
    pub extended: bool,
    /// Entry being renamed, with the text typed so far
    pub editing: Option<(usize, String)>,
}

enum SidebarAction {
    NewChat,
    Replay(String),
    BeginEdit(usize),
    SaveEdit(usize, String),
    CancelEdit,
    Delete(usize),
}

/// Sidebar label for a history entry.
pub fn entry_label(entry: &str) -> String {
    if entry.chars().count() > ENTRY_PREVIEW_CHARS {
        let head: String = entry.chars().take(ENTRY_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        entry.to_string()
    }
}

pub fn render_sidebar(ctx: &egui::Context, s: &mut AppState) {
    let dark = s.store.theme().is_dark();
    let width = if s.sidebar.extended { 250.0 } else { 56.0 };
    let mut action: Option<SidebarAction> = None;

    egui::SidePanel::left("history")
        .resizable(false)
        .exact_width(width)
        .frame(
            egui::Frame::none()
                .fill(if dark {
                    egui::Color32::from_rgb(30, 31, 32)
                } else {
                    egui::Color32::from_rgb(240, 244, 249)
                })
                .inner_margin(egui::Margin::symmetric(10.0, 14.0)),
        )
        .show(ctx, |ui| {
            if ui
                .add(egui::Button::new(egui::RichText::new("☰").size(18.0)).frame(false))
                .on_hover_text("Toggle menu")
                .clicked()
            {
                s.sidebar.extended = !s.sidebar.extended;
            }
            ui.add_space(24.0);

            let new_chat = if s.sidebar.extended { "+  New Chat" } else { "+" };
            if ui
                .add(egui::Button::new(new_chat).rounding(egui::Rounding::same(16.0)))
                .clicked()
            {
                action = Some(SidebarAction::NewChat);
            }

            if !s.sidebar.extended {
                return;
            }

            ui.add_space(20.0);
            ui.label(egui::RichText::new("Recent").strong());
            ui.add_space(6.0);

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for (index, entry) in s.store.history().iter().enumerate() {
                        let editing = match &mut s.sidebar.editing {
                            Some((i, text)) if *i == index => Some(text),
                            _ => None,
                        };
                        if let Some(text) = editing {
                            ui.horizontal(|ui| {
                                let edit = ui.add(
                                    egui::TextEdit::singleline(text).desired_width(140.0),
                                );
                                let enter = edit.lost_focus()
                                    && ui.input(|i| i.key_pressed(egui::Key::Enter));
                                if enter || ui.small_button("✔").on_hover_text("Save").clicked() {
                                    action = Some(SidebarAction::SaveEdit(index, text.clone()));
                                }
                                if ui.small_button("✕").on_hover_text("Cancel").clicked()
                                    || ui.input(|i| i.key_pressed(egui::Key::Escape))
                                {
                                    action = Some(SidebarAction::CancelEdit);
                                }
                            });
                            continue;
                        }

                        ui.horizontal(|ui| {
                            let label = egui::Button::new(format!("💬 {}", entry_label(entry)))
                                .frame(false);
                            if ui.add(label).on_hover_text(entry.as_str()).clicked() {
                                action = Some(SidebarAction::Replay(entry.clone()));
                            }
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                                        action = Some(SidebarAction::Delete(index));
                                    }
                                    if ui.small_button("✏").on_hover_text("Edit").clicked() {
                                        action = Some(SidebarAction::BeginEdit(index));
                                    }
                                },
                            );
                        });
                    }
                });
        });

    match action {
        Some(SidebarAction::NewChat) => {
            s.sidebar.editing = None;
            s.store.new_chat();
        }
        Some(SidebarAction::Replay(prompt)) => s.submit(Some(prompt)),
        Some(SidebarAction::BeginEdit(index)) => {
            let current = s.store.history().get(index).cloned().unwrap_or_default();
            s.sidebar.editing = Some((index, current));
        }
        Some(SidebarAction::SaveEdit(index, text)) => {
            s.sidebar.editing = None;
            if let Err(e) = s.store.edit_history(index, &text) {
                tracing::warn!("history edit failed: {}", e);
            }
        }
        Some(SidebarAction::CancelEdit) => s.sidebar.editing = None,
        Some(SidebarAction::Delete(index)) => {
            s.sidebar.editing = None;
            if let Err(e) = s.store.delete_history(index) {
                tracing::warn!("history delete failed: {}", e);
            }
        }
        None => {}
    }
}

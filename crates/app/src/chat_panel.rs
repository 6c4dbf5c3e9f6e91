//! Top bar, result area and composer.

use crate::attachments::{load_image, pick_images};
use crate::simple_md::render_markdown;
use crate::AppState;
use chat_host::APP_TITLE;
use eframe::egui;

const SUGGESTIONS: [&str; 4] = [
    "Suggest beautiful places to visit in the world",
    "Briefly summarize this concept: urban planning",
    "Brainstorm team bonding activities for our work retreat",
    "Improve the readability of the following code",
];

fn accent() -> egui::Color32 {
    egui::Color32::from_rgb(66, 133, 244)
}

pub fn render_top_bar(ctx: &egui::Context, s: &mut AppState) {
    let dark = s.store.theme().is_dark();
    egui::TopBottomPanel::top("top_bar")
        .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(20.0, 12.0)))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(APP_TITLE).size(22.0));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let initial = s
                        .identity
                        .display_name
                        .as_deref()
                        .and_then(|n| n.chars().next())
                        .filter(|_| s.identity.signed_in)
                        .unwrap_or('D');
                    egui::Frame::none()
                        .fill(accent())
                        .rounding(egui::Rounding::same(16.0))
                        .inner_margin(egui::Margin::symmetric(10.0, 6.0))
                        .show(ui, |ui| {
                            ui.label(egui::RichText::new(initial.to_string()).color(egui::Color32::WHITE));
                        })
                        .response
                        .on_hover_text(if s.identity.signed_in {
                            "Signed in"
                        } else {
                            "Not signed in"
                        });

                    ui.add_space(8.0);
                    let (icon, hint) = if dark {
                        ("☀", "Switch to light mode")
                    } else {
                        ("🌙", "Switch to dark mode")
                    };
                    if ui
                        .add(egui::Button::new(egui::RichText::new(icon).size(18.0)).frame(false))
                        .on_hover_text(hint)
                        .clicked()
                    {
                        let theme = s.store.toggle_theme();
                        tracing::info!("theme set to {}", theme);
                    }
                });
            });
        });
}

pub fn render_composer(ctx: &egui::Context, s: &mut AppState) {
    egui::TopBottomPanel::bottom("composer")
        .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(20.0, 12.0)))
        .show(ctx, |ui| {
            ui.set_max_width(900.0);

            // Attachment chips
            if !s.store.attachments().is_empty() {
                let mut remove: Option<usize> = None;
                ui.horizontal_wrapped(|ui| {
                    for (index, attachment) in s.store.attachments().iter().enumerate() {
                        egui::Frame::group(ui.style()).show(ui, |ui| {
                            ui.horizontal(|ui| {
                                match s.previews.get(attachment.preview) {
                                    Some(texture) => {
                                        ui.add(
                                            egui::Image::new(texture)
                                                .fit_to_exact_size(egui::vec2(40.0, 40.0))
                                                .rounding(egui::Rounding::same(6.0)),
                                        );
                                    }
                                    None => {
                                        ui.label("🖼");
                                    }
                                }
                                if ui
                                    .small_button("✕")
                                    .on_hover_text(format!("Remove {}", attachment.name))
                                    .clicked()
                                {
                                    remove = Some(index);
                                }
                            });
                        });
                    }
                });
                if let Some(index) = remove {
                    if let Err(e) = s.store.remove_attachment(index) {
                        tracing::warn!("{}", e);
                    }
                }
                ui.add_space(6.0);
            }

            let mut submit = false;
            egui::Frame::none()
                .fill(ui.visuals().faint_bg_color)
                .rounding(egui::Rounding::same(28.0))
                .inner_margin(egui::Margin::symmetric(18.0, 10.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let mut input = if s.voice.is_recording() {
                            s.voice.display_text()
                        } else {
                            s.store.input().to_string()
                        };
                        let edit = ui.add(
                            egui::TextEdit::singleline(&mut input)
                                .hint_text("Enter a prompt here")
                                .frame(false)
                                .desired_width(ui.available_width() - 120.0),
                        );
                        if edit.changed() && !s.voice.is_recording() {
                            s.store.set_input(input);
                        }
                        if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                            submit = true;
                            edit.request_focus();
                        }

                        let can_send =
                            !s.store.input().is_empty() || !s.store.attachments().is_empty();
                        if can_send
                            && ui
                                .add(egui::Button::new(egui::RichText::new("➤").size(18.0)).frame(false))
                                .on_hover_text("Send")
                                .clicked()
                        {
                            submit = true;
                        }

                        let mic_hint = match s.voice.last_error() {
                            Some(e) => format!("Voice input stopped: {e}"),
                            None if s.voice.is_available() => "Start voice input".to_string(),
                            None => "Voice input is not available on this system".to_string(),
                        };
                        ui.add_enabled(
                            s.voice.is_available(),
                            egui::Button::new(egui::RichText::new("🎤").size(18.0)).frame(false),
                        )
                        .on_hover_text(mic_hint.clone())
                        .on_disabled_hover_text(mic_hint);

                        if ui
                            .add(egui::Button::new(egui::RichText::new("🖼").size(18.0)).frame(false))
                            .on_hover_text("Upload images")
                            .clicked()
                        {
                            attach_images(ctx, s);
                        }
                    });
                });

            if submit {
                s.submit(None);
            }

            if let Some(notice) = &s.notice {
                ui.label(egui::RichText::new(notice).small().color(egui::Color32::from_rgb(217, 48, 37)));
            }
            ui.vertical_centered(|ui| {
                ui.label(
                    egui::RichText::new(
                        "Gemchat can make mistakes, so double-check the answers it gives you.",
                    )
                    .small()
                    .weak(),
                );
            });
        });
}

fn attach_images(ctx: &egui::Context, s: &mut AppState) {
    for path in pick_images() {
        match load_image(&path) {
            Ok((attachment, image)) => {
                let preview = s.store.add_attachment(attachment);
                s.previews.insert(ctx, preview, image);
            }
            Err(e) => {
                tracing::warn!("could not attach {}: {:#}", path.display(), e);
                s.notice = Some(format!("{e:#}"));
            }
        }
    }
}

pub fn render_main(ctx: &egui::Context, s: &mut AppState) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(32.0, 16.0)))
        .show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    ui.set_max_width(900.0);
                    if s.store.show_result() {
                        render_result(ui, s);
                    } else {
                        render_greeting(ui, s);
                    }
                });
        });
}

fn render_greeting(ui: &mut egui::Ui, s: &mut AppState) {
    ui.add_space(40.0);
    ui.label(
        egui::RichText::new(s.identity.greeting())
            .size(44.0)
            .color(accent()),
    );
    ui.label(
        egui::RichText::new("How can I help you today?")
            .size(44.0)
            .weak(),
    );
    ui.add_space(40.0);

    ui.horizontal_wrapped(|ui| {
        for suggestion in SUGGESTIONS {
            let card = egui::Button::new(egui::RichText::new(suggestion).size(15.0))
                .min_size(egui::vec2(190.0, 150.0))
                .wrap(true)
                .rounding(egui::Rounding::same(12.0));
            if ui.add(card).clicked() {
                s.store.set_input(suggestion);
            }
        }
    });
}

fn render_result(ui: &mut egui::Ui, s: &mut AppState) {
    let theme = s.store.theme();
    ui.add_space(16.0);
    ui.horizontal_wrapped(|ui| {
        ui.label(egui::RichText::new("👤").size(20.0));
        ui.label(egui::RichText::new(s.store.recent_prompt()).size(16.0));
    });
    ui.add_space(20.0);

    ui.horizontal_top(|ui| {
        ui.label(egui::RichText::new("✦").size(22.0).color(accent()));
        ui.vertical(|ui| {
            if s.store.is_loading() {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new());
                    ui.label(egui::RichText::new("Thinking...").weak());
                });
                return;
            }
            if let Some(error) = s.store.last_error() {
                ui.label(
                    egui::RichText::new(format!("Something went wrong.\n{error}"))
                        .color(egui::Color32::from_rgb(217, 48, 37)),
                );
                return;
            }

            render_markdown(ui, &s.store.output().markdown, theme);

            if s.store.status() == chat_host::TurnStatus::Idle && !s.store.response().is_empty() {
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.small_button("Copy").clicked() {
                        let text = s.store.response().to_string();
                        ui.output_mut(|o| o.copied_text = text);
                    }
                    if ui.small_button("Copy as HTML").clicked() {
                        let html = s.store.output().html.clone();
                        ui.output_mut(|o| o.copied_text = html);
                    }
                });
            }
        });
    });
}

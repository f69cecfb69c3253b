//! # Motion Viewer User Interface Module
//!
//! eframe window for inspecting XR motion-controller profiles and the way
//! their input drives a controller model.
//!
//! ## Why This Module Exists
//!
//! Profile authors need to see whether every component of a profile reaches
//! the right node of its asset. The window shows:
//!
//! - **Top Panel**: profile, handedness and background selectors, the local
//!   profile directory input and the force-profile toggle for hardware input
//! - **Central Panel**: manual controls, one row per component with sliders
//!   and the component's live data
//! - **Side Panel**: node inspector for the mock model and, when a gamepad is
//!   attached, the hardware model
//! - **Bottom Panel**: the error list
//!
//! ## Frame Processing
//!
//! All state lives in [`ViewerSession`]. Each frame [`ViewerSession::tick`]
//! drains finished background work, reacts to selection changes and advances
//! every ready model; drawing happens afterwards on the settled state.
//! Selectors are disabled while a profile fetch is in flight.
//!
//! ### Refresh Rate Management
//! Repaints are requested every `frame_interval` so models keep animating
//! without user input.

pub mod common;
pub mod manual_controls;
pub mod node_inspector;
pub mod viewer_session;

use eframe::egui::{self, Button, ComboBox, RichText, ScrollArea, TextEdit, Vec2};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::profile::Handedness;

use self::common::UiColors;
pub use self::viewer_session::{Completion, ViewerSession};

/// Main window of the viewer.
pub struct ViewerUI {
    /// Selection, models and background work
    session: ViewerSession,
    /// Text of the local profile directory input
    local_dir_input: String,
    /// Time of the previous frame, for `advance(dt)`
    last_frame: Instant,
    /// Requested repaint interval
    frame_interval: Duration,
}

/// What the user picked in the top panel this frame.
enum TopBarAction {
    Profile(String),
    Handedness(Handedness),
    Background(String),
    LoadLocal(PathBuf),
    ForceProfile(bool),
}

impl ViewerUI {
    /// Creates the window state around an already started session.
    ///
    /// # Parameters
    /// - `cc`: eframe creation context for egui initialization
    /// - `session`: viewer state, usually started with [`ViewerSession::start`]
    /// - `frame_interval`: repaint interval of the render loop
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        session: ViewerSession,
        frame_interval: Duration,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);
        Self {
            session,
            local_dir_input: String::new(),
            last_frame: Instant::now(),
            frame_interval,
        }
    }

    fn render_top_bar(&mut self, ui: &mut egui::Ui) -> Vec<TopBarAction> {
        let mut actions = Vec::new();
        let selector = self.session.profile_selector();
        let busy = selector.is_busy();

        ui.horizontal(|ui| {
            ui.add_enabled_ui(!busy, |ui| {
                ComboBox::from_id_salt("profile_selector")
                    .selected_text(selector.selected_profile_id().unwrap_or("-"))
                    .show_ui(ui, |ui| {
                        for id in selector.options() {
                            let selected = selector.selected_profile_id() == Some(id.as_str());
                            if ui.selectable_label(selected, id).clicked() && !selected {
                                actions.push(TopBarAction::Profile(id.clone()));
                            }
                        }
                    });

                ComboBox::from_id_salt("handedness_selector")
                    .selected_text(
                        selector
                            .selected_handedness()
                            .map_or("-".to_string(), |h| h.to_string()),
                    )
                    .show_ui(ui, |ui| {
                        for &handedness in selector.handedness_options() {
                            let selected = selector.selected_handedness() == Some(handedness);
                            if ui
                                .selectable_label(selected, handedness.to_string())
                                .clicked()
                                && !selected
                            {
                                actions.push(TopBarAction::Handedness(handedness));
                            }
                        }
                    });
            });
            if busy {
                ui.spinner();
            }
            if selector.list_failed() {
                ui.label(RichText::new("profile list unavailable").color(UiColors::INACTIVE));
            }

            ui.separator();
            let backgrounds = self.session.background_selector();
            ComboBox::from_id_salt("background_selector")
                .selected_text(backgrounds.selected().unwrap_or("-"))
                .show_ui(ui, |ui| {
                    for name in backgrounds.names() {
                        let selected = backgrounds.selected() == Some(name);
                        if ui.selectable_label(selected, name).clicked() && !selected {
                            actions.push(TopBarAction::Background(name.to_string()));
                        }
                    }
                });

            ui.separator();
            ui.add(
                TextEdit::singleline(&mut self.local_dir_input)
                    .hint_text("local profile directory")
                    .desired_width(220.0),
            );
            let load = Button::new("Load local").min_size(Vec2 { x: 80.0, y: 20.0 });
            if ui
                .add_enabled(!self.local_dir_input.trim().is_empty(), load)
                .clicked()
            {
                actions.push(TopBarAction::LoadLocal(PathBuf::from(
                    self.local_dir_input.trim(),
                )));
            }

            if self.session.has_hardware() {
                ui.separator();
                let mut force = self.session.force_profile();
                if ui.checkbox(&mut force, "Force profile").changed() {
                    actions.push(TopBarAction::ForceProfile(force));
                }
            }
        });

        actions
    }

    fn apply(&mut self, action: TopBarAction) {
        match action {
            TopBarAction::Profile(id) => self.session.select_profile(&id),
            TopBarAction::Handedness(handedness) => self.session.select_handedness(handedness),
            TopBarAction::Background(name) => self.session.select_background(&name),
            TopBarAction::LoadLocal(dir) => self.session.read_local_directory(dir, false),
            TopBarAction::ForceProfile(force) => self.session.set_force_profile(force),
        }
    }

    fn render_error_list(&self, ui: &mut egui::Ui) {
        let entries = self.session.diagnostics().entries();
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("Errors ({})", entries.len())).strong());
            if let Some(background) = self.session.background() {
                ui.separator();
                ui.label(format!("Background: {}", background.path.display()));
            }
        });
        ScrollArea::vertical()
            .id_salt("error_list")
            .max_height(120.0)
            .show(ui, |ui| {
                for entry in entries {
                    ui.label(
                        RichText::new(format!(
                            "[{}] {}",
                            entry.at.format("%H:%M:%S"),
                            entry.message
                        ))
                        .color(UiColors::INACTIVE),
                    );
                }
            });
    }
}

impl eframe::App for ViewerUI {
    /// Advances the session, then draws the four panels.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.session.tick(dt);

        ctx.request_repaint_after(self.frame_interval);

        let actions = egui::TopBottomPanel::top("top_panel")
            .show(ctx, |ui| self.render_top_bar(ui))
            .inner;
        for action in actions {
            self.apply(action);
        }

        egui::TopBottomPanel::bottom("error_panel").show(ctx, |ui| self.render_error_list(ui));

        egui::SidePanel::right("node_inspector")
            .default_width(420.0)
            .show(ctx, |ui| {
                ui.heading("Nodes");
                match self.session.mock_model() {
                    Some(model) => node_inspector::render(ui, "mock", model),
                    None => {
                        ui.label("No model loaded");
                    }
                }
                if let Some(model) = self.session.hardware_model() {
                    ui.separator();
                    node_inspector::render(ui, "hardware", model);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Manual controls");
            self.session.manual_controls_mut().render(ui);
        });
    }
}

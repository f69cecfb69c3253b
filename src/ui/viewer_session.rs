//! # Viewer Session
//!
//! Everything the viewer window does except drawing.
//!
//! ## Why This Module Exists
//! The render loop must never wait. Fetches, file reads and asset loads run
//! on the tokio runtime and come back as [`Completion`]s through an unbounded
//! channel; selection changes arrive on `watch` channels. [`ViewerSession::tick`]
//! drains both once per frame and then advances every ready model.
//!
//! ## Staleness
//! Model loads carry the generation they were started for. A completion for
//! an older generation is dropped, so a slow asset never replaces the model
//! of a newer selection.

use crate::diagnostics::Diagnostics;
use crate::input::{InputSource, MockGamepad, MockInputSource};
use crate::model::{ControllerModel, Ready};
use crate::motion::MotionController;
use crate::profile::local::LocalFile;
use crate::profile::{
    Handedness, LocalProfile, Profile, ProfileError, ProfileResolver, ProfilesList,
};
use crate::selection::{
    Background, BackgroundSelector, ProfileFetch, ProfileFetchResult, ProfileSelector,
    SelectionError, SelectionEvent,
};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use super::manual_controls::ManualControls;

/// Result of background work, delivered to the render loop.
pub enum Completion {
    ProfilesList(Result<ProfilesList, ProfileError>),
    ProfileFetched(ProfileFetchResult),
    Backgrounds(Result<BTreeMap<String, String>, SelectionError>),
    LocalFiles {
        initial: bool,
        result: Result<Vec<LocalFile>, ProfileError>,
    },
    MockController {
        generation: u64,
        gamepad: MockGamepad,
        controller: Option<MotionController>,
    },
    MockModel {
        generation: u64,
        model: Option<ControllerModel<Ready>>,
    },
    HardwareModel {
        generation: u64,
        model: Option<ControllerModel<Ready>>,
    },
}

pub struct ViewerSession {
    runtime: Handle,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    diagnostics: Diagnostics,

    profile_selector: ProfileSelector,
    selection_rx: watch::Receiver<SelectionEvent>,
    background_selector: BackgroundSelector,
    background_rx: watch::Receiver<Option<Background>>,
    background: Option<Background>,

    manual_controls: ManualControls,
    mock_generation: u64,
    mock_model: Option<ControllerModel<Ready>>,
    mock_controller: Option<MotionController>,

    hardware_source: Option<InputSource>,
    force_profile: bool,
    hardware_generation: u64,
    hardware_model: Option<ControllerModel<Ready>>,
}

impl ViewerSession {
    pub fn new(
        runtime: Handle,
        profile_selector: ProfileSelector,
        background_selector: BackgroundSelector,
        diagnostics: Diagnostics,
        hardware_source: Option<InputSource>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let selection_rx = profile_selector.subscribe();
        let background_rx = background_selector.subscribe();
        Self {
            runtime,
            completions_tx,
            completions_rx,
            diagnostics,
            profile_selector,
            selection_rx,
            background_selector,
            background_rx,
            background: None,
            manual_controls: ManualControls::new(),
            mock_generation: 0,
            mock_model: None,
            mock_controller: None,
            hardware_source,
            force_profile: false,
            hardware_generation: 0,
            hardware_model: None,
        }
    }

    /// Kicks off the profile list, the background list and an optional
    /// initial read of local profile files.
    pub fn start(&mut self, local_dir: Option<PathBuf>) {
        if self.profile_selector.needs_profiles_list() {
            let repository = self.profile_selector.repository().clone();
            self.spawn(async move {
                Completion::ProfilesList(repository.fetch_profiles_list().await)
            });
        }

        let dir = self.background_selector.dir().to_path_buf();
        self.spawn(async move { Completion::Backgrounds(BackgroundSelector::fetch_list(&dir).await) });

        if let Some(dir) = local_dir {
            self.read_local_directory(dir, true);
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn profile_selector(&self) -> &ProfileSelector {
        &self.profile_selector
    }

    pub fn background_selector(&self) -> &BackgroundSelector {
        &self.background_selector
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn manual_controls(&self) -> &ManualControls {
        &self.manual_controls
    }

    pub fn manual_controls_mut(&mut self) -> &mut ManualControls {
        &mut self.manual_controls
    }

    pub fn mock_model(&self) -> Option<&ControllerModel<Ready>> {
        self.mock_model.as_ref()
    }

    pub fn hardware_model(&self) -> Option<&ControllerModel<Ready>> {
        self.hardware_model.as_ref()
    }

    pub fn has_hardware(&self) -> bool {
        self.hardware_source.is_some()
    }

    pub fn force_profile(&self) -> bool {
        self.force_profile
    }

    /// One render loop step.
    pub fn tick(&mut self, dt: Duration) {
        self.drain_completions();
        self.react_to_local_profile();
        self.react_to_selection();
        self.react_to_background();

        if let Some(model) = &mut self.mock_model {
            model.advance(dt);
            self.manual_controls.update_text(model.controller());
        } else if let Some(controller) = &mut self.mock_controller {
            // Asset still loading or failed: keep the panel's data live
            controller.update_from_gamepad();
            self.manual_controls.update_text(controller);
        }
        if let Some(model) = &mut self.hardware_model {
            model.advance(dt);
        }
    }

    pub fn select_profile(&mut self, profile_id: &str) {
        let ticket = self.profile_selector.select_profile_id(profile_id);
        self.run_fetch(ticket);
    }

    pub fn select_handedness(&mut self, handedness: Handedness) {
        self.profile_selector.select_handedness(Some(handedness));
    }

    pub fn select_background(&mut self, name: &str) {
        self.background_selector.select(name);
    }

    pub fn set_force_profile(&mut self, force: bool) {
        if self.force_profile != force {
            self.force_profile = force;
            self.rebuild_hardware_model();
        }
    }

    pub fn read_local_directory(&mut self, dir: PathBuf, initial: bool) {
        info!("Reading local profile files from {}", dir.display());
        self.spawn(async move {
            Completion::LocalFiles {
                initial,
                result: LocalProfile::read_directory(&dir).await,
            }
        });
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            if tx.send(task.await).is_err() {
                debug!("Viewer closed, dropping completion");
            }
        });
    }

    fn run_fetch(&self, ticket: Option<ProfileFetch>) {
        if let Some(ticket) = ticket {
            self.spawn(async move { Completion::ProfileFetched(ticket.run().await) });
        }
    }

    fn drain_completions(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.handle_completion(completion);
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::ProfilesList(Ok(list)) => {
                let ticket = self.profile_selector.populate_profile_selector(list);
                self.run_fetch(ticket);
            }
            Completion::ProfilesList(Err(e)) => self.profile_selector.profiles_list_failed(&e),
            Completion::ProfileFetched(fetched) => {
                self.profile_selector.complete_profile_fetch(fetched)
            }
            Completion::Backgrounds(Ok(backgrounds)) => {
                self.background_selector.populate(backgrounds)
            }
            Completion::Backgrounds(Err(e)) => self
                .diagnostics
                .log(format!("Failed to load background list: {}", e)),
            Completion::LocalFiles {
                initial,
                result: Ok(files),
            } => {
                self.profile_selector.load_local_files(&files, initial);
            }
            Completion::LocalFiles { result: Err(e), .. } => self.diagnostics.log(e.to_string()),
            Completion::MockController {
                generation,
                gamepad,
                controller,
            } => {
                if generation != self.mock_generation {
                    debug!("Discarding stale mock controller (generation {})", generation);
                    return;
                }
                if let Some(controller) = controller {
                    self.manual_controls.build(&controller, gamepad);
                    self.initialize_mock_model(controller);
                }
            }
            Completion::MockModel { generation, model } => {
                if generation != self.mock_generation {
                    debug!("Discarding stale mock model (generation {})", generation);
                    return;
                }
                if model.is_some() {
                    self.mock_controller = None;
                }
                self.mock_model = model;
            }
            Completion::HardwareModel { generation, model } => {
                if generation != self.hardware_generation {
                    debug!("Discarding stale hardware model (generation {})", generation);
                    return;
                }
                self.hardware_model = model;
            }
        }
    }

    fn react_to_local_profile(&mut self) {
        let ticket = self.profile_selector.poll_local_profile();
        self.run_fetch(ticket);
    }

    fn react_to_selection(&mut self) {
        if !self.selection_rx.has_changed().unwrap_or(false) {
            return;
        }
        let event = self.selection_rx.borrow_and_update().clone();

        self.clear_mock();
        if let SelectionEvent::Changed {
            profile,
            handedness,
        } = event
        {
            self.create_mock(profile, handedness);
            self.rebuild_hardware_model();
        }
    }

    fn react_to_background(&mut self) {
        if !self.background_rx.has_changed().unwrap_or(false) {
            return;
        }
        self.background = self.background_rx.borrow_and_update().clone();
        if let Some(background) = &self.background {
            info!(
                "Background {} ({})",
                background.name,
                background.path.display()
            );
        }
    }

    fn clear_mock(&mut self) {
        self.mock_generation += 1;
        self.manual_controls.clear();
        self.mock_model = None;
        self.mock_controller = None;
    }

    fn create_mock(&mut self, profile: Arc<Profile>, handedness: Handedness) {
        let gamepad = match MockGamepad::new(Some(&profile), Some(handedness)) {
            Ok(gamepad) => gamepad,
            Err(e) => {
                self.diagnostics.log(e.to_string());
                return;
            }
        };
        let source = match MockInputSource::new(
            vec![profile.profile_id.clone()],
            &gamepad,
            Some(handedness),
        ) {
            Ok(source) => source,
            Err(e) => {
                self.diagnostics.log(e.to_string());
                return;
            }
        };

        let generation = self.mock_generation;
        let resolver = self.profile_selector.resolver();
        let diagnostics = self.diagnostics.clone();
        self.spawn(async move {
            let controller = create_motion_controller(&resolver, source, &diagnostics).await;
            Completion::MockController {
                generation,
                gamepad,
                controller,
            }
        });
    }

    fn initialize_mock_model(&mut self, controller: MotionController) {
        // The panel reads a second controller on the same input until the
        // model is ready
        self.mock_controller = MotionController::new(
            controller.input_source().clone(),
            controller.profile().clone(),
            controller.asset().cloned(),
        )
        .ok();

        let generation = self.mock_generation;
        let diagnostics = self.diagnostics.clone();
        self.spawn(async move {
            let model = ControllerModel::create(controller, diagnostics)
                .initialize()
                .await
                .ok();
            Completion::MockModel { generation, model }
        });
    }

    fn rebuild_hardware_model(&mut self) {
        let Some(hardware) = &self.hardware_source else {
            return;
        };
        let source = if self.force_profile {
            match self.profile_selector.forced_source(hardware) {
                Some(source) => source,
                None => return,
            }
        } else {
            hardware.clone()
        };

        self.hardware_generation += 1;
        self.hardware_model = None;
        let generation = self.hardware_generation;
        let resolver = self.profile_selector.resolver();
        let diagnostics = self.diagnostics.clone();
        info!(
            "Building hardware model for {:?} ({})",
            source.profiles, source.handedness
        );
        self.spawn(async move {
            let model = match create_motion_controller(&resolver, source, &diagnostics).await {
                Some(controller) => ControllerModel::create(controller, diagnostics)
                    .initialize()
                    .await
                    .ok(),
                None => None,
            };
            Completion::HardwareModel { generation, model }
        });
    }
}

/// Resolves the profile of `source` and builds its motion controller.
/// Failures are logged to `diagnostics`.
async fn create_motion_controller(
    resolver: &ProfileResolver,
    source: InputSource,
    diagnostics: &Diagnostics,
) -> Option<MotionController> {
    let resolved = match resolver.resolve(&source.profiles, source.handedness).await {
        Ok(resolved) => resolved,
        Err(e) => {
            diagnostics.log(e.to_string());
            return None;
        }
    };
    match MotionController::new(source, resolved.profile, resolved.asset) {
        Ok(controller) => Some(controller),
        Err(e) => {
            diagnostics.log(e.to_string());
            None
        }
    }
}

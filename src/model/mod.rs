//! # Model Module
//!
//! A [`ControllerModel`] couples a [`MotionController`] with the scene graph of
//! its 3D asset.
//!
//! ```text
//! ControllerModel<Loading> ── initialize ──► load asset ──► bind nodes ──► add touch markers
//!                                                                              │
//! ControllerModel<Ready>   ◄───────────────────────────────────────────────────┘
//!        │
//!        └── advance(dt) each frame: sample input ──► animate bound nodes
//! ```
//!
//! Only `Ready` exposes `advance`, so binding is always complete before the
//! first animated frame.

pub mod animator;
pub mod binder;
pub mod loader;
pub mod scene;

use crate::diagnostics::Diagnostics;
use crate::motion::MotionController;
use binder::Bindings;
use scene::SceneGraph;
use statum::{machine, state};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Asset {asset} missing or malformed.")]
    AssetLoad { asset: String, reason: String },

    #[error("Invalid glTF data: {0}")]
    InvalidGltf(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum ModelState {
    Loading,
    Ready,
}

#[machine]
#[derive(Debug)]
pub struct ControllerModel<S: ModelState> {
    controller: MotionController,
    scene: SceneGraph,
    bindings: Bindings,
    diagnostics: Diagnostics,
    elapsed: Duration,
    frames: u64,
}

impl<S: ModelState> ControllerModel<S> {
    pub fn controller(&self) -> &MotionController {
        &self.controller
    }
}

impl ControllerModel<Loading> {
    pub fn create(controller: MotionController, diagnostics: Diagnostics) -> Self {
        Self::new(
            controller,
            SceneGraph::new(),
            Bindings::default(),
            diagnostics,
            Duration::ZERO,
            0,
        )
    }

    /// Loads the controller's asset and binds it.
    ///
    /// A failed load is logged as a diagnostic and only fails this model.
    pub async fn initialize(self) -> Result<ControllerModel<Ready>, ModelError> {
        let Some(asset) = self.controller.asset().cloned() else {
            let err = ModelError::AssetLoad {
                asset: "<none>".to_string(),
                reason: "profile layout has no asset path".to_string(),
            };
            self.diagnostics.log(err.to_string());
            return Err(err);
        };

        info!("Loading asset {}", asset);
        let loaded = match asset.load_bytes().await {
            Ok(bytes) => loader::load_scene(&bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match loaded {
            Ok(scene) => Ok(self.attach_scene(scene)),
            Err(reason) => {
                let err = ModelError::AssetLoad {
                    asset: asset.to_string(),
                    reason,
                };
                debug!("Asset load failed: {:?}", err);
                self.diagnostics.log(err.to_string());
                Err(err)
            }
        }
    }

    /// Binds an already loaded scene.
    pub fn attach_scene(mut self, mut scene: SceneGraph) -> ControllerModel<Ready> {
        let components = self.controller.components();
        let bindings = binder::bind_nodes(&scene, components, &self.diagnostics);
        binder::add_touch_markers(&mut scene, components, &bindings);

        info!(
            "Model for {} ({}) ready: {} nodes, {} names resolved",
            self.controller.id(),
            self.controller.handedness(),
            scene.len(),
            bindings.table.entries().filter(|(_, id)| id.is_some()).count()
        );

        self.scene = scene;
        self.bindings = bindings;
        self.transition()
    }
}

impl ControllerModel<Ready> {
    pub fn is_loaded(&self) -> bool {
        true
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Re-samples input and projects it onto the bound nodes.
    pub fn advance(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.frames += 1;
        self.controller.update_from_gamepad();
        animator::animate(&mut self.scene, self.controller.components(), &self.bindings);
    }
}

//! Explicit event dispatcher.
//!
//! Local interactions, network messages and frame ticks all enter through
//! [`Dispatcher::handle`], which turns them into coordinator calls. Gesture
//! and voice recognition happen elsewhere; only their results arrive here.

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SyncError;
use crate::placement::{Mounting, PlacementPass, Surface, rank_surfaces};
use crate::replication::field::FieldValue;
use crate::replication::scene::Scene;
use crate::replication::selector::ModelSelection;
use crate::replication::types::{ModelKind, ObjectId, Pose, Quat, Transform, Vec3};
use crate::session::peer::Role;
use crate::sync::coordinator::{SyncCoordinator, TickInput};
use crate::sync::message::Envelope;
use crate::sync::presentation::Presentation;
use crate::sync::transport::Transport;

/// Degrees of yaw per meter of hand motion per second.
pub const ROTATION_SENSITIVITY: f32 = 100.0;

/// Height above a tapped point at which the model library is dropped.
pub const RELOCATE_LIFT: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManipulationMode {
    #[default]
    Movement,
    Rotation,
}

impl ManipulationMode {
    /// Maps a recognized voice keyword to a mode.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "rotation mode" => Some(ManipulationMode::Rotation),
            "movement mode" => Some(ManipulationMode::Movement),
            _ => None,
        }
    }
}

/// A recognized local interaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interaction {
    PosterClicked {
        model: ModelKind,
    },
    /// A hand drag on the model library began
    ManipulationStarted,
    ManipulationUpdated {
        /// Hand offset since the drag began
        cumulative_delta: Vec3,
        /// Seconds since the previous update
        delta_time: f32,
    },
    ManipulationCompleted,
    ManipulationCanceled,
    VoiceKeyword {
        keyword: String,
    },
    AirTap {
        head: Pose,
    },
    RelocateModel {
        target: Vec3,
    },
    SurfacesDetected {
        mounting: Mounting,
        surfaces: Vec<Surface>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LocalInteraction(Interaction),
    NetworkMessage(Envelope),
    Tick(TickInput),
}

pub struct Dispatcher<T: Transport, P: Presentation> {
    coordinator: SyncCoordinator<T, P>,
    scene: Scene,
    mode: ManipulationMode,
    drag_origin: Option<Transform>,
    /// Yaw accumulated since the drag began, in degrees
    drag_yaw: f32,
}

impl<T: Transport, P: Presentation> Dispatcher<T, P> {
    pub fn new(coordinator: SyncCoordinator<T, P>, scene: Scene) -> Self {
        Dispatcher {
            coordinator,
            scene,
            mode: ManipulationMode::default(),
            drag_origin: None,
            drag_yaw: 0.0,
        }
    }

    pub fn coordinator(&self) -> &SyncCoordinator<T, P> {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut SyncCoordinator<T, P> {
        &mut self.coordinator
    }

    pub fn mode(&self) -> ManipulationMode {
        self.mode
    }

    pub fn handle(&mut self, event: Event) -> Result<(), SyncError> {
        match event {
            Event::LocalInteraction(interaction) => self.on_local_interaction(interaction),
            Event::NetworkMessage(envelope) => self.on_network_message(envelope),
            Event::Tick(input) => {
                self.on_tick(&input);
                Ok(())
            }
        }
    }

    pub fn on_network_message(&mut self, envelope: Envelope) -> Result<(), SyncError> {
        self.coordinator.on_network_message(envelope)
    }

    pub fn on_tick(&mut self, input: &TickInput) {
        self.coordinator.on_tick(input);
    }

    pub fn on_local_interaction(&mut self, interaction: Interaction) -> Result<(), SyncError> {
        match interaction {
            Interaction::PosterClicked { model } => {
                self.coordinator.select_model(ModelSelection::from(model))?;
            }
            Interaction::ManipulationStarted => {
                self.drag_origin = self.coordinator.registry().transform(ObjectId::ModelLibrary);
                self.drag_yaw = 0.0;
            }
            Interaction::ManipulationUpdated {
                cumulative_delta,
                delta_time,
            } => self.on_drag(cumulative_delta, delta_time)?,
            Interaction::ManipulationCompleted | Interaction::ManipulationCanceled => {
                self.drag_origin = None;
            }
            Interaction::VoiceKeyword { keyword } => match ManipulationMode::from_keyword(&keyword) {
                Some(mode) => {
                    info!("Manipulation mode set to {:?}", mode);
                    self.mode = mode;
                }
                None => debug!("Ignoring keyword {:?}", keyword),
            },
            Interaction::AirTap { head } => {
                self.coordinator.spawn_cube(&head)?;
            }
            Interaction::RelocateModel { target } => {
                let Some(current) = self.coordinator.registry().transform(ObjectId::ModelLibrary)
                else {
                    return Err(SyncError::UnknownObject {
                        object: ObjectId::ModelLibrary,
                    });
                };
                let lift = current.rotation * Vec3::Y * RELOCATE_LIFT;
                let moved = Transform {
                    position: target + lift,
                    ..current
                };
                self.coordinator
                    .request_mutation(ObjectId::ModelLibrary, FieldValue::Transform(moved))?;
            }
            Interaction::SurfacesDetected { mounting, surfaces } => {
                self.place_on(mounting, surfaces)?;
            }
        }
        Ok(())
    }

    fn on_drag(&mut self, cumulative_delta: Vec3, delta_time: f32) -> Result<(), SyncError> {
        let Some(origin) = self.drag_origin else {
            debug!("Manipulation update without a drag in progress");
            return Ok(());
        };
        let Some(current) = self.coordinator.registry().transform(ObjectId::ModelLibrary) else {
            return Err(SyncError::UnknownObject {
                object: ObjectId::ModelLibrary,
            });
        };
        // Targets are absolute from the drag origin; unconfirmed requests may overwrite each other
        let next = match self.mode {
            ManipulationMode::Movement => Transform {
                position: origin.position + cumulative_delta,
                ..current
            },
            ManipulationMode::Rotation => {
                self.drag_yaw +=
                    -(cumulative_delta.x + cumulative_delta.z) * ROTATION_SENSITIVITY * delta_time;
                let yaw = Quat::from_rotation_y(self.drag_yaw.to_radians());
                Transform {
                    rotation: (origin.rotation * yaw).normalize(),
                    ..current
                }
            }
        };
        self.coordinator
            .request_mutation(ObjectId::ModelLibrary, FieldValue::Transform(next))?;
        Ok(())
    }

    /// Runs one greedy placement pass for every prop with `mounting` and
    /// routes each result through the coordinator. Guests leave placement to
    /// the host. Returns the number of props placed.
    pub fn place_on(&mut self, mounting: Mounting, mut surfaces: Vec<Surface>) -> Result<usize, SyncError> {
        if self.coordinator.role() == Some(Role::Guest) {
            debug!("Guest skips {:?} placement; the host places props", mounting);
            return Ok(0);
        }
        rank_surfaces(&mut surfaces);
        let mut pass = PlacementPass::new(&surfaces);
        let mut placed = Vec::new();
        for placeable in self.scene.placeables_for(mounting) {
            let Some(current) = self.coordinator.registry().transform(placeable.object) else {
                continue;
            };
            if let Some(transform) = pass.place(placeable, &current) {
                placed.push((placeable.object, transform));
            }
        }
        let count = placed.len();
        for (object, transform) in placed {
            self.coordinator
                .request_mutation(object, FieldValue::Transform(transform))?;
        }
        info!(
            "{:?} placement: {} of {} surfaces used",
            mounting,
            count,
            surfaces.len()
        );
        Ok(count)
    }
}

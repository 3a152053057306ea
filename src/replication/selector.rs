//! The exclusive model selector of the model library.
//!
//! The selector is a single tagged value rather than one flag per model, so a
//! state with two models shown at once cannot be represented, and switching
//! models is one assignment that no reader can observe half-done.

use serde::{Deserialize, Serialize};

use crate::replication::field::ReplicatedField;
use crate::replication::types::{ModelKind, Version};

/// Which model, if any, the model library shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelSelection {
    #[serde(rename = "none")]
    None,
    #[default]
    #[serde(rename = "hololens")]
    HoloLens,
    #[serde(rename = "car")]
    Car,
    #[serde(rename = "engine")]
    Engine,
}

impl ModelSelection {
    pub fn active(&self) -> Option<ModelKind> {
        match self {
            ModelSelection::None => None,
            ModelSelection::HoloLens => Some(ModelKind::HoloLens),
            ModelSelection::Car => Some(ModelKind::Car),
            ModelSelection::Engine => Some(ModelKind::Engine),
        }
    }

    pub fn is_active(&self, kind: ModelKind) -> bool {
        self.active() == Some(kind)
    }
}

impl From<ModelKind> for ModelSelection {
    fn from(kind: ModelKind) -> Self {
        match kind {
            ModelKind::HoloLens => ModelSelection::HoloLens,
            ModelKind::Car => ModelSelection::Car,
            ModelKind::Engine => ModelSelection::Engine,
        }
    }
}

impl From<Option<ModelKind>> for ModelSelection {
    fn from(kind: Option<ModelKind>) -> Self {
        kind.map_or(ModelSelection::None, ModelSelection::from)
    }
}

/// Replicated selector field; the scene shows the HoloLens model at start.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExclusiveSelector {
    field: ReplicatedField<ModelSelection>,
}

impl Default for ExclusiveSelector {
    fn default() -> Self {
        ExclusiveSelector::new(ModelSelection::default())
    }
}

impl ExclusiveSelector {
    pub fn new(initial: ModelSelection) -> Self {
        ExclusiveSelector {
            field: ReplicatedField::new(initial),
        }
    }

    pub fn current(&self) -> ModelSelection {
        *self.field.value()
    }

    pub fn version(&self) -> Version {
        self.field.version()
    }

    pub fn is_active(&self, kind: ModelKind) -> bool {
        self.current().is_active(kind)
    }

    /// Number of models currently shown; zero or one by construction.
    pub fn active_count(&self) -> usize {
        ModelKind::ALL
            .iter()
            .filter(|kind| self.is_active(**kind))
            .count()
    }

    /// Replaces the whole selection in one step.
    pub fn select(&mut self, selection: ModelSelection, version: Version) -> bool {
        self.field.apply(selection, version)
    }
}

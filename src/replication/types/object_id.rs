//! Identities of the replicated props in the shared scene.

use serde::{Deserialize, Serialize};

/// The three models the model library can show, each advertised by one poster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "hololens")]
    HoloLens,
    #[serde(rename = "car")]
    Car,
    #[serde(rename = "engine")]
    Engine,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::HoloLens, ModelKind::Car, ModelKind::Engine];
}

/// Identifies one replicated object of the fixed scene.
///
/// The ordering of this type is the order in which a full sync enumerates
/// objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectId {
    /// Wall poster that selects a model when clicked
    Poster(ModelKind),
    /// The model stand: owns a transform and the exclusive model selector
    ModelLibrary,
    Capsule,
    Sofa,
}

impl ObjectId {
    /// Capsule and sofa replicate their scale; posters and the model library
    /// only replicate position and rotation.
    pub fn replicates_scale(&self) -> bool {
        matches!(self, ObjectId::Capsule | ObjectId::Sofa)
    }

    /// Only the model library carries the exclusive model selector.
    pub fn has_selector(&self) -> bool {
        matches!(self, ObjectId::ModelLibrary)
    }
}

/// Prefabs that can be spawned as transient, unreplicated entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefabId {
    BrownCube,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_capabilities() {
        assert!(ObjectId::Capsule.replicates_scale());
        assert!(ObjectId::Sofa.replicates_scale());
        assert!(!ObjectId::Poster(ModelKind::Car).replicates_scale());
        assert!(!ObjectId::ModelLibrary.replicates_scale());

        assert!(ObjectId::ModelLibrary.has_selector());
        assert!(!ObjectId::Sofa.has_selector());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&ObjectId::Poster(ModelKind::HoloLens)).unwrap();
        assert_eq!(json, r#"{"poster":"hololens"}"#);
        let json = serde_json::to_string(&ObjectId::ModelLibrary).unwrap();
        assert_eq!(json, r#""model_library""#);
    }
}

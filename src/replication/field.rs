//! A single replicated value and the wire form of field values.

use serde::{Deserialize, Serialize};

use crate::replication::selector::ModelSelection;
use crate::replication::types::{Transform, Version};

/// One synchronized value with the version of the host commit that produced it.
///
/// Updates are last-write-wins: an update is applied unless its version is older
/// than the one already held. Re-applying the current version is a no-op on the
/// observable value, which makes broadcast delivery idempotent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicatedField<T> {
    value: T,
    version: Version,
}

impl<T: Clone + PartialEq> ReplicatedField<T> {
    /// Creates a field holding its design-time value.
    pub fn new(value: T) -> Self {
        ReplicatedField {
            value,
            version: Version::INITIAL,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Overwrites the value unless `version` is older than the current one.
    ///
    /// Returns `false` for a stale update, which leaves the field untouched.
    pub fn apply(&mut self, value: T, version: Version) -> bool {
        if version < self.version {
            return false;
        }
        self.value = value;
        self.version = version;
        true
    }
}

/// Names the fields a replicated object can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    Transform,
    Selection,
}

/// A new value for one field, as carried by mutation requests and broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Transform(Transform),
    Selection(ModelSelection),
}

impl FieldValue {
    pub fn field_id(&self) -> FieldId {
        match self {
            FieldValue::Transform(_) => FieldId::Transform,
            FieldValue::Selection(_) => FieldId::Selection,
        }
    }

    /// Positional values are only meaningful from a peer sharing the anchor frame.
    pub fn is_positional(&self) -> bool {
        matches!(self, FieldValue::Transform(_))
    }
}

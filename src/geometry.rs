//! Plain snapshots of transform-like objects, storable as custom data.

use crate::data::StorableData;
use crate::value::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Position, euler rotation (degrees) and scale of an object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransformData {
    pub position: Vector3,
    pub rotation: Vector3,
    pub scale: Vector3,
}

impl Default for TransformData {
    fn default() -> Self {
        Self {
            position: Vector3::default(),
            rotation: Vector3::default(),
            scale: Vector3::ONE,
        }
    }
}

impl StorableData for TransformData {
    const TYPE_NAME: &'static str = "TransformData";
}

/// Anchor layout of a rectangle inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RectTransformData {
    pub pivot: Vector2,
    pub anchored_position: Vector2,
    pub anchor_max: Vector2,
    pub anchor_min: Vector2,
    pub offset_max: Vector2,
    pub offset_min: Vector2,
    pub size_delta: Vector2,
}

impl Default for RectTransformData {
    fn default() -> Self {
        let center = Vector2::new(0.5, 0.5);
        Self {
            pivot: center,
            anchored_position: Vector2::default(),
            anchor_max: center,
            anchor_min: center,
            offset_max: Vector2::default(),
            offset_min: Vector2::default(),
            size_delta: Vector2::default(),
        }
    }
}

impl StorableData for RectTransformData {
    const TYPE_NAME: &'static str = "RectTransformData";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn test_identity_defaults() {
        let transform = TransformData::default();
        assert_eq!(transform.scale, Vector3::ONE);
        assert_eq!(transform.position, Vector3::default());
        assert_eq!(RectTransformData::default().pivot, Vector2::new(0.5, 0.5));
    }

    #[test]
    fn test_stored_as_custom_data() {
        let mut store = Store::new();
        let transform = TransformData {
            position: Vector3::new(1.0, 2.0, 3.0),
            ..Default::default()
        };
        store.set_data("player", transform);
        assert_eq!(store.try_get_data::<TransformData>("player"), Some(transform));
        assert_eq!(store.try_get_data::<RectTransformData>("player"), None);
    }
}

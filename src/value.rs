use crate::kind::ValueKind;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An RGBA color with float channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub(crate) fn is_finite(&self) -> bool {
        [self.r, self.g, self.b, self.a].iter().all(|c| c.is_finite())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ONE: Vector3 = Vector3::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vector4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub(crate) fn is_finite(&self) -> bool {
        [self.x, self.y, self.z, self.w].iter().all(|c| c.is_finite())
    }
}

/// A primitive payload of any of the eight built-in kinds.
///
/// This is what the dynamic accessors ([`Store::value`]) hand out, and what
/// [`Store::set_value`] accepts through `Into<Value>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    String(String),
    Color(Color),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
}

impl Value {
    /// The kind of map this value lives in.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::String(_) => ValueKind::String,
            Value::Color(_) => ValueKind::Color,
            Value::Vector2(_) => ValueKind::Vector2,
            Value::Vector3(_) => ValueKind::Vector3,
            Value::Vector4(_) => ValueKind::Vector4,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust type that maps onto one of the built-in value kinds.
///
/// Implemented for `i32`, `f32`, `bool`, `String`, [`Color`], [`Vector2`],
/// [`Vector3`] and [`Vector4`]. This trait is sealed.
pub trait PrimitiveValue: Clone + Into<Value> + sealed::Sealed + 'static {
    /// The kind recorded in the index for values of this type.
    const KIND: ValueKind;

    #[doc(hidden)]
    fn slot(store: &Store) -> &HashMap<String, Self>;

    #[doc(hidden)]
    fn slot_mut(store: &mut Store) -> &mut HashMap<String, Self>;
}

macro_rules! primitive {
    ($ty:ty, $variant:ident, $field:ident) => {
        impl sealed::Sealed for $ty {}

        impl PrimitiveValue for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn slot(store: &Store) -> &HashMap<String, Self> {
                &store.$field
            }

            fn slot_mut(store: &mut Store) -> &mut HashMap<String, Self> {
                &mut store.$field
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    };
}

primitive!(i32, Int, ints);
primitive!(f32, Float, floats);
primitive!(bool, Bool, bools);
primitive!(String, String, strings);
primitive!(Color, Color, colors);
primitive!(Vector2, Vector2, vector2s);
primitive!(Vector3, Vector3, vector3s);
primitive!(Vector4, Vector4, vector4s);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::from(3).kind(), ValueKind::Int);
        assert_eq!(Value::from(3.5f32).kind(), ValueKind::Float);
        assert_eq!(Value::from(true).kind(), ValueKind::Bool);
        assert_eq!(Value::from("name").kind(), ValueKind::String);
        assert_eq!(Value::from(Color::default()).kind(), ValueKind::Color);
        assert_eq!(Value::from(Vector2::default()).kind(), ValueKind::Vector2);
        assert_eq!(Value::from(Vector3::ONE).kind(), ValueKind::Vector3);
        assert_eq!(Value::from(Vector4::default()).kind(), ValueKind::Vector4);
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Vector3::new(1.0, 2.0, 3.0), Vector3::new(1.0, 2.0, 3.0));
        assert_ne!(Color::new(1.0, 0.0, 0.0, 1.0), Color::new(1.0, 0.0, 0.0, 0.5));
    }

    #[test]
    fn test_finite_checks() {
        assert!(Color::new(0.1, 0.2, 0.3, 1.0).is_finite());
        assert!(!Color::new(f32::NAN, 0.0, 0.0, 1.0).is_finite());
        assert!(!Vector2::new(0.0, f32::INFINITY).is_finite());
        assert!(!Vector4::new(0.0, 0.0, 0.0, f32::NEG_INFINITY).is_finite());
    }

    #[test]
    fn test_vector_encoding_uses_named_components() {
        let json = serde_json::to_string(&Vector3::new(1.0, 2.5, -3.0)).unwrap();
        assert_eq!(json, r#"{"x":1.0,"y":2.5,"z":-3.0}"#);
    }
}

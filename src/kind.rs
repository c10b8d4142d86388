use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which typed map owns a key.
///
/// `Data` marks a custom-data entry. A key that is not stored at all has no
/// kind; [`Store::get_value_type`](crate::Store::get_value_type) returns
/// `None` for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Float,
    #[serde(alias = "Boolean")]
    Bool,
    String,
    Color,
    Vector2,
    Vector3,
    Vector4,
    #[serde(alias = "None")]
    Data,
}

impl ValueKind {
    /// Every kind, in declaration order.
    pub const ALL: [ValueKind; 9] = [
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::Bool,
        ValueKind::String,
        ValueKind::Color,
        ValueKind::Vector2,
        ValueKind::Vector3,
        ValueKind::Vector4,
        ValueKind::Data,
    ];

    /// The symbolic name used by key search and in the encoded index.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Int => "Int",
            ValueKind::Float => "Float",
            ValueKind::Bool => "Bool",
            ValueKind::String => "String",
            ValueKind::Color => "Color",
            ValueKind::Vector2 => "Vector2",
            ValueKind::Vector3 => "Vector3",
            ValueKind::Vector4 => "Vector4",
            ValueKind::Data => "Data",
        }
    }

    /// True for the eight built-in value kinds.
    pub fn is_primitive(self) -> bool {
        self != ValueKind::Data
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

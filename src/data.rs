use crate::error::{DataError, DataResult};
use crate::geometry::{RectTransformData, TransformData};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// A user-defined value that can live in a container's custom-data map.
///
/// The serde derives are the serialization contract: anything marked
/// `#[serde(skip)]` is never written to disk. `TYPE_NAME` identifies the type
/// in the data file and must be unique within a [`DataRegistry`].
///
/// # Examples
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use sovran_datastore::StorableData;
///
/// #[derive(Clone, Default, Serialize, Deserialize)]
/// struct Inventory {
///     gold: u32,
///     items: Vec<String>,
/// }
///
/// impl StorableData for Inventory {
///     const TYPE_NAME: &'static str = "Inventory";
/// }
/// ```
pub trait StorableData: Any + Clone + Send + Sync + Serialize + DeserializeOwned {
    const TYPE_NAME: &'static str;
}

trait ErasedData: Any + Send + Sync {
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
    /// Fails if `value` would not decode back into this type.
    fn check(&self, value: &serde_json::Value) -> serde_json::Result<()>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: StorableData> ErasedData for T {
    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn check(&self, value: &serde_json::Value) -> serde_json::Result<()> {
        T::deserialize(value).map(drop)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

enum Payload {
    Typed {
        type_id: TypeId,
        value: Box<dyn ErasedData>,
    },
    /// A record whose type was not registered when it was loaded
    Opaque(serde_json::Value),
}

/// A type-erased custom-data entry that remembers its concrete type
pub(crate) struct AnyData {
    type_name: String,
    payload: Payload,
}

impl AnyData {
    pub(crate) fn new<T: StorableData>(value: T) -> Self {
        Self {
            type_name: T::TYPE_NAME.to_owned(),
            payload: Payload::Typed {
                type_id: TypeId::of::<T>(),
                value: Box::new(value),
            },
        }
    }

    pub(crate) fn opaque(type_name: String, value: serde_json::Value) -> Self {
        Self {
            type_name,
            payload: Payload::Opaque(value),
        }
    }

    /// Get a reference to the contained value if it is exactly a T
    pub(crate) fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match &self.payload {
            Payload::Typed { type_id, value } if *type_id == TypeId::of::<T>() => {
                value.as_any().downcast_ref::<T>()
            }
            _ => None,
        }
    }

    /// Encode as a `{type, value}` record.
    ///
    /// Only the payload's top level is touched: `null` members are dropped
    /// unless the type needs them to decode, and nested members are written
    /// exactly as the type's serializer produced them. A typed payload must
    /// decode back into its type; serde writes NaN and infinities as `null`,
    /// so such a payload fails here instead of producing an unloadable file.
    pub(crate) fn to_record(&self) -> serde_json::Result<DataRecord> {
        let value = match &self.payload {
            Payload::Typed { value, .. } => {
                let full = value.to_json()?;
                let sparse = without_nulls(&full);
                if value.check(&sparse).is_ok() {
                    sparse
                } else {
                    value.check(&full)?;
                    full
                }
            }
            Payload::Opaque(value) => without_nulls(value),
        };
        Ok(DataRecord {
            type_name: self.type_name.clone(),
            value,
        })
    }
}

fn without_nulls(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(members) => serde_json::Value::Object(
            members
                .iter()
                .filter(|(_, member)| !member.is_null())
                .map(|(name, member)| (name.clone(), member.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl fmt::Debug for AnyData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let opaque = matches!(self.payload, Payload::Opaque(_));
        f.debug_struct("AnyData")
            .field("type_name", &self.type_name)
            .field("opaque", &opaque)
            .finish()
    }
}

/// Encoded form of one custom-data entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DataRecord {
    #[serde(rename = "type")]
    pub(crate) type_name: String,
    #[serde(default)]
    pub(crate) value: serde_json::Value,
}

#[derive(Clone, Copy)]
struct Decoder {
    type_id: TypeId,
    decode: fn(serde_json::Value) -> serde_json::Result<AnyData>,
}

fn decode_as<T: StorableData>(value: serde_json::Value) -> serde_json::Result<AnyData> {
    serde_json::from_value::<T>(value).map(AnyData::new)
}

static GLOBAL_REGISTRY: LazyLock<Arc<DataRegistry>> =
    LazyLock::new(|| Arc::new(DataRegistry::with_builtins()));

/// The table of custom-data types a container knows how to decode.
///
/// Types are registered once at startup. Loading a file only reconstructs
/// entries whose type name is registered; anything else is carried through as
/// an opaque record so a later save does not lose it.
///
/// # Examples
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use sovran_datastore::{DataRegistry, StorableData};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Quest { stage: u8 }
///
/// impl StorableData for Quest {
///     const TYPE_NAME: &'static str = "Quest";
/// }
///
/// let registry = DataRegistry::new();
/// registry.register::<Quest>().unwrap();
/// assert!(registry.is_registered::<Quest>());
/// ```
pub struct DataRegistry {
    decoders: RwLock<HashMap<&'static str, Decoder>>,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self {
            decoders: RwLock::new(HashMap::new()),
        }
    }

    /// A registry that already knows [`TransformData`] and [`RectTransformData`].
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for result in [
            registry.register::<TransformData>(),
            registry.register::<RectTransformData>(),
        ] {
            if let Err(error) = result {
                tracing::warn!(%error, "built-in geometry type not registered");
            }
        }
        registry
    }

    /// The process-wide registry used by containers that are not given their
    /// own. The geometry types are registered in it from the start.
    pub fn global() -> Arc<DataRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Registers `T` under `T::TYPE_NAME`.
    ///
    /// Registering the same type again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DataError::DuplicateType` if a different type already uses the name.
    pub fn register<T: StorableData>(&self) -> DataResult<()> {
        let mut decoders = self.decoders.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = decoders.get(T::TYPE_NAME) {
            if existing.type_id == TypeId::of::<T>() {
                return Ok(());
            }
            return Err(DataError::DuplicateType { name: T::TYPE_NAME });
        }
        decoders.insert(
            T::TYPE_NAME,
            Decoder {
                type_id: TypeId::of::<T>(),
                decode: decode_as::<T>,
            },
        );
        tracing::debug!(type_name = T::TYPE_NAME, "registered custom data type");
        Ok(())
    }

    pub fn is_registered<T: StorableData>(&self) -> bool {
        let decoders = self.decoders.read().unwrap_or_else(PoisonError::into_inner);
        decoders
            .get(T::TYPE_NAME)
            .is_some_and(|decoder| decoder.type_id == TypeId::of::<T>())
    }

    pub(crate) fn decode(&self, key: &str, record: DataRecord) -> DataResult<AnyData> {
        let decoder = {
            let decoders = self.decoders.read().unwrap_or_else(PoisonError::into_inner);
            decoders.get(record.type_name.as_str()).copied()
        };
        match decoder {
            Some(decoder) => (decoder.decode)(record.value).map_err(|e| {
                DataError::Corrupted(format!(
                    "custom data `{}` of type `{}`: {}",
                    key, record.type_name, e
                ))
            }),
            None => {
                tracing::warn!(
                    key,
                    type_name = %record.type_name,
                    "custom data type is not registered; keeping the record as-is"
                );
                Ok(AnyData::opaque(record.type_name, record.value))
            }
        }
    }
}

impl Default for DataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let decoders = self.decoders.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = decoders.keys().collect();
        names.sort();
        f.debug_struct("DataRegistry").field("types", &names).finish()
    }
}

use crate::data::{AnyData, StorableData};
use crate::kind::ValueKind;
use crate::value::{Color, PrimitiveValue, Value, Vector2, Vector3, Vector4};
use std::borrow::Cow;
use std::collections::HashMap;

/// Case handling for key search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchCase {
    #[default]
    Sensitive,
    Insensitive,
}

impl SearchCase {
    fn fold<'a>(self, text: &'a str) -> Cow<'a, str> {
        match self {
            SearchCase::Sensitive => Cow::Borrowed(text),
            SearchCase::Insensitive => Cow::Owned(text.to_lowercase()),
        }
    }
}

/// The typed multi-map behind a data container.
///
/// A `Store` keeps one map per built-in kind, one map for custom data, and an
/// index from key to kind. Every key lives in exactly one map and the index
/// always mirrors the maps: setting a key first removes whatever the key held
/// before, whatever its kind.
///
/// Reads never fail. A missing key, or a key of another kind, reads as
/// "not found".
///
/// # Examples
///
/// ```
/// use sovran_datastore::{Store, ValueKind, Vector3};
///
/// let mut store = Store::new();
/// store.set_value("hp", 100);
/// store.set_value("spawn", Vector3::new(0.0, 1.0, 0.0));
///
/// assert_eq!(store.try_get_value("hp", 0), (true, 100));
/// assert_eq!(store.try_get_value("hp", 0.0f32), (false, 0.0));
///
/// // Setting a value of another kind displaces the old one.
/// store.set_value("hp", "full");
/// assert!(!store.has_key_of("hp", ValueKind::Int));
/// assert_eq!(store.get_value_type("hp"), Some(ValueKind::String));
/// ```
#[derive(Debug, Default)]
pub struct Store {
    pub(crate) ints: HashMap<String, i32>,
    pub(crate) floats: HashMap<String, f32>,
    pub(crate) bools: HashMap<String, bool>,
    pub(crate) strings: HashMap<String, String>,
    pub(crate) colors: HashMap<String, Color>,
    pub(crate) vector2s: HashMap<String, Vector2>,
    pub(crate) vector3s: HashMap<String, Vector3>,
    pub(crate) vector4s: HashMap<String, Vector4>,
    pub(crate) data: HashMap<String, AnyData>,
    pub(crate) index: HashMap<String, ValueKind>,
}

impl Store {
    /// Creates a new, empty store with unallocated maps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a primitive value, replacing any existing entry for `key`.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.delete(&key);
        self.index.insert(key.clone(), value.kind());
        match value {
            Value::Int(v) => {
                self.ints.insert(key, v);
            }
            Value::Float(v) => {
                self.floats.insert(key, v);
            }
            Value::Bool(v) => {
                self.bools.insert(key, v);
            }
            Value::String(v) => {
                self.strings.insert(key, v);
            }
            Value::Color(v) => {
                self.colors.insert(key, v);
            }
            Value::Vector2(v) => {
                self.vector2s.insert(key, v);
            }
            Value::Vector3(v) => {
                self.vector3s.insert(key, v);
            }
            Value::Vector4(v) => {
                self.vector4s.insert(key, v);
            }
        }
    }

    /// Returns a copy of the value under `key` if it is stored as a `T`.
    pub fn get_value<T: PrimitiveValue>(&self, key: &str) -> Option<T> {
        T::slot(self).get(key).cloned()
    }

    /// Returns `(true, value)` if `key` holds a `T`, otherwise `(false, default)`.
    pub fn try_get_value<T: PrimitiveValue>(&self, key: &str, default: T) -> (bool, T) {
        match self.get_value(key) {
            Some(value) => (true, value),
            None => (false, default),
        }
    }

    /// Like [`Store::try_get_value`], but a miss also stores `default`.
    ///
    /// The default is only written when `key` is absent from the whole store;
    /// a key that already holds another kind is left alone. Either way a miss
    /// still reports `false`.
    pub fn try_get_value_or_store<T: PrimitiveValue>(&mut self, key: &str, default: T) -> (bool, T) {
        if let Some(value) = self.get_value(key) {
            return (true, value);
        }
        if !self.has_key(key) {
            T::slot_mut(self).insert(key.to_owned(), default.clone());
            self.index.insert(key.to_owned(), T::KIND);
        }
        (false, default)
    }

    /// Returns the primitive value under `key`, whatever its kind.
    pub fn value(&self, key: &str) -> Option<Value> {
        let value: Value = match self.index.get(key)? {
            ValueKind::Int => self.ints.get(key).copied()?.into(),
            ValueKind::Float => self.floats.get(key).copied()?.into(),
            ValueKind::Bool => self.bools.get(key).copied()?.into(),
            ValueKind::String => self.strings.get(key).cloned()?.into(),
            ValueKind::Color => self.colors.get(key).copied()?.into(),
            ValueKind::Vector2 => self.vector2s.get(key).copied()?.into(),
            ValueKind::Vector3 => self.vector3s.get(key).copied()?.into(),
            ValueKind::Vector4 => self.vector4s.get(key).copied()?.into(),
            ValueKind::Data => return None,
        };
        Some(value)
    }

    /// Stores custom data, replacing any existing entry for `key`.
    pub fn set_data<T: StorableData>(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        self.insert_data(key, AnyData::new(value));
    }

    pub(crate) fn insert_data(&mut self, key: String, data: AnyData) {
        self.delete(&key);
        self.index.insert(key.clone(), ValueKind::Data);
        self.data.insert(key, data);
    }

    /// Returns the custom data under `key`, or `default` if it is missing or
    /// was stored as a different type.
    pub fn get_data<T: StorableData>(&self, key: &str, default: T) -> T {
        self.try_get_data(key).unwrap_or(default)
    }

    /// Returns a copy of the custom data under `key` if it is exactly a `T`.
    pub fn try_get_data<T: StorableData>(&self, key: &str) -> Option<T> {
        self.with_data(key, T::clone)
    }

    /// Runs `f` against the custom data under `key` without cloning it.
    ///
    /// Returns `None` if the key is missing or holds a different type.
    pub fn with_data<T: StorableData, R>(&self, key: &str, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.data.get(key)?.downcast_ref::<T>().map(f)
    }

    /// True if `key` is stored under any kind.
    pub fn has_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// True if `key` is stored in the map for `kind`.
    pub fn has_key_of(&self, key: &str, kind: ValueKind) -> bool {
        match kind {
            ValueKind::Int => self.ints.contains_key(key),
            ValueKind::Float => self.floats.contains_key(key),
            ValueKind::Bool => self.bools.contains_key(key),
            ValueKind::String => self.strings.contains_key(key),
            ValueKind::Color => self.colors.contains_key(key),
            ValueKind::Vector2 => self.vector2s.contains_key(key),
            ValueKind::Vector3 => self.vector3s.contains_key(key),
            ValueKind::Vector4 => self.vector4s.contains_key(key),
            ValueKind::Data => self.data.contains_key(key),
        }
    }

    /// Removes `key` from every map. Returns `true` if anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let mut removed = self.index.remove(key).is_some();
        for kind in ValueKind::ALL {
            removed |= self.remove_from(key, kind);
        }
        removed
    }

    /// Removes `key` only if it is stored as `kind`.
    pub fn delete_of(&mut self, key: &str, kind: ValueKind) -> bool {
        if !self.remove_from(key, kind) {
            return false;
        }
        self.index.remove(key);
        true
    }

    fn remove_from(&mut self, key: &str, kind: ValueKind) -> bool {
        match kind {
            ValueKind::Int => self.ints.remove(key).is_some(),
            ValueKind::Float => self.floats.remove(key).is_some(),
            ValueKind::Bool => self.bools.remove(key).is_some(),
            ValueKind::String => self.strings.remove(key).is_some(),
            ValueKind::Color => self.colors.remove(key).is_some(),
            ValueKind::Vector2 => self.vector2s.remove(key).is_some(),
            ValueKind::Vector3 => self.vector3s.remove(key).is_some(),
            ValueKind::Vector4 => self.vector4s.remove(key).is_some(),
            ValueKind::Data => self.data.remove(key).is_some(),
        }
    }

    /// Removes every entry. Map capacity is kept.
    pub fn delete_all(&mut self) {
        self.ints.clear();
        self.floats.clear();
        self.bools.clear();
        self.strings.clear();
        self.colors.clear();
        self.vector2s.clear();
        self.vector3s.clear();
        self.vector4s.clear();
        self.data.clear();
        self.index.clear();
    }

    /// The kind `key` is stored under, or `None` if it is not stored.
    pub fn get_value_type(&self, key: &str) -> Option<ValueKind> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every `(key, kind)` pair, ordered by kind and then key.
    pub fn all_keys(&self) -> Vec<(String, ValueKind)> {
        let mut keys: Vec<_> = self
            .index
            .iter()
            .map(|(key, kind)| (key.clone(), *kind))
            .collect();
        keys.sort_by(|a, b| (a.1, &a.0).cmp(&(b.1, &b.0)));
        keys
    }

    /// The sorted keys stored as `kind`.
    pub fn keys_of(&self, kind: ValueKind) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries()
            .filter(|(_, k)| *k == kind)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Finds entries whose key contains `needle`.
    ///
    /// An entry also matches when its kind's name contains `needle`, so a
    /// search for `"Vec"` lists every vector entry and `"Int"` every integer
    /// entry, whatever their keys are.
    pub fn search_key(&self, needle: &str, case: SearchCase) -> Vec<(String, ValueKind)> {
        let needle = case.fold(needle);
        self.all_keys()
            .into_iter()
            .filter(|(key, kind)| {
                case.fold(kind.name()).contains(needle.as_ref())
                    || case.fold(key).contains(needle.as_ref())
            })
            .collect()
    }

    /// Finds keys of one kind whose text contains `needle`.
    pub fn search_key_of(&self, needle: &str, kind: ValueKind, case: SearchCase) -> Vec<String> {
        let needle = case.fold(needle);
        self.keys_of(kind)
            .into_iter()
            .filter(|key| case.fold(key).contains(needle.as_ref()))
            .collect()
    }

    /// Walks every map, yielding each key with the kind of the map holding it.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&String, ValueKind)> + '_ {
        self.ints
            .keys()
            .map(|k| (k, ValueKind::Int))
            .chain(self.floats.keys().map(|k| (k, ValueKind::Float)))
            .chain(self.bools.keys().map(|k| (k, ValueKind::Bool)))
            .chain(self.strings.keys().map(|k| (k, ValueKind::String)))
            .chain(self.colors.keys().map(|k| (k, ValueKind::Color)))
            .chain(self.vector2s.keys().map(|k| (k, ValueKind::Vector2)))
            .chain(self.vector3s.keys().map(|k| (k, ValueKind::Vector3)))
            .chain(self.vector4s.keys().map(|k| (k, ValueKind::Vector4)))
            .chain(self.data.keys().map(|k| (k, ValueKind::Data)))
    }

    /// Recomputes the index from the maps.
    ///
    /// Fails with the offending key if it is present in more than one map; the
    /// index is left empty in that case.
    pub(crate) fn rebuild_index(&mut self) -> Result<(), String> {
        let mut index = std::mem::take(&mut self.index);
        index.clear();
        let mut duplicate = None;
        for (key, kind) in self.entries() {
            if let Some(previous) = index.insert(key.clone(), kind) {
                duplicate = Some(format!(
                    "key `{}` is stored as both {} and {}",
                    key, previous, kind
                ));
                break;
            }
        }
        if duplicate.is_some() {
            index.clear();
        }
        self.index = index;
        duplicate.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
pub(crate) fn assert_consistent(store: &Store) {
    let mut seen = HashMap::new();
    for (key, kind) in store.entries() {
        assert!(
            seen.insert(key.clone(), kind).is_none(),
            "key {} appears in more than one map",
            key
        );
    }
    assert_eq!(seen, store.index, "index does not mirror the maps");
}

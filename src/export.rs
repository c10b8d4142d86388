//! One-way export of scalar entries into a flat preference store.

use crate::store::Store;
use std::collections::BTreeMap;

/// A flat key-value preference backend with int, float and string slots.
pub trait PreferenceSink {
    fn set_int(&mut self, key: &str, value: i32);
    fn set_float(&mut self, key: &str, value: f32);
    fn set_string(&mut self, key: &str, value: &str);
}

/// How booleans are written to the integer slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoolExport {
    /// `true` is 1, `false` is 0
    #[default]
    Standard,
    /// `true` is 0, `false` is 1, for consumers of older exports
    Inverted,
}

impl BoolExport {
    fn encode(self, value: bool) -> i32 {
        match (self, value) {
            (BoolExport::Standard, true) | (BoolExport::Inverted, false) => 1,
            _ => 0,
        }
    }
}

/// Copies every Int, Float, Bool and String entry into `sink`.
///
/// Colors, vectors and custom data have no flat representation and are
/// skipped. Returns the number of entries written.
pub fn export_preferences(store: &Store, sink: &mut impl PreferenceSink, bools: BoolExport) -> usize {
    let mut written = 0;
    for (key, value) in &store.ints {
        sink.set_int(key, *value);
        written += 1;
    }
    for (key, value) in &store.bools {
        sink.set_int(key, bools.encode(*value));
        written += 1;
    }
    for (key, value) in &store.floats {
        sink.set_float(key, *value);
        written += 1;
    }
    for (key, value) in &store.strings {
        sink.set_string(key, value);
        written += 1;
    }
    tracing::debug!(written, "exported preferences");
    written
}

/// A single exported preference.
#[derive(Debug, Clone, PartialEq)]
pub enum Preference {
    Int(i32),
    Float(f32),
    String(String),
}

/// An in-memory [`PreferenceSink`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryPreferences {
    pub entries: BTreeMap<String, Preference>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Preference> {
        self.entries.get(key)
    }
}

impl PreferenceSink for MemoryPreferences {
    fn set_int(&mut self, key: &str, value: i32) {
        self.entries.insert(key.to_owned(), Preference::Int(value));
    }

    fn set_float(&mut self, key: &str, value: f32) {
        self.entries.insert(key.to_owned(), Preference::Float(value));
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.entries
            .insert(key.to_owned(), Preference::String(value.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Vector2;

    fn store() -> Store {
        let mut store = Store::new();
        store.set_value("volume", 0.75f32);
        store.set_value("level", 4);
        store.set_value("muted", true);
        store.set_value("subtitles", false);
        store.set_value("name", "hero");
        store.set_value("cursor", Vector2::new(1.0, 2.0));
        store
    }

    #[test]
    fn test_standard_export() {
        let mut prefs = MemoryPreferences::new();
        let written = export_preferences(&store(), &mut prefs, BoolExport::Standard);
        assert_eq!(written, 5);
        assert_eq!(prefs.get("volume"), Some(&Preference::Float(0.75)));
        assert_eq!(prefs.get("level"), Some(&Preference::Int(4)));
        assert_eq!(prefs.get("muted"), Some(&Preference::Int(1)));
        assert_eq!(prefs.get("subtitles"), Some(&Preference::Int(0)));
        assert_eq!(prefs.get("name"), Some(&Preference::String("hero".into())));
        assert_eq!(prefs.get("cursor"), None);
    }

    #[test]
    fn test_inverted_bools() {
        let mut prefs = MemoryPreferences::new();
        export_preferences(&store(), &mut prefs, BoolExport::Inverted);
        assert_eq!(prefs.get("muted"), Some(&Preference::Int(0)));
        assert_eq!(prefs.get("subtitles"), Some(&Preference::Int(1)));
    }
}

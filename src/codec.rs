//! Text encoding of a store.
//!
//! A store is written as one JSON object with an optional member per map:
//!
//! ```json
//! {
//!   "IntMap": { "hp": 100 },
//!   "FloatMap": { "speed": 3.5 },
//!   "KeyToValueMap": { "hp": "Int", "speed": "Float" }
//! }
//! ```
//!
//! Empty maps are left out entirely and members are emitted in key order, so
//! equal stores always produce identical text. Decoding ignores members it does
//! not know, treats any missing map as empty, and rebuilds the key index from
//! the maps themselves.

use crate::data::{DataRecord, DataRegistry};
use crate::error::{DataError, DataResult};
use crate::kind::ValueKind;
use crate::pool;
use crate::store::Store;
use crate::value::{Color, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EncodedStore<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    int_map: Option<BTreeMap<&'a str, &'a i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    float_map: Option<BTreeMap<&'a str, &'a f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bool_map: Option<BTreeMap<&'a str, &'a bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    string_map: Option<BTreeMap<&'a str, &'a String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_map: Option<BTreeMap<&'a str, &'a Color>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector2_map: Option<BTreeMap<&'a str, &'a Vector2>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector3_map: Option<BTreeMap<&'a str, &'a Vector3>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector4_map: Option<BTreeMap<&'a str, &'a Vector4>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_map: Option<BTreeMap<&'a str, DataRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_to_value_map: Option<BTreeMap<&'a str, &'a ValueKind>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DecodedStore {
    #[serde(default)]
    int_map: Option<HashMap<String, i32>>,
    #[serde(default)]
    float_map: Option<HashMap<String, f32>>,
    #[serde(default)]
    bool_map: Option<HashMap<String, bool>>,
    #[serde(default)]
    string_map: Option<HashMap<String, String>>,
    #[serde(default)]
    color_map: Option<HashMap<String, Color>>,
    #[serde(default)]
    vector2_map: Option<HashMap<String, Vector2>>,
    #[serde(default)]
    vector3_map: Option<HashMap<String, Vector3>>,
    #[serde(default)]
    vector4_map: Option<HashMap<String, Vector4>>,
    #[serde(default)]
    data_map: Option<HashMap<String, DataRecord>>,
    #[serde(default)]
    key_to_value_map: Option<HashMap<String, ValueKind>>,
}

fn sorted<V>(map: &HashMap<String, V>) -> Option<BTreeMap<&str, &V>> {
    if map.is_empty() {
        return None;
    }
    Some(map.iter().map(|(k, v)| (k.as_str(), v)).collect())
}

fn check_finite<V>(map: &HashMap<String, V>, is_finite: impl Fn(&V) -> bool) -> DataResult<()> {
    match map.iter().find(|(_, v)| !is_finite(v)) {
        Some((key, _)) => Err(DataError::NonFiniteFloat { key: key.clone() }),
        None => Ok(()),
    }
}

/// Encodes `store` as indented JSON.
///
/// # Errors
///
/// - `DataError::NonFiniteFloat` if any float component is NaN or infinite
/// - `DataError::UnencodableData` if a custom-data payload fails to serialize
///   or would not decode back into its type
pub(crate) fn encode(store: &Store) -> DataResult<String> {
    check_finite(&store.floats, |v| v.is_finite())?;
    check_finite(&store.colors, Color::is_finite)?;
    check_finite(&store.vector2s, Vector2::is_finite)?;
    check_finite(&store.vector3s, Vector3::is_finite)?;
    check_finite(&store.vector4s, Vector4::is_finite)?;

    let data_map = if store.data.is_empty() {
        None
    } else {
        let mut records = BTreeMap::new();
        for (key, data) in &store.data {
            let record = data
                .to_record()
                .map_err(|source| DataError::UnencodableData {
                    key: key.clone(),
                    source,
                })?;
            records.insert(key.as_str(), record);
        }
        Some(records)
    };

    let encoded = EncodedStore {
        int_map: sorted(&store.ints),
        float_map: sorted(&store.floats),
        bool_map: sorted(&store.bools),
        string_map: sorted(&store.strings),
        color_map: sorted(&store.colors),
        vector2_map: sorted(&store.vector2s),
        vector3_map: sorted(&store.vector3s),
        vector4_map: sorted(&store.vector4s),
        data_map,
        key_to_value_map: sorted(&store.index),
    };
    Ok(serde_json::to_string_pretty(&encoded)?)
}

/// Decodes text produced by [`encode`] into a new store.
///
/// Custom-data records are rebuilt through `registry`.
///
/// # Errors
///
/// - `DataError::Serialization` if the text is not a valid encoded store
/// - `DataError::Corrupted` if a key appears in two maps or a registered
///   custom-data payload does not match its type
pub(crate) fn decode(text: &str, registry: &DataRegistry) -> DataResult<Store> {
    let decoded: DecodedStore = serde_json::from_str(text)?;

    let mut store = pool::take_store();
    if let Err(error) = fill(&mut store, decoded, registry) {
        pool::recycle(&mut store);
        return Err(error);
    }
    Ok(store)
}

fn fill(store: &mut Store, decoded: DecodedStore, registry: &DataRegistry) -> DataResult<()> {
    store.ints.extend(decoded.int_map.unwrap_or_default());
    store.floats.extend(decoded.float_map.unwrap_or_default());
    store.bools.extend(decoded.bool_map.unwrap_or_default());
    store.strings.extend(decoded.string_map.unwrap_or_default());
    store.colors.extend(decoded.color_map.unwrap_or_default());
    store.vector2s.extend(decoded.vector2_map.unwrap_or_default());
    store.vector3s.extend(decoded.vector3_map.unwrap_or_default());
    store.vector4s.extend(decoded.vector4_map.unwrap_or_default());
    for (key, record) in decoded.data_map.unwrap_or_default() {
        let data = registry.decode(&key, record)?;
        store.data.insert(key, data);
    }

    store.rebuild_index().map_err(DataError::Corrupted)?;

    match decoded.key_to_value_map {
        Some(recorded) if recorded != store.index => {
            tracing::warn!(
                recorded = recorded.len(),
                rebuilt = store.index.len(),
                "stored key index disagrees with the maps; using the maps"
            );
        }
        Some(_) => {}
        None => tracing::debug!("no key index in data file; rebuilt from maps"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StorableData;
    use crate::store::assert_consistent;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Loadout {
        weapon: String,
        charm: Option<String>,
        ammo: Vec<u16>,
    }

    impl StorableData for Loadout {
        const TYPE_NAME: &'static str = "Loadout";
    }

    #[test]
    fn test_empty_store_encodes_to_empty_object() {
        let text = encode(&Store::new()).unwrap();
        assert_eq!(text, "{}");
    }

    #[test]
    fn test_empty_maps_are_omitted() {
        let mut store = Store::new();
        store.set_value("hp", 100);
        let text = encode(&store).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed,
            json!({ "IntMap": { "hp": 100 }, "KeyToValueMap": { "hp": "Int" } })
        );
    }

    #[test]
    fn test_encoding_is_indented_and_sorted() {
        let mut store = Store::new();
        store.set_value("b", 2);
        store.set_value("a", 1);
        let text = encode(&store).unwrap();
        let expected = "{\n  \"IntMap\": {\n    \"a\": 1,\n    \"b\": 2\n  },\n  \"KeyToValueMap\": {\n    \"a\": \"Int\",\n    \"b\": \"Int\"\n  }\n}";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_every_kind_round_trips() {
        let registry = DataRegistry::new();
        registry.register::<Loadout>().unwrap();

        let mut store = Store::new();
        store.set_value("i", -4);
        store.set_value("f", 0.1f32);
        store.set_value("b", false);
        store.set_value("s", "ünïcode");
        store.set_value("c", Color::new(0.2, 0.4, 0.6, 0.8));
        store.set_value("v2", Vector2::new(1.5, -2.5));
        store.set_value("v3", Vector3::new(0.0, 1.0, 2.0));
        store.set_value("v4", Vector4::new(1.0, 2.0, 3.0, 4.0));
        let loadout = Loadout {
            weapon: "bow".into(),
            charm: None,
            ammo: vec![12, 3],
        };
        store.set_data("loadout", loadout.clone());

        let decoded = decode(&encode(&store).unwrap(), &registry).unwrap();
        assert_consistent(&decoded);
        assert_eq!(decoded.all_keys(), store.all_keys());
        for (key, _) in store.all_keys() {
            assert_eq!(decoded.value(&key), store.value(&key));
        }
        assert_eq!(decoded.try_get_data::<Loadout>("loadout"), Some(loadout));
    }

    #[test]
    fn test_missing_maps_decode_empty_and_index_is_rebuilt() {
        let registry = DataRegistry::new();
        let text = r#"{ "FloatMap": { "speed": 3.5 }, "BoolMap": { "muted": true } }"#;
        let store = decode(text, &registry).unwrap();
        assert_eq!(store.get_value_type("speed"), Some(ValueKind::Float));
        assert_eq!(store.get_value_type("muted"), Some(ValueKind::Bool));
        assert!(store.ints.is_empty());
        assert!(store.data.is_empty());
        assert_consistent(&store);
    }

    #[test]
    fn test_null_maps_decode_empty() {
        let registry = DataRegistry::new();
        let store = decode(r#"{ "IntMap": null, "StringMap": { "a": "b" } }"#, &registry).unwrap();
        assert!(store.ints.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_members_are_ignored() {
        let registry = DataRegistry::new();
        let text = r#"{ "Version": 9, "IntMap": { "hp": 1 }, "QuaternionMap": { "q": [0, 0, 0, 1] } }"#;
        let store = decode(text, &registry).unwrap();
        assert_eq!(store.try_get_value("hp", 0), (true, 1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_key_in_two_maps_is_corrupted() {
        let registry = DataRegistry::new();
        let text = r#"{ "IntMap": { "k": 1 }, "StringMap": { "k": "one" } }"#;
        let err = decode(text, &registry).unwrap_err();
        assert!(matches!(err, DataError::Corrupted(_)));
    }

    #[test]
    fn test_disagreeing_index_loses_to_maps() {
        let registry = DataRegistry::new();
        let text = r#"{
            "IntMap": { "hp": 1 },
            "KeyToValueMap": { "hp": "Float", "ghost": "Int" }
        }"#;
        let store = decode(text, &registry).unwrap();
        assert_eq!(store.get_value_type("hp"), Some(ValueKind::Int));
        assert!(!store.has_key("ghost"));
        assert_consistent(&store);
    }

    #[test]
    fn test_malformed_text_fails() {
        let registry = DataRegistry::new();
        assert!(matches!(
            decode("{ \"IntMap\": ", &registry),
            Err(DataError::Serialization(_))
        ));
        assert!(matches!(
            decode(r#"{ "IntMap": { "hp": "many" } }"#, &registry),
            Err(DataError::Serialization(_))
        ));
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        let mut store = Store::new();
        store.set_value("bad", Vector3::new(0.0, f32::NAN, 0.0));
        let err = encode(&store).unwrap_err();
        assert!(matches!(err, DataError::NonFiniteFloat { ref key } if key == "bad"));
    }

    #[test]
    fn test_custom_payload_nulls_are_dropped() {
        let mut store = Store::new();
        store.set_data(
            "loadout",
            Loadout {
                weapon: "axe".into(),
                charm: None,
                ammo: vec![],
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&encode(&store).unwrap()).unwrap();
        assert_eq!(
            parsed["DataMap"],
            json!({ "loadout": { "type": "Loadout", "value": { "weapon": "axe", "ammo": [] } } })
        );
        assert_eq!(parsed["KeyToValueMap"], json!({ "loadout": "Data" }));
    }

    #[test]
    fn test_unregistered_records_survive_a_round_trip() {
        let registry = DataRegistry::new();
        let text = r#"{
            "DataMap": { "pet": { "type": "Pet", "value": { "name": "Rex" } } },
            "KeyToValueMap": { "pet": "None" }
        }"#;
        let store = decode(text, &registry).unwrap();
        assert_eq!(store.get_value_type("pet"), Some(ValueKind::Data));
        assert_consistent(&store);

        let parsed: serde_json::Value = serde_json::from_str(&encode(&store).unwrap()).unwrap();
        assert_eq!(
            parsed["DataMap"]["pet"],
            json!({ "type": "Pet", "value": { "name": "Rex" } })
        );
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Waypoint {
        at: Vector3,
        label: String,
        #[serde(skip)]
        visited: bool,
        extra: serde_json::Value,
    }

    impl StorableData for Waypoint {
        const TYPE_NAME: &'static str = "Waypoint";
    }

    fn waypoint(at: Vector3) -> Waypoint {
        Waypoint {
            at,
            label: "camp".into(),
            visited: true,
            extra: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_non_finite_custom_data_is_rejected() {
        let mut store = Store::new();
        store.set_value("hp", 100);
        store.set_data("camp", waypoint(Vector3::new(f32::NAN, 0.0, 0.0)));

        let err = encode(&store).unwrap_err();
        assert!(matches!(err, DataError::UnencodableData { ref key, .. } if key == "camp"));
    }

    #[test]
    fn test_skipped_fields_are_not_written() {
        let registry = DataRegistry::new();
        registry.register::<Waypoint>().unwrap();

        let mut store = Store::new();
        store.set_data("camp", waypoint(Vector3::new(1.0, 2.0, 3.0)));
        let text = encode(&store).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let value = &parsed["DataMap"]["camp"]["value"];
        assert!(value.get("visited").is_none());
        assert_eq!(value["label"], json!("camp"));

        let loaded = decode(&text, &registry).unwrap();
        let camp = loaded.try_get_data::<Waypoint>("camp").unwrap();
        assert!(!camp.visited);
        assert_eq!(camp.at, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_nulls_kept_when_needed_to_decode() {
        let registry = DataRegistry::new();
        registry.register::<Waypoint>().unwrap();

        let mut store = Store::new();
        store.set_data("camp", waypoint(Vector3::ONE));
        let text = encode(&store).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["DataMap"]["camp"]["value"]["extra"], json!(null));
        assert!(decode(&text, &registry).is_ok());
    }

    #[test]
    fn test_failed_decode_returns_maps_to_pools() {
        let registry = DataRegistry::new();
        let before = pool::returned_on_this_thread();

        let text = r#"{ "IntMap": { "k": 1 }, "BoolMap": { "k": true } }"#;
        assert!(matches!(decode(text, &registry), Err(DataError::Corrupted(_))));

        assert!(pool::returned_on_this_thread() >= before + 2);
    }

    #[test]
    fn test_legacy_boolean_kind_name() {
        let registry = DataRegistry::new();
        let text = r#"{ "BoolMap": { "on": true }, "KeyToValueMap": { "on": "Boolean" } }"#;
        let store = decode(text, &registry).unwrap();
        assert_eq!(store.get_value_type("on"), Some(ValueKind::Bool));
    }
}

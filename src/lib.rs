//! # sovran-datastore
//!
//! A typed, heterogeneous key-value store for application state, with JSON
//! persistence.
//!
//! `sovran-datastore` keeps runtime state such as settings, progress counters,
//! positions and small user-defined records in one place under string keys,
//! and saves the whole store to a human-readable file and loads it back.
//!
//! ## Key Features
//!
//! - **Typed maps**: Ints, floats, bools, strings, colors and 2/3/4-component
//!   vectors each live in their own map; a key belongs to exactly one of them
//! - **Forgiving reads**: A missing key or a kind mismatch reads as
//!   "not found" with your default, never as an error
//! - **Custom data**: Any `serde` type implementing [`StorableData`] can be
//!   stored and persisted once registered
//! - **Sparse, stable files**: Empty maps are omitted and keys are sorted,
//!   so saves diff cleanly
//! - **Background save/load**: Saves snapshot the store before returning;
//!   loads replace it all at once or not at all
//! - **Pooled containers**: [`DataContainer::acquire`] and
//!   [`DataContainer::release`] recycle map allocations across cycles
//!
//! ## Usage Examples
//!
//! ### Basic Usage
//!
//! ```rust
//! use sovran_datastore::{Store, ValueKind, Vector3};
//!
//! let mut store = Store::new();
//!
//! // Store values of different kinds
//! store.set_value("hp", 100);
//! store.set_value("speed", 3.5f32);
//! store.set_value("velocity", Vector3::new(0.0, 1.0, 0.0));
//! store.set_value("name", "hero");
//!
//! // Read them back with a default for the miss case
//! assert_eq!(store.try_get_value("hp", 0), (true, 100));
//! assert_eq!(store.try_get_value("missing", 7), (false, 7));
//!
//! // Reading with the wrong type is a miss, not an error
//! assert_eq!(store.try_get_value("hp", 0.0f32), (false, 0.0));
//!
//! // Kind names take part in key search
//! let hits = store.search_key("Vec", Default::default());
//! assert_eq!(hits, vec![("velocity".to_string(), ValueKind::Vector3)]);
//! ```
//!
//! ### Custom Data
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use sovran_datastore::{DataContainer, DataError, StorableData};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Inventory {
//!     gold: u32,
//!     items: Vec<String>,
//! }
//!
//! impl StorableData for Inventory {
//!     const TYPE_NAME: &'static str = "Inventory";
//! }
//!
//! fn main() -> Result<(), DataError> {
//!     let container = DataContainer::new();
//!     container.register_data::<Inventory>()?;
//!
//!     let bag = Inventory { gold: 12, items: vec!["rope".into()] };
//!     container.set_data("bag", bag.clone())?;
//!
//!     assert_eq!(container.try_get_data::<Inventory>("bag"), Some(bag));
//!     Ok(())
//! }
//! ```
//!
//! ### Saving and Loading
//!
//! ```rust
//! use sovran_datastore::{DataCallback, DataContainer, DataError, DataState};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dir = tempfile::tempdir().unwrap();
//! let file = dir.path().join("state.json");
//!
//! let container = DataContainer::acquire();
//! container.set_value("hp", 100);
//!
//! // Completion is reported through the callback and the returned handle
//! let callback: DataCallback = Box::new(|state: DataState, error: Option<&DataError>| {
//!     assert_eq!(state, DataState::Success);
//!     assert!(error.is_none());
//! });
//! container.save(Some(file.as_path()), Some(callback)).await.unwrap();
//!
//! // A failed load leaves the store untouched
//! let missing = dir.path().join("missing.json");
//! let state = container.load(Some(missing.as_path()), None).await.unwrap();
//! assert_eq!(state, DataState::Error);
//! assert!(container.has_key("hp"));
//!
//! container.release();
//! # }
//! ```

mod codec;
mod config;
mod container;
mod data;
mod error;
mod events;
mod export;
pub mod facade;
mod geometry;
mod kind;
mod pool;
mod store;
mod value;

pub use config::{DataConfig, DEFAULT_FILE_NAME, DIR_ENV, PATH_ENV};
pub use container::DataContainer;
pub use data::{DataRegistry, StorableData};
pub use error::{DataError, DataResult};
pub use events::{DataCallback, DataEvents, DataState, ListenerId, Operation};
pub use export::{export_preferences, BoolExport, MemoryPreferences, Preference, PreferenceSink};
pub use geometry::{RectTransformData, TransformData};
pub use kind::ValueKind;
pub use store::{SearchCase, Store};
pub use value::{Color, PrimitiveValue, Value, Vector2, Vector3, Vector4};

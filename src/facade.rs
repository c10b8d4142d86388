//! The process-wide data container.
//!
//! One [`DataContainer`] lives for the whole process. It is created by
//! [`init`] (or on first use, from the environment) and never released. Every
//! function here forwards directly to the matching method on that container.
//!
//! ```no_run
//! use sovran_datastore::{facade, DataConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! facade::init(DataConfig::from_env("my-game")).unwrap();
//!
//! facade::set_value("volume", 0.8f32);
//! facade::save(None, None).await.unwrap();
//! # }
//! ```

use crate::config::DataConfig;
use crate::container::DataContainer;
use crate::data::StorableData;
use crate::error::{DataError, DataResult};
use crate::events::{DataCallback, DataState, ListenerId};
use crate::kind::ValueKind;
use crate::store::SearchCase;
use crate::value::{PrimitiveValue, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::task::JoinHandle;

/// Identity used when the global container is created without [`init`].
pub const DEFAULT_APP_IDENTITY: &str = "sovran-datastore";

static GLOBAL: OnceLock<DataContainer> = OnceLock::new();

fn build(config: DataConfig) -> DataContainer {
    let container = DataContainer::new();
    container.set_path(config.default_path());
    tracing::info!(
        app = %config.app_identity,
        path = %container.get_path().display(),
        "global data container ready"
    );
    container
}

/// Creates the global container from `config`.
///
/// # Errors
///
/// Returns `DataError::AlreadyInitialized` if the container already exists,
/// including when an earlier call to another facade function created it.
pub fn init(config: DataConfig) -> DataResult<&'static DataContainer> {
    let mut created = false;
    let container = GLOBAL.get_or_init(|| {
        created = true;
        build(config)
    });
    if created {
        Ok(container)
    } else {
        Err(DataError::AlreadyInitialized)
    }
}

/// The global container, created from the environment on first use.
pub fn global() -> &'static DataContainer {
    GLOBAL.get_or_init(|| build(DataConfig::from_env(DEFAULT_APP_IDENTITY)))
}

/// Stores a primitive value in the global container.
pub fn set_value(key: impl Into<String>, value: impl Into<Value>) {
    global().set_value(key, value)
}

/// Reads a primitive value; see [`DataContainer::get_value`].
pub fn get_value<T: PrimitiveValue>(key: &str) -> Option<T> {
    global().get_value(key)
}

/// See [`DataContainer::try_get_value`].
pub fn try_get_value<T: PrimitiveValue>(key: &str, default: T) -> (bool, T) {
    global().try_get_value(key, default)
}

/// Reads a value, storing `default` if the key is absent.
pub fn try_get_value_or_store<T: PrimitiveValue>(key: &str, default: T) -> (bool, T) {
    global().try_get_value_or_store(key, default)
}

/// Registers `T` with the process-wide registry.
pub fn register_data<T: StorableData>() -> DataResult<()> {
    global().register_data::<T>()
}

/// Stores custom data; `T` must be registered.
pub fn set_data<T: StorableData>(key: impl Into<String>, value: T) -> DataResult<()> {
    global().set_data(key, value)
}

/// See [`DataContainer::get_data`].
pub fn get_data<T: StorableData>(key: &str, default: T) -> T {
    global().get_data(key, default)
}

/// See [`DataContainer::try_get_data`].
pub fn try_get_data<T: StorableData>(key: &str) -> Option<T> {
    global().try_get_data(key)
}

/// True if `key` is stored under any kind.
pub fn has_key(key: &str) -> bool {
    global().has_key(key)
}

/// True if `key` is stored as `kind`.
pub fn has_key_of(key: &str, kind: ValueKind) -> bool {
    global().has_key_of(key, kind)
}

/// Removes `key` from every map.
pub fn delete(key: &str) -> bool {
    global().delete(key)
}

/// Removes `key` only if it is stored as `kind`.
pub fn delete_of(key: &str, kind: ValueKind) -> bool {
    global().delete_of(key, kind)
}

/// Removes every entry from the global container.
pub fn delete_all() {
    global().delete_all()
}

/// The kind `key` is stored under, if any.
pub fn get_value_type(key: &str) -> Option<ValueKind> {
    global().get_value_type(key)
}

/// Every `(key, kind)` pair, ordered by kind and then key.
pub fn all_keys() -> Vec<(String, ValueKind)> {
    global().all_keys()
}

/// Finds entries whose key or kind name contains `needle`.
pub fn search_key(needle: &str, case: SearchCase) -> Vec<(String, ValueKind)> {
    global().search_key(needle, case)
}

/// Sets the default data file.
pub fn set_path(path: impl Into<PathBuf>) {
    global().set_path(path)
}

/// The default data file.
pub fn get_path() -> PathBuf {
    global().get_path()
}

/// Saves the global container in the background; see [`DataContainer::save`].
pub fn save(path: Option<&Path>, callback: Option<DataCallback>) -> JoinHandle<DataState> {
    global().save(path, callback)
}

/// Loads into the global container in the background; see [`DataContainer::load`].
pub fn load(path: Option<&Path>, callback: Option<DataCallback>) -> JoinHandle<DataState> {
    global().load(path, callback)
}

/// Subscribes to save completions on the global event hub.
pub fn on_save(listener: impl Fn(DataState) + Send + Sync + 'static) -> ListenerId {
    global().events().on_save(listener)
}

/// Subscribes to load completions on the global event hub.
pub fn on_load(listener: impl Fn(DataState) + Send + Sync + 'static) -> ListenerId {
    global().events().on_load(listener)
}

/// Subscribes to save and load failures on the global event hub.
pub fn on_error(listener: impl Fn(&DataError) + Send + Sync + 'static) -> ListenerId {
    global().events().on_error(listener)
}

/// Removes a listener added through this module.
pub fn unsubscribe(id: ListenerId) -> bool {
    global().events().unsubscribe(id)
}

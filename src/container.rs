use crate::codec;
use crate::data::{DataRegistry, StorableData};
use crate::error::{DataError, DataResult};
use crate::events::{DataCallback, DataEvents, DataState, Operation};
use crate::kind::ValueKind;
use crate::pool::{self, MAX_IDLE};
use crate::store::{SearchCase, Store};
use crate::value::{PrimitiveValue, Value};
use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::fs;
use tokio::task::JoinHandle;

struct Shell {
    store: Mutex<Store>,
    path: Mutex<PathBuf>,
    events: Arc<DataEvents>,
    registry: Arc<DataRegistry>,
}

impl Shell {
    fn lock_store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_path(&self) -> MutexGuard<'_, PathBuf> {
        self.path.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swaps in a fully decoded store and recycles the old maps.
    fn replace(&self, store: Store) {
        let mut old = mem::replace(&mut *self.lock_store(), store);
        pool::recycle(&mut old);
    }

    fn uses_globals(&self) -> bool {
        Arc::ptr_eq(&self.events, &DataEvents::global())
            && Arc::ptr_eq(&self.registry, &DataRegistry::global())
    }
}

static SHELLS: Mutex<Vec<Shell>> = Mutex::new(Vec::new());
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A store plus the file it persists to.
///
/// `DataContainer` is the unit of lifecycle management and persistence. All
/// methods take `&self`; the store sits behind a mutex so that a save or load
/// running on the Tokio runtime can reach it.
///
/// Containers come from [`DataContainer::acquire`] (pooled) or
/// [`DataContainer::new`] (plain allocation) and go back with
/// [`DataContainer::release`].
///
/// # Examples
///
/// ```
/// use sovran_datastore::{DataContainer, DataState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let dir = tempfile::tempdir().unwrap();
/// let file = dir.path().join("a.json");
///
/// let container = DataContainer::acquire();
/// container.set_value("hp", 100);
/// container.set_value("speed", 3.5f32);
///
/// let state = container.save(Some(file.as_path()), None).await.unwrap();
/// assert_eq!(state, DataState::Success);
///
/// container.delete_all();
/// container.load(Some(file.as_path()), None).await.unwrap();
/// assert_eq!(container.try_get_value("hp", 0), (true, 100));
/// assert_eq!(container.try_get_value("speed", 0.0f32), (true, 3.5));
///
/// container.release();
/// # }
/// ```
pub struct DataContainer {
    shell: Arc<Shell>,
}

impl DataContainer {
    /// Allocates a container reporting to the process-wide events and registry.
    pub fn new() -> Self {
        Self::with_parts(DataEvents::global(), DataRegistry::global())
    }

    /// Allocates a container with its own event hub and type registry.
    pub fn with_parts(events: Arc<DataEvents>, registry: Arc<DataRegistry>) -> Self {
        Self {
            shell: Arc::new(Shell {
                store: Mutex::new(Store::new()),
                path: Mutex::new(PathBuf::new()),
                events,
                registry,
            }),
        }
    }

    /// Takes a container from the shared pool, or allocates one, and initialises it.
    pub fn acquire() -> Self {
        let pooled = SHELLS.lock().unwrap_or_else(PoisonError::into_inner).pop();
        let container = match pooled {
            Some(shell) => Self {
                shell: Arc::new(shell),
            },
            None => Self::new(),
        };
        container.init();
        container
    }

    /// Resets the container: every map is replaced by an empty pooled map and
    /// the path is cleared.
    pub fn init(&self) {
        {
            let mut store = self.shell.lock_store();
            pool::recycle(&mut store);
            *store = pool::take_store();
        }
        *self.shell.lock_path() = PathBuf::new();
    }

    /// Clears the container and hands its maps, then the container itself,
    /// back to the shared pools.
    ///
    /// If a save or load spawned from this container is still running, the
    /// maps are still returned but the container itself is left to drop.
    pub fn release(self) {
        pool::recycle(&mut self.shell.lock_store());
        *self.shell.lock_path() = PathBuf::new();

        if let Ok(shell) = Arc::try_unwrap(self.shell) {
            if shell.uses_globals() {
                let mut shells = SHELLS.lock().unwrap_or_else(PoisonError::into_inner);
                if shells.len() < MAX_IDLE {
                    shells.push(shell);
                }
            }
        }
    }

    /// Runs `f` with shared access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        f(&self.shell.lock_store())
    }

    /// Runs `f` with exclusive access to the store.
    ///
    /// Everything `f` does lands in a save snapshot together or not at all.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        f(&mut self.shell.lock_store())
    }

    /// Stores a primitive value, replacing whatever `key` held before.
    pub fn set_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.shell.lock_store().set_value(key, value)
    }

    /// Returns a copy of the value under `key` if it is stored as a `T`.
    pub fn get_value<T: PrimitiveValue>(&self, key: &str) -> Option<T> {
        self.shell.lock_store().get_value(key)
    }

    /// Returns `(true, value)` if `key` holds a `T`, otherwise `(false, default)`.
    pub fn try_get_value<T: PrimitiveValue>(&self, key: &str, default: T) -> (bool, T) {
        self.shell.lock_store().try_get_value(key, default)
    }

    /// Like [`try_get_value`](Self::try_get_value), but a miss on an absent
    /// key also stores `default`.
    pub fn try_get_value_or_store<T: PrimitiveValue>(&self, key: &str, default: T) -> (bool, T) {
        self.shell.lock_store().try_get_value_or_store(key, default)
    }

    /// The primitive value under `key`, whatever its kind.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.shell.lock_store().value(key)
    }

    /// Stores custom data.
    ///
    /// # Errors
    ///
    /// Returns `DataError::UnregisteredType` if `T` is not registered with
    /// this container's registry, since the entry could not be loaded back.
    pub fn set_data<T: StorableData>(&self, key: impl Into<String>, value: T) -> DataResult<()> {
        if !self.shell.registry.is_registered::<T>() {
            return Err(DataError::UnregisteredType(T::TYPE_NAME));
        }
        self.shell.lock_store().set_data(key, value);
        Ok(())
    }

    /// Returns the custom data under `key`, or `default` if it is missing or
    /// of another type.
    pub fn get_data<T: StorableData>(&self, key: &str, default: T) -> T {
        self.shell.lock_store().get_data(key, default)
    }

    /// Returns a copy of the custom data under `key` if it is exactly a `T`.
    pub fn try_get_data<T: StorableData>(&self, key: &str) -> Option<T> {
        self.shell.lock_store().try_get_data(key)
    }

    /// Registers `T` with this container's registry.
    pub fn register_data<T: StorableData>(&self) -> DataResult<()> {
        self.shell.registry.register::<T>()
    }

    /// True if `key` is stored under any kind.
    pub fn has_key(&self, key: &str) -> bool {
        self.shell.lock_store().has_key(key)
    }

    /// True if `key` is stored as `kind`.
    pub fn has_key_of(&self, key: &str, kind: ValueKind) -> bool {
        self.shell.lock_store().has_key_of(key, kind)
    }

    /// Removes `key` from every map. Returns `true` if anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.shell.lock_store().delete(key)
    }

    /// Removes `key` only if it is stored as `kind`.
    pub fn delete_of(&self, key: &str, kind: ValueKind) -> bool {
        self.shell.lock_store().delete_of(key, kind)
    }

    /// Removes every entry; the path is kept.
    pub fn delete_all(&self) {
        self.shell.lock_store().delete_all()
    }

    /// The kind `key` is stored under, or `None` if it is not stored.
    pub fn get_value_type(&self, key: &str) -> Option<ValueKind> {
        self.shell.lock_store().get_value_type(key)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.shell.lock_store().len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.shell.lock_store().is_empty()
    }

    /// Every `(key, kind)` pair, ordered by kind and then key.
    pub fn all_keys(&self) -> Vec<(String, ValueKind)> {
        self.shell.lock_store().all_keys()
    }

    /// The sorted keys stored as `kind`.
    pub fn keys_of(&self, kind: ValueKind) -> Vec<String> {
        self.shell.lock_store().keys_of(kind)
    }

    /// Finds entries whose key or kind name contains `needle`.
    pub fn search_key(&self, needle: &str, case: SearchCase) -> Vec<(String, ValueKind)> {
        self.shell.lock_store().search_key(needle, case)
    }

    /// Finds keys of one kind whose text contains `needle`.
    pub fn search_key_of(&self, needle: &str, kind: ValueKind, case: SearchCase) -> Vec<String> {
        self.shell.lock_store().search_key_of(needle, kind, case)
    }

    /// Sets the default file used by [`save`](Self::save) and [`load`](Self::load).
    pub fn set_path(&self, path: impl Into<PathBuf>) {
        *self.shell.lock_path() = path.into();
    }

    /// The default file for [`save`](Self::save) and [`load`](Self::load).
    pub fn get_path(&self) -> PathBuf {
        self.shell.lock_path().clone()
    }

    /// The hub this container reports completions to.
    pub fn events(&self) -> &Arc<DataEvents> {
        &self.shell.events
    }

    /// Encodes the current contents without touching the filesystem.
    pub fn save_to_string(&self) -> DataResult<String> {
        codec::encode(&self.shell.lock_store())
    }

    /// Replaces the contents with decoded `text`.
    ///
    /// On error the container is left exactly as it was.
    pub fn load_from_str(&self, text: &str) -> DataResult<()> {
        let store = codec::decode(text, &self.shell.registry)?;
        self.shell.replace(store);
        Ok(())
    }

    /// An explicit path becomes the new default; otherwise the stored default is used.
    fn resolve_path(&self, path: Option<&Path>) -> PathBuf {
        let mut current = self.shell.lock_path();
        if let Some(path) = path {
            *current = path.to_path_buf();
        }
        current.clone()
    }

    /// Writes the container to `path` (or the stored default) in the background.
    ///
    /// The contents are encoded before this returns, so later changes never
    /// leak into this save. Completion is reported once through the event hub
    /// and `callback`; the returned handle resolves to the same outcome.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn save(&self, path: Option<&Path>, callback: Option<DataCallback>) -> JoinHandle<DataState> {
        let path = self.resolve_path(path);
        let snapshot = if path.as_os_str().is_empty() {
            Err(DataError::MissingPath)
        } else {
            codec::encode(&self.shell.lock_store())
        };
        let events = Arc::clone(&self.shell.events);

        tokio::spawn(async move {
            let result = match snapshot {
                Ok(text) => {
                    tracing::debug!(bytes = text.len(), path = %path.display(), "writing data file");
                    write_atomically(&path, text).await
                }
                Err(error) => Err(error),
            };
            events.complete(Operation::Save, &path, result, callback)
        })
    }

    /// Reads `path` (or the stored default) in the background and replaces the
    /// contents with it.
    ///
    /// The swap happens in one step after the file has been fully decoded; if
    /// reading or decoding fails the contents are untouched. Completion is
    /// reported as for [`save`](Self::save).
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn load(&self, path: Option<&Path>, callback: Option<DataCallback>) -> JoinHandle<DataState> {
        let path = self.resolve_path(path);
        let shell = Arc::clone(&self.shell);

        tokio::spawn(async move {
            let result = read_store(&path, &shell.registry)
                .await
                .map(|store| shell.replace(store));
            shell.events.complete(Operation::Load, &path, result, callback)
        })
    }
}

async fn read_store(path: &Path, registry: &DataRegistry) -> DataResult<Store> {
    if path.as_os_str().is_empty() {
        return Err(DataError::MissingPath);
    }
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| DataError::io("read", path, e))?;
    tracing::debug!(bytes = text.len(), path = %path.display(), "read data file");
    codec::decode(&text, registry)
}

/// Writes through a sibling temp file and renames it over `path`.
async fn write_atomically(path: &Path, text: String) -> DataResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| DataError::io("create directory", parent, e))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, text.as_bytes())
        .await
        .map_err(|e| DataError::io("write", &temp_path, e))?;
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(DataError::io("rename", path, e));
    }
    Ok(())
}

impl Default for DataContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataContainer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DataContainer")
            .field("path", &self.get_path())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_starts_empty() {
        let container = DataContainer::acquire();
        container.set_value("a", 1);
        container.set_path("somewhere.json");
        container.release();

        let container = DataContainer::acquire();
        assert!(container.is_empty());
        assert_eq!(container.get_path(), PathBuf::new());
        container.release();
    }

    #[test]
    fn test_init_resets() {
        let container = DataContainer::new();
        container.set_value("a", 1);
        container.set_path("x.json");
        container.init();
        assert!(!container.has_key("a"));
        assert_eq!(container.get_path(), PathBuf::new());
    }

    #[test]
    fn test_explicit_path_becomes_default() {
        let container = DataContainer::new();
        container.set_path("first.json");
        assert_eq!(container.resolve_path(None), PathBuf::from("first.json"));
        assert_eq!(
            container.resolve_path(Some(Path::new("second.json"))),
            PathBuf::from("second.json")
        );
        assert_eq!(container.get_path(), PathBuf::from("second.json"));
    }

    #[test]
    fn test_set_data_requires_registration() {
        use serde::{Deserialize, Serialize};

        #[derive(Clone, Serialize, Deserialize)]
        struct Unlisted;

        impl StorableData for Unlisted {
            const TYPE_NAME: &'static str = "container::Unlisted";
        }

        let container =
            DataContainer::with_parts(Arc::new(DataEvents::new()), Arc::new(DataRegistry::new()));
        let err = container.set_data("u", Unlisted).unwrap_err();
        assert!(matches!(err, DataError::UnregisteredType("container::Unlisted")));
        assert!(!container.has_key("u"));

        container.register_data::<Unlisted>().unwrap();
        container.set_data("u", Unlisted).unwrap();
        assert_eq!(container.get_value_type("u"), Some(ValueKind::Data));
    }

    #[test]
    fn test_failed_text_load_leaves_contents() {
        let container = DataContainer::new();
        container.set_value("keep", true);
        assert!(container.load_from_str("not json").is_err());
        assert_eq!(container.try_get_value("keep", false), (true, true));

        let text = container.save_to_string().unwrap();
        container.delete_all();
        container.load_from_str(&text).unwrap();
        assert!(container.has_key("keep"));
    }
}

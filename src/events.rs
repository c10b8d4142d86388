use crate::error::DataError;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

/// Terminal outcome of a save or load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    Success,
    Error,
}

/// Which persistence operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Load,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Save => f.write_str("save"),
            Operation::Load => f.write_str("load"),
        }
    }
}

/// One-shot completion callback for a single save or load.
pub type DataCallback = Box<dyn FnOnce(DataState, Option<&DataError>) + Send>;

type StateListener = Arc<dyn Fn(DataState) + Send + Sync>;
type ErrorListener = Arc<dyn Fn(&DataError) + Send + Sync>;

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    fn next() -> Self {
        ListenerId(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed))
    }
}

static GLOBAL_EVENTS: LazyLock<Arc<DataEvents>> = LazyLock::new(|| Arc::new(DataEvents::new()));

/// Subscriber lists for save, load and error notifications.
///
/// Listeners fire in subscription order. When an operation fails the error
/// listeners run first, then the state listeners for that operation (with
/// [`DataState::Error`]), then the operation's own callback. A successful
/// operation fires only its state listeners and callback.
///
/// Listeners are called without any internal lock held, so a listener may
/// subscribe or unsubscribe freely.
#[derive(Default)]
pub struct DataEvents {
    save: Mutex<Vec<(ListenerId, StateListener)>>,
    load: Mutex<Vec<(ListenerId, StateListener)>>,
    error: Mutex<Vec<(ListenerId, ErrorListener)>>,
}

impl DataEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide hub containers report to unless given their own.
    pub fn global() -> Arc<DataEvents> {
        Arc::clone(&GLOBAL_EVENTS)
    }

    pub fn on_save(&self, listener: impl Fn(DataState) + Send + Sync + 'static) -> ListenerId {
        let listener: StateListener = Arc::new(listener);
        subscribe(&self.save, listener)
    }

    pub fn on_load(&self, listener: impl Fn(DataState) + Send + Sync + 'static) -> ListenerId {
        let listener: StateListener = Arc::new(listener);
        subscribe(&self.load, listener)
    }

    pub fn on_error(&self, listener: impl Fn(&DataError) + Send + Sync + 'static) -> ListenerId {
        let listener: ErrorListener = Arc::new(listener);
        subscribe(&self.error, listener)
    }

    /// Removes a listener from whichever list holds it.
    ///
    /// Returns `false` if the id is unknown.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        unsubscribe(&self.save, id) || unsubscribe(&self.load, id) || unsubscribe(&self.error, id)
    }

    /// Reports the end of an operation to listeners and the callback.
    pub(crate) fn complete(
        &self,
        operation: Operation,
        path: &Path,
        result: Result<(), DataError>,
        callback: Option<DataCallback>,
    ) -> DataState {
        let state_listeners = match operation {
            Operation::Save => snapshot(&self.save),
            Operation::Load => snapshot(&self.load),
        };

        match result {
            Ok(()) => {
                tracing::info!(%operation, path = %path.display(), "data {} complete", operation);
                for listener in &state_listeners {
                    listener(DataState::Success);
                }
                if let Some(callback) = callback {
                    callback(DataState::Success, None);
                }
                DataState::Success
            }
            Err(error) => {
                tracing::error!(%operation, path = %path.display(), %error, "data {} failed", operation);
                for listener in &snapshot(&self.error) {
                    listener(&error);
                }
                for listener in &state_listeners {
                    listener(DataState::Error);
                }
                if let Some(callback) = callback {
                    callback(DataState::Error, Some(&error));
                }
                DataState::Error
            }
        }
    }
}

impl fmt::Debug for DataEvents {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DataEvents")
            .field("save", &snapshot(&self.save).len())
            .field("load", &snapshot(&self.load).len())
            .field("error", &snapshot(&self.error).len())
            .finish()
    }
}

fn subscribe<L: ?Sized>(list: &Mutex<Vec<(ListenerId, Arc<L>)>>, listener: Arc<L>) -> ListenerId {
    let id = ListenerId::next();
    list.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((id, listener));
    id
}

fn unsubscribe<L: ?Sized>(list: &Mutex<Vec<(ListenerId, Arc<L>)>>, id: ListenerId) -> bool {
    let mut list = list.lock().unwrap_or_else(PoisonError::into_inner);
    let before = list.len();
    list.retain(|(existing, _)| *existing != id);
    list.len() != before
}

fn snapshot<L: ?Sized>(list: &Mutex<Vec<(ListenerId, Arc<L>)>>) -> Vec<Arc<L>> {
    list.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .map(|(_, listener)| Arc::clone(listener))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Clone) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |line: &str| sink.lock().unwrap().push(line.to_string()))
    }

    #[test]
    fn test_success_fires_state_and_callback_only() {
        let events = DataEvents::new();
        let (log, push) = recorder();

        let p = push.clone();
        events.on_save(move |state| p(&format!("save:{:?}", state)));
        let p = push.clone();
        events.on_load(move |state| p(&format!("load:{:?}", state)));
        let p = push.clone();
        events.on_error(move |_| p("error"));

        let p = push.clone();
        let state = events.complete(
            Operation::Save,
            Path::new("a.json"),
            Ok(()),
            Some(Box::new(move |state: DataState, err: Option<&DataError>| {
                p(&format!("callback:{:?}:{}", state, err.is_some()))
            })),
        );

        assert_eq!(state, DataState::Success);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["save:Success", "callback:Success:false"]
        );
    }

    #[test]
    fn test_error_fires_broadcast_then_state_then_callback() {
        let events = DataEvents::new();
        let (log, push) = recorder();

        let p = push.clone();
        events.on_load(move |state| p(&format!("load:{:?}", state)));
        let p = push.clone();
        events.on_error(move |err| p(&format!("error:{}", err)));

        let p = push.clone();
        let state = events.complete(
            Operation::Load,
            Path::new("a.json"),
            Err(DataError::Corrupted("bad".into())),
            Some(Box::new(move |state: DataState, err: Option<&DataError>| {
                p(&format!("callback:{:?}:{}", state, err.is_some()))
            })),
        );

        assert_eq!(state, DataState::Error);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "error:corrupted data file: bad",
                "load:Error",
                "callback:Error:true"
            ]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let events = DataEvents::new();
        let (log, push) = recorder();
        let p = push.clone();
        let id = events.on_save(move |_| p("save"));

        assert!(events.unsubscribe(id));
        assert!(!events.unsubscribe(id));
        events.complete(Operation::Save, Path::new("a.json"), Ok(()), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listener_may_subscribe_while_firing() {
        let events = Arc::new(DataEvents::new());
        let inner = Arc::clone(&events);
        events.on_save(move |_| {
            inner.on_save(|_| {});
        });
        events.complete(Operation::Save, Path::new("a.json"), Ok(()), None);
        assert_eq!(snapshot(&events.save).len(), 2);
    }
}

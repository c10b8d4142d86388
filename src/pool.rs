use crate::data::AnyData;
use crate::kind::ValueKind;
use crate::store::Store;
use crate::value::{Color, Vector2, Vector3, Vector4};
#[cfg(test)]
use std::cell::Cell;
use std::collections::HashMap;
use std::mem;
use std::sync::{Mutex, PoisonError};

/// Idle objects kept per pool; anything returned beyond this is dropped.
pub(crate) const MAX_IDLE: usize = 32;

#[cfg(test)]
thread_local! {
    static RETURNED: Cell<usize> = const { Cell::new(0) };
}

/// Allocated maps handed back to any pool from the calling thread.
#[cfg(test)]
pub(crate) fn returned_on_this_thread() -> usize {
    RETURNED.with(Cell::get)
}

/// A synchronized free list of string-keyed maps.
///
/// Maps are cleared when they come back, so anything handed out by
/// [`MapPool::take`] is empty but may keep capacity from earlier use.
pub(crate) struct MapPool<V> {
    idle: Mutex<Vec<HashMap<String, V>>>,
}

impl<V> MapPool<V> {
    pub(crate) const fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn take(&self) -> HashMap<String, V> {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    pub(crate) fn give(&self, mut map: HashMap<String, V>) {
        map.clear();
        if map.capacity() == 0 {
            return;
        }
        #[cfg(test)]
        RETURNED.with(|n| n.set(n.get() + 1));
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE {
            idle.push(map);
        }
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

static INTS: MapPool<i32> = MapPool::new();
static FLOATS: MapPool<f32> = MapPool::new();
static BOOLS: MapPool<bool> = MapPool::new();
static STRINGS: MapPool<String> = MapPool::new();
static COLORS: MapPool<Color> = MapPool::new();
static VECTOR2S: MapPool<Vector2> = MapPool::new();
static VECTOR3S: MapPool<Vector3> = MapPool::new();
static VECTOR4S: MapPool<Vector4> = MapPool::new();
static DATA: MapPool<AnyData> = MapPool::new();
static INDEX: MapPool<ValueKind> = MapPool::new();

/// Builds an empty store whose maps come from the shared per-kind pools.
pub(crate) fn take_store() -> Store {
    Store {
        ints: INTS.take(),
        floats: FLOATS.take(),
        bools: BOOLS.take(),
        strings: STRINGS.take(),
        colors: COLORS.take(),
        vector2s: VECTOR2S.take(),
        vector3s: VECTOR3S.take(),
        vector4s: VECTOR4S.take(),
        data: DATA.take(),
        index: INDEX.take(),
    }
}

/// Empties `store` and hands each of its maps back to its pool.
///
/// The store is left holding fresh, unallocated maps.
pub(crate) fn recycle(store: &mut Store) {
    INTS.give(mem::take(&mut store.ints));
    FLOATS.give(mem::take(&mut store.floats));
    BOOLS.give(mem::take(&mut store.bools));
    STRINGS.give(mem::take(&mut store.strings));
    COLORS.give(mem::take(&mut store.colors));
    VECTOR2S.give(mem::take(&mut store.vector2s));
    VECTOR3S.give(mem::take(&mut store.vector3s));
    VECTOR4S.give(mem::take(&mut store.vector4s));
    DATA.give(mem::take(&mut store.data));
    INDEX.give(mem::take(&mut store.index));
}

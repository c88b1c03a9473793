// Copyright (c) 2019-present Vesper Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! The asset store: a table of reference-counted entries keyed by file path.

use crate::{
    entry::{AssetEntry, LoadState, QueuedCallback},
    AssetData, AssetLoadError, LoadPolicy,
};
use fxhash::FxHashMap;
use vesper_core::{
    log::Log,
    parking_lot::{Mutex, RwLock},
    task::TaskPool,
};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

struct AssetStoreShared<T: AssetData> {
    entries: RwLock<FxHashMap<PathBuf, Arc<AssetEntry<T>>>>,
    default: RwLock<Arc<T>>,
    task_pool: Arc<TaskPool>,
    // Entries whose async load settled since the last update() call, together
    // with the callbacks that were queued while the load was in flight.
    ready: Mutex<Vec<(Arc<AssetEntry<T>>, Vec<QueuedCallback<T>>)>>,
    next_handle_id: AtomicU64,
}

/// See module docs.
pub struct AssetStore<T: AssetData> {
    shared: Arc<AssetStoreShared<T>>,
}

impl<T: AssetData> Clone for AssetStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: AssetData> AssetStore<T> {
    pub fn new(task_pool: Arc<TaskPool>) -> Self {
        Self {
            shared: Arc::new(AssetStoreShared {
                entries: RwLock::new(FxHashMap::default()),
                default: RwLock::new(Arc::new(T::default())),
                task_pool,
                ready: Mutex::new(Vec::new()),
                next_handle_id: AtomicU64::new(0),
            }),
        }
    }

    /// Requests the asset at the given path. If the path is already known the
    /// existing entry is shared, otherwise a new entry is created and its load
    /// is started according to the policy.
    pub fn load<P: AsRef<Path>>(&self, path: P, policy: LoadPolicy) -> Asset<T> {
        let path = path.as_ref().to_path_buf();

        if let Some(entry) = self.shared.entries.read().get(&path) {
            return self.make_handle(entry.clone());
        }

        let entry = {
            let mut entries = self.shared.entries.write();
            // A concurrent loader may have won the race for the write lock.
            if let Some(existing) = entries.get(&path) {
                existing.clone()
            } else {
                let entry = Arc::new(AssetEntry::new(
                    path.clone(),
                    self.shared.default.read().clone(),
                ));
                entries.insert(path.clone(), entry.clone());

                match policy {
                    LoadPolicy::Sync => {
                        let callbacks = entry.commit(Self::load_and_log(&path));
                        self.shared.ready.lock().push((entry.clone(), callbacks));
                    }
                    LoadPolicy::Async => {
                        let task_entry = entry.clone();
                        let shared = self.shared.clone();
                        self.shared.task_pool.spawn_task(async move {
                            let callbacks = task_entry.commit(Self::load_and_log(task_entry.path()));
                            shared.ready.lock().push((task_entry, callbacks));
                        });
                    }
                }
                entry
            }
        };

        self.make_handle(entry)
    }

    /// Registers an already-loaded asset under the given path - the way
    /// embedded or procedurally generated data enters the store. An existing
    /// entry for the path is shared instead, ignoring the new data.
    pub fn insert<P: AsRef<Path>>(&self, path: P, data: T) -> Asset<T> {
        let path = path.as_ref().to_path_buf();
        let entry = {
            let mut entries = self.shared.entries.write();
            if let Some(existing) = entries.get(&path) {
                existing.clone()
            } else {
                let entry = Arc::new(AssetEntry::new(
                    path.clone(),
                    self.shared.default.read().clone(),
                ));
                let callbacks = entry.commit(Ok(data));
                debug_assert!(callbacks.is_empty());
                entries.insert(path, entry.clone());
                entry
            }
        };
        self.make_handle(entry)
    }

    /// Replaces the fallback instance served while loads are in flight. The
    /// load runs on the calling thread; on failure the previous default stays.
    pub fn load_default<P: AsRef<Path>>(&self, path: P) {
        match T::load(path.as_ref()) {
            Ok(data) => *self.shared.default.write() = Arc::new(data),
            Err(error) => Log::err(format!("Unable to load default asset. Reason: {}", error)),
        }
    }

    /// Invokes callbacks of every entry whose load settled since the last
    /// call. Must be called once per frame on the main thread.
    pub fn update(&self) {
        let ready = std::mem::take(&mut *self.shared.ready.lock());
        for (entry, callbacks) in ready {
            let data = entry.data();
            for (_, callback) in callbacks {
                callback(&data);
            }
        }
    }

    /// Number of entries currently in the table.
    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.read().is_empty()
    }

    fn load_and_log(path: &Path) -> Result<T, AssetLoadError> {
        match T::load(path) {
            Ok(data) => Ok(data),
            Err(error) => {
                Log::err(format!("Asset load failed. Reason: {}", error));
                Err(error)
            }
        }
    }

    fn make_handle(&self, entry: Arc<AssetEntry<T>>) -> Asset<T> {
        entry.grab();
        Asset {
            id: self.shared.next_handle_id.fetch_add(1, Ordering::Relaxed),
            entry,
            store: Arc::downgrade(&self.shared),
        }
    }
}

/// A reference-counted handle to an entry of an [`AssetStore`]. Dropping the
/// last handle of an entry erases the entry; if a load is still in flight the
/// drop briefly blocks until the load settles, so the worker never writes into
/// freed state.
pub struct Asset<T: AssetData> {
    id: u64,
    entry: Arc<AssetEntry<T>>,
    store: Weak<AssetStoreShared<T>>,
}

impl<T: AssetData> Asset<T> {
    /// Current data of the asset: the loaded value, or the default instance
    /// while the load is pending or has failed.
    #[inline]
    pub fn get(&self) -> Arc<T> {
        self.entry.data()
    }

    /// Invokes the callback with the loaded data: synchronously if the load
    /// already settled, otherwise the callback is queued and runs during
    /// [`AssetStore::update`] once the data is in.
    pub fn get_with<F>(&self, callback: F)
    where
        F: FnOnce(&Arc<T>) + Send + 'static,
    {
        let mut guarded = self.entry.guarded.lock();
        if guarded.state == LoadState::Pending {
            guarded.callbacks.push((self.id, Box::new(callback)));
        } else {
            let data = guarded.data.clone();
            drop(guarded);
            callback(&data);
        }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.entry.is_loaded()
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.entry.is_loading()
    }

    #[inline]
    pub fn path(&self) -> &Path {
        self.entry.path()
    }

    #[inline]
    pub fn ref_count(&self) -> usize {
        self.entry.ref_count()
    }
}

impl<T: AssetData> std::fmt::Debug for Asset<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Asset<{}>({})",
            std::any::type_name::<T>(),
            self.entry.path().display()
        )
    }
}

impl<T: AssetData> Clone for Asset<T> {
    fn clone(&self) -> Self {
        self.entry.grab();
        Self {
            id: self
                .store
                .upgrade()
                .map(|shared| shared.next_handle_id.fetch_add(1, Ordering::Relaxed))
                .unwrap_or(u64::MAX),
            entry: self.entry.clone(),
            store: self.store.clone(),
        }
    }
}

impl<T: AssetData> Drop for Asset<T> {
    fn drop(&mut self) {
        self.entry.forget_callbacks_of(self.id);

        if self.entry.release() == 0 {
            if let Some(shared) = self.store.upgrade() {
                // Let an in-flight load settle before the entry goes away.
                self.entry.wait_until_settled();

                let mut entries = shared.entries.write();
                // A concurrent load() may have revived the entry in the
                // meantime; only erase it while it is still orphaned.
                if self.entry.ref_count() == 0 {
                    entries.remove(self.entry.path());
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{thread, time::Duration};

    #[derive(Debug)]
    struct Stub {
        value: u32,
    }

    impl Default for Stub {
        fn default() -> Self {
            Self { value: 0 }
        }
    }

    impl AssetData for Stub {
        fn load(path: &Path) -> Result<Self, AssetLoadError> {
            let name = path.to_string_lossy();
            if name.starts_with("slow") {
                thread::sleep(Duration::from_millis(20));
                Ok(Self { value: 42 })
            } else if name.starts_with("fast") {
                Ok(Self { value: 7 })
            } else {
                Err(AssetLoadError::NotFound(path.to_path_buf()))
            }
        }
    }

    fn make_store() -> AssetStore<Stub> {
        AssetStore::new(Arc::new(TaskPool::new()))
    }

    fn wait_settled(asset: &Asset<Stub>) {
        let mut spins = 0;
        while asset.is_loading() {
            thread::sleep(Duration::from_millis(5));
            spins += 1;
            assert!(spins < 1000, "load did not settle in time");
        }
    }

    #[test]
    fn sync_load_is_immediately_available() {
        let store = make_store();
        let asset = store.load("fast.stub", LoadPolicy::Sync);
        assert!(asset.is_loaded());
        assert_eq!(asset.get().value, 7);
    }

    #[test]
    fn async_load_serves_default_until_done() {
        let store = make_store();
        let asset = store.load("slow.stub", LoadPolicy::Async);
        if asset.is_loading() {
            assert_eq!(asset.get().value, 0);
        }
        wait_settled(&asset);
        assert_eq!(asset.get().value, 42);
    }

    #[test]
    fn second_load_shares_the_entry() {
        let store = make_store();
        let first = store.load("slow.stub", LoadPolicy::Async);
        let second = store.load("slow.stub", LoadPolicy::Async);
        assert_eq!(first.ref_count(), 2);
        assert_eq!(second.ref_count(), 2);
        assert_eq!(store.len(), 1);
        wait_settled(&first);
    }

    #[test]
    fn queued_callbacks_run_on_update() {
        let store = make_store();
        let asset = store.load("slow.stub", LoadPolicy::Async);

        let (sender, receiver) = std::sync::mpsc::channel();
        asset.get_with(move |data| {
            let _ = sender.send(data.value);
        });

        wait_settled(&asset);
        store.update();
        assert_eq!(receiver.try_recv(), Ok(42));
    }

    #[test]
    fn failed_load_keeps_default_and_still_calls_back() {
        let store = make_store();
        let asset = store.load("missing.stub", LoadPolicy::Sync);
        assert!(!asset.is_loaded());
        assert_eq!(asset.get().value, 0);

        let (sender, receiver) = std::sync::mpsc::channel();
        asset.get_with(move |data| {
            let _ = sender.send(data.value);
        });
        // Load already settled, the callback must have run synchronously.
        assert_eq!(receiver.try_recv(), Ok(0));
    }

    #[test]
    fn dropping_last_handle_erases_the_entry() {
        let store = make_store();
        let asset = store.load("slow.stub", LoadPolicy::Async);
        assert_eq!(store.len(), 1);
        drop(asset);
        assert_eq!(store.len(), 0);
    }
}

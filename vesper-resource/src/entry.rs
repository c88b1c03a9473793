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

//! A single slot of the asset table: shared state of one loaded (or loading)
//! file, plus the queue of callbacks waiting for it.

use crate::{AssetData, AssetLoadError};
use vesper_core::parking_lot::{Condvar, Mutex};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// A load goes through a small state machine:
///
/// 1. Pending - it is loading or queued for loading.
/// 2. LoadError - an error has occurred during the load.
/// 3. Ok - the data is fully loaded and ready to use.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Pending,
    LoadError,
    Ok,
}

/// A callback waiting for the entry to finish loading, tagged with the id of
/// the handle that queued it so it can be withdrawn when that handle drops.
pub(crate) type QueuedCallback<T> = (u64, Box<dyn FnOnce(&Arc<T>) + Send>);

pub(crate) struct EntryState<T: AssetData> {
    pub data: Arc<T>,
    pub state: LoadState,
    pub callbacks: Vec<QueuedCallback<T>>,
}

/// Shared state of one asset. The reference count tracks live [`crate::Asset`]
/// handles; the store erases the entry when it reaches zero.
pub struct AssetEntry<T: AssetData> {
    path: PathBuf,
    ref_count: AtomicUsize,
    pub(crate) guarded: Mutex<EntryState<T>>,
    // Signalled when the state leaves Pending, so a last-handle drop can wait
    // out an in-flight load before the entry is erased.
    pub(crate) loaded: Condvar,
}

impl<T: AssetData> AssetEntry<T> {
    pub(crate) fn new(path: PathBuf, default: Arc<T>) -> Self {
        Self {
            path,
            ref_count: AtomicUsize::new(0),
            guarded: Mutex::new(EntryState {
                data: default,
                state: LoadState::Pending,
                callbacks: Vec::new(),
            }),
            loaded: Condvar::new(),
        }
    }

    #[inline]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    #[inline]
    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn grab(&self) {
        self.ref_count.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub(crate) fn release(&self) -> usize {
        self.ref_count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// True once a load attempt finished successfully.
    pub fn is_loaded(&self) -> bool {
        self.guarded.lock().state == LoadState::Ok
    }

    /// True while a load is still in flight.
    pub fn is_loading(&self) -> bool {
        self.guarded.lock().state == LoadState::Pending
    }

    /// Current data; the default instance while loading or after a failure.
    pub fn data(&self) -> Arc<T> {
        self.guarded.lock().data.clone()
    }

    /// Commits the outcome of a load attempt and wakes pending waiters.
    /// Returns the callbacks queued so far; the caller is responsible for
    /// running them on the main thread.
    pub(crate) fn commit(&self, result: Result<T, AssetLoadError>) -> Vec<QueuedCallback<T>> {
        let mut guarded = self.guarded.lock();
        match result {
            Ok(data) => {
                guarded.data = Arc::new(data);
                guarded.state = LoadState::Ok;
            }
            Err(_) => {
                // The default data stays in place, degraded but usable.
                guarded.state = LoadState::LoadError;
            }
        }
        self.loaded.notify_all();
        std::mem::take(&mut guarded.callbacks)
    }

    /// Blocks until the entry leaves the pending state.
    pub(crate) fn wait_until_settled(&self) {
        let mut guarded = self.guarded.lock();
        while guarded.state == LoadState::Pending {
            self.loaded.wait(&mut guarded);
        }
    }

    /// Withdraws callbacks queued by the handle with the given id.
    pub(crate) fn forget_callbacks_of(&self, handle_id: u64) {
        self.guarded
            .lock()
            .callbacks
            .retain(|(id, _)| *id != handle_id);
    }
}

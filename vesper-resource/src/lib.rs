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

//! Asset management.
//!
//! Assets are stored in a per-type [`manager::AssetStore`] keyed by file path.
//! Loading an already known path only bumps the reference count of the
//! existing entry. Loads can run synchronously on the calling thread or
//! asynchronously on the shared task pool; while a load is in flight every
//! reader observes the asset type's default instance, so the simulation never
//! stalls on a missing file.

#![forbid(unsafe_code)]

use std::{
    fmt::{Debug, Display, Formatter},
    path::{Path, PathBuf},
};

pub mod entry;
pub mod manager;

pub use entry::AssetEntry;
pub use manager::{Asset, AssetStore};

/// A type that can be stored in an asset store. The `Default` value doubles as
/// the fallback instance handed out while the real data is still loading.
pub trait AssetData: Default + Debug + Send + Sync + 'static {
    /// Loads the asset from the given path. Runs either on the calling thread
    /// or on a worker of the task pool, depending on the load policy.
    fn load(path: &Path) -> Result<Self, AssetLoadError>;
}

/// Chooses where an asset load runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Load on the calling thread; the returned handle is immediately loaded
    /// (or failed).
    Sync,
    /// Load on a worker task; the returned handle serves the default instance
    /// until the load finishes.
    Async,
}

/// Errors produced while loading an asset. Failed entries stay in the store
/// with their default data, so these are reported, never fatal.
#[derive(Debug, Clone)]
pub enum AssetLoadError {
    /// The path does not exist.
    NotFound(PathBuf),
    /// The file exists but its contents could not be understood.
    Decode {
        path: PathBuf,
        reason: String,
    },
    /// Any other I/O failure.
    Io {
        path: PathBuf,
        reason: String,
    },
}

impl Display for AssetLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetLoadError::NotFound(path) => {
                write!(f, "Asset {} was not found!", path.display())
            }
            AssetLoadError::Decode { path, reason } => {
                write!(f, "Unable to decode asset {}. Reason: {}", path.display(), reason)
            }
            AssetLoadError::Io { path, reason } => {
                write!(f, "Unable to read asset {}. Reason: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for AssetLoadError {}

impl AssetLoadError {
    /// Wraps a `std::io` error for the given path, mapping missing files onto
    /// [`AssetLoadError::NotFound`].
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                reason: error.to_string(),
            }
        }
    }
}

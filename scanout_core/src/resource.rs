// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffer import with per-handle de-duplication.
//!
//! The platform mapping subsystem sits behind [`BufferImporter`]. The
//! [`ResourceManager`] in front of it caches one [`OverlayBuffer`] per
//! [`NativeHandle`], so a buffer shown for many frames, or on several outputs
//! in one frame, is imported once and shared.
//!
//! The cache keeps a strong reference of its own. [`release_unused`] drops
//! every entry no layer references any more and tells the importer; the
//! presenter calls it once per committed frame.
//!
//! [`release_unused`]: ResourceManager::release_unused

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::buffer::{BufferInfo, NativeHandle, OverlayBuffer};

/// Errors from importing a native buffer.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The layer carries no buffer handle.
    #[error("layer has no native buffer")]
    MissingHandle,
    /// The handle does not describe a buffer this display can map.
    #[error("native handle {0:?} cannot be imported")]
    Unsupported(NativeHandle),
    /// No free import slots are left.
    #[error("no free buffer slots")]
    Exhausted,
    /// The platform mapping call failed.
    #[error("buffer mapping failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The platform buffer mapping service.
pub trait BufferImporter {
    /// Maps a native buffer for display use.
    fn import(&mut self, handle: NativeHandle) -> Result<BufferInfo, ImportError>;

    /// Ends an import started by [`import`](Self::import).
    fn release(&mut self, handle: NativeHandle, info: &BufferInfo) {
        _ = (handle, info);
    }
}

/// Cache of imported buffers in front of a [`BufferImporter`].
pub struct ResourceManager {
    importer: Box<dyn BufferImporter>,
    cache: HashMap<NativeHandle, Arc<OverlayBuffer>>,
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("importer", &"<dyn BufferImporter>")
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl ResourceManager {
    /// Creates an empty cache over `importer`.
    #[must_use]
    pub fn new(importer: Box<dyn BufferImporter>) -> Self {
        Self {
            importer,
            cache: HashMap::new(),
        }
    }

    /// Returns the cached buffer for `handle`, importing it on first use.
    pub fn import(&mut self, handle: NativeHandle) -> Result<Arc<OverlayBuffer>, ImportError> {
        if let Some(buffer) = self.find_cached(handle) {
            return Ok(buffer);
        }
        let buffer = self.import_uncached(handle)?;
        self.cache.insert(handle, buffer.clone());
        Ok(buffer)
    }

    /// Imports `handle` without consulting or filling the cache.
    ///
    /// The importer is never told to release such a buffer; callers that
    /// bypass the cache own the import outright.
    pub fn import_uncached(
        &mut self,
        handle: NativeHandle,
    ) -> Result<Arc<OverlayBuffer>, ImportError> {
        let info = self.importer.import(handle)?;
        tracing::trace!(?handle, format = info.format, "imported buffer");
        Ok(Arc::new(OverlayBuffer::new(handle, info)))
    }

    /// Looks `handle` up without importing.
    #[must_use]
    pub fn find_cached(&self, handle: NativeHandle) -> Option<Arc<OverlayBuffer>> {
        self.cache.get(&handle).cloned()
    }

    /// Number of cached imports.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Releases every cached buffer that only the cache still references.
    ///
    /// Returns how many imports were released.
    pub fn release_unused(&mut self) -> usize {
        let unused: Vec<NativeHandle> = self
            .cache
            .iter()
            .filter(|(_, buffer)| Arc::strong_count(buffer) == 1)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in &unused {
            if let Some(buffer) = self.cache.remove(handle) {
                tracing::trace!(?handle, "releasing buffer");
                self.importer.release(*handle, buffer.info());
            }
        }
        unused.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeImporter;

    #[test]
    fn repeated_import_reuses_the_buffer() {
        let importer = FakeImporter::new();
        let stats = importer.stats();
        let mut rm = ResourceManager::new(Box::new(importer));

        let a = rm.import(NativeHandle(1)).unwrap();
        let b = rm.import(NativeHandle(1)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(stats.imports(), 1);
        assert_eq!(rm.cached_len(), 1);
    }

    #[test]
    fn failure_is_not_cached() {
        let importer = FakeImporter::new().failing(NativeHandle(9));
        let stats = importer.stats();
        let mut rm = ResourceManager::new(Box::new(importer));

        assert!(matches!(
            rm.import(NativeHandle(9)),
            Err(ImportError::Unsupported(NativeHandle(9)))
        ));
        assert!(rm.import(NativeHandle(9)).is_err());
        assert_eq!(stats.imports(), 2);
        assert_eq!(rm.cached_len(), 0);
    }

    #[test]
    fn release_waits_for_last_owner() {
        let importer = FakeImporter::new();
        let stats = importer.stats();
        let mut rm = ResourceManager::new(Box::new(importer));

        let held = rm.import(NativeHandle(1)).unwrap();
        drop(rm.import(NativeHandle(2)).unwrap());

        assert_eq!(rm.release_unused(), 1);
        assert_eq!(stats.releases(), 1);
        assert!(rm.find_cached(NativeHandle(1)).is_some());
        assert!(rm.find_cached(NativeHandle(2)).is_none());

        drop(held);
        assert_eq!(rm.release_unused(), 1);
        assert_eq!(stats.releases(), 2);
    }

    #[test]
    fn uncached_import_bypasses_cache() {
        let importer = FakeImporter::new();
        let stats = importer.stats();
        let mut rm = ResourceManager::new(Box::new(importer));

        let cached = rm.import(NativeHandle(3)).unwrap();
        let fresh = rm.import_uncached(NativeHandle(3)).unwrap();
        assert!(!Arc::ptr_eq(&cached, &fresh));
        assert_eq!(stats.imports(), 2);
        assert_eq!(rm.cached_len(), 1);
    }
}

// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fakes shared by the unit tests.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::os::fd::OwnedFd;
use std::rc::Rc;

use crate::buffer::{BufferInfo, BufferUsage, NativeHandle};
use crate::compositor::{Compositor, CompositorError, FrameVerdict, OutputTarget};
use crate::fence::Fence;
use crate::layer::{Composition, OverlayLayer};
use crate::resource::{BufferImporter, ImportError};

/// DRM_FORMAT_ABGR8888.
const FORMAT_ABGR8888: u32 = 0x3432_4241;

/// An unsignalled fence and the write end that would signal it.
pub(crate) fn fence_pair() -> (Fence, OwnedFd) {
    let (read, write) = rustix::pipe::pipe().expect("pipe");
    (Fence::new(read), write)
}

/// A linear RGBA buffer that can be scanned out.
pub(crate) fn rgba_info(width: u32, height: u32) -> BufferInfo {
    BufferInfo {
        width,
        height,
        format: FORMAT_ABGR8888,
        modifier: 0,
        usage: BufferUsage::empty(),
        scanout: true,
    }
}

/// Counters shared between a [`FakeImporter`] and the test observing it.
#[derive(Clone, Debug, Default)]
pub(crate) struct ImportStats {
    imports: Rc<Cell<usize>>,
    releases: Rc<Cell<usize>>,
}

impl ImportStats {
    pub(crate) fn imports(&self) -> usize {
        self.imports.get()
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.get()
    }
}

/// Importer answering from a table. Unknown handles are 64x64 RGBA.
#[derive(Debug, Default)]
pub(crate) struct FakeImporter {
    infos: HashMap<NativeHandle, BufferInfo>,
    failing: HashSet<NativeHandle>,
    stats: ImportStats,
}

impl FakeImporter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(mut self, handle: NativeHandle) -> Self {
        self.failing.insert(handle);
        self
    }

    pub(crate) fn with_info(mut self, handle: NativeHandle, info: BufferInfo) -> Self {
        self.infos.insert(handle, info);
        self
    }

    pub(crate) fn stats(&self) -> ImportStats {
        self.stats.clone()
    }
}

impl BufferImporter for FakeImporter {
    fn import(&mut self, handle: NativeHandle) -> Result<BufferInfo, ImportError> {
        if self.failing.contains(&handle) {
            return Err(ImportError::Unsupported(handle));
        }
        self.stats.imports.set(self.stats.imports.get() + 1);
        Ok(self
            .infos
            .get(&handle)
            .copied()
            .unwrap_or_else(|| rgba_info(64, 64)))
    }

    fn release(&mut self, _handle: NativeHandle, _info: &BufferInfo) {
        self.stats.releases.set(self.stats.releases.get() + 1);
    }
}

/// What a [`ScriptedCompositor`] does on its next call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Script {
    /// Scan out every visible layer that supports it, GPU for the rest.
    Accept,
    /// Reject the plane assignment.
    Reject,
    /// Fail in the backend.
    Fail,
    /// Answer with no verdicts at all.
    WrongCount,
}

/// Test-side control of a boxed [`ScriptedCompositor`].
#[derive(Clone, Debug)]
pub(crate) struct CompositorHandle {
    script: Rc<Cell<Script>>,
    calls: Rc<Cell<usize>>,
}

impl CompositorHandle {
    pub(crate) fn set_script(&self, script: Script) {
        self.script.set(script);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }
}

/// Compositor following a [`Script`].
///
/// Accepted frames get a fresh unsignalled retire fence; the compositor keeps
/// the write ends so the fences stay valid for the whole test.
#[derive(Debug)]
pub(crate) struct ScriptedCompositor {
    handle: CompositorHandle,
    producers: Vec<OwnedFd>,
}

impl ScriptedCompositor {
    pub(crate) fn new() -> Self {
        Self {
            handle: CompositorHandle {
                script: Rc::new(Cell::new(Script::Accept)),
                calls: Rc::new(Cell::new(0)),
            },
            producers: Vec::new(),
        }
    }

    pub(crate) fn handle(&self) -> CompositorHandle {
        self.handle.clone()
    }
}

impl Compositor for ScriptedCompositor {
    fn compose(
        &mut self,
        layers: &mut [OverlayLayer],
        target: &mut OutputTarget,
    ) -> Result<FrameVerdict, CompositorError> {
        self.handle.calls.set(self.handle.calls.get() + 1);
        match self.handle.script.get() {
            Script::Reject => Err(CompositorError::Rejected),
            Script::Fail => Err(CompositorError::Backend("scripted failure".into())),
            Script::WrongCount => Ok(FrameVerdict {
                compositions: Vec::new(),
                retire_fence: None,
            }),
            Script::Accept => {
                drop(target.acquire_fence.take());
                let compositions = layers
                    .iter_mut()
                    .map(|layer| {
                        drop(layer.take_acquire_fence());
                        if layer.is_visible() && layer.can_scan_out() {
                            Composition::DISPLAY
                        } else {
                            Composition::GPU
                        }
                    })
                    .collect();
                let (retire, producer) = fence_pair();
                self.producers.push(producer);
                Ok(FrameVerdict {
                    compositions,
                    retire_fence: Some(retire),
                })
            }
        }
    }
}

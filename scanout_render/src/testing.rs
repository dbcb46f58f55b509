// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A virtual display driven by fixed verdicts, for the unit tests.

use scanout_core::buffer::{BufferInfo, BufferUsage, NativeHandle};
use scanout_core::compositor::{Compositor, CompositorError, FrameVerdict, OutputTarget};
use scanout_core::config::DisplayConfig;
use scanout_core::display::{FramePresenter, PresentOptions, VirtualDisplay};
use scanout_core::geometry::Rect;
use scanout_core::layer::{ClientLayer, Composition, OverlayLayer};
use scanout_core::resource::{BufferImporter, ImportError};

pub(crate) const OUTPUT: NativeHandle = NativeHandle(0x100);

/// Which layers the test compositor puts on the GPU.
#[derive(Clone, Copy, Debug)]
pub(crate) enum GpuOnly {
    /// Every layer.
    All,
    /// Only the layers that cannot be scanned out.
    None,
}

struct Importer;

impl BufferImporter for Importer {
    fn import(&mut self, _handle: NativeHandle) -> Result<BufferInfo, ImportError> {
        Ok(BufferInfo {
            width: 64,
            height: 64,
            format: 0x3432_4241,
            modifier: 0,
            usage: BufferUsage::empty(),
            scanout: true,
        })
    }
}

struct Verdicts(GpuOnly);

impl Compositor for Verdicts {
    fn compose(
        &mut self,
        layers: &mut [OverlayLayer],
        _target: &mut OutputTarget,
    ) -> Result<FrameVerdict, CompositorError> {
        let compositions = layers
            .iter()
            .map(|layer| match self.0 {
                GpuOnly::None if layer.is_visible() && layer.can_scan_out() => {
                    Composition::DISPLAY
                }
                _ => Composition::GPU,
            })
            .collect();
        Ok(FrameVerdict {
            compositions,
            retire_fence: None,
        })
    }
}

pub(crate) struct Harness {
    display: VirtualDisplay,
}

impl Harness {
    pub(crate) fn present(&mut self, layers: &mut [&mut ClientLayer]) {
        self.display.set_output_buffer(OUTPUT, None);
        self.display
            .present(layers, PresentOptions::DEFAULT)
            .expect("present");
    }

    pub(crate) fn layers(&self) -> &[OverlayLayer] {
        self.display.in_flight_layers()
    }
}

pub(crate) fn harness(mode: GpuOnly) -> Harness {
    Harness {
        display: VirtualDisplay::with_config(
            DisplayConfig::virtual_output(1920, 1080),
            Box::new(Importer),
            Box::new(Verdicts(mode)),
        ),
    }
}

pub(crate) fn client(handle: u64, frame: Rect) -> ClientLayer {
    let mut c = ClientLayer::new();
    c.set_native_handle(NativeHandle(handle));
    c.set_source_crop(kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(frame.width()),
        f64::from(frame.height()),
    ));
    c.set_display_frame(frame, 0, 0);
    c
}

// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Off-screen presenter compositing into caller-supplied buffers.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::buffer::{NativeHandle, OverlayBuffer};
use crate::compositor::{Compositor, OutputTarget};
use crate::config::DisplayConfig;
use crate::fence::{Fence, FenceError};
use crate::layer::{ClientLayer, Composition, LayerPlacement, OverlayLayer};
use crate::resource::{BufferImporter, ResourceManager};
use crate::trace::{
    FrameBeginEvent, FrameCommittedEvent, FrameFailedEvent, ImportFailureEvent, LayerBuiltEvent,
    PhaseKind, Tracer,
};

use super::{
    CompositionPlan, ConfigError, DisplayAttribute, DisplayType, FramePresenter, PresentError,
    PresentOptions, PresentState,
};

/// The only configuration a virtual display offers.
const CONFIG_ID: u32 = 0;

#[derive(Debug)]
struct PendingOutput {
    handle: NativeHandle,
    acquire_fence: Option<Fence>,
}

/// A display without a connector.
///
/// Every frame is composited into the output buffer most recently passed to
/// [`set_output_buffer`](FramePresenter::set_output_buffer). The presenter owns
/// the in-flight frame: the overlay layers and output buffer of the last
/// successful present, which stay alive until the next one commits.
pub struct VirtualDisplay {
    config: DisplayConfig,
    resources: ResourceManager,
    compositor: Box<dyn Compositor>,
    in_flight_layers: Vec<OverlayLayer>,
    in_flight_output: Option<Arc<OverlayBuffer>>,
    pending_output: Option<PendingOutput>,
    frame_index: u64,
}

impl fmt::Debug for VirtualDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualDisplay")
            .field("config", &self.config)
            .field("resources", &self.resources)
            .field("in_flight_layers", &self.in_flight_layers.len())
            .field("in_flight_output", &self.in_flight_output)
            .field("pending_output", &self.pending_output)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl VirtualDisplay {
    /// Creates a 1x1 virtual display. Call [`init`](Self::init) to size it.
    #[must_use]
    pub fn new(importer: Box<dyn BufferImporter>, compositor: Box<dyn Compositor>) -> Self {
        Self::with_config(DisplayConfig::default(), importer, compositor)
    }

    /// Creates a virtual display with an explicit configuration.
    #[must_use]
    pub fn with_config(
        config: DisplayConfig,
        importer: Box<dyn BufferImporter>,
        compositor: Box<dyn Compositor>,
    ) -> Self {
        Self {
            config,
            resources: ResourceManager::new(importer),
            compositor,
            in_flight_layers: Vec::new(),
            in_flight_output: None,
            pending_output: None,
            frame_index: 0,
        }
    }

    /// Sets the output size.
    pub fn init(&mut self, width: u32, height: u32) {
        tracing::debug!(width, height, "virtual display sized");
        self.config.width = width;
        self.config.height = height;
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// The buffer cache shared by the layers of this display.
    #[must_use]
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    /// Number of present calls so far, failed ones included.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The output buffer of the last committed frame.
    #[must_use]
    pub fn in_flight_output(&self) -> Option<&Arc<OverlayBuffer>> {
        self.in_flight_output.as_ref()
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        "Virtual"
    }

    /// Ids of the available configurations.
    #[must_use]
    pub fn display_configs(&self) -> &'static [u32] {
        &[CONFIG_ID]
    }

    /// Id of the active configuration.
    #[must_use]
    pub fn active_config(&self) -> u32 {
        CONFIG_ID
    }

    /// Switches configuration. Only the single built-in one is accepted.
    pub fn set_active_config(&mut self, config: u32) -> Result<(), ConfigError> {
        if config == CONFIG_ID {
            Ok(())
        } else {
            Err(ConfigError::UnknownConfig(config))
        }
    }

    /// Reads one attribute of configuration `config`.
    ///
    /// The refresh rate is reported as a period in nanoseconds.
    pub fn display_attribute(
        &self,
        config: u32,
        attribute: DisplayAttribute,
    ) -> Result<u64, ConfigError> {
        if config != CONFIG_ID {
            return Err(ConfigError::UnknownConfig(config));
        }
        Ok(match attribute {
            DisplayAttribute::Width => u64::from(self.config.width),
            DisplayAttribute::Height => u64::from(self.config.height),
            DisplayAttribute::RefreshRate => self.config.vsync_period_nanos(),
            DisplayAttribute::DpiX => u64::from(self.config.dpi_x),
            DisplayAttribute::DpiY => u64::from(self.config.dpi_y),
        })
    }

    /// Whether `format` can be composited into. Any format can.
    #[must_use]
    pub fn check_plane_format(&self, format: u32) -> bool {
        _ = format;
        true
    }

    /// [`present`](FramePresenter::present) with trace events sent to `tracer`.
    pub fn present_traced(
        &mut self,
        layers: &mut [&mut ClientLayer],
        options: PresentOptions,
        tracer: &mut Tracer<'_>,
    ) -> Result<Option<Fence>, PresentError> {
        self.frame_index += 1;
        let frame_index = self.frame_index;
        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            layer_count: layers.len(),
            plan: options.plan,
            handle_constraints: options.handle_constraints,
        });
        tracing::debug!(
            frame_index,
            layers = layers.len(),
            plan = ?options.plan,
            "presenting virtual display frame"
        );

        tracer.phase_begin(frame_index, PhaseKind::Build);
        let Some(pending) = self.pending_output.take() else {
            return Err(self.fail(
                tracer,
                PresentState::BuildingFrame,
                PresentError::MissingOutputBuffer,
            ));
        };
        let buffer = match self.resources.import(pending.handle) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.pending_output = Some(pending);
                return Err(self.fail(
                    tracer,
                    PresentState::BuildingFrame,
                    PresentError::OutputImport(e),
                ));
            }
        };
        let mut target = OutputTarget {
            buffer,
            acquire_fence: pending.acquire_fence,
        };
        warn_on_z_order_collisions(layers);
        let mut frame = self.build_frame(layers, options, frame_index, tracer);
        tracer.phase_end(frame_index, PhaseKind::Build);

        tracer.phase_begin(frame_index, PhaseKind::Compose);
        let verdict = match self.compositor.compose(&mut frame, &mut target) {
            Ok(verdict) if verdict.compositions.len() == frame.len() => verdict,
            Ok(verdict) => {
                let err = PresentError::VerdictMismatch {
                    expected: frame.len(),
                    actual: verdict.compositions.len(),
                };
                self.abort(layers, &mut frame, target);
                return Err(self.fail(tracer, PresentState::AwaitingCompositor, err));
            }
            Err(e) => {
                self.abort(layers, &mut frame, target);
                return Err(self.fail(tracer, PresentState::AwaitingCompositor, e.into()));
            }
        };
        tracer.phase_end(frame_index, PhaseKind::Compose);

        let release_fences = match duplicate_fence(verdict.retire_fence.as_ref(), layers.len()) {
            Ok(fences) => fences,
            Err(e) => {
                self.abort(layers, &mut frame, target);
                return Err(self.fail(tracer, PresentState::AwaitingCompositor, e.into()));
            }
        };

        tracer.phase_begin(frame_index, PhaseKind::Commit);
        for (layer, composition) in frame.iter_mut().zip(&verdict.compositions) {
            layer.set_layer_composition(*composition);
        }
        for (client, release_fence) in layers.iter_mut().zip(release_fences) {
            client.set_release_fence(release_fence);
            let mut pipeline = client.pipeline();
            if options.handle_constraints {
                pipeline.advance_constraints();
            }
            pipeline.set_total_displays(options.displays);
            pipeline.validate();
        }

        let gpu_layers = count_composition(&frame, Composition::GPU);
        let display_layers = count_composition(&frame, Composition::DISPLAY);
        let layer_count = frame.len();
        self.in_flight_layers = frame;
        self.in_flight_output = Some(target.buffer);
        let released_buffers = self.resources.release_unused();
        tracer.phase_end(frame_index, PhaseKind::Commit);

        tracer.frame_committed(&FrameCommittedEvent {
            frame_index,
            layers: layer_count,
            gpu_layers,
            display_layers,
            released_buffers,
            has_retire_fence: verdict.retire_fence.is_some(),
        });
        tracing::debug!(
            frame_index,
            gpu_layers,
            display_layers,
            released_buffers,
            "virtual display frame committed"
        );
        Ok(verdict.retire_fence)
    }

    fn build_frame(
        &mut self,
        layers: &mut [&mut ClientLayer],
        options: PresentOptions,
        frame_index: u64,
        tracer: &mut Tracer<'_>,
    ) -> Vec<OverlayLayer> {
        let mut frame = Vec::with_capacity(layers.len());
        for (position, client) in layers.iter_mut().enumerate() {
            let index = u32::try_from(position).unwrap_or(u32::MAX);
            let placement = LayerPlacement::new(index, self.config.width, self.config.height)
                .with_rotation(self.config.rotation)
                .with_constraints(options.handle_constraints)
                .with_gpu_only(options.plan == CompositionPlan::AllGpu);
            let layer = OverlayLayer::from_client_layer(
                client,
                &mut self.resources,
                self.in_flight_layers.get(position),
                &placement,
            );

            if layer.import_failed() {
                tracer.import_failure(&ImportFailureEvent {
                    frame_index,
                    layer_index: index,
                });
            }
            tracer.layer_built(&LayerBuiltEvent {
                frame_index,
                layer_index: index,
                kind: layer.kind(),
                state: layer.state(),
                supported: layer.supported_composition(),
            });
            frame.push(layer);
        }

        #[cfg(feature = "trace-rich")]
        if tracer.is_active() {
            let rects: Vec<_> = frame
                .iter()
                .filter(|layer| layer.is_visible() && !layer.surface_damage().is_empty())
                .map(|layer| {
                    let damage = layer.surface_damage();
                    crate::trace::DamageRect {
                        layer_index: layer.layer_index(),
                        x: damage.left,
                        y: damage.top,
                        width: damage.width(),
                        height: damage.height(),
                    }
                })
                .collect();
            tracer.damage_rects(frame_index, &rects);
        }

        frame
    }

    /// Hands back what a failed frame took from the caller.
    fn abort(
        &mut self,
        layers: &mut [&mut ClientLayer],
        frame: &mut [OverlayLayer],
        target: OutputTarget,
    ) {
        for (client, layer) in layers.iter_mut().zip(frame.iter_mut()) {
            if let Some(fence) = layer.take_acquire_fence() {
                client.set_acquire_fence(Some(fence));
            }
        }
        self.pending_output = Some(PendingOutput {
            handle: target.buffer.handle(),
            acquire_fence: target.acquire_fence,
        });
    }

    fn fail(
        &self,
        tracer: &mut Tracer<'_>,
        during: PresentState,
        err: PresentError,
    ) -> PresentError {
        tracing::warn!(
            frame_index = self.frame_index,
            ?during,
            error = %err,
            "virtual display present failed"
        );
        tracer.frame_failed(&FrameFailedEvent {
            frame_index: self.frame_index,
            during,
            recoverable: err.is_recoverable(),
        });
        err
    }
}

impl FramePresenter for VirtualDisplay {
    fn present(
        &mut self,
        layers: &mut [&mut ClientLayer],
        options: PresentOptions,
    ) -> Result<Option<Fence>, PresentError> {
        self.present_traced(layers, options, &mut Tracer::none())
    }

    fn set_output_buffer(&mut self, handle: NativeHandle, acquire_fence: Option<Fence>) {
        let previous = self.pending_output.replace(PendingOutput {
            handle,
            acquire_fence,
        });
        if let Some(previous) = previous {
            tracing::warn!(
                dropped = ?previous.handle,
                replacement = ?handle,
                "output buffer replaced before it was presented"
            );
        }
    }

    fn in_flight_layers(&self) -> &[OverlayLayer] {
        &self.in_flight_layers
    }

    fn display_type(&self) -> DisplayType {
        DisplayType::Virtual
    }

    fn width(&self) -> u32 {
        self.config.width
    }

    fn height(&self) -> u32 {
        self.config.height
    }
}

fn warn_on_z_order_collisions(layers: &[&mut ClientLayer]) {
    let mut seen = HashSet::new();
    for (index, layer) in layers.iter().enumerate() {
        let Some(z_order) = layer.z_order() else {
            continue;
        };
        if !seen.insert(z_order) {
            tracing::warn!(index, z_order, "z-order collision, stacking by list position");
        }
    }
}

fn duplicate_fence(fence: Option<&Fence>, count: usize) -> Result<Vec<Option<Fence>>, FenceError> {
    (0..count)
        .map(|_| fence.map(Fence::try_clone).transpose())
        .collect()
}

fn count_composition(frame: &[OverlayLayer], composition: Composition) -> usize {
    frame
        .iter()
        .filter(|layer| layer.actual_composition() == composition)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::layer::TileConstraint;
    use crate::test_support::{CompositorHandle, FakeImporter, Script, ScriptedCompositor, fence_pair};

    const OUTPUT: NativeHandle = NativeHandle(0x100);

    fn display(importer: FakeImporter) -> (VirtualDisplay, CompositorHandle) {
        let compositor = ScriptedCompositor::new();
        let handle = compositor.handle();
        let display = VirtualDisplay::with_config(
            DisplayConfig::virtual_output(1920, 1080),
            Box::new(importer),
            Box::new(compositor),
        );
        (display, handle)
    }

    fn client(handle: u64, frame: Rect) -> ClientLayer {
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

    fn present(
        d: &mut VirtualDisplay,
        layers: &mut [&mut ClientLayer],
        options: PresentOptions,
    ) -> Result<Option<Fence>, PresentError> {
        d.set_output_buffer(OUTPUT, None);
        d.present(layers, options)
    }

    #[test]
    fn crop_change_revalidates_only_that_layer() {
        let (mut d, _) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let mut b = client(2, Rect::new(100, 0, 200, 100));
        present(&mut d, &mut [&mut a, &mut b], PresentOptions::DEFAULT).unwrap();

        b.set_source_crop(kurbo::Rect::new(0.0, 0.0, 50.0, 50.0));
        let retire = present(&mut d, &mut [&mut a, &mut b], PresentOptions::DEFAULT).unwrap();

        assert!(retire.is_some());
        let layers = d.in_flight_layers();
        assert_eq!(layers.len(), 2);
        assert!(!layers[0].needs_revalidation());
        assert!(layers[1].needs_revalidation());
        assert!(layers[1].has_source_rect_changed());
    }

    #[test]
    fn identical_frames_are_stable() {
        let (mut d, _) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        present(&mut d, &mut [&mut a], PresentOptions::DEFAULT).unwrap();
        assert!(d.in_flight_layers()[0].needs_revalidation());

        present(&mut d, &mut [&mut a], PresentOptions::DEFAULT).unwrap();
        let layer = &d.in_flight_layers()[0];
        assert!(!layer.needs_revalidation());
        assert!(!layer.has_layer_content_changed());
        assert_eq!(layer.actual_composition(), Composition::DISPLAY);
    }

    #[test]
    fn import_failure_still_commits() {
        let (mut d, _) = display(FakeImporter::new().failing(NativeHandle(2)));
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let mut b = client(2, Rect::new(100, 0, 200, 100));
        let (fence, _producer) = fence_pair();
        b.set_acquire_fence(Some(fence));

        present(&mut d, &mut [&mut a, &mut b], PresentOptions::DEFAULT).unwrap();

        let layers = d.in_flight_layers();
        assert!(layers[0].can_scan_out());
        assert!(!layers[1].can_scan_out());
        assert!(layers[1].import_failed());
        assert_eq!(layers[1].actual_composition(), Composition::GPU);
        assert!(b.is_validated());
        assert!(b.take_acquire_fence().is_some());
    }

    #[test]
    fn commit_validates_clients_and_sets_release_fences() {
        let (mut d, _) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let mut b = client(2, Rect::new(100, 0, 200, 100));
        assert!(!a.is_validated());

        present(&mut d, &mut [&mut a, &mut b], PresentOptions::DEFAULT).unwrap();

        for c in [&mut a, &mut b] {
            assert!(c.is_validated());
            assert!(!c.has_content_changed());
            assert!(c.take_release_fence().is_some());
        }
        assert_eq!(d.in_flight_output().map(|b| b.handle()), Some(OUTPUT));
    }

    #[test]
    fn missing_output_buffer_changes_nothing() {
        let (mut d, compositor) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));

        let err = d.present(&mut [&mut a], PresentOptions::DEFAULT).unwrap_err();

        assert!(matches!(err, PresentError::MissingOutputBuffer));
        assert!(!a.is_validated());
        assert!(d.in_flight_layers().is_empty());
        assert_eq!(compositor.calls(), 0);
    }

    #[test]
    fn output_import_failure_keeps_pending_output() {
        let (mut d, compositor) = display(FakeImporter::new().failing(OUTPUT));
        let mut a = client(1, Rect::new(0, 0, 100, 100));

        let err = present(&mut d, &mut [&mut a], PresentOptions::DEFAULT).unwrap_err();
        assert!(matches!(err, PresentError::OutputImport(_)));
        assert_eq!(compositor.calls(), 0);

        let err = d.present(&mut [&mut a], PresentOptions::DEFAULT).unwrap_err();
        assert!(matches!(err, PresentError::OutputImport(_)));
    }

    #[test]
    fn rejection_keeps_previous_frame_and_hands_back_fences() {
        let (mut d, compositor) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        present(&mut d, &mut [&mut a], PresentOptions::DEFAULT).unwrap();
        let committed = Arc::clone(d.in_flight_layers()[0].buffer().unwrap());

        a.set_native_handle(NativeHandle(3));
        let (fence, _producer) = fence_pair();
        a.set_acquire_fence(Some(fence));
        let (output_fence, _output_producer) = fence_pair();
        d.set_output_buffer(OUTPUT, Some(output_fence));
        compositor.set_script(Script::Reject);

        let err = d.present(&mut [&mut a], PresentOptions::DEFAULT).unwrap_err();

        assert!(err.is_recoverable());
        assert!(!a.is_validated());
        assert!(a.take_release_fence().is_none());
        assert!(a.take_acquire_fence().is_some());
        assert!(Arc::ptr_eq(
            d.in_flight_layers()[0].buffer().unwrap(),
            &committed
        ));

        compositor.set_script(Script::Accept);
        d.present(&mut [&mut a], PresentOptions::DEFAULT.all_gpu())
            .unwrap();
        let layer = &d.in_flight_layers()[0];
        assert_eq!(layer.buffer().unwrap().handle(), NativeHandle(3));
        assert_eq!(layer.actual_composition(), Composition::GPU);
        assert!(a.is_validated());
    }

    #[test]
    fn rejected_frame_keeps_tiling_bands() {
        let (mut d, compositor) = display(FakeImporter::new());
        let (mut mirror, _) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 200, 100));
        a.push_constraint(TileConstraint::new(0, 100));
        a.push_constraint(TileConstraint::new(100, 200));
        let options = PresentOptions {
            displays: 2,
            ..PresentOptions::DEFAULT.with_constraints()
        };

        compositor.set_script(Script::Reject);
        assert!(present(&mut d, &mut [&mut a], options).is_err());
        compositor.set_script(Script::Accept);
        present(&mut d, &mut [&mut a], options.all_gpu()).unwrap();

        let crop = d.in_flight_layers()[0].source_crop();
        assert_eq!((crop.x0, crop.x1), (0.0, 100.0));
        assert!(!a.is_validated());

        present(&mut mirror, &mut [&mut a], options).unwrap();
        let layer = &mirror.in_flight_layers()[0];
        assert_eq!((layer.source_crop().x0, layer.source_crop().x1), (100.0, 200.0));
        assert_eq!(layer.display_frame(), Rect::new(0, 0, 100, 100));
        assert!(a.is_validated());
    }

    #[test]
    fn z_order_collision_stacks_by_position() {
        let (mut d, _) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let mut b = client(2, Rect::new(50, 50, 150, 150));
        a.set_z_order(5);
        b.set_z_order(5);

        present(&mut d, &mut [&mut a, &mut b], PresentOptions::DEFAULT).unwrap();

        let layers = d.in_flight_layers();
        assert_eq!(layers.len(), 2);
        assert_eq!((layers[0].z_order(), layers[1].z_order()), (0, 1));
        assert_eq!(layers[0].buffer().unwrap().handle(), NativeHandle(1));
        assert!(a.is_validated() && b.is_validated());
    }

    #[test]
    fn backend_failure_is_not_recoverable() {
        let (mut d, compositor) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        compositor.set_script(Script::Fail);

        let err = present(&mut d, &mut [&mut a], PresentOptions::DEFAULT).unwrap_err();

        assert!(matches!(err, PresentError::Compositor(_)));
        assert!(!err.is_recoverable());
        assert!(d.in_flight_layers().is_empty());
    }

    #[test]
    fn verdict_count_mismatch_aborts() {
        let (mut d, compositor) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        compositor.set_script(Script::WrongCount);

        let err = present(&mut d, &mut [&mut a], PresentOptions::DEFAULT).unwrap_err();

        assert!(matches!(
            err,
            PresentError::VerdictMismatch {
                expected: 1,
                actual: 0
            }
        ));
        assert!(!a.is_validated());
    }

    #[test]
    fn all_gpu_frames_do_not_churn() {
        let (mut d, _) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let options = PresentOptions::DEFAULT.all_gpu();
        present(&mut d, &mut [&mut a], options).unwrap();
        present(&mut d, &mut [&mut a], options).unwrap();

        let layer = &d.in_flight_layers()[0];
        assert_eq!(layer.supported_composition(), Composition::GPU);
        assert!(!layer.needs_revalidation());
    }

    #[test]
    fn removed_layers_release_their_buffers() {
        let importer = FakeImporter::new();
        let stats = importer.stats();
        let (mut d, _) = display(importer);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let mut b = client(2, Rect::new(100, 0, 200, 100));
        present(&mut d, &mut [&mut a, &mut b], PresentOptions::DEFAULT).unwrap();
        assert_eq!(stats.releases(), 0);

        present(&mut d, &mut [&mut a], PresentOptions::DEFAULT).unwrap();

        assert_eq!(d.in_flight_layers().len(), 1);
        assert_eq!(stats.releases(), 1);
        assert!(d.resources().find_cached(NativeHandle(2)).is_none());
        assert!(d.resources().find_cached(OUTPUT).is_some());
    }

    #[test]
    fn mirrored_clients_validate_after_every_display() {
        let (mut first, _) = display(FakeImporter::new());
        let (mut second, _) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let options = PresentOptions {
            displays: 2,
            ..PresentOptions::DEFAULT
        };

        present(&mut first, &mut [&mut a], options).unwrap();
        assert!(!a.is_validated());
        assert!(a.has_content_changed());

        present(&mut second, &mut [&mut a], options).unwrap();
        assert!(a.is_validated());
        assert!(second.in_flight_layers()[0].has_layer_content_changed());
    }

    #[test]
    fn replaced_output_buffer_is_the_one_used() {
        let (mut d, _) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        d.set_output_buffer(NativeHandle(0x200), None);
        d.set_output_buffer(OUTPUT, None);

        d.present(&mut [&mut a], PresentOptions::DEFAULT).unwrap();

        assert_eq!(d.in_flight_output().map(|b| b.handle()), Some(OUTPUT));
        assert!(d.resources().find_cached(NativeHandle(0x200)).is_none());
    }

    #[test]
    fn display_queries() {
        let (mut d, _) = display(FakeImporter::new());
        assert_eq!(d.display_type(), DisplayType::Virtual);
        assert_eq!(d.display_name(), "Virtual");
        assert_eq!(d.display_configs(), &[0]);
        assert_eq!(d.active_config(), 0);
        assert!(d.set_active_config(0).is_ok());
        assert!(matches!(
            d.set_active_config(1),
            Err(ConfigError::UnknownConfig(1))
        ));
        assert!(d.check_plane_format(0x3231_5258));

        d.init(640, 480);
        assert_eq!((d.width(), d.height()), (640, 480));
        assert_eq!(d.display_attribute(0, DisplayAttribute::Width).unwrap(), 640);
        assert_eq!(d.display_attribute(0, DisplayAttribute::Height).unwrap(), 480);
        assert_eq!(
            d.display_attribute(0, DisplayAttribute::RefreshRate).unwrap(),
            16_666_666
        );
        assert_eq!(d.display_attribute(0, DisplayAttribute::DpiX).unwrap(), 0);
        assert!(d.display_attribute(3, DisplayAttribute::Width).is_err());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn traced_present_reports_phases() {
        use crate::trace::{PhaseBeginEvent, TraceSink};

        #[derive(Default)]
        struct RecordingSink {
            phases: Vec<PhaseKind>,
            committed: Vec<FrameCommittedEvent>,
            failed: Vec<FrameFailedEvent>,
        }
        impl TraceSink for RecordingSink {
            fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
                self.phases.push(e.phase);
            }
            fn on_frame_committed(&mut self, e: &FrameCommittedEvent) {
                self.committed.push(*e);
            }
            fn on_frame_failed(&mut self, e: &FrameFailedEvent) {
                self.failed.push(*e);
            }
        }

        let (mut d, _) = display(FakeImporter::new());
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let mut sink = RecordingSink::default();

        d.set_output_buffer(OUTPUT, None);
        d.present_traced(&mut [&mut a], PresentOptions::DEFAULT, &mut Tracer::new(&mut sink))
            .unwrap();
        let _ = d.present_traced(
            &mut [&mut a],
            PresentOptions::DEFAULT,
            &mut Tracer::new(&mut sink),
        );

        assert_eq!(
            sink.phases,
            [
                PhaseKind::Build,
                PhaseKind::Compose,
                PhaseKind::Commit,
                PhaseKind::Build
            ]
        );
        assert_eq!(sink.committed.len(), 1);
        assert_eq!(sink.committed[0].display_layers, 1);
        assert!(sink.committed[0].has_retire_fence);
        assert_eq!(sink.failed.len(), 1);
        assert_eq!(sink.failed[0].during, PresentState::BuildingFrame);
        assert!(!sink.failed[0].recoverable);
    }
}

use tracing::{debug, info, warn};

use super::config::{CanvasStyle, ParticleSimConfig, RESIZE_DEBOUNCE_MS};
use super::simulation::{ParticleBatch, ParticleRng};
use crate::quality::{CapabilityProbe, QualityTier};
use crate::timers::Debouncer;

/// 2D drawing surface backing the field.
pub trait CanvasSurface {
    fn set_size(&mut self, width: f32, height: f32);
    fn size(&self) -> (f32, f32);
    fn clear(&mut self);
    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: &str, alpha: f32);
    /// Detach the canvas element from the document.
    fn remove(&mut self);
}

/// Creates the canvas the field draws on.
pub trait CanvasHost {
    type Surface: CanvasSurface;

    /// `None` when no 2D context is available.
    fn create_canvas(&mut self, style: &CanvasStyle) -> Option<Self::Surface>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// `requestAnimationFrame` / `cancelAnimationFrame`.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Drawn, next frame requested.
    Rendered,
    /// Page hidden: nothing drawn and nothing requested.
    Stalled,
    /// Torn down.
    Inactive,
}

/// Decorative drifting-particle backdrop.
pub struct ParticleField<S: CanvasSurface> {
    surface: S,
    config: ParticleSimConfig,
    batch: ParticleBatch,
    rng: ParticleRng,
    resize: Debouncer<(f32, f32)>,
    pending_frame: Option<FrameHandle>,
    active: bool,
    tier: QualityTier,
}

impl<S: CanvasSurface> ParticleField<S> {
    /// Returns `None` when reduced motion is requested or a narrow viewport
    /// runs on a low-power device.
    pub fn new<H>(probe: &dyn CapabilityProbe, host: &mut H, seed: u32) -> Option<Self>
    where
        H: CanvasHost<Surface = S>,
    {
        let tier = QualityTier::classify(probe);
        if !tier.is_enabled() {
            info!(?tier, "particle field disabled");
            return None;
        }

        let config = ParticleSimConfig {
            particle_count: tier.budget().particle_count,
            ..ParticleSimConfig::default()
        };
        let Some(mut surface) = host.create_canvas(&CanvasStyle::default()) else {
            warn!("canvas 2d context unavailable, particle field disabled");
            return None;
        };
        let (width, height) = probe.viewport();
        surface.set_size(width, height);

        let mut rng = ParticleRng::new(seed);
        let batch = ParticleBatch::seed(config, width, height, &mut rng);
        debug!(count = batch.len(), width, height, "particle field created");

        Some(Self {
            surface,
            config,
            batch,
            rng,
            resize: Debouncer::new(RESIZE_DEBOUNCE_MS),
            pending_frame: None,
            active: true,
            tier,
        })
    }

    /// Kick off the loop; call once after construction.
    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.active && self.pending_frame.is_none() {
            self.pending_frame = Some(scheduler.request_frame());
        }
    }

    /// One animation-frame callback.
    pub fn frame(
        &mut self,
        now_ms: u64,
        hidden: bool,
        scheduler: &mut dyn FrameScheduler,
    ) -> FrameOutcome {
        self.pending_frame = None;
        if !self.active {
            return FrameOutcome::Inactive;
        }
        if hidden {
            return FrameOutcome::Stalled;
        }

        if let Some((width, height)) = self.resize.poll(now_ms) {
            self.apply_resize(width, height);
        }

        self.surface.clear();
        self.batch.step();
        for p in &self.batch.particles {
            self.surface.fill_circle(
                p.position[0],
                p.position[1],
                p.size,
                p.color,
                self.config.draw_alpha,
            );
        }
        self.pending_frame = Some(scheduler.request_frame());
        FrameOutcome::Rendered
    }

    /// Debounced; the batch is rebuilt once the viewport settles.
    pub fn request_resize(&mut self, width: f32, height: f32, now_ms: u64) {
        self.resize.call(now_ms, (width, height));
    }

    /// Re-arms a loop that stalled while the page was hidden. Returns whether
    /// a frame was requested.
    pub fn on_visibility_change(&mut self, hidden: bool, scheduler: &mut dyn FrameScheduler) -> bool {
        if hidden || !self.active || self.pending_frame.is_some() {
            return false;
        }
        debug!("particle loop resumed");
        self.pending_frame = Some(scheduler.request_frame());
        true
    }

    pub fn teardown(&mut self, scheduler: &mut dyn FrameScheduler) {
        if !self.active {
            return;
        }
        if let Some(handle) = self.pending_frame.take() {
            scheduler.cancel_frame(handle);
        }
        self.surface.remove();
        self.batch.particles.clear();
        self.active = false;
        debug!("particle field torn down");
    }

    fn apply_resize(&mut self, width: f32, height: f32) {
        self.surface.set_size(width, height);
        self.batch = ParticleBatch::seed(self.config, width, height, &mut self.rng);
        debug!(width, height, "particle batch regenerated");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending_frame.is_some()
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn batch(&self) -> &ParticleBatch {
        &self.batch
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

/// Records draw calls instead of rasterising; headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub width: f32,
    pub height: f32,
    pub clears: usize,
    pub circles_last_frame: usize,
    pub circles_total: usize,
    pub removed: bool,
    pub css_text: String,
}

impl CanvasSurface for RecordingSurface {
    fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.circles_last_frame = 0;
    }

    fn fill_circle(&mut self, _x: f32, _y: f32, _radius: f32, _color: &str, _alpha: f32) {
        self.circles_last_frame += 1;
        self.circles_total += 1;
    }

    fn remove(&mut self) {
        self.removed = true;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingHost;

impl CanvasHost for RecordingHost {
    type Surface = RecordingSurface;

    fn create_canvas(&mut self, style: &CanvasStyle) -> Option<RecordingSurface> {
        Some(RecordingSurface {
            css_text: style.css_text(),
            ..RecordingSurface::default()
        })
    }
}

/// Hands out increasing handles and remembers which are still pending.
#[derive(Debug, Clone, Default)]
pub struct ManualFrames {
    next: u64,
    pub pending: Vec<FrameHandle>,
    pub cancelled: Vec<FrameHandle>,
}

impl ManualFrames {
    /// Take the oldest pending request, as the browser would run it.
    pub fn take_next(&mut self) -> Option<FrameHandle> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.retain(|h| *h != handle);
        self.cancelled.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CanvasSurface, FrameOutcome, ManualFrames, ParticleField, RecordingHost, RecordingSurface,
    };
    use crate::quality::StaticProbe;

    fn desktop_field(frames: &mut ManualFrames) -> ParticleField<RecordingSurface> {
        let mut field =
            ParticleField::new(&StaticProbe::default(), &mut RecordingHost, 3).unwrap();
        field.start(frames);
        field
    }

    #[test]
    fn reduced_motion_skips_construction() {
        let probe = StaticProbe {
            reduced_motion: true,
            ..StaticProbe::default()
        };
        assert!(ParticleField::new(&probe, &mut RecordingHost, 1).is_none());
    }

    #[test]
    fn canvas_is_full_viewport_and_transparent_to_pointer() {
        let mut frames = ManualFrames::default();
        let field = desktop_field(&mut frames);
        assert_eq!(field.surface().size(), (1280.0, 720.0));
        assert!(field.surface().css_text.contains("pointer-events: none"));
        assert!(field.surface().css_text.contains("opacity: 0.15"));
        assert_eq!(field.batch().len(), 30);
    }

    #[test]
    fn each_frame_clears_then_draws_every_particle() {
        let mut frames = ManualFrames::default();
        let mut field = desktop_field(&mut frames);
        for t in 0..3 {
            assert!(frames.take_next().is_some());
            assert_eq!(field.frame(t * 16, false, &mut frames), FrameOutcome::Rendered);
        }
        assert_eq!(field.surface().clears, 3);
        assert_eq!(field.surface().circles_last_frame, 30);
        assert_eq!(frames.pending.len(), 1);
    }

    #[test]
    fn hidden_page_stalls_until_visibility_returns() {
        let mut frames = ManualFrames::default();
        let mut field = desktop_field(&mut frames);
        frames.take_next();
        assert_eq!(field.frame(0, true, &mut frames), FrameOutcome::Stalled);
        assert!(frames.pending.is_empty());
        assert_eq!(field.surface().clears, 0);

        assert!(!field.on_visibility_change(true, &mut frames));
        assert!(field.on_visibility_change(false, &mut frames));
        assert_eq!(frames.pending.len(), 1);
        // Already armed: no second loop.
        assert!(!field.on_visibility_change(false, &mut frames));
    }

    #[test]
    fn resize_is_debounced_and_regenerates_batch() {
        let mut frames = ManualFrames::default();
        let mut field = desktop_field(&mut frames);
        field.request_resize(800.0, 600.0, 0);
        field.request_resize(1024.0, 500.0, 100);

        frames.take_next();
        field.frame(200, false, &mut frames);
        assert_eq!(field.surface().size(), (1280.0, 720.0));

        frames.take_next();
        field.frame(400, false, &mut frames);
        assert_eq!(field.surface().size(), (1024.0, 500.0));
        assert_eq!(field.batch().bounds(), (1024.0, 500.0));
        for p in &field.batch().particles {
            assert!(p.position[0] < 1024.0 && p.position[1] < 500.0);
        }
    }

    #[test]
    fn teardown_cancels_frame_and_removes_canvas() {
        let mut frames = ManualFrames::default();
        let mut field = desktop_field(&mut frames);
        let pending = frames.pending[0];
        field.teardown(&mut frames);

        assert_eq!(frames.cancelled, vec![pending]);
        assert!(frames.pending.is_empty());
        assert!(field.surface().removed);
        assert!(!field.is_active());
        assert_eq!(field.frame(0, false, &mut frames), FrameOutcome::Inactive);
    }
}

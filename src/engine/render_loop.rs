use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::display::device::FrameRGBA;
use crate::display::dispatch::{LayerDispatcher, LayerStrategy};
use crate::effect::Effect;
use crate::effect::registry::Registry;
use crate::engine::context::EngineContext;
use crate::engine::control::EngineControl;
use crate::foundation::error::GefxResult;
use crate::perf::{PerfMonitor, PerfSnapshot};

/// Which effect, if any, the loop is driving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// No active effect: the registry is empty or the last init failed. Frames still run but
    /// nothing is drawn.
    Idle,
    /// The effect at `index` is running.
    Active {
        /// Registry index.
        index: usize,
    },
}

/// Render loop counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Frames run (presented and paced).
    pub frames: u64,
    /// Frames in which an effect was drawn.
    pub drawn: u64,
    /// Switch requests honoured.
    pub switches: u64,
    /// Effect inits that failed.
    pub init_failures: u64,
    /// Effect draws that returned an error.
    pub draw_failures: u64,
}

struct ActiveEffect {
    index: usize,
    name: &'static str,
    strategy: LayerStrategy,
    effect: Box<dyn Effect>,
    // Live allocations before init; teardown must return to this.
    baseline: usize,
}

/// The single render loop: owns the context, the active effect and the layer dispatcher.
///
/// Each [`Engine::run_frame`]:
/// 1. honours at most one pending switch request (deinit, colour reset, init),
/// 2. programs the layers for the active strategy,
/// 3. lets the active effect draw into the back page,
/// 4. draws the diagnostic overlay,
/// 5. presents the back page, waits for vsync, flips and yields.
pub struct Engine {
    ctx: EngineContext,
    registry: Registry,
    control: EngineControl,
    dispatcher: LayerDispatcher,
    perf: PerfMonitor,
    active: Option<ActiveEffect>,
    stats: EngineStats,
    osd: bool,
    yield_for: Duration,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("stats", &self.stats)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build the loop and activate `config.start_effect`.
    ///
    /// An out-of-range start index falls back to the first effect. A failing init leaves the
    /// engine idle rather than failing construction.
    pub fn new(ctx: EngineContext, registry: Registry, config: &EngineConfig) -> Self {
        let mut start = config.start_effect;
        if start >= registry.count() && !registry.is_empty() {
            tracing::warn!(
                start,
                count = registry.count(),
                "start effect out of range, using 0"
            );
            start = 0;
        }
        let control = EngineControl::new(registry.names(), start);
        let mut engine = Self {
            ctx,
            registry,
            control,
            dispatcher: LayerDispatcher::new(),
            perf: PerfMonitor::new(),
            active: None,
            stats: EngineStats::default(),
            osd: config.osd,
            yield_for: Duration::from_millis(config.pacing.yield_ms),
        };
        if engine.registry.is_empty() {
            tracing::warn!("no effects registered, engine idle");
        } else {
            engine.activate(start);
        }
        engine
    }

    /// Open the software devices described by `config` and build the loop.
    pub fn open_soft(config: &EngineConfig, registry: Registry) -> GefxResult<Self> {
        let ctx = EngineContext::open_soft(config)?;
        Ok(Self::new(ctx, registry, config))
    }

    /// Handle for next/prev/jump/stop from any thread.
    pub fn control(&self) -> EngineControl {
        self.control.clone()
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        match &self.active {
            Some(a) => EngineState::Active { index: a.index },
            None => EngineState::Idle,
        }
    }

    /// Name of the active effect.
    pub fn active_name(&self) -> Option<&'static str> {
        self.active.as_ref().map(|a| a.name)
    }

    /// Counters.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Latest perf measurements.
    pub fn perf(&self) -> PerfSnapshot {
        self.perf.snapshot()
    }

    /// Effect registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Engine context.
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Mutable engine context.
    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    /// Read back what the display currently shows.
    pub fn capture(&self) -> GefxResult<FrameRGBA> {
        self.ctx.capture()
    }

    fn strategy(&self) -> LayerStrategy {
        self.active
            .as_ref()
            .map(|a| a.strategy)
            .unwrap_or_default()
    }

    fn check_leaks(&self, name: &'static str, baseline: usize) {
        let live = self.ctx.mem().live_buffers();
        if live > baseline {
            tracing::warn!(
                effect = name,
                leaked = live - baseline,
                "effect teardown left device buffers allocated"
            );
        }
    }

    fn activate(&mut self, index: usize) {
        let Some(desc) = self.registry.get(index).copied() else {
            tracing::warn!(index, "no effect at index, engine idle");
            return;
        };
        let baseline = self.ctx.mem().live_buffers();
        let mut effect = desc.instantiate();
        match effect.init(&mut self.ctx) {
            Ok(()) => {
                tracing::info!(index, effect = desc.name, strategy = ?desc.strategy, "effect active");
                self.active = Some(ActiveEffect {
                    index,
                    name: desc.name,
                    strategy: desc.strategy,
                    effect,
                    baseline,
                });
            }
            Err(err) => {
                self.stats.init_failures = self.stats.init_failures.saturating_add(1);
                tracing::warn!(index, effect = desc.name, error = %err, "effect init failed, engine idle");
                // Wait for anything the partial init emitted, then release what it acquired.
                self.settle(desc.name);
                effect.deinit(&mut self.ctx);
                self.settle(desc.name);
                self.check_leaks(desc.name, baseline);
            }
        }
    }

    fn deactivate(&mut self) {
        if let Some(mut active) = self.active.take() {
            self.settle(active.name);
            active.effect.deinit(&mut self.ctx);
            self.settle(active.name);
            self.check_leaks(active.name, active.baseline);
            tracing::info!(index = active.index, effect = active.name, "effect stopped");
        }
    }

    // Drain compositing work an effect left queued so no buffer stays busy across phases.
    fn settle(&mut self, name: &'static str) {
        if self.ctx.ge().is_idle() {
            return;
        }
        tracing::warn!(effect = name, "effect left compositing work outstanding");
        if let Err(err) = self.ctx.emit() {
            tracing::warn!(error = %err, "emit of outstanding work failed");
        }
        self.ctx.sync();
    }

    #[tracing::instrument(level = "info", skip(self), fields(from = ?self.state()))]
    fn switch_to(&mut self, index: usize) {
        self.deactivate();
        if let Err(err) = self.ctx.reset_color_state() {
            tracing::warn!(error = %err, "colour state reset failed");
        }
        self.dispatcher.invalidate();
        self.activate(index);
        self.stats.switches = self.stats.switches.saturating_add(1);
    }

    /// Run one frame. Device errors (layer programming, vsync) are returned; effect errors are
    /// logged and counted.
    pub fn run_frame(&mut self) -> GefxResult<()> {
        let started = Instant::now();
        if let Some(index) = self.control.take_request() {
            self.switch_to(index);
        }

        let strategy = self.strategy();
        self.dispatcher.prepare(&mut self.ctx, strategy)?;

        let target = self.ctx.back_page()?;
        if let Some(active) = self.active.as_mut() {
            match active.effect.draw(&mut self.ctx, target) {
                Ok(()) => self.stats.drawn = self.stats.drawn.saturating_add(1),
                Err(err) => {
                    self.stats.draw_failures = self.stats.draw_failures.saturating_add(1);
                    tracing::warn!(effect = active.name, error = %err, "effect draw failed");
                }
            }
            let name = active.name;
            self.settle(name);
        }

        self.perf.update(self.ctx.mem().stats(), started.elapsed());
        if self.osd
            && let Err(err) = self.perf.draw_osd(&mut self.ctx, strategy)
        {
            tracing::warn!(error = %err, "diagnostic overlay failed");
        }

        self.dispatcher.present(&mut self.ctx, target)?;
        self.ctx.fb_mut().wait_for_vsync()?;
        self.ctx.flip();
        self.stats.frames = self.stats.frames.saturating_add(1);

        if !self.yield_for.is_zero() {
            std::thread::sleep(self.yield_for);
        }
        Ok(())
    }

    /// Run frames until `limit` frames have run (if given) or a stop is requested. Returns the
    /// number of frames run by this call.
    pub fn run(&mut self, limit: Option<u64>) -> GefxResult<u64> {
        let mut n = 0u64;
        while !self.control.stop_requested() && limit.is_none_or(|l| n < l) {
            self.run_frame()?;
            n += 1;
        }
        tracing::debug!(frames = n, "render loop returned");
        Ok(n)
    }

    /// Tear down the active effect and reset the colour pipeline. Safe to call repeatedly; also
    /// runs on drop.
    pub fn shutdown(&mut self) {
        if self.active.is_none() {
            return;
        }
        self.deactivate();
        if let Err(err) = self.ctx.reset_color_state() {
            tracing::warn!(error = %err, "colour state reset failed");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

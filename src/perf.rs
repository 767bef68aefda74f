//! Frame-rate, CPU-load and memory monitor with a font-free diagnostic overlay.

use std::time::{Duration, Instant};

use crate::display::dispatch::LayerStrategy;
use crate::engine::context::EngineContext;
use crate::foundation::core::Rect;
use crate::foundation::error::GefxResult;
use crate::foundation::pixel::PixelCanvas;
use crate::memory::pool::MemoryStats;

const WINDOW: Duration = Duration::from_secs(1);
const FPS_FULL_SCALE: f32 = 60.0;

/// Latest measurements.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerfSnapshot {
    /// Frames per second over the last complete window.
    pub fps: f32,
    /// Share of the last window the render thread spent working rather than waiting for
    /// vsync, in `0.0..=1.0`.
    pub cpu: f32,
    /// Frames counted since creation.
    pub frames: u64,
    /// Device memory counters at the last window boundary.
    pub mem: MemoryStats,
}

/// Counts frames and samples memory roughly once per second.
#[derive(Debug)]
pub struct PerfMonitor {
    window_start: Instant,
    window_frames: u32,
    window_busy: Duration,
    snapshot: PerfSnapshot,
}

impl PerfMonitor {
    /// Start measuring now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Start measuring at `now`.
    pub fn starting_at(now: Instant) -> Self {
        Self {
            window_start: now,
            window_frames: 0,
            window_busy: Duration::ZERO,
            snapshot: PerfSnapshot::default(),
        }
    }

    /// Latest measurements.
    pub fn snapshot(&self) -> PerfSnapshot {
        self.snapshot
    }

    /// Count one frame that kept the render thread busy for `busy`.
    pub fn update(&mut self, mem: MemoryStats, busy: Duration) {
        self.update_at(Instant::now(), mem, busy);
    }

    /// Count one frame at `now`.
    pub fn update_at(&mut self, now: Instant, mem: MemoryStats, busy: Duration) {
        self.snapshot.frames = self.snapshot.frames.saturating_add(1);
        self.window_frames = self.window_frames.saturating_add(1);
        self.window_busy = self.window_busy.saturating_add(busy);
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= WINDOW {
            let secs = elapsed.as_secs_f32();
            self.snapshot.fps = self.window_frames as f32 / secs;
            self.snapshot.cpu = (self.window_busy.as_secs_f32() / secs).clamp(0.0, 1.0);
            self.snapshot.mem = mem;
            self.window_frames = 0;
            self.window_busy = Duration::ZERO;
            self.window_start = now;
            tracing::debug!(
                fps = self.snapshot.fps,
                cpu = self.snapshot.cpu,
                bytes_in_use = mem.bytes_in_use,
                "perf window"
            );
        }
    }

    /// Draw the overlay for the given path.
    ///
    /// Isolated: the scratch buffer is redrawn on a colour-key background. Traditional: the
    /// meters are drawn onto the back page, whose rows are invalidated first because the
    /// compositing engine wrote them.
    pub fn draw_osd(&self, ctx: &mut EngineContext, strategy: LayerStrategy) -> GefxResult<()> {
        let rect = ctx.overlay().rect();
        match strategy {
            LayerStrategy::Isolated => {
                let key = ctx.overlay().color_key();
                let mut canvas = ctx.overlay_canvas()?;
                canvas.clear_raw(key);
                let area = Rect::full(canvas.width(), canvas.height());
                draw_meters(&mut canvas, area, &self.snapshot, Some(key));
                ctx.flush_overlay()
            }
            LayerStrategy::Traditional => {
                let rows = rect.y..rect.y + rect.height;
                ctx.invalidate_back_rows(rows.clone())?;
                let mut canvas = ctx.back_canvas()?;
                canvas.fill_rect(rect, PANEL);
                draw_meters(&mut canvas, rect, &self.snapshot, None);
                ctx.flush_back_rows(rows)
            }
        }
    }
}

const PANEL: u32 = 0xFF10_1018;
const FPS_BAR: u32 = 0xFF20_E040;
const CPU_BAR: u32 = 0xFF40_80F0;
const MEM_BAR: u32 = 0xFFF0_A020;
const TRACK: u32 = 0xFF30_3038;
const BIT_ON: u32 = 0xFFF0_F0F0;
const BIT_OFF: u32 = 0xFF50_5058;

fn keyed_safe(canvas: &PixelCanvas<'_>, color: u32, key: Option<u32>) -> u32 {
    let mut px = [0u8; 4];
    canvas.format().encode(color, &mut px);
    match key {
        Some(k) if canvas.format().raw(&px) == k => color ^ 0x0008_0808,
        _ => color,
    }
}

fn bar(canvas: &mut PixelCanvas<'_>, track: Rect, fill: f32, color: u32, key: Option<u32>) {
    let bg = keyed_safe(canvas, TRACK, key);
    canvas.fill_rect(track, bg);
    let w = (track.width as f32 * fill.clamp(0.0, 1.0)).round() as u32;
    if w > 0 {
        let filled = Rect::new(track.x, track.y, w, track.height);
        let fg = keyed_safe(canvas, color, key);
        canvas.fill_rect(filled, fg);
    }
}

/// FPS, CPU and memory bars and a 16-bit frame counter laid out top to bottom inside `area`.
pub(crate) fn draw_meters(
    canvas: &mut PixelCanvas<'_>,
    area: Rect,
    snap: &PerfSnapshot,
    key: Option<u32>,
) {
    let inner = area.inset(4);
    let row_h = (inner.height / 4).max(1);
    let gap = (row_h / 4).min(4);
    let bar_h = row_h.saturating_sub(gap).max(1);

    let fps = snap.fps / FPS_FULL_SCALE;
    bar(
        canvas,
        Rect::new(inner.x, inner.y, inner.width, bar_h),
        fps,
        FPS_BAR,
        key,
    );

    bar(
        canvas,
        Rect::new(inner.x, inner.y + row_h, inner.width, bar_h),
        snap.cpu,
        CPU_BAR,
        key,
    );

    let mem = if snap.mem.capacity_bytes == 0 {
        0.0
    } else {
        snap.mem.bytes_in_use as f32 / snap.mem.capacity_bytes as f32
    };
    bar(
        canvas,
        Rect::new(inner.x, inner.y + 2 * row_h, inner.width, bar_h),
        mem,
        MEM_BAR,
        key,
    );

    let cell = (inner.width / 16).max(1);
    let y = inner.y + 3 * row_h;
    for bit in 0..16u32 {
        let on = (snap.frames >> (15 - bit)) & 1 == 1;
        let color = keyed_safe(canvas, if on { BIT_ON } else { BIT_OFF }, key);
        let r = Rect::new(inner.x + bit * cell, y, cell.saturating_sub(1).max(1), bar_h);
        canvas.fill_rect(r, color);
    }
}

impl Default for PerfMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/unit/perf.rs"]
mod tests;

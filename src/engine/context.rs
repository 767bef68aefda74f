use std::ops::Range;

use crate::config::EngineConfig;
use crate::display::device::{
    CcmConfig, ColorState, DisplayKind, DisplayProps, FrameBufferDevice, FrameRGBA, GammaConfig,
    LayerConfig, LayerId, create_display,
};
use crate::foundation::core::{PixelFormat, Rect, ScreenInfo};
use crate::foundation::error::{GefxError, GefxResult};
use crate::foundation::pixel::PixelCanvas;
use crate::ge::engine::{GeKind, GraphicsEngine, SyncReport, create_engine, run_ops};
use crate::ge::op::{CompositingOp, Surface};
use crate::memory::buffer::DeviceBuffer;
use crate::memory::pool::DeviceMemory;

/// Scratch buffer shown by the overlay layer on the isolated path.
#[derive(Debug)]
pub struct Overlay {
    pub(crate) buffer: DeviceBuffer,
    pub(crate) rect: Rect,
    pub(crate) color_key: u32,
    pub(crate) alpha: u8,
}

impl Overlay {
    /// On-screen placement.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Stored value shown as transparent.
    pub fn color_key(&self) -> u32 {
        self.color_key
    }

    /// Global layer alpha.
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    /// Image surface of the scratch buffer.
    pub fn surface(&self) -> GefxResult<Surface> {
        self.buffer.surface()
    }
}

/// Everything an effect and the render loop touch: device handles, the memory arena, screen
/// geometry, the two scan-out pages and the overlay scratch buffer.
pub struct EngineContext {
    fb: Box<dyn FrameBufferDevice>,
    ge: Box<dyn GraphicsEngine>,
    mem: DeviceMemory,
    screen: ScreenInfo,
    pages: [DeviceBuffer; 2],
    back: usize,
    overlay: Overlay,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("fb", &self.fb.name())
            .field("ge", &self.ge.name())
            .field("screen", &self.screen)
            .field("mem", &self.mem)
            .field("back", &self.back)
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    /// Bring up the context on the given devices.
    ///
    /// Allocates both pages and the overlay scratch buffer and resets the colour pipeline. Any
    /// failure here is fatal to the caller.
    #[tracing::instrument(level = "info", skip_all, fields(fb = fb.name(), ge = ge.name()))]
    pub fn open(
        config: &EngineConfig,
        mut fb: Box<dyn FrameBufferDevice>,
        ge: Box<dyn GraphicsEngine>,
    ) -> GefxResult<Self> {
        config.validate()?;
        let screen = fb.screen_info();
        screen.validate()?;
        let ov = config.overlay;
        if !ov.rect().fits_within(screen.width, screen.height) {
            return Err(GefxError::device(format!(
                "overlay {:?} does not fit the {}x{} device screen",
                ov.rect(),
                screen.width,
                screen.height
            )));
        }

        let mut mem = DeviceMemory::new(config.memory)?;
        let page0 = mem.alloc_image(screen.width, screen.height, screen.format)?;
        let page1 = mem.alloc_image(screen.width, screen.height, screen.format)?;
        let scratch = mem.alloc_image(ov.width, ov.height, screen.format)?;

        mem.canvas(&scratch)?.clear_raw(ov.color_key);
        mem.flush_all(&scratch)?;

        for id in LayerId::ALL {
            fb.update_layer_config(&LayerConfig::disabled(id))?;
        }

        let mut ctx = Self {
            fb,
            ge,
            mem,
            screen,
            pages: [page0, page1],
            back: 1,
            overlay: Overlay {
                buffer: scratch,
                rect: ov.rect(),
                color_key: ov.color_key,
                alpha: ov.alpha,
            },
        };
        ctx.reset_color_state()?;
        tracing::info!(
            width = screen.width,
            height = screen.height,
            format = ?screen.format,
            "display opened"
        );
        Ok(ctx)
    }

    /// Open the software display and engine described by `config`.
    pub fn open_soft(config: &EngineConfig) -> GefxResult<Self> {
        let fb = create_display(
            DisplayKind::Soft,
            config.screen.info(),
            config.pacing.vsync_hz,
        )?;
        let ge = create_engine(GeKind::Soft)?;
        Self::open(config, fb, ge)
    }

    /// Screen geometry.
    pub fn screen(&self) -> ScreenInfo {
        self.screen
    }

    /// Display device.
    pub fn fb(&self) -> &dyn FrameBufferDevice {
        self.fb.as_ref()
    }

    /// Mutable display device.
    pub fn fb_mut(&mut self) -> &mut dyn FrameBufferDevice {
        self.fb.as_mut()
    }

    /// Compositing engine.
    pub fn ge(&self) -> &dyn GraphicsEngine {
        self.ge.as_ref()
    }

    /// Device memory arena.
    pub fn mem(&self) -> &DeviceMemory {
        &self.mem
    }

    /// Mutable device memory arena.
    pub fn mem_mut(&mut self) -> &mut DeviceMemory {
        &mut self.mem
    }

    /// Overlay scratch buffer.
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Allocate raw device memory.
    pub fn alloc(&mut self, size: usize) -> GefxResult<DeviceBuffer> {
        self.mem.alloc(size)
    }

    /// Allocate an image.
    pub fn alloc_image(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> GefxResult<DeviceBuffer> {
        self.mem.alloc_image(width, height, format)
    }

    /// Free the buffer in `slot`; a second call is a no-op.
    pub fn release(&mut self, slot: &mut Option<DeviceBuffer>) {
        self.mem.release(slot);
    }

    /// CPU canvas over an image buffer.
    pub fn canvas(&mut self, buf: &DeviceBuffer) -> GefxResult<PixelCanvas<'_>> {
        self.mem.canvas(buf)
    }

    /// Make CPU writes to the whole buffer visible to the hardware.
    pub fn flush(&mut self, buf: &DeviceBuffer) -> GefxResult<()> {
        self.mem.flush_all(buf)
    }

    /// Make hardware writes to the whole buffer visible to the CPU.
    pub fn invalidate(&mut self, buf: &DeviceBuffer) -> GefxResult<()> {
        self.mem.invalidate_all(buf)
    }

    /// Queue one compositing op.
    pub fn submit(&mut self, op: impl Into<CompositingOp>) -> GefxResult<()> {
        self.ge.submit(op.into())
    }

    /// Hand queued ops to the hardware.
    pub fn emit(&mut self) -> GefxResult<usize> {
        self.ge.emit(&mut self.mem)
    }

    /// Wait for emitted ops. Failures are logged and counted, not propagated.
    pub fn sync(&mut self) -> SyncReport {
        let report = self.ge.sync(&mut self.mem);
        log_failures(&report);
        report
    }

    /// Submit, emit and wait for a batch. Returns the number of ops that completed.
    pub fn run_ops(
        &mut self,
        ops: impl IntoIterator<Item = CompositingOp>,
    ) -> GefxResult<usize> {
        let report = run_ops(self.ge.as_mut(), &mut self.mem, ops)?;
        log_failures(&report);
        Ok(report.executed)
    }

    /// Put CCM, gamma and display properties back to pass-through.
    pub fn reset_color_state(&mut self) -> GefxResult<()> {
        self.fb.set_ccm(&CcmConfig::neutral())?;
        self.fb.set_gamma(&GammaConfig::neutral())?;
        self.fb.set_display_props(DisplayProps::NEUTRAL)?;
        tracing::debug!("colour state reset");
        Ok(())
    }

    /// Current colour pipeline state.
    pub fn color_state(&self) -> ColorState {
        self.fb.color_state()
    }

    /// Page the next frame is drawn into.
    pub fn back_page(&self) -> GefxResult<Surface> {
        self.pages[self.back].surface()
    }

    /// Page currently on screen.
    pub fn front_page(&self) -> GefxResult<Surface> {
        self.pages[1 - self.back].surface()
    }

    pub(crate) fn back_buffer(&self) -> &DeviceBuffer {
        &self.pages[self.back]
    }

    pub(crate) fn back_canvas(&mut self) -> GefxResult<PixelCanvas<'_>> {
        self.mem.canvas(&self.pages[self.back])
    }

    fn back_rows(&self, rows: Range<u32>) -> Range<usize> {
        let stride = self.pages[self.back].stride() as usize;
        let end = rows.end.min(self.screen.height);
        rows.start.min(end) as usize * stride..end as usize * stride
    }

    /// Reload `rows` of the back page from what the hardware wrote.
    pub(crate) fn invalidate_back_rows(&mut self, rows: Range<u32>) -> GefxResult<()> {
        let bytes = self.back_rows(rows);
        self.mem.invalidate(&self.pages[self.back], bytes)
    }

    /// Write `rows` of the back page back to the device.
    pub(crate) fn flush_back_rows(&mut self, rows: Range<u32>) -> GefxResult<()> {
        let bytes = self.back_rows(rows);
        self.mem.flush(&self.pages[self.back], bytes)
    }

    pub(crate) fn overlay_canvas(&mut self) -> GefxResult<PixelCanvas<'_>> {
        self.mem.canvas(&self.overlay.buffer)
    }

    pub(crate) fn flush_overlay(&mut self) -> GefxResult<()> {
        self.mem.flush_all(&self.overlay.buffer)
    }

    pub(crate) fn flip(&mut self) {
        self.back = 1 - self.back;
    }

    /// Replace a layer's configuration on the display.
    pub fn set_layer(&mut self, config: &LayerConfig) -> GefxResult<()> {
        tracing::debug!(
            layer = ?config.id,
            enabled = config.enabled,
            rect = ?config.rect,
            "layer configured"
        );
        self.fb.update_layer_config(config)
    }

    /// Read back the current scanout.
    pub fn capture(&self) -> GefxResult<FrameRGBA> {
        self.fb.capture(&self.mem)
    }

    /// Allocations beyond the pages and the overlay.
    pub fn effect_buffers(&self) -> usize {
        self.mem.live_buffers().saturating_sub(3)
    }
}

fn log_failures(report: &SyncReport) {
    for f in &report.failures {
        tracing::warn!(index = f.index, kind = f.kind, error = %f.error, "compositing op failed");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/context.rs"]
mod tests;

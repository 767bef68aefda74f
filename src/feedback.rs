//! Two-buffer feedback accumulation for effects with temporal memory.

use crate::engine::context::EngineContext;
use crate::foundation::core::PixelFormat;
use crate::foundation::error::{GefxError, GefxResult};
use crate::foundation::pixel::PixelCanvas;
use crate::ge::op::{BlendRule, BlitOp, CompositingOp, FillOp, Flip, RotateOp, Surface};
use crate::memory::buffer::DeviceBuffer;

/// How last frame's image is carried into the next one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeedbackTransform {
    /// Straight copy.
    Identity,
    /// Scale up by cropping `inset` pixels from every source edge, optionally mirrored.
    Zoom {
        /// Pixels cropped from each edge of the source.
        inset: u32,
        /// Mirroring applied on the way.
        flip: Flip,
    },
    /// Rotate about the centre; uncovered pixels keep the base colour.
    Rotate {
        /// Clockwise angle in degrees.
        angle_deg: f64,
    },
}

/// One feedback step: clear the write buffer to `base`, then blend the transformed read buffer
/// over it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedbackStep {
    /// Transform applied to the read buffer.
    pub transform: FeedbackTransform,
    /// Blend used when drawing the transformed image.
    pub blend: BlendRule,
    /// Clear colour for the write buffer.
    pub base: u32,
}

impl FeedbackStep {
    /// Fading trail: `alpha` of last frame survives.
    pub fn decay(transform: FeedbackTransform, alpha: u8) -> Self {
        Self {
            transform,
            blend: BlendRule::SourceOver { alpha },
            base: 0xFF00_0000,
        }
    }

    /// Additive carry-over.
    pub fn accumulate(transform: FeedbackTransform) -> Self {
        Self {
            transform,
            blend: BlendRule::Accumulate,
            base: 0xFF00_0000,
        }
    }

    fn ops(&self, src: Surface, dst: Surface) -> [CompositingOp; 2] {
        let clear = CompositingOp::from(FillOp::clear(dst, self.base));
        let carry = match self.transform {
            FeedbackTransform::Identity => BlitOp::copy(src, dst).with_blend(self.blend).into(),
            FeedbackTransform::Zoom { inset, flip } => BlitOp::copy(src, dst)
                .with_src_rect(src.rect().inset(inset))
                .with_flip(flip)
                .with_blend(self.blend)
                .into(),
            FeedbackTransform::Rotate { angle_deg } => {
                RotateOp::about_centers(src, dst, angle_deg)
                    .with_blend(self.blend)
                    .into()
            }
        };
        [clear, carry]
    }
}

/// A pair of same-sized images; one is read while the other is written.
///
/// Frame order: [`PingPong::begin_frame`], [`PingPong::inject`] (any number),
/// [`PingPong::present`], [`PingPong::end_frame`]. The active index flips only in `end_frame`,
/// and only when the compositing engine is idle.
#[derive(Debug)]
pub struct PingPong {
    bufs: [Option<DeviceBuffer>; 2],
    active: usize,
    frames: u64,
}

impl PingPong {
    /// Allocate both buffers. Either both are allocated or neither is.
    pub fn alloc(
        ctx: &mut EngineContext,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> GefxResult<Self> {
        let first = ctx.alloc_image(width, height, format)?;
        let second = match ctx.alloc_image(width, height, format) {
            Ok(buf) => buf,
            Err(err) => {
                ctx.release(&mut Some(first));
                return Err(err);
            }
        };
        Ok(Self {
            bufs: [Some(first), Some(second)],
            active: 0,
            frames: 0,
        })
    }

    /// Buffers sized like the screen.
    pub fn alloc_screen(ctx: &mut EngineContext) -> GefxResult<Self> {
        let s = ctx.screen();
        Self::alloc(ctx, s.width, s.height, s.format)
    }

    /// Index of the buffer read this frame.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Completed frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn buffer(&self, index: usize) -> GefxResult<&DeviceBuffer> {
        self.bufs[index]
            .as_ref()
            .ok_or_else(|| GefxError::invalid_buffer("feedback buffers were released"))
    }

    /// Surface read this frame.
    pub fn src(&self) -> GefxResult<Surface> {
        self.buffer(self.active)?.surface()
    }

    /// Surface written this frame.
    pub fn dst(&self) -> GefxResult<Surface> {
        self.buffer(1 - self.active)?.surface()
    }

    /// Derive the write buffer from the read buffer. Blocks until the engine is done.
    pub fn begin_frame(&mut self, ctx: &mut EngineContext, step: FeedbackStep) -> GefxResult<()> {
        let ops = step.ops(self.src()?, self.dst()?);
        ctx.run_ops(ops)?;
        Ok(())
    }

    /// Draw new content into the write buffer with the CPU and flush it.
    pub fn inject<F>(&mut self, ctx: &mut EngineContext, draw: F) -> GefxResult<()>
    where
        F: FnOnce(&mut PixelCanvas<'_>),
    {
        let dst = self.buffer(1 - self.active)?;
        // The engine wrote this buffer; reload before the read-modify-write.
        ctx.invalidate(dst)?;
        draw(&mut ctx.canvas(dst)?);
        ctx.flush(dst)
    }

    /// Composite the write buffer onto `target` (scaled to fit). Blocks until done.
    pub fn present(
        &self,
        ctx: &mut EngineContext,
        target: Surface,
        blend: BlendRule,
    ) -> GefxResult<usize> {
        let op = BlitOp::copy(self.dst()?, target).with_blend(blend);
        ctx.run_ops([CompositingOp::from(op)])
    }

    /// Swap read and write buffers.
    ///
    /// Refused while the engine still has queued or in-flight work, since the next frame would
    /// read memory the hardware may still be writing.
    pub fn end_frame(&mut self, ctx: &EngineContext) -> GefxResult<()> {
        if !ctx.ge().is_idle() {
            return Err(GefxError::busy(
                "feedback swap with compositing work outstanding",
            ));
        }
        self.active = 1 - self.active;
        self.frames = self.frames.saturating_add(1);
        Ok(())
    }

    /// Free both buffers. Calling it again is a no-op.
    pub fn release(&mut self, ctx: &mut EngineContext) {
        for slot in &mut self.bufs {
            ctx.release(slot);
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/feedback.rs"]
mod tests;

//! Built-in effects and the static table the registry is built from.
//!
//! Effects render small RGB565 textures on the CPU and let the compositing engine scale, rotate
//! and blend them onto the back page.

use crate::effect::EffectDescriptor;
use crate::engine::context::EngineContext;
use crate::foundation::core::PixelFormat;
use crate::foundation::error::{GefxError, GefxResult};
use crate::foundation::math::{SinLut, rgb565};
use crate::ge::op::Surface;
use crate::memory::buffer::DeviceBuffer;

mod chromosphere;
mod chronos;
mod echo;
mod plasma;
mod radiance;
mod spectral;
mod void;
mod xor_shards;

/// Every built-in effect in registry order.
pub static BUILTIN: [EffectDescriptor; 8] = [
    EffectDescriptor::new("NO.2 PLASMA INTERFERENCE", plasma::create),
    EffectDescriptor::new("NO.16 FEEDBACK TUNNEL", echo::create),
    EffectDescriptor::new("NO.28 XOR LOGIC SHARDS", xor_shards::create),
    EffectDescriptor::new("NO.29 QUANTUM CHROMOSPHERE", chromosphere::create),
    EffectDescriptor::new("NO.30 GAMMA RADIANCE", radiance::create),
    EffectDescriptor::new("NO.33 RIEMANN SPECTRAL FOLD", spectral::create),
    EffectDescriptor::new("NO.37 RECURSIVE VOID", void::create),
    EffectDescriptor::new("NO.51 CHRONOS STABILIZER", chronos::create).isolated(),
];

/// Nominal texture size (QVGA), clamped to the screen.
const TEX_W: u32 = 320;
const TEX_H: u32 = 240;

/// Frame counters wrap here; a multiple of every table period, so animation stays seamless.
const TICK_MASK: i32 = 0xFFFF;

fn texture_size(ctx: &EngineContext) -> (u32, u32) {
    let s = ctx.screen();
    (TEX_W.min(s.width), TEX_H.min(s.height))
}

/// CPU-painted RGB565 texture living in device memory.
#[derive(Debug, Default)]
struct Texture {
    buf: Option<DeviceBuffer>,
    width: u32,
    height: u32,
}

impl Texture {
    fn alloc(ctx: &mut EngineContext, width: u32, height: u32) -> GefxResult<Self> {
        let buf = ctx.alloc_image(width, height, PixelFormat::Rgb565)?;
        Ok(Self {
            buf: Some(buf),
            width,
            height,
        })
    }

    fn alloc_default(ctx: &mut EngineContext) -> GefxResult<Self> {
        let (w, h) = texture_size(ctx);
        Self::alloc(ctx, w, h)
    }

    fn buffer(&self) -> GefxResult<&DeviceBuffer> {
        self.buf
            .as_ref()
            .ok_or_else(|| GefxError::invalid_buffer("texture was released"))
    }

    fn surface(&self) -> GefxResult<Surface> {
        self.buffer()?.surface()
    }

    /// Run `paint(pixels, width, height)` over the CPU view, then flush it.
    fn paint<F>(&self, ctx: &mut EngineContext, paint: F) -> GefxResult<()>
    where
        F: FnOnce(&mut [u16], u32, u32),
    {
        let buf = self.buffer()?;
        let n = self.width as usize * self.height as usize;
        let px = ctx.mem_mut().cpu_u16_mut(buf)?;
        paint(&mut px[..n], self.width, self.height);
        ctx.flush(buf)
    }

    fn release(&mut self, ctx: &mut EngineContext) {
        ctx.release(&mut self.buf);
    }
}

/// 256-entry RGB565 palette built from three phase-shifted sine waves.
fn sine_palette(lut: &SinLut, phase: [i32; 3], bias: [i32; 3], swing: [i32; 3]) -> Vec<u16> {
    (0..256)
        .map(|i| {
            let ch = |c: usize| {
                let s = lut.sin(i * 2 + phase[c]);
                (bias[c] + ((s * swing[c]) >> 12)).clamp(0, 255) as u8
            };
            rgb565(ch(0), ch(1), ch(2))
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/effects.rs"]
mod tests;

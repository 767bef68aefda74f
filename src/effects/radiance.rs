use crate::display::device::{CcmConfig, DisplayProps, GammaConfig};
use crate::effect::Effect;
use crate::effects::{TICK_MASK, Texture, sine_palette};
use crate::engine::context::EngineContext;
use crate::foundation::error::GefxResult;
use crate::foundation::math::SinLut;
use crate::ge::op::{BlitOp, CompositingOp, Surface};

const GAMMA_PULSE_SPEED: i32 = 2;

/// A static nebula texture whose look is driven entirely by the display engine: the gamma curve
/// breathes between concave and convex, the hue drifts and a warm colour matrix fades in and out.
#[derive(Debug, Default)]
struct GammaRadiance {
    tex: Texture,
    lut: SinLut,
    tick: i32,
}

pub(super) fn create() -> Box<dyn Effect> {
    Box::new(GammaRadiance::default())
}

fn breathing_curve(pulse: i32) -> [u8; 16] {
    std::array::from_fn(|i| {
        let i = i as i32;
        let offset = (pulse * i * (15 - i)) >> 6;
        (i * 17 + offset).clamp(0, 255) as u8
    })
}

fn warm_matrix(strength: i32) -> [i32; 12] {
    let s = strength.clamp(0, 0x40);
    [
        0x100 + s, 0, 0, 0, //
        0, 0x100, 0, 0, //
        0, 0, 0x100 - s, 0,
    ]
}

impl Effect for GammaRadiance {
    fn init(&mut self, ctx: &mut EngineContext) -> GefxResult<()> {
        self.tex = Texture::alloc_default(ctx)?;
        let palette = sine_palette(&self.lut, [0, 100, 300], [90, 60, 150], [90, 60, 105]);
        let lut = &self.lut;
        self.tex.paint(ctx, |px, w, h| {
            let (cx, cy) = (w as i32 / 2, h as i32 / 2);
            for (i, p) in px.iter_mut().enumerate() {
                let (x, y) = ((i as u32 % w) as i32 - cx, (i as u32 / w) as i32 - cy);
                let arms = lut.sin(x * 3 + (y >> 1)) + lut.cos(y * 2 - (x >> 2));
                let d = ((x * x + y * y) >> 8) + (arms >> 9);
                *p = palette[(d & 0xFF) as usize];
            }
        })?;
        self.tick = 0;
        Ok(())
    }

    fn draw(&mut self, ctx: &mut EngineContext, target: Surface) -> GefxResult<()> {
        let t = self.tick;
        ctx.run_ops([CompositingOp::from(BlitOp::copy(self.tex.surface()?, target))])?;

        let pulse = self.lut.sin(t << GAMMA_PULSE_SPEED) >> 5;
        let curve = breathing_curve(pulse);
        let fb = ctx.fb_mut();
        fb.set_gamma(&GammaConfig {
            enabled: true,
            lut: [curve; 3],
        })?;
        fb.set_display_props(DisplayProps {
            hue: (50 + (self.lut.sin(t) * 20 >> 12)) as u8,
            ..DisplayProps::NEUTRAL
        })?;
        fb.set_ccm(&CcmConfig::enabled(warm_matrix(
            (self.lut.sin(t * 2) + 4096) >> 7,
        )))?;

        self.tick = (self.tick + 1) & TICK_MASK;
        Ok(())
    }

    fn deinit(&mut self, ctx: &mut EngineContext) {
        if let Err(err) = ctx.fb_mut().set_gamma(&GammaConfig::neutral()) {
            tracing::warn!(error = %err, "gamma reset failed");
        }
        self.tex.release(ctx);
    }
}

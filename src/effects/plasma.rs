use crate::effect::Effect;
use crate::effects::{TICK_MASK, Texture, sine_palette};
use crate::engine::context::EngineContext;
use crate::foundation::error::GefxResult;
use crate::foundation::math::SinLut;
use crate::ge::op::{BlitOp, CompositingOp, Surface};

/// Four interfering sine fields looked up through a slowly cycling palette, scaled to the
/// screen with one blit.
#[derive(Debug, Default)]
struct Plasma {
    tex: Texture,
    lut: SinLut,
    palette: Vec<u16>,
    tick: i32,
}

pub(super) fn create() -> Box<dyn Effect> {
    Box::new(Plasma::default())
}

impl Effect for Plasma {
    fn init(&mut self, ctx: &mut EngineContext) -> GefxResult<()> {
        self.tex = Texture::alloc_default(ctx)?;
        self.palette = sine_palette(&self.lut, [0, 170, 340], [128, 128, 128], [127, 127, 127]);
        self.tick = 0;
        Ok(())
    }

    fn draw(&mut self, ctx: &mut EngineContext, target: Surface) -> GefxResult<()> {
        let t = self.tick;
        let (lut, palette) = (&self.lut, &self.palette);
        self.tex.paint(ctx, |px, w, h| {
            for y in 0..h as i32 {
                let row = lut.sin(y * 2 + t) + lut.sin(y + t * 3);
                for x in 0..w as i32 {
                    let v = row + lut.sin(x * 3 - t * 2) + lut.sin((x + y) + t);
                    // Four Q12 terms span roughly -16384..16384.
                    let idx = ((v >> 7) + t) & 0xFF;
                    px[y as usize * w as usize + x as usize] = palette[idx as usize];
                }
            }
        })?;

        let blit = BlitOp::copy(self.tex.surface()?, target);
        ctx.run_ops([CompositingOp::from(blit)])?;
        self.tick = (self.tick + 1) & TICK_MASK;
        Ok(())
    }

    fn deinit(&mut self, ctx: &mut EngineContext) {
        self.tex.release(ctx);
    }
}

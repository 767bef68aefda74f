use crate::effect::Effect;
use crate::effects::{TICK_MASK, Texture, sine_palette};
use crate::engine::context::EngineContext;
use crate::foundation::error::GefxResult;
use crate::foundation::math::{SinLut, rgb565};
use crate::ge::op::{BlendRule, BlitOp, CompositingOp, Surface};

/// Stored RGB565 value treated as transparent in the foreground.
const KEY: u16 = 0x0000;
const BAND: i32 = 12;

/// A turbulent corona behind drifting shells; the gaps between shells are keyed out by the
/// compositing engine, so no alpha channel is stored.
#[derive(Debug, Default)]
struct Chromosphere {
    corona: Texture,
    shells: Texture,
    lut: SinLut,
    palette: Vec<u16>,
    tick: i32,
}

pub(super) fn create() -> Box<dyn Effect> {
    Box::new(Chromosphere::default())
}

impl Effect for Chromosphere {
    fn init(&mut self, ctx: &mut EngineContext) -> GefxResult<()> {
        self.corona = Texture::alloc_default(ctx)?;
        self.shells = Texture::alloc_default(ctx)?;
        self.palette = sine_palette(&self.lut, [0, 60, 200], [200, 90, 40], [55, 80, 40]);
        self.tick = 0;
        Ok(())
    }

    fn draw(&mut self, ctx: &mut EngineContext, target: Surface) -> GefxResult<()> {
        let t = self.tick;
        let (lut, palette) = (&self.lut, &self.palette);

        self.corona.paint(ctx, |px, w, h| {
            let (cx, cy) = (w as i32 / 2, h as i32 / 2);
            for (i, p) in px.iter_mut().enumerate() {
                let (x, y) = ((i as u32 % w) as i32 - cx, (i as u32 / w) as i32 - cy);
                let swirl = lut.sin(x * 2 + t) + lut.cos(y * 3 - t * 2);
                let idx = ((x.abs() + y.abs()) + (swirl >> 8) + t) & 0xFF;
                *p = palette[idx as usize];
            }
        })?;

        self.shells.paint(ctx, |px, w, h| {
            let (cx, cy) = (w as i32 / 2, h as i32 / 2);
            for (i, p) in px.iter_mut().enumerate() {
                let (x, y) = ((i as u32 % w) as i32 - cx, (i as u32 / w) as i32 - cy);
                let wobble = lut.sin((x ^ y) + t * 4) >> 10;
                let r = ((x * x + y * y) >> 5) + wobble - t;
                *p = if r.rem_euclid(BAND * 2) < BAND {
                    let shade = (r.rem_euclid(BAND) * 255 / BAND) as u8;
                    rgb565(255, shade, 64)
                } else {
                    KEY
                };
            }
        })?;

        let key = BlendRule::ColorKey {
            key: u32::from(KEY),
        };
        ctx.run_ops([
            CompositingOp::from(BlitOp::copy(self.corona.surface()?, target)),
            BlitOp::copy(self.shells.surface()?, target)
                .with_blend(key)
                .into(),
        ])?;

        self.tick = (self.tick + 1) & TICK_MASK;
        Ok(())
    }

    fn deinit(&mut self, ctx: &mut EngineContext) {
        self.shells.release(ctx);
        self.corona.release(ctx);
    }
}

use crate::effect::Effect;
use crate::effects::{TICK_MASK, Texture, sine_palette};
use crate::engine::context::EngineContext;
use crate::foundation::core::Rect;
use crate::foundation::error::GefxResult;
use crate::foundation::math::SinLut;
use crate::ge::op::{BlendRule, BlitOp, CompositingOp, FillOp, RotateOp, Surface};

const CORE: u32 = 96;
const KEY: u16 = 0x0000;

/// A slow lattice backdrop with a rotating gravitational anchor scaled over its centre.
///
/// Runs on the isolated path so the diagnostic overlay's layer settings never touch the image.
/// The anchor is rotated into an intermediate that is cleared every frame, then scaled onto the
/// page with the cleared colour keyed out.
#[derive(Debug, Default)]
pub(super) struct ChronosStabilizer {
    lattice: Texture,
    anchor: Texture,
    pub(super) rot: Texture,
    lut: SinLut,
    palette: Vec<u16>,
    pub(super) tick: i32,
}

pub(super) fn create() -> Box<dyn Effect> {
    Box::new(ChronosStabilizer::default())
}

impl Effect for ChronosStabilizer {
    fn init(&mut self, ctx: &mut EngineContext) -> GefxResult<()> {
        self.lattice = Texture::alloc_default(ctx)?;
        let side = CORE.min(ctx.screen().width).min(ctx.screen().height);
        self.anchor = Texture::alloc(ctx, side, side)?;
        self.rot = Texture::alloc(ctx, side, side)?;
        self.palette = sine_palette(&self.lut, [40, 140, 0], [30, 110, 150], [30, 100, 105]);

        let palette = &self.palette;
        self.anchor.paint(ctx, |px, w, _h| {
            let c = w as i32 / 2;
            for (i, p) in px.iter_mut().enumerate() {
                let (x, y) = ((i as u32 % w) as i32 - c, (i as u32 / w) as i32 - c);
                let (ax, ay) = (x.abs(), y.abs());
                // A four-armed star; everything else is keyed out.
                let on = ax.min(ay) < 3 + (c - ax.max(ay)) / 6 && ax.max(ay) < c;
                *p = if on {
                    palette[(((ax + ay) * 4) & 0xFF) as usize] | 0x0821
                } else {
                    KEY
                };
            }
        })?;
        self.tick = 0;
        Ok(())
    }

    fn draw(&mut self, ctx: &mut EngineContext, target: Surface) -> GefxResult<()> {
        let t = self.tick;
        let (lut, palette) = (&self.lut, &self.palette);
        self.lattice.paint(ctx, |px, w, _h| {
            let shift = lut.sin(t) >> 9;
            for (i, p) in px.iter_mut().enumerate() {
                let (x, y) = ((i as u32 % w) as i32, (i as u32 / w) as i32);
                let grid = ((x + shift) & 15 == 0) || ((y - shift) & 15 == 0);
                let v = if grid { 200 } else { (x ^ y) & 0x3F };
                *p = palette[((v + t) & 0xFF) as usize];
            }
        })?;

        let anchor = self.anchor.surface()?;
        let rot = self.rot.surface()?;
        let angle = f64::from(t % 360);
        ctx.run_ops([
            CompositingOp::from(BlitOp::copy(self.lattice.surface()?, target)),
            FillOp::clear(rot, 0xFF00_0000).into(),
            RotateOp::about_centers(anchor, rot, angle).into(),
        ])?;

        let pulse = (lut.sin(t * 3) * 16) >> 12;
        let size = (target.width.min(target.height) / 2).saturating_add_signed(pulse).max(1);
        let dst = Rect::new(
            (target.width.saturating_sub(size)) / 2,
            (target.height.saturating_sub(size)) / 2,
            size.min(target.width),
            size.min(target.height),
        );
        ctx.run_ops([CompositingOp::from(
            BlitOp::copy(rot, target)
                .with_dst_rect(dst)
                .with_blend(BlendRule::ColorKey {
                    key: u32::from(KEY),
                }),
        )])?;

        self.tick = (self.tick + 1) & TICK_MASK;
        Ok(())
    }

    fn deinit(&mut self, ctx: &mut EngineContext) {
        self.rot.release(ctx);
        self.anchor.release(ctx);
        self.lattice.release(ctx);
    }
}

use crate::effect::Effect;
use crate::effects::{TICK_MASK, Texture, sine_palette};
use crate::engine::context::EngineContext;
use crate::foundation::error::GefxResult;
use crate::foundation::math::{SinLut, rgb565};
use crate::ge::op::{BlendRule, BlitOp, CompositingOp, FillOp, RotateOp, Surface};

const ROT_SPEED: i32 = 5;
const LOGIC_SHIFT_T: i32 = 2;
const LOGIC_SHIFT_XY: i32 = 2;

/// A bit-pattern backdrop with a rotating interference mask XOR-ed over it.
///
/// Pipeline per frame: clear the page, scale the backdrop onto it, clear the rotation
/// intermediate, rotate the mask into it, then scale an over-cropped window of the intermediate
/// onto the page with [`BlendRule::Xor`].
#[derive(Debug, Default)]
pub(super) struct XorShards {
    base: Texture,
    mask: Texture,
    pub(super) rot: Texture,
    palette: Vec<u16>,
    pub(super) tick: i32,
}

pub(super) fn create() -> Box<dyn Effect> {
    Box::new(XorShards::default())
}

impl Effect for XorShards {
    fn init(&mut self, ctx: &mut EngineContext) -> GefxResult<()> {
        self.base = Texture::alloc_default(ctx)?;
        self.mask = Texture::alloc_default(ctx)?;
        self.rot = Texture::alloc_default(ctx)?;

        let lut = SinLut::new();
        let mut palette = sine_palette(&lut, [0, 80, 160], [20, 40, 180], [30, 40, 75]);
        for (i, c) in palette.iter_mut().enumerate() {
            if i & 0x1C == 0x1C {
                *c = rgb565(100, 150, 255);
            }
        }
        self.palette = palette;
        self.tick = 0;
        Ok(())
    }

    fn draw(&mut self, ctx: &mut EngineContext, target: Surface) -> GefxResult<()> {
        let t = self.tick;
        let palette = &self.palette;
        self.base.paint(ctx, |px, w, _h| {
            for (i, p) in px.iter_mut().enumerate() {
                let (x, y) = ((i as u32 % w) as i32, (i as u32 / w) as i32);
                let y_logic = y ^ (t >> LOGIC_SHIFT_T);
                let v = (x >> LOGIC_SHIFT_XY) ^ (y_logic >> LOGIC_SHIFT_XY);
                *p = palette[(v & 0xFF) as usize];
            }
        })?;
        self.mask.paint(ctx, |px, w, h| {
            let (cx, cy) = (w as i32 / 2, h as i32 / 2);
            for (i, p) in px.iter_mut().enumerate() {
                let (x, y) = ((i as u32 % w) as i32, (i as u32 / w) as i32);
                let (dx, dy) = (x - cx, y - cy);
                let dist = (dx * dx + dy * dy) >> 7;
                let v = dist ^ (x >> 1);
                *p = palette[((v + t) & 0xFF) as usize];
            }
        })?;

        let base = self.base.surface()?;
        let mask = self.mask.surface()?;
        let rot = self.rot.surface()?;
        let window = rot.rect().inset(rot.width.min(rot.height) / 6);
        let angle = f64::from((t * ROT_SPEED) % 360);

        // The rotation leaves uncovered corners untouched, so the intermediate is cleared first
        // or last frame's geometry bleeds through.
        ctx.run_ops([
            CompositingOp::from(FillOp::clear(target, 0xFF00_0000)),
            BlitOp::copy(base, target).into(),
            FillOp::clear(rot, 0xFF00_0000).into(),
            RotateOp::about_centers(mask, rot, angle).into(),
        ])?;
        // Reads the rotation result, so it runs only after that batch has synced.
        ctx.run_ops([CompositingOp::from(
            BlitOp::copy(rot, target)
                .with_src_rect(window)
                .with_blend(BlendRule::Xor),
        )])?;

        self.tick = (self.tick + 1) & TICK_MASK;
        Ok(())
    }

    fn deinit(&mut self, ctx: &mut EngineContext) {
        self.rot.release(ctx);
        self.mask.release(ctx);
        self.base.release(ctx);
    }
}

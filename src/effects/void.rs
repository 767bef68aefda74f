use crate::effect::Effect;
use crate::effects::{TICK_MASK, texture_size};
use crate::engine::context::EngineContext;
use crate::feedback::{FeedbackStep, FeedbackTransform, PingPong};
use crate::foundation::core::PixelFormat;
use crate::foundation::error::{GefxError, GefxResult};
use crate::foundation::math::{SinLut, argb, hue_rgb};
use crate::ge::op::{BlendRule, Surface};

const TWIST_DEG: f64 = 4.0;
const DECAY_ALPHA: u8 = 220;

/// Droste-style recursion: last frame is rotated a few degrees and faded, and a fresh ring is
/// drawn at the rim, so every ring spirals inward into the void.
#[derive(Debug, Default)]
struct RecursiveVoid {
    pp: Option<PingPong>,
    lut: SinLut,
    tick: i32,
}

pub(super) fn create() -> Box<dyn Effect> {
    Box::new(RecursiveVoid::default())
}

impl Effect for RecursiveVoid {
    fn init(&mut self, ctx: &mut EngineContext) -> GefxResult<()> {
        let (w, h) = texture_size(ctx);
        self.pp = Some(PingPong::alloc(ctx, w, h, PixelFormat::Rgb565)?);
        self.tick = 0;
        Ok(())
    }

    fn draw(&mut self, ctx: &mut EngineContext, target: Surface) -> GefxResult<()> {
        let pp = self
            .pp
            .as_mut()
            .ok_or_else(|| GefxError::invalid_buffer("recursive void not initialised"))?;
        let t = self.tick;

        // Twist direction reverses slowly with the sine table.
        let twist = TWIST_DEG * f64::from(self.lut.sin(t)) / 4096.0;
        pp.begin_frame(
            ctx,
            FeedbackStep::decay(FeedbackTransform::Rotate { angle_deg: twist }, DECAY_ALPHA),
        )?;

        let lut = &self.lut;
        pp.inject(ctx, |canvas| {
            let (cx, cy) = (canvas.width() as i32 / 2, canvas.height() as i32 / 2);
            let rim = (cx.min(cy) * 7 / 8).max(1);
            let (r, g, b) = hue_rgb((t & 0xFF) as u8);
            let color = argb(0xFF, r, g, b);
            for k in 0..64 {
                let phase = k * 8 + t;
                let x = cx + ((lut.cos(phase) * rim) >> 12);
                let y = cy + ((lut.sin(phase) * rim) >> 12);
                canvas.put(x.max(0) as u32, y.max(0) as u32, color);
            }
            // Keep the centre dark so the spiral has somewhere to fall.
            for y in cy - 2..cy + 2 {
                for x in cx - 2..cx + 2 {
                    canvas.put(x.max(0) as u32, y.max(0) as u32, 0xFF00_0000);
                }
            }
        })?;

        pp.present(ctx, target, BlendRule::Overwrite)?;
        pp.end_frame(ctx)?;
        self.tick = (self.tick + 1) & TICK_MASK;
        Ok(())
    }

    fn deinit(&mut self, ctx: &mut EngineContext) {
        if let Some(pp) = self.pp.as_mut() {
            pp.release(ctx);
        }
    }
}

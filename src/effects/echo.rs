use crate::effect::Effect;
use crate::effects::{TICK_MASK, texture_size};
use crate::engine::context::EngineContext;
use crate::feedback::{FeedbackStep, FeedbackTransform, PingPong};
use crate::foundation::core::{PixelFormat, Rect};
use crate::foundation::error::{GefxError, GefxResult};
use crate::foundation::math::{SinLut, argb, hue_rgb};
use crate::ge::op::{BlendRule, Flip, Surface};

const DECAY_ALPHA: u8 = 232;
const ZOOM_INSET: u32 = 3;
const EMITTERS: i32 = 6;

/// Zooming feedback tunnel: last frame is enlarged and faded, then a ring of orbiting emitters
/// is injected on top.
#[derive(Debug, Default)]
struct FeedbackTunnel {
    pp: Option<PingPong>,
    lut: SinLut,
    tick: i32,
}

pub(super) fn create() -> Box<dyn Effect> {
    Box::new(FeedbackTunnel::default())
}

impl Effect for FeedbackTunnel {
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
            .ok_or_else(|| GefxError::invalid_buffer("feedback tunnel not initialised"))?;
        let t = self.tick;
        let flip = if (t >> 8) & 1 == 1 {
            Flip::HORIZONTAL
        } else {
            Flip::empty()
        };
        let step = FeedbackStep::decay(
            FeedbackTransform::Zoom {
                inset: ZOOM_INSET,
                flip,
            },
            DECAY_ALPHA,
        );
        pp.begin_frame(ctx, step)?;

        let lut = &self.lut;
        pp.inject(ctx, |canvas| {
            let (cx, cy) = (canvas.width() as i32 / 2, canvas.height() as i32 / 2);
            let radius = (canvas.height() as i32 / 4).max(1);
            for i in 0..EMITTERS {
                let phase = t * 3 + i * (512 / EMITTERS);
                let x = cx + ((lut.cos(phase) * radius) >> 12);
                let y = cy + ((lut.sin(phase) * radius) >> 12);
                let (r, g, b) = hue_rgb(((t + i * 40) & 0xFF) as u8);
                canvas.fill_rect(
                    Rect::new(x.max(0) as u32, y.max(0) as u32, 3, 3),
                    argb(0xFF, r, g, b),
                );
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

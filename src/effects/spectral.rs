use crate::effect::Effect;
use crate::effects::{TICK_MASK, texture_size};
use crate::engine::context::EngineContext;
use crate::feedback::{FeedbackStep, FeedbackTransform, PingPong};
use crate::foundation::core::{PixelFormat, Rect};
use crate::foundation::error::{GefxError, GefxResult};
use crate::foundation::math::{SinLut, argb, hue_rgb};
use crate::ge::op::{BlendRule, CompositingOp, FillOp, Flip, Surface};

/// Frames of additive build-up before the fold collapses back to black.
const CYCLE: i32 = 96;
const SPARKS: i32 = 24;
const BACKDROP: u32 = 0xFF08_0418;

/// Mirrored additive feedback: each frame the previous image is folded (mirrored and slightly
/// zoomed) and added onto itself while a spectrum of sparks is injected. The energy builds up
/// over a cycle, then the buffer is wiped and the fold starts again.
#[derive(Debug, Default)]
struct SpectralFold {
    pp: Option<PingPong>,
    lut: SinLut,
    tick: i32,
}

pub(super) fn create() -> Box<dyn Effect> {
    Box::new(SpectralFold::default())
}

impl Effect for SpectralFold {
    fn init(&mut self, ctx: &mut EngineContext) -> GefxResult<()> {
        let (w, h) = texture_size(ctx);
        self.pp = Some(PingPong::alloc(ctx, w / 2, h / 2, PixelFormat::Rgb565)?);
        self.tick = 0;
        Ok(())
    }

    fn draw(&mut self, ctx: &mut EngineContext, target: Surface) -> GefxResult<()> {
        let pp = self
            .pp
            .as_mut()
            .ok_or_else(|| GefxError::invalid_buffer("spectral fold not initialised"))?;
        let t = self.tick;

        let mut step = FeedbackStep::accumulate(FeedbackTransform::Zoom {
            inset: 1,
            flip: if t & 1 == 0 {
                Flip::HORIZONTAL
            } else {
                Flip::VERTICAL
            },
        });
        if t % CYCLE == 0 {
            // Wipe: derive nothing from the saturated buffer.
            step.blend = BlendRule::SourceOver { alpha: 0 };
        }
        pp.begin_frame(ctx, step)?;

        let lut = &self.lut;
        pp.inject(ctx, |canvas| {
            let (w, h) = (canvas.width() as i32, canvas.height() as i32);
            for i in 0..SPARKS {
                let phase = t * 7 + i * 37;
                let x = (w / 2) + ((lut.sin(phase) * (w / 3)) >> 12);
                let y = (h / 2) + ((lut.cos(phase * 2 + i) * (h / 3)) >> 12);
                let (r, g, b) = hue_rgb((i * (256 / SPARKS)) as u8);
                // Dim sparks; the accumulation does the brightening.
                canvas.fill_rect(
                    Rect::new(x.max(0) as u32, y.max(0) as u32, 2, 2),
                    argb(0xFF, r >> 3, g >> 3, b >> 3),
                );
            }
        })?;

        ctx.run_ops([CompositingOp::from(FillOp::clear(target, BACKDROP))])?;
        pp.present(ctx, target, BlendRule::Accumulate)?;
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


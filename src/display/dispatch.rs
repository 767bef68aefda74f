use crate::display::device::{LayerAlpha, LayerConfig, LayerId};
use crate::engine::context::EngineContext;
use crate::foundation::error::GefxResult;
use crate::ge::op::Surface;

/// How the composited image reaches the screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayerStrategy {
    /// Video layer shows the image full screen; the ui layer carries only the colour-keyed
    /// diagnostic overlay.
    Isolated,
    /// Ui layer shows the image full screen; the video layer is off.
    #[default]
    Traditional,
}

/// Applies a [`LayerStrategy`] to the two hardware layers.
///
/// Layer geometry, alpha and colour key are rewritten for both layers whenever the strategy
/// changes or after [`LayerDispatcher::invalidate`]; each frame only the image pointer moves.
#[derive(Debug, Default)]
pub struct LayerDispatcher {
    applied: Option<LayerStrategy>,
}

impl LayerDispatcher {
    /// Dispatcher with nothing applied yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategy currently programmed into the layers.
    pub fn applied(&self) -> Option<LayerStrategy> {
        self.applied
    }

    /// Force a full reconfiguration on the next `prepare`.
    pub fn invalidate(&mut self) {
        self.applied = None;
    }

    /// Program both layers for `strategy` unless already applied.
    pub fn prepare(&mut self, ctx: &mut EngineContext, strategy: LayerStrategy) -> GefxResult<()> {
        if self.applied == Some(strategy) {
            return Ok(());
        }
        // Leave `applied` unset on failure so the next frame retries.
        self.applied = None;
        let (video, ui) = layer_pair(ctx, strategy, ctx.front_page()?)?;
        ctx.set_layer(&video)?;
        ctx.set_layer(&ui)?;
        tracing::debug!(?strategy, "layer strategy applied");
        self.applied = Some(strategy);
        Ok(())
    }

    /// Point the strategy's main layer at `page`. Takes effect at the next vsync.
    pub fn present(&self, ctx: &mut EngineContext, page: Surface) -> GefxResult<()> {
        let id = match self.applied.unwrap_or_default() {
            LayerStrategy::Isolated => LayerId::Video,
            LayerStrategy::Traditional => LayerId::Ui,
        };
        let mut cfg = ctx.fb().layer_config(id);
        cfg.surface = Some(page);
        ctx.set_layer(&cfg)
    }
}

/// Full configuration of both layers for `strategy` with `page` as the image.
pub(crate) fn layer_pair(
    ctx: &EngineContext,
    strategy: LayerStrategy,
    page: Surface,
) -> GefxResult<(LayerConfig, LayerConfig)> {
    let full = ctx.screen().rect();
    Ok(match strategy {
        LayerStrategy::Isolated => {
            let ov = ctx.overlay();
            (
                LayerConfig {
                    id: LayerId::Video,
                    enabled: true,
                    rect: full,
                    surface: Some(page),
                    alpha: LayerAlpha::Global(255),
                    color_key: None,
                },
                LayerConfig {
                    id: LayerId::Ui,
                    enabled: true,
                    rect: ov.rect(),
                    surface: Some(ov.surface()?),
                    alpha: LayerAlpha::Global(ov.alpha()),
                    color_key: Some(ov.color_key()),
                },
            )
        }
        LayerStrategy::Traditional => (
            LayerConfig::disabled(LayerId::Video),
            LayerConfig {
                id: LayerId::Ui,
                enabled: true,
                rect: full,
                surface: Some(page),
                alpha: LayerAlpha::Global(255),
                color_key: None,
            },
        ),
    })
}

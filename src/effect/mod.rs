//! Effect plugin contract and the static registry of built-in effects.

use crate::display::dispatch::LayerStrategy;
use crate::engine::context::EngineContext;
use crate::foundation::error::GefxResult;
use crate::ge::op::Surface;

pub(crate) mod registry;

/// One visual effect with an explicit resource lifecycle.
///
/// The engine calls `init` once on activation, `draw` once per frame while active and `deinit`
/// once on deactivation. `deinit` is also called after a failed `init`, so it must tolerate
/// partially acquired resources and must be safe to call more than once.
pub trait Effect {
    /// Acquire device buffers and program hardware state.
    fn init(&mut self, ctx: &mut EngineContext) -> GefxResult<()>;

    /// Render one frame into `target` (the back page).
    fn draw(&mut self, ctx: &mut EngineContext, target: Surface) -> GefxResult<()>;

    /// Release everything `init` acquired.
    fn deinit(&mut self, ctx: &mut EngineContext);
}

/// Builds a fresh effect instance.
pub type EffectFactory = fn() -> Box<dyn Effect>;

/// Immutable registry record of one effect.
#[derive(Clone, Copy)]
pub struct EffectDescriptor {
    /// Display name.
    pub name: &'static str,
    /// Which layer path the dispatcher uses while the effect is active.
    pub strategy: LayerStrategy,
    factory: EffectFactory,
}

impl std::fmt::Debug for EffectDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectDescriptor")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl EffectDescriptor {
    /// Descriptor for an effect composited on the traditional path.
    pub const fn new(name: &'static str, factory: EffectFactory) -> Self {
        Self {
            name,
            strategy: LayerStrategy::Traditional,
            factory,
        }
    }

    /// Same descriptor on the isolated path.
    pub const fn isolated(mut self) -> Self {
        self.strategy = LayerStrategy::Isolated;
        self
    }

    /// Build a fresh instance.
    pub fn instantiate(&self) -> Box<dyn Effect> {
        (self.factory)()
    }
}

//! gefx is an effect-lifecycle engine for small embedded displays with a fixed-function
//! compositing engine.
//!
//! It runs one visual effect at a time against two hardware collaborators: a frame-buffer device
//! with two scan-out layers and a colour pipeline, and a compositing engine that fills, blits
//! and rotates between buffers of physically contiguous memory.
//!
//! # Frame overview
//!
//! 1. **Switch**: at most one pending request from [`EngineControl`] is honoured. The old effect
//!    is torn down, the colour pipeline is reset to neutral and the new effect is initialised.
//! 2. **Dispatch**: [`LayerDispatcher`] programs both layers for the effect's [`LayerStrategy`].
//! 3. **Draw**: the effect writes textures on the CPU, flushes them and composites them into the
//!    back page through [`GraphicsEngine`] (`submit`, `emit`, `sync`).
//! 4. **Present**: the diagnostic overlay is drawn, the back page is shown at the next vsync and
//!    the pages flip.
//!
//! The key constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Explicit cache discipline**: [`DeviceMemory`] keeps separate CPU and device views, so a
//!   missing `flush` or `invalidate` shows up as stale pixels.
//! - **All-or-nothing teardown**: `deinit` runs after every init, failed or not, and releasing
//!   a buffer twice is a no-op.
//!
//! The software devices ([`SoftDisplay`], [`SoftEngine`]) execute the same contract in host
//! memory and can capture the composed scan-out as RGBA.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod display;
mod effect;
mod effects;
mod engine;
mod feedback;
mod foundation;
mod ge;
mod memory;
mod perf;

pub use config::{EngineConfig, OverlayConfig, PacingConfig, ScreenConfig};
pub use display::device::{
    CcmConfig, ColorState, DisplayKind, DisplayProps, FrameBufferDevice, FrameRGBA, GammaConfig,
    LayerAlpha, LayerConfig, LayerId, create_display,
};
pub use display::dispatch::{LayerDispatcher, LayerStrategy};
pub use display::soft::SoftDisplay;
pub use effect::registry::Registry;
pub use effect::{Effect, EffectDescriptor, EffectFactory};
pub use engine::context::{EngineContext, Overlay};
pub use engine::control::EngineControl;
pub use engine::render_loop::{Engine, EngineState, EngineStats};
pub use feedback::{FeedbackStep, FeedbackTransform, PingPong};
pub use foundation::core::{
    Affine, PhysAddr, PixelFormat, Point, Rect, ScreenInfo, Vec2, align_up,
};
pub use foundation::error::{GefxError, GefxResult};
pub use foundation::math::{
    Q12_ONE, Q12_SHIFT, SinLut, argb, argb_channels, hue_rgb, mul_div255, q12, q12_mul, rgb565,
    unpack_rgb565,
};
pub use foundation::pixel::PixelCanvas;
pub use ge::engine::{
    GeKind, GeStats, GraphicsEngine, OpFailure, SyncReport, create_engine, run_ops,
};
pub use ge::op::{BlendRule, BlitOp, CompositingOp, FillOp, Flip, RotateOp, Surface};
pub use ge::soft::SoftEngine;
pub use memory::buffer::{DeviceBuffer, ImageLayout};
pub use memory::pool::{DeviceMemory, MemoryConfig, MemoryStats};
pub use perf::{PerfMonitor, PerfSnapshot};

use super::*;
use crate::config::{EngineConfig, OverlayConfig, ScreenConfig};
use crate::memory::pool::MemoryConfig;

fn config(capacity_bytes: usize) -> EngineConfig {
    EngineConfig {
        screen: ScreenConfig {
            width: 16,
            height: 8,
            format: PixelFormat::Rgb565,
        },
        overlay: OverlayConfig {
            x: 0,
            y: 0,
            width: 8,
            height: 4,
            color_key: 0,
            alpha: 255,
        },
        memory: MemoryConfig {
            capacity_bytes,
            ..MemoryConfig::default()
        },
        ..EngineConfig::headless()
    }
}

fn ctx() -> EngineContext {
    EngineContext::open_soft(&config(1 << 20)).unwrap()
}

#[test]
fn active_index_tracks_frame_parity() {
    let mut ctx = ctx();
    let mut pp = PingPong::alloc_screen(&mut ctx).unwrap();
    let step = FeedbackStep::decay(FeedbackTransform::Identity, 200);
    for n in 1..=7u64 {
        pp.begin_frame(&mut ctx, step).unwrap();
        pp.end_frame(&ctx).unwrap();
        assert_eq!(pp.frames(), n);
        assert_eq!(pp.active() as u64, n % 2);
    }
    pp.release(&mut ctx);
}

#[test]
fn decay_carries_a_fraction_of_last_frame() {
    let mut ctx = ctx();
    let mut pp = PingPong::alloc_screen(&mut ctx).unwrap();
    let step = FeedbackStep::decay(FeedbackTransform::Identity, 128);

    pp.begin_frame(&mut ctx, step).unwrap();
    pp.inject(&mut ctx, |c| c.put(3, 2, 0xFFFF_FFFF)).unwrap();
    pp.end_frame(&ctx).unwrap();

    pp.begin_frame(&mut ctx, step).unwrap();
    let dst = pp.bufs[1 - pp.active()].as_ref().unwrap();
    ctx.invalidate(dst).unwrap();
    assert_eq!(ctx.canvas(dst).unwrap().get(3, 2), Some(0xFF80_8080));
    assert_eq!(ctx.canvas(dst).unwrap().get(0, 0), Some(0xFF00_0000));
    pp.release(&mut ctx);
}

#[test]
fn present_scales_the_write_buffer_onto_the_target() {
    let mut ctx = ctx();
    let mut pp = PingPong::alloc(&mut ctx, 4, 2, PixelFormat::Rgb565).unwrap();
    pp.begin_frame(&mut ctx, FeedbackStep::accumulate(FeedbackTransform::Identity))
        .unwrap();
    pp.inject(&mut ctx, |c| c.clear_raw(0xF800)).unwrap();
    let page = ctx.back_page().unwrap();
    assert_eq!(pp.present(&mut ctx, page, BlendRule::Overwrite).unwrap(), 1);

    let back = ctx.back_buffer();
    let device = ctx.mem().device_view(back).unwrap();
    let last = device.len() - 2;
    assert_eq!(&device[last..], &0xF800u16.to_le_bytes());
    pp.release(&mut ctx);
}

#[test]
fn swap_is_refused_while_work_is_queued() {
    let mut ctx = ctx();
    let mut pp = PingPong::alloc_screen(&mut ctx).unwrap();
    let dst = pp.dst().unwrap();
    ctx.submit(FillOp::clear(dst, 0xFFFF_FFFF)).unwrap();
    assert!(matches!(pp.end_frame(&ctx), Err(GefxError::BufferBusy(_))));
    assert_eq!(pp.active(), 0);

    ctx.emit().unwrap();
    assert!(ctx.sync().is_clean());
    pp.end_frame(&ctx).unwrap();
    assert_eq!(pp.active(), 1);
    pp.release(&mut ctx);
}

#[test]
fn failed_alloc_leaves_nothing_behind() {
    // Room for the pages, the overlay and one 256-byte feedback buffer only.
    let mut ctx = EngineContext::open_soft(&config(2 * 256 + 64 + 256)).unwrap();
    let before = ctx.mem().live_buffers();
    let err = PingPong::alloc_screen(&mut ctx).unwrap_err();
    assert!(matches!(err, GefxError::OutOfMemory { .. }));
    assert_eq!(ctx.mem().live_buffers(), before);
}

#[test]
fn release_is_idempotent() {
    let mut ctx = ctx();
    let mut pp = PingPong::alloc_screen(&mut ctx).unwrap();
    assert_eq!(ctx.effect_buffers(), 2);
    pp.release(&mut ctx);
    pp.release(&mut ctx);
    assert_eq!(ctx.effect_buffers(), 0);
    assert!(pp.src().is_err());
}

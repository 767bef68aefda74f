use super::*;
use crate::config::{OverlayConfig, ScreenConfig};
use crate::display::device::DisplayProps;
use crate::ge::op::FillOp;
use crate::memory::pool::MemoryConfig;

fn config() -> EngineConfig {
    EngineConfig {
        screen: ScreenConfig {
            width: 32,
            height: 16,
            format: PixelFormat::Rgb565,
        },
        overlay: OverlayConfig {
            x: 2,
            y: 2,
            width: 8,
            height: 4,
            color_key: 0x001F,
            alpha: 200,
        },
        ..EngineConfig::headless()
    }
}

#[test]
fn open_allocates_pages_and_keyed_overlay() {
    let ctx = EngineContext::open_soft(&config()).unwrap();
    assert_eq!(ctx.mem().live_buffers(), 3);
    assert_eq!(ctx.effect_buffers(), 0);
    assert_ne!(ctx.back_page().unwrap().addr, ctx.front_page().unwrap().addr);
    for id in LayerId::ALL {
        assert!(!ctx.fb().layer_config(id).enabled);
    }
    assert!(ctx.color_state().is_neutral());

    let device = ctx.mem().device_view(&ctx.overlay().buffer).unwrap();
    assert_eq!(&device[..2], &0x001Fu16.to_le_bytes());
    assert_eq!(ctx.overlay().rect(), Rect::new(2, 2, 8, 4));
    assert_eq!(ctx.overlay().alpha(), 200);
}

#[test]
fn open_fails_when_arena_cannot_hold_the_pages() {
    let mut cfg = config();
    cfg.memory = MemoryConfig {
        capacity_bytes: 1024,
        ..MemoryConfig::default()
    };
    assert!(EngineContext::open_soft(&cfg).is_err());
}

#[test]
fn flip_swaps_back_and_front() {
    let mut ctx = EngineContext::open_soft(&config()).unwrap();
    let back = ctx.back_page().unwrap();
    let front = ctx.front_page().unwrap();
    ctx.flip();
    assert_eq!(ctx.back_page().unwrap(), front);
    assert_eq!(ctx.front_page().unwrap(), back);
}

#[test]
fn back_rows_round_trip_through_the_device() {
    let mut ctx = EngineContext::open_soft(&config()).unwrap();
    let page = ctx.back_page().unwrap();
    ctx.run_ops([CompositingOp::from(FillOp::clear(page, 0xFFFF_0000))])
        .unwrap();

    // The CPU view is stale until invalidated.
    assert_eq!(ctx.back_canvas().unwrap().get(0, 4), Some(0xFF00_0000));
    ctx.invalidate_back_rows(4..6).unwrap();
    assert_eq!(ctx.back_canvas().unwrap().get(0, 4), Some(0xFFF8_0000));

    ctx.back_canvas().unwrap().fill_rect(Rect::new(0, 4, 32, 2), 0xFF00_00FF);
    ctx.flush_back_rows(4..6).unwrap();
    let stride = ctx.back_buffer().stride() as usize;
    let device = ctx.mem().device_view(ctx.back_buffer()).unwrap();
    assert_eq!(&device[4 * stride..4 * stride + 2], &0x001Fu16.to_le_bytes());
}

#[test]
fn reset_restores_neutral_colour() {
    let mut ctx = EngineContext::open_soft(&config()).unwrap();
    ctx.fb_mut()
        .set_display_props(DisplayProps {
            brightness: 80,
            ..DisplayProps::NEUTRAL
        })
        .unwrap();
    ctx.fb_mut()
        .set_ccm(&CcmConfig::enabled([0x100, 0, 0, 10, 0, 0x100, 0, 0, 0, 0, 0x100, 0]))
        .unwrap();
    assert!(!ctx.color_state().is_neutral());
    ctx.reset_color_state().unwrap();
    assert!(ctx.color_state().is_neutral());
}

#[test]
fn effect_buffers_count_only_extra_allocations() {
    let mut ctx = EngineContext::open_soft(&config()).unwrap();
    let screen = ctx.screen();
    let mut slot = Some(
        ctx.alloc_image(screen.width, screen.height, screen.format)
            .unwrap(),
    );
    assert_eq!(ctx.effect_buffers(), 1);
    ctx.release(&mut slot);
    ctx.release(&mut slot);
    assert_eq!(ctx.effect_buffers(), 0);
}

use super::*;
use crate::foundation::core::{PixelFormat, Rect};
use crate::memory::pool::MemoryConfig;

fn screen() -> ScreenInfo {
    ScreenInfo::packed(4, 2, PixelFormat::Rgb565)
}

#[test]
fn layers_start_disabled_and_neutral() {
    let fb = SoftDisplay::new(screen(), None).unwrap();
    for id in LayerId::ALL {
        assert!(!fb.layer_config(id).enabled);
    }
    assert!(fb.color_state().is_neutral());
}

#[test]
fn enabled_layer_needs_image_inside_screen() {
    let mut mem = DeviceMemory::new(MemoryConfig::default()).unwrap();
    let page = mem.alloc_image(4, 2, PixelFormat::Rgb565).unwrap();
    let mut fb = SoftDisplay::new(screen(), None).unwrap();

    let mut cfg = LayerConfig {
        id: LayerId::Ui,
        enabled: true,
        rect: Rect::full(4, 2),
        surface: None,
        alpha: LayerAlpha::Global(255),
        color_key: None,
    };
    assert!(fb.update_layer_config(&cfg).is_err());

    cfg.surface = Some(page.surface().unwrap());
    cfg.rect = Rect::new(1, 0, 4, 2);
    assert!(fb.update_layer_config(&cfg).is_err());

    cfg.rect = Rect::full(4, 2);
    fb.update_layer_config(&cfg).unwrap();
    assert_eq!(fb.layer_config(LayerId::Ui), cfg);
    assert_eq!(fb.layer_updates(), 1);
    mem.free(page);
}

#[test]
fn capture_composes_with_color_key() {
    let mut mem = DeviceMemory::new(MemoryConfig::default()).unwrap();
    let video = mem.alloc_image(4, 2, PixelFormat::Rgb565).unwrap();
    let osd = mem.alloc_image(2, 1, PixelFormat::Rgb565).unwrap();
    mem.cpu_u16_mut(&video).unwrap()[..8].fill(0xF800);
    mem.flush_all(&video).unwrap();
    mem.cpu_u16_mut(&osd).unwrap()[..2].copy_from_slice(&[0x0000, 0x001F]);
    mem.flush_all(&osd).unwrap();

    let mut fb = SoftDisplay::new(screen(), None).unwrap();
    fb.update_layer_config(&LayerConfig {
        id: LayerId::Video,
        enabled: true,
        rect: Rect::full(4, 2),
        surface: Some(video.surface().unwrap()),
        alpha: LayerAlpha::Global(255),
        color_key: None,
    })
    .unwrap();
    fb.update_layer_config(&LayerConfig {
        id: LayerId::Ui,
        enabled: true,
        rect: Rect::new(2, 1, 2, 1),
        surface: Some(osd.surface().unwrap()),
        alpha: LayerAlpha::Global(255),
        color_key: Some(0x0000),
    })
    .unwrap();

    let frame = fb.capture(&mem).unwrap();
    assert_eq!(frame.pixel(0, 0), Some([0xF8, 0, 0, 0xFF]));
    // Keyed overlay pixel shows the video layer.
    assert_eq!(frame.pixel(2, 1), Some([0xF8, 0, 0, 0xFF]));
    assert_eq!(frame.pixel(3, 1), Some([0, 0, 0xF8, 0xFF]));
    mem.free(video);
    mem.free(osd);
}

#[test]
fn global_alpha_blends_over_lower_layer() {
    let mut mem = DeviceMemory::new(MemoryConfig::default()).unwrap();
    let video = mem.alloc_image(4, 2, PixelFormat::Argb8888).unwrap();
    let ui = mem.alloc_image(4, 2, PixelFormat::Argb8888).unwrap();
    mem.cpu_u32_mut(&video).unwrap()[..8].fill(0xFF00_0000);
    mem.flush_all(&video).unwrap();
    mem.cpu_u32_mut(&ui).unwrap()[..8].fill(0xFFFF_FFFF);
    mem.flush_all(&ui).unwrap();

    let mut fb = SoftDisplay::new(ScreenInfo::packed(4, 2, PixelFormat::Argb8888), None).unwrap();
    for (id, buf, alpha) in [
        (LayerId::Video, &video, LayerAlpha::PerPixel),
        (LayerId::Ui, &ui, LayerAlpha::Global(128)),
    ] {
        fb.update_layer_config(&LayerConfig {
            id,
            enabled: true,
            rect: Rect::full(4, 2),
            surface: Some(buf.surface().unwrap()),
            alpha,
            color_key: None,
        })
        .unwrap();
    }
    let frame = fb.capture(&mem).unwrap();
    assert_eq!(frame.pixel(1, 1), Some([128, 128, 128, 255]));
    mem.free(video);
    mem.free(ui);
}

#[test]
fn neutral_color_state_is_identity() {
    let state = ColorState::neutral();
    for rgb in [[0, 0, 0], [255, 255, 255], [12, 200, 99]] {
        assert_eq!(apply_color(&state, rgb), rgb);
    }
}

#[test]
fn enabled_identity_pipeline_is_identity() {
    let state = ColorState {
        ccm: CcmConfig::enabled(CcmConfig::IDENTITY),
        gamma: GammaConfig {
            enabled: true,
            ..GammaConfig::neutral()
        },
        props: DisplayProps::NEUTRAL,
    };
    for rgb in [[0, 0, 0], [255, 255, 255], [12, 200, 99]] {
        assert_eq!(apply_color(&state, rgb), rgb);
    }
}

#[test]
fn ccm_swaps_channels() {
    let mut table = [0; 12];
    table[1] = 0x100; // R <- G
    table[4] = 0x100; // G <- R
    table[10] = 0x100;
    let state = ColorState {
        ccm: CcmConfig::enabled(table),
        ..ColorState::neutral()
    };
    assert_eq!(apply_color(&state, [10, 20, 30]), [20, 10, 30]);
}

#[test]
fn brightness_and_saturation_move_pixels() {
    let bright = ColorState {
        props: DisplayProps {
            brightness: 100,
            ..DisplayProps::NEUTRAL
        },
        ..ColorState::neutral()
    };
    assert!(!bright.is_neutral());
    assert_eq!(apply_color(&bright, [0, 0, 0]), [255, 255, 255]);

    let grey = ColorState {
        props: DisplayProps {
            saturation: 0,
            ..DisplayProps::NEUTRAL
        },
        ..ColorState::neutral()
    };
    let [r, g, b] = apply_color(&grey, [255, 0, 0]);
    assert_eq!(r, g);
    assert_eq!(g, b);
}

#[test]
fn out_of_range_props_are_rejected() {
    let mut fb = SoftDisplay::new(screen(), None).unwrap();
    let bad = DisplayProps {
        hue: 101,
        ..DisplayProps::NEUTRAL
    };
    assert!(fb.set_display_props(bad).is_err());
    assert!(fb.color_state().is_neutral());
}

#[test]
fn vsync_counts_without_pacing() {
    let mut fb = SoftDisplay::new(screen(), None).unwrap();
    for _ in 0..3 {
        fb.wait_for_vsync().unwrap();
    }
    assert_eq!(fb.vsync_count(), 3);
    assert!(SoftDisplay::new(screen(), Some(0)).is_err());
}

use super::*;

#[test]
fn rgb565_expansion_round_trips() {
    for c in [0x0000u16, 0xFFFF, 0xF800, 0x07E0, 0x001F, 0x1234, 0xBEEF] {
        let (r, g, b) = unpack_rgb565(c);
        assert_eq!(rgb565(r, g, b), c);
    }
    assert_eq!(rgb565(255, 255, 255), 0xFFFF);
    assert_eq!(rgb565(255, 0, 0), 0xF800);
}

#[test]
fn sin_lut_quadrants() {
    let lut = SinLut::new();
    assert_eq!(lut.sin(0), 0);
    assert!((lut.sin(128) - Q12_ONE).abs() <= 1);
    assert!((lut.cos(0) - Q12_ONE).abs() <= 1);
    assert_eq!(lut.sin(SinLut::LEN as i32 + 7), lut.sin(7));
    assert_eq!(lut.sin(-1), lut.sin(SinLut::LEN as i32 - 1));
}

#[test]
fn q12_multiply() {
    assert_eq!(q12_mul(q12(0.5), q12(0.5)), q12(0.25));
    assert_eq!(q12_mul(Q12_ONE, 1234), 1234);
}

#[test]
fn argb_packing_is_big_endian_channels() {
    let c = argb(0x11, 0x22, 0x33, 0x44);
    assert_eq!(c, 0x1122_3344);
    assert_eq!(argb_channels(c), [0x11, 0x22, 0x33, 0x44]);
    assert_eq!(mul_div255(255, 255), 255);
    assert_eq!(mul_div255(128, 255), 128);
}

#[test]
fn hue_wheel_hits_primaries() {
    assert_eq!(hue_rgb(0), (255, 0, 0));
    assert_eq!(hue_rgb(86), (0, 255, 0));
    assert_eq!(hue_rgb(172), (0, 0, 255));
}

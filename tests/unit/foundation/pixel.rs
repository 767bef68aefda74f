use super::*;

#[test]
fn rgb565_decodes_opaque() {
    let mut buf = [0u8; 2];
    PixelFormat::Rgb565.encode(0x00FF_0000, &mut buf);
    assert_eq!(u16::from_le_bytes(buf), 0xF800);
    assert_eq!(PixelFormat::Rgb565.decode(&buf), 0xFFF8_0000);
    assert_eq!(PixelFormat::Rgb565.raw(&buf), 0xF800);
}

#[test]
fn argb8888_is_identity() {
    let mut buf = [0u8; 4];
    PixelFormat::Argb8888.encode(0x80C0_FFEE, &mut buf);
    assert_eq!(PixelFormat::Argb8888.decode(&buf), 0x80C0_FFEE);
}

#[test]
fn canvas_respects_stride_and_clips() {
    // 3x2 RGB565 with 8-byte rows (2 bytes of padding).
    let mut data = vec![0u8; 16];
    let mut canvas = PixelCanvas::new(&mut data, 3, 2, 8, PixelFormat::Rgb565);
    canvas.fill_rect(Rect::new(1, 0, 10, 10), 0x00FF_FFFF);
    canvas.put(5, 5, 0x00FF_FFFF);
    assert_eq!(canvas.get(0, 0), Some(0xFF00_0000));
    assert_eq!(canvas.get(2, 1), Some(0xFFF8_FCF8));
    assert_eq!(canvas.get(3, 0), None);

    // Padding bytes stay untouched.
    assert_eq!(&data[6..8], &[0, 0]);
    assert_eq!(&data[14..16], &[0, 0]);
    assert_eq!(&data[2..4], &[0xFF, 0xFF]);
}

#[test]
fn canvas_height_limited_by_backing_len() {
    let mut data = vec![0u8; 8];
    let canvas = PixelCanvas::new(&mut data, 2, 100, 4, PixelFormat::Rgb565);
    assert_eq!(canvas.height(), 2);
}

#[test]
fn raw_fill_writes_native_value() {
    let mut data = vec![0u8; 8];
    let mut canvas = PixelCanvas::new(&mut data, 4, 1, 8, PixelFormat::Rgb565);
    canvas.clear_raw(0x07E0);
    assert_eq!(&data[..2], &0x07E0u16.to_le_bytes());
    assert_eq!(&data[6..8], &0x07E0u16.to_le_bytes());
}

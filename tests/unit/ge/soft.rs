use super::*;
use crate::foundation::core::PixelFormat;
use crate::ge::engine::run_ops;
use crate::memory::pool::MemoryConfig;

fn setup() -> (DeviceMemory, SoftEngine) {
    let mem = DeviceMemory::new(MemoryConfig::default()).unwrap();
    (mem, SoftEngine::new())
}

fn device_px(mem: &DeviceMemory, s: &Surface, x: u32, y: u32) -> u32 {
    let bytes = mem.device_region(s.addr, s.byte_len()).unwrap();
    s.format.raw(&bytes[px_offset(s, x, y)..])
}

#[test]
fn fill_writes_device_view_only() {
    let (mut mem, mut ge) = setup();
    let buf = mem.alloc_image(4, 4, PixelFormat::Rgb565).unwrap();
    let s = buf.surface().unwrap();

    let report = run_ops(&mut ge, &mut mem, [FillOp::clear(s, 0xFFFF_FFFF).into()]).unwrap();
    assert!(report.is_clean());
    assert_eq!(device_px(&mem, &s, 3, 3), 0xFFFF);
    // The CPU sees the result only after invalidating.
    assert_eq!(mem.cpu_u16_mut(&buf).unwrap()[0], 0);
    mem.invalidate_all(&buf).unwrap();
    assert_eq!(mem.cpu_u16_mut(&buf).unwrap()[0], 0xFFFF);
    mem.free(buf);
}

#[test]
fn unflushed_cpu_writes_are_not_composited() {
    let (mut mem, mut ge) = setup();
    let src = mem.alloc_image(2, 1, PixelFormat::Rgb565).unwrap();
    let dst = mem.alloc_image(2, 1, PixelFormat::Rgb565).unwrap();
    mem.cpu_u16_mut(&src).unwrap()[..2].copy_from_slice(&[0xF800, 0x07E0]);

    let op = BlitOp::copy(src.surface().unwrap(), dst.surface().unwrap());
    run_ops(&mut ge, &mut mem, [op.into()]).unwrap();
    assert_eq!(device_px(&mem, &dst.surface().unwrap(), 0, 0), 0);

    mem.flush_all(&src).unwrap();
    run_ops(&mut ge, &mut mem, [op.into()]).unwrap();
    assert_eq!(device_px(&mem, &dst.surface().unwrap(), 0, 0), 0xF800);
    assert_eq!(device_px(&mem, &dst.surface().unwrap(), 1, 0), 0x07E0);
    mem.free(src);
    mem.free(dst);
}

#[test]
fn emitted_buffers_are_busy_until_sync() {
    let (mut mem, mut ge) = setup();
    let buf = mem.alloc_image(4, 4, PixelFormat::Rgb565).unwrap();
    ge.submit(FillOp::clear(buf.surface().unwrap(), 0).into())
        .unwrap();
    assert!(!ge.is_idle());
    // Submitted but not emitted: CPU access still allowed.
    assert!(mem.cpu_bytes_mut(&buf).is_ok());

    assert_eq!(ge.emit(&mut mem).unwrap(), 1);
    assert!(matches!(
        mem.cpu_bytes_mut(&buf),
        Err(GefxError::BufferBusy(_))
    ));
    let report = ge.sync(&mut mem);
    assert_eq!(report.executed, 1);
    assert!(ge.is_idle());
    assert!(mem.cpu_bytes_mut(&buf).is_ok());
    mem.free(buf);
}

#[test]
fn blit_scales_and_flips() {
    let (mut mem, mut ge) = setup();
    let src = mem.alloc_image(2, 1, PixelFormat::Rgb565).unwrap();
    let dst = mem.alloc_image(4, 2, PixelFormat::Rgb565).unwrap();
    mem.cpu_u16_mut(&src).unwrap()[..2].copy_from_slice(&[0x0001, 0x0002]);
    mem.flush_all(&src).unwrap();

    let ds = dst.surface().unwrap();
    let op = BlitOp::copy(src.surface().unwrap(), ds).with_flip(Flip::HORIZONTAL);
    run_ops(&mut ge, &mut mem, [op.into()]).unwrap();
    let row: Vec<u32> = (0..4).map(|x| device_px(&mem, &ds, x, 1)).collect();
    assert_eq!(row, vec![2, 2, 1, 1]);
    mem.free(src);
    mem.free(dst);
}

#[test]
fn blend_rules_apply_on_device_pixels() {
    let (mut mem, mut ge) = setup();
    let a = mem.alloc_image(1, 1, PixelFormat::Argb8888).unwrap();
    let b = mem.alloc_image(1, 1, PixelFormat::Argb8888).unwrap();
    let (sa, sb) = (a.surface().unwrap(), b.surface().unwrap());
    run_ops(
        &mut ge,
        &mut mem,
        [
            FillOp::clear(sa, 0xFF40_4040).into(),
            FillOp::clear(sb, 0xFFD0_1010).into(),
            BlitOp::copy(sa, sb)
                .with_blend(BlendRule::Accumulate)
                .into(),
        ],
    )
    .unwrap();
    assert_eq!(device_px(&mem, &sb, 0, 0), 0xFFFF_5050);

    run_ops(
        &mut ge,
        &mut mem,
        [BlitOp::copy(sa, sb).with_blend(BlendRule::Xor).into()],
    )
    .unwrap();
    assert_eq!(device_px(&mem, &sb, 0, 0), 0xFFBF_1010);
    mem.free(a);
    mem.free(b);
}

#[test]
fn color_key_leaves_keyed_pixels() {
    let (mut mem, mut ge) = setup();
    let src = mem.alloc_image(2, 1, PixelFormat::Rgb565).unwrap();
    let dst = mem.alloc_image(2, 1, PixelFormat::Rgb565).unwrap();
    mem.cpu_u16_mut(&src).unwrap()[..2].copy_from_slice(&[0x0000, 0x001F]);
    mem.flush_all(&src).unwrap();
    mem.cpu_u16_mut(&dst).unwrap()[..2].copy_from_slice(&[0x07E0, 0x07E0]);
    mem.flush_all(&dst).unwrap();

    let ds = dst.surface().unwrap();
    let op = BlitOp::copy(src.surface().unwrap(), ds).with_blend(BlendRule::ColorKey { key: 0 });
    run_ops(&mut ge, &mut mem, [op.into()]).unwrap();
    assert_eq!(device_px(&mem, &ds, 0, 0), 0x07E0);
    assert_eq!(device_px(&mem, &ds, 1, 0), 0x001F);
    mem.free(src);
    mem.free(dst);
}

#[test]
fn rotate_half_turn_mirrors_both_axes() {
    let (mut mem, mut ge) = setup();
    let src = mem.alloc_image(2, 2, PixelFormat::Rgb565).unwrap();
    let dst = mem.alloc_image(2, 2, PixelFormat::Rgb565).unwrap();
    mem.cpu_u16_mut(&src).unwrap()[..4].copy_from_slice(&[1, 2, 3, 4]);
    mem.flush_all(&src).unwrap();

    let ds = dst.surface().unwrap();
    let op = RotateOp::about_centers(src.surface().unwrap(), ds, 180.0);
    run_ops(&mut ge, &mut mem, [op.into()]).unwrap();
    assert_eq!(device_px(&mem, &ds, 0, 0), 4);
    assert_eq!(device_px(&mem, &ds, 1, 1), 1);
    mem.free(src);
    mem.free(dst);
}

#[test]
fn rotate_leaves_uncovered_pixels() {
    let (mut mem, mut ge) = setup();
    let src = mem.alloc_image(2, 2, PixelFormat::Rgb565).unwrap();
    let dst = mem.alloc_image(8, 8, PixelFormat::Rgb565).unwrap();
    let ds = dst.surface().unwrap();
    run_ops(
        &mut ge,
        &mut mem,
        [
            FillOp::clear(src.surface().unwrap(), 0xFFFF_FFFF).into(),
            FillOp::clear(ds, 0xFF00_0000).into(),
            RotateOp::about_centers(src.surface().unwrap(), ds, 45.0).into(),
        ],
    )
    .unwrap();
    assert_eq!(device_px(&mem, &ds, 0, 0), 0);
    assert_eq!(device_px(&mem, &ds, 4, 4), 0xFFFF);
    mem.free(src);
    mem.free(dst);
}

#[test]
fn execution_failures_do_not_stop_the_batch() {
    let (mut mem, mut ge) = setup();
    let gone = mem.alloc_image(2, 2, PixelFormat::Rgb565).unwrap();
    let gone_surface = gone.surface().unwrap();
    mem.free(gone);
    let live = mem.alloc_image(2, 2, PixelFormat::Rgb565).unwrap();

    let report = run_ops(
        &mut ge,
        &mut mem,
        [
            FillOp::clear(gone_surface, 0xFFFF_FFFF).into(),
            FillOp::clear(live.surface().unwrap(), 0xFFFF_FFFF).into(),
        ],
    )
    .unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 0);
    assert!(matches!(
        report.failures[0].error,
        GefxError::InvalidBuffer(_)
    ));
    assert_eq!(ge.stats().failed, 1);
    mem.free(live);
}

#[test]
fn invalid_batches_queue_nothing() {
    let (mut mem, mut ge) = setup();
    let buf = mem.alloc_image(2, 2, PixelFormat::Rgb565).unwrap();
    let s = buf.surface().unwrap();
    let bad = FillOp {
        dst: s,
        rect: Rect::new(0, 0, 3, 3),
        color: 0,
    };
    let err = run_ops(&mut ge, &mut mem, [FillOp::clear(s, 0).into(), bad.into()]);
    assert!(matches!(err, Err(GefxError::InvalidOp(_))));
    assert!(ge.is_idle());
    assert_eq!(ge.stats().submitted, 0);
    mem.free(buf);
}

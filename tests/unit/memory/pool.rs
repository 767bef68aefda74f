use super::*;

fn arena(capacity: usize) -> DeviceMemory {
    DeviceMemory::new(MemoryConfig {
        capacity_bytes: capacity,
        ..MemoryConfig::default()
    })
    .unwrap()
}

#[test]
fn alloc_rounds_up_to_alignment() {
    let mut mem = arena(4096);
    for req in [1usize, 63, 64, 65, 200] {
        let buf = mem.alloc(req).unwrap();
        assert!(buf.size() >= req);
        assert_eq!(buf.size() % 64, 0);
        assert_eq!(buf.addr().0 % 64, 0);
        assert_eq!(buf.requested(), req);
        mem.free(buf);
    }
    assert_eq!(mem.live_buffers(), 0);
    assert_eq!(mem.stats().total_allocs, 5);
}

#[test]
fn out_of_memory_allocates_nothing() {
    let mut mem = arena(256);
    let a = mem.alloc(200).unwrap();
    let before = mem.stats();
    let err = mem.alloc(100).unwrap_err();
    assert!(matches!(
        err,
        GefxError::OutOfMemory {
            requested: 128,
            available: 0
        }
    ));
    let after = mem.stats();
    assert_eq!(after.live_buffers, before.live_buffers);
    assert_eq!(after.bytes_in_use, before.bytes_in_use);
    assert_eq!(after.failed_allocs, 1);
    mem.free(a);
}

#[test]
fn zero_sized_alloc_is_rejected() {
    let mut mem = arena(256);
    assert!(matches!(mem.alloc(0), Err(GefxError::Validation(_))));
}

#[test]
fn release_is_idempotent() {
    let mut mem = arena(1024);
    let mut slot = Some(mem.alloc(64).unwrap());
    let addr = slot.as_ref().unwrap().addr();
    mem.release(&mut slot);
    assert!(slot.is_none());
    mem.release(&mut slot);
    assert!(!mem.free_addr(addr));
    assert_eq!(mem.stats().bytes_in_use, 0);
    assert_eq!(mem.live_buffers(), 0);
}

#[test]
fn cpu_writes_need_flush() {
    let mut mem = arena(1024);
    let buf = mem.alloc(256).unwrap();
    mem.cpu_bytes_mut(&buf).unwrap()[0] = 0xAB;
    mem.cpu_bytes_mut(&buf).unwrap()[200] = 0xCD;
    assert_eq!(mem.device_view(&buf).unwrap()[0], 0);

    // Flushing one byte writes back the whole 64-byte line, nothing more.
    mem.flush(&buf, 0..1).unwrap();
    assert_eq!(mem.device_view(&buf).unwrap()[0], 0xAB);
    assert_eq!(mem.device_view(&buf).unwrap()[200], 0);

    mem.flush_all(&buf).unwrap();
    assert_eq!(mem.device_view(&buf).unwrap()[200], 0xCD);
    mem.free(buf);
}

#[test]
fn invalidate_reloads_device_contents() {
    let mut mem = arena(1024);
    let buf = mem.alloc(128).unwrap();
    mem.device_region_mut(buf.addr(), 128).unwrap()[70] = 9;
    assert_eq!(mem.cpu_bytes(&buf).unwrap()[70], 0);
    mem.invalidate(&buf, 64..65).unwrap();
    assert_eq!(mem.cpu_bytes(&buf).unwrap()[70], 9);
    mem.free(buf);
}

#[test]
fn busy_buffers_refuse_cpu_access() {
    let mut mem = arena(1024);
    let buf = mem.alloc(64).unwrap();
    mem.mark_busy(buf.addr().offset(16)).unwrap();
    assert!(mem.is_busy(&buf));
    assert!(matches!(
        mem.cpu_bytes_mut(&buf),
        Err(GefxError::BufferBusy(_))
    ));
    assert!(matches!(mem.flush_all(&buf), Err(GefxError::BufferBusy(_))));
    mem.clear_busy(buf.addr());
    assert!(mem.cpu_bytes_mut(&buf).is_ok());
    mem.free(buf);
}

#[test]
fn device_region_must_stay_inside_one_allocation() {
    let mut mem = arena(1024);
    let a = mem.alloc(64).unwrap();
    let b = mem.alloc(64).unwrap();
    assert!(mem.device_region(a.addr(), 64).is_ok());
    assert!(matches!(
        mem.device_region(a.addr().offset(32), 64),
        Err(GefxError::InvalidBuffer(_))
    ));
    assert!(mem.device_region(b.addr().offset(64), 1).is_err());
    mem.free(a);
    mem.free(b);
}

#[test]
fn image_allocations_carry_layout() {
    let mut mem = arena(1 << 20);
    let img = mem.alloc_image(10, 3, PixelFormat::Rgb565).unwrap();
    assert_eq!(img.stride(), 20);
    assert_eq!(img.size(), 64);
    let s = img.surface().unwrap();
    assert_eq!((s.width, s.height, s.stride), (10, 3, 20));

    let raw = mem.alloc(64).unwrap();
    assert!(raw.surface().is_err());
    assert!(raw.as_surface(8, 4, PixelFormat::Rgb565).is_ok());
    assert!(raw.as_surface(8, 5, PixelFormat::Rgb565).is_err());

    let mut canvas = mem.canvas(&img).unwrap();
    canvas.put(9, 2, 0x00FF_FFFF);
    mem.free(img);
    mem.free(raw);
}

#[test]
fn peak_tracks_high_water_mark() {
    let mut mem = arena(1024);
    let a = mem.alloc(256).unwrap();
    let b = mem.alloc(256).unwrap();
    mem.free(a);
    assert_eq!(mem.stats().bytes_in_use, 256);
    assert_eq!(mem.stats().peak_bytes, 512);
    mem.free(b);
}

#[test]
fn config_rejects_bad_alignment() {
    let cfg = MemoryConfig {
        align: 48,
        ..MemoryConfig::default()
    };
    assert!(DeviceMemory::new(cfg).is_err());
}

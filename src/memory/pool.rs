use std::collections::BTreeMap;
use std::ops::Range;

use crate::foundation::core::{PhysAddr, PixelFormat, align_up};
use crate::foundation::error::{GefxError, GefxResult};
use crate::foundation::pixel::PixelCanvas;
use crate::memory::buffer::{DeviceBuffer, ImageLayout};

/// Arena configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Total bytes the arena may hand out.
    pub capacity_bytes: usize,
    /// Allocation alignment and cache-line size (power of two, at least 4).
    pub align: usize,
    /// First physical address handed out.
    pub base: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 16 * 1024 * 1024,
            align: 64,
            base: 0x8000_0000,
        }
    }
}

impl MemoryConfig {
    /// Validate alignment and base.
    pub fn validate(&self) -> GefxResult<()> {
        if !self.align.is_power_of_two() || self.align < 4 {
            return Err(GefxError::validation(format!(
                "memory alignment must be a power of two >= 4, got {}",
                self.align
            )));
        }
        if self.base % self.align as u64 != 0 {
            return Err(GefxError::validation(format!(
                "memory base {:#x} is not {}-byte aligned",
                self.base, self.align
            )));
        }
        Ok(())
    }
}

/// Allocation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Allocations currently live.
    pub live_buffers: usize,
    /// Aligned bytes currently allocated.
    pub bytes_in_use: usize,
    /// High-water mark of `bytes_in_use`.
    pub peak_bytes: usize,
    /// Configured capacity.
    pub capacity_bytes: usize,
    /// Successful allocations since creation.
    pub total_allocs: u64,
    /// Allocations refused for lack of space.
    pub failed_allocs: u64,
}

// Words keep both views 4-byte aligned so typed casts never fail.
struct Block {
    size: usize,
    cpu: Vec<u32>,
    device: Vec<u32>,
    busy: u32,
}

/// Physically contiguous memory shared between the CPU and the compositing hardware.
///
/// Every allocation has two copies: the CPU's cached view and the device view. CPU accessors
/// only touch the cached view; [`DeviceMemory::flush`] writes it back to the device and
/// [`DeviceMemory::invalidate`] discards it in favour of the device contents. A buffer referenced
/// by an emitted, unsynchronised compositing op is busy and refuses CPU access.
pub struct DeviceMemory {
    config: MemoryConfig,
    blocks: BTreeMap<u64, Block>,
    next_addr: u64,
    stats: MemoryStats,
}

impl std::fmt::Debug for DeviceMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DeviceMemory {
    /// Create an arena.
    pub fn new(config: MemoryConfig) -> GefxResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            blocks: BTreeMap::new(),
            next_addr: config.base,
            stats: MemoryStats {
                capacity_bytes: config.capacity_bytes,
                ..MemoryStats::default()
            },
        })
    }

    /// Arena configuration.
    pub fn config(&self) -> MemoryConfig {
        self.config
    }

    /// Current counters.
    pub fn stats(&self) -> MemoryStats {
        self.stats
    }

    /// Number of live allocations.
    pub fn live_buffers(&self) -> usize {
        self.blocks.len()
    }

    /// Bytes still available.
    pub fn available(&self) -> usize {
        self.config
            .capacity_bytes
            .saturating_sub(self.stats.bytes_in_use)
    }

    /// Allocate `size` bytes, rounded up to the arena alignment and zero-filled.
    ///
    /// On failure nothing is allocated.
    pub fn alloc(&mut self, size: usize) -> GefxResult<DeviceBuffer> {
        if size == 0 {
            return Err(GefxError::validation("allocation size must be > 0"));
        }
        let aligned = align_up(size, self.config.align);
        if aligned > self.available() {
            self.stats.failed_allocs = self.stats.failed_allocs.saturating_add(1);
            tracing::debug!(
                requested = size,
                aligned,
                available = self.available(),
                "device allocation refused"
            );
            return Err(GefxError::OutOfMemory {
                requested: aligned,
                available: self.available(),
            });
        }

        let addr = self.next_addr;
        self.next_addr = self.next_addr.saturating_add(aligned as u64);
        self.blocks.insert(
            addr,
            Block {
                size: aligned,
                cpu: vec![0; aligned / 4],
                device: vec![0; aligned / 4],
                busy: 0,
            },
        );

        self.stats.live_buffers = self.blocks.len();
        self.stats.bytes_in_use = self.stats.bytes_in_use.saturating_add(aligned);
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.stats.bytes_in_use);
        self.stats.total_allocs = self.stats.total_allocs.saturating_add(1);
        tracing::debug!(addr = %PhysAddr(addr), size, aligned, "device allocation");

        Ok(DeviceBuffer {
            addr: PhysAddr(addr),
            size: aligned,
            requested: size,
            image: None,
        })
    }

    /// Allocate a tightly packed `width x height` image.
    pub fn alloc_image(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> GefxResult<DeviceBuffer> {
        if width == 0 || height == 0 {
            return Err(GefxError::validation(format!(
                "image dimensions must be > 0, got {width}x{height}"
            )));
        }
        let stride = width * format.bytes_per_pixel();
        let mut buf = self.alloc(stride as usize * height as usize)?;
        buf.image = Some(ImageLayout {
            width,
            height,
            stride,
            format,
        });
        Ok(buf)
    }

    /// Return an allocation to the arena.
    pub fn free(&mut self, buf: DeviceBuffer) {
        self.free_addr(buf.addr);
    }

    /// Free the buffer held in `slot`, leaving `None`. Calling it again is a no-op.
    pub fn release(&mut self, slot: &mut Option<DeviceBuffer>) {
        if let Some(buf) = slot.take() {
            self.free(buf);
        }
    }

    /// Free by address. Returns `false` when nothing was allocated there (already freed).
    pub fn free_addr(&mut self, addr: PhysAddr) -> bool {
        let Some(block) = self.blocks.remove(&addr.0) else {
            tracing::debug!(addr = %addr, "free of unknown address ignored");
            return false;
        };
        if block.busy > 0 {
            tracing::warn!(addr = %addr, "freed a buffer still referenced by an emitted op");
        }
        self.stats.live_buffers = self.blocks.len();
        self.stats.bytes_in_use = self.stats.bytes_in_use.saturating_sub(block.size);
        tracing::debug!(addr = %addr, size = block.size, "device free");
        true
    }

    /// Return `true` when `buf` is still allocated.
    pub fn is_live(&self, buf: &DeviceBuffer) -> bool {
        self.blocks.contains_key(&buf.addr.0)
    }

    /// Return `true` while an emitted op references `buf`.
    pub fn is_busy(&self, buf: &DeviceBuffer) -> bool {
        self.blocks.get(&buf.addr.0).is_some_and(|b| b.busy > 0)
    }

    fn block(&self, buf: &DeviceBuffer) -> GefxResult<&Block> {
        self.blocks.get(&buf.addr.0).ok_or_else(|| {
            GefxError::invalid_buffer(format!("buffer at {} is not allocated", buf.addr))
        })
    }

    fn block_mut(&mut self, buf: &DeviceBuffer) -> GefxResult<&mut Block> {
        self.blocks.get_mut(&buf.addr.0).ok_or_else(|| {
            GefxError::invalid_buffer(format!("buffer at {} is not allocated", buf.addr))
        })
    }

    fn idle_block(&self, buf: &DeviceBuffer) -> GefxResult<&Block> {
        let block = self.block(buf)?;
        if block.busy > 0 {
            return Err(GefxError::busy(format!(
                "buffer at {} is referenced by an outstanding op",
                buf.addr
            )));
        }
        Ok(block)
    }

    fn idle_block_mut(&mut self, buf: &DeviceBuffer) -> GefxResult<&mut Block> {
        let block = self.block_mut(buf)?;
        if block.busy > 0 {
            return Err(GefxError::busy(format!(
                "buffer at {} is referenced by an outstanding op",
                buf.addr
            )));
        }
        Ok(block)
    }

    /// CPU (cached) view.
    pub fn cpu_bytes(&self, buf: &DeviceBuffer) -> GefxResult<&[u8]> {
        Ok(bytemuck::cast_slice(&self.idle_block(buf)?.cpu))
    }

    /// Mutable CPU (cached) view. Writes reach the device only after [`DeviceMemory::flush`].
    pub fn cpu_bytes_mut(&mut self, buf: &DeviceBuffer) -> GefxResult<&mut [u8]> {
        Ok(bytemuck::cast_slice_mut(&mut self.idle_block_mut(buf)?.cpu))
    }

    /// CPU view as RGB565 words.
    pub fn cpu_u16_mut(&mut self, buf: &DeviceBuffer) -> GefxResult<&mut [u16]> {
        Ok(bytemuck::cast_slice_mut(&mut self.idle_block_mut(buf)?.cpu))
    }

    /// CPU view as ARGB8888 words.
    pub fn cpu_u32_mut(&mut self, buf: &DeviceBuffer) -> GefxResult<&mut [u32]> {
        Ok(&mut self.idle_block_mut(buf)?.cpu)
    }

    /// Pixel canvas over the CPU view of an image allocation.
    pub fn canvas(&mut self, buf: &DeviceBuffer) -> GefxResult<PixelCanvas<'_>> {
        let layout = buf.image.ok_or_else(|| {
            GefxError::invalid_buffer(format!("buffer at {} has no image layout", buf.addr))
        })?;
        let bytes = self.cpu_bytes_mut(buf)?;
        Ok(PixelCanvas::new(
            bytes,
            layout.width,
            layout.height,
            layout.stride,
            layout.format,
        ))
    }

    fn line_range(&self, size: usize, range: Range<usize>) -> GefxResult<Range<usize>> {
        if range.start > range.end || range.end > size {
            return Err(GefxError::validation(format!(
                "cache range {range:?} outside buffer of {size} bytes"
            )));
        }
        let align = self.config.align;
        let start = range.start & !(align - 1);
        let end = align_up(range.end, align).min(size);
        // Word granularity for the storage copy.
        Ok(start / 4..end.div_ceil(4))
    }

    /// Write back CPU cache lines covering `range` to the device view.
    pub fn flush(&mut self, buf: &DeviceBuffer, range: Range<usize>) -> GefxResult<()> {
        let size = self.idle_block(buf)?.size;
        let words = self.line_range(size, range)?;
        let block = self.idle_block_mut(buf)?;
        block.device[words.clone()].copy_from_slice(&block.cpu[words]);
        Ok(())
    }

    /// Flush the whole allocation.
    pub fn flush_all(&mut self, buf: &DeviceBuffer) -> GefxResult<()> {
        let size = buf.size;
        self.flush(buf, 0..size)
    }

    /// Discard CPU cache lines covering `range`, reloading them from the device view.
    pub fn invalidate(&mut self, buf: &DeviceBuffer, range: Range<usize>) -> GefxResult<()> {
        let size = self.idle_block(buf)?.size;
        let words = self.line_range(size, range)?;
        let block = self.idle_block_mut(buf)?;
        block.cpu[words.clone()].copy_from_slice(&block.device[words]);
        Ok(())
    }

    /// Invalidate the whole allocation.
    pub fn invalidate_all(&mut self, buf: &DeviceBuffer) -> GefxResult<()> {
        let size = buf.size;
        self.invalidate(buf, 0..size)
    }

    /// Device view (what the hardware reads and writes).
    pub fn device_view(&self, buf: &DeviceBuffer) -> GefxResult<&[u8]> {
        Ok(bytemuck::cast_slice(&self.block(buf)?.device))
    }

    fn locate(&self, addr: PhysAddr) -> Option<(u64, &Block)> {
        let (&base, block) = self.blocks.range(..=addr.0).next_back()?;
        (addr.0 < base + block.size as u64).then_some((base, block))
    }

    fn span(&self, addr: PhysAddr, len: usize) -> GefxResult<(u64, Range<usize>)> {
        let (base, block) = self
            .locate(addr)
            .ok_or_else(|| GefxError::invalid_buffer(format!("address {addr} is not allocated")))?;
        let start = (addr.0 - base) as usize;
        let end = start.saturating_add(len);
        if end > block.size {
            return Err(GefxError::invalid_buffer(format!(
                "{len} bytes at {addr} overrun the allocation at {}",
                PhysAddr(base)
            )));
        }
        Ok((base, start..end))
    }

    /// Device bytes at `addr..addr+len`, which must lie inside one allocation.
    pub(crate) fn device_region(&self, addr: PhysAddr, len: usize) -> GefxResult<&[u8]> {
        let (base, range) = self.span(addr, len)?;
        let block = &self.blocks[&base];
        Ok(&bytemuck::cast_slice::<u32, u8>(&block.device)[range])
    }

    /// Mutable device bytes at `addr..addr+len`.
    pub(crate) fn device_region_mut(&mut self, addr: PhysAddr, len: usize) -> GefxResult<&mut [u8]> {
        let (base, range) = self.span(addr, len)?;
        let block = self
            .blocks
            .get_mut(&base)
            .ok_or_else(|| GefxError::invalid_buffer(format!("address {addr} is not allocated")))?;
        Ok(&mut bytemuck::cast_slice_mut::<u32, u8>(&mut block.device)[range])
    }

    /// Mark the allocation containing `addr` as referenced by an emitted op.
    pub(crate) fn mark_busy(&mut self, addr: PhysAddr) -> GefxResult<()> {
        let (base, _) = self.span(addr, 0)?;
        if let Some(block) = self.blocks.get_mut(&base) {
            block.busy = block.busy.saturating_add(1);
        }
        Ok(())
    }

    /// Drop one busy reference. Freed allocations are ignored.
    pub(crate) fn clear_busy(&mut self, addr: PhysAddr) {
        let Ok((base, _)) = self.span(addr, 0) else {
            return;
        };
        if let Some(block) = self.blocks.get_mut(&base) {
            block.busy = block.busy.saturating_sub(1);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/memory/pool.rs"]
mod tests;

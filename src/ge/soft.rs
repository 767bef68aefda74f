use smallvec::SmallVec;

use crate::foundation::core::{Affine, PhysAddr, Point, Rect};
use crate::foundation::error::{GefxError, GefxResult};
use crate::ge::blend::blend_px;
use crate::ge::engine::{GeStats, GraphicsEngine, OpFailure, SyncReport};
use crate::ge::op::{BlendRule, BlitOp, CompositingOp, FillOp, Flip, RotateOp, Surface};
use crate::memory::pool::DeviceMemory;

struct InFlight {
    op: CompositingOp,
    held: SmallVec<[PhysAddr; 2]>,
}

/// Software compositing engine operating on the device view of [`DeviceMemory`].
///
/// Ops execute when `sync` is called, so anything the CPU wrote without flushing is invisible to
/// them, and their results are invisible to the CPU until invalidated.
#[derive(Default)]
pub struct SoftEngine {
    pending: SmallVec<[CompositingOp; 8]>,
    in_flight: Vec<InFlight>,
    stats: GeStats,
}

impl SoftEngine {
    /// Create an idle engine.
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for SoftEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftEngine")
            .field("pending", &self.pending.len())
            .field("in_flight", &self.in_flight.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl GraphicsEngine for SoftEngine {
    fn name(&self) -> &'static str {
        "soft"
    }

    fn submit(&mut self, op: CompositingOp) -> GefxResult<()> {
        op.validate()?;
        self.pending.push(op);
        self.stats.submitted = self.stats.submitted.saturating_add(1);
        Ok(())
    }

    fn emit(&mut self, mem: &mut DeviceMemory) -> GefxResult<usize> {
        let n = self.pending.len();
        for op in self.pending.drain(..) {
            let mut held = SmallVec::new();
            for s in op.surfaces() {
                // Unresolvable addresses surface as a failure at sync.
                if mem.mark_busy(s.addr).is_ok() {
                    held.push(s.addr);
                }
            }
            self.in_flight.push(InFlight { op, held });
        }
        self.stats.emitted = self.stats.emitted.saturating_add(n as u64);
        Ok(n)
    }

    fn sync(&mut self, mem: &mut DeviceMemory) -> SyncReport {
        let mut report = SyncReport::default();
        for (index, job) in std::mem::take(&mut self.in_flight).into_iter().enumerate() {
            let res = execute(mem, &job.op);
            for addr in job.held {
                mem.clear_busy(addr);
            }
            match res {
                Ok(()) => report.executed += 1,
                Err(error) => {
                    tracing::debug!(index, kind = job.op.kind(), %error, "compositing op failed");
                    report.failures.push(OpFailure {
                        index,
                        kind: job.op.kind(),
                        error,
                    });
                }
            }
        }
        self.stats.syncs = self.stats.syncs.saturating_add(1);
        self.stats.executed = self.stats.executed.saturating_add(report.executed as u64);
        self.stats.failed = self
            .stats
            .failed
            .saturating_add(report.failures.len() as u64);
        report
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    fn stats(&self) -> GeStats {
        self.stats
    }
}

fn px_offset(s: &Surface, x: u32, y: u32) -> usize {
    y as usize * s.stride as usize + x as usize * s.format.bytes_per_pixel() as usize
}

fn execute(mem: &mut DeviceMemory, op: &CompositingOp) -> GefxResult<()> {
    match op {
        CompositingOp::Fill(op) => exec_fill(mem, op),
        CompositingOp::Blit(op) => exec_blit(mem, op),
        CompositingOp::Rotate(op) => exec_rotate(mem, op),
    }
}

fn exec_fill(mem: &mut DeviceMemory, op: &FillOp) -> GefxResult<()> {
    let dst = op.dst;
    let bpp = dst.format.bytes_per_pixel() as usize;
    let mut px = [0u8; 4];
    dst.format.encode(op.color, &mut px);
    let bytes = mem.device_region_mut(dst.addr, dst.byte_len())?;
    let Rect {
        x,
        y,
        width,
        height,
    } = op.rect;
    for row in y..y + height {
        let start = px_offset(&dst, x, row);
        let end = start + width as usize * bpp;
        for chunk in bytes[start..end].chunks_exact_mut(bpp) {
            chunk.copy_from_slice(&px[..bpp]);
        }
    }
    Ok(())
}

// Source is snapshotted so in-place ops read pre-op pixels.
fn snapshot(mem: &DeviceMemory, src: &Surface) -> GefxResult<Vec<u8>> {
    Ok(mem.device_region(src.addr, src.byte_len())?.to_vec())
}

struct Sampler<'a> {
    surface: Surface,
    bytes: &'a [u8],
}

impl Sampler<'_> {
    /// Stored value and `0xAARRGGBB` of one pixel.
    fn sample(&self, x: u32, y: u32) -> (u32, u32) {
        let px = &self.bytes[px_offset(&self.surface, x, y)..];
        (self.surface.format.raw(px), self.surface.format.decode(px))
    }
}

fn blend_into(
    dst: &Surface,
    bytes: &mut [u8],
    x: u32,
    y: u32,
    rule: BlendRule,
    src: (u32, u32),
) {
    let off = px_offset(dst, x, y);
    let current = dst.format.decode(&bytes[off..]);
    if let Some(out) = blend_px(rule, src.0, src.1, current) {
        dst.format.encode(out, &mut bytes[off..]);
    }
}

fn exec_blit(mem: &mut DeviceMemory, op: &BlitOp) -> GefxResult<()> {
    let src_bytes = snapshot(mem, &op.src)?;
    let src = Sampler {
        surface: op.src,
        bytes: &src_bytes,
    };
    let dst = op.dst;
    let dst_bytes = mem.device_region_mut(dst.addr, dst.byte_len())?;
    let (sr, dr) = (op.src_rect, op.dst_rect);

    for j in 0..dr.height {
        let mut v = (u64::from(j) * u64::from(sr.height) / u64::from(dr.height)) as u32;
        if op.flip.contains(Flip::VERTICAL) {
            v = sr.height - 1 - v;
        }
        for i in 0..dr.width {
            let mut u = (u64::from(i) * u64::from(sr.width) / u64::from(dr.width)) as u32;
            if op.flip.contains(Flip::HORIZONTAL) {
                u = sr.width - 1 - u;
            }
            let px = src.sample(sr.x + u, sr.y + v);
            blend_into(&dst, dst_bytes, dr.x + i, dr.y + j, op.blend, px);
        }
    }
    Ok(())
}

fn exec_rotate(mem: &mut DeviceMemory, op: &RotateOp) -> GefxResult<()> {
    let forward = Affine::translate(op.dst_center.to_vec2())
        * Affine::rotate(op.angle_deg.to_radians())
        * Affine::translate(-op.src_center.to_vec2());
    if forward.determinant().abs() < f64::EPSILON {
        return Err(GefxError::invalid_op("degenerate rotation"));
    }
    let inverse = forward.inverse();

    let src_bytes = snapshot(mem, &op.src)?;
    let src = Sampler {
        surface: op.src,
        bytes: &src_bytes,
    };
    let dst = op.dst;
    let dst_bytes = mem.device_region_mut(dst.addr, dst.byte_len())?;
    let (sr, dr) = (op.src_rect, op.dst_rect);

    for dy in dr.y..dr.y + dr.height {
        for dx in dr.x..dr.x + dr.width {
            let p = inverse * Point::new(f64::from(dx) + 0.5, f64::from(dy) + 0.5);
            let (sx, sy) = (p.x.floor(), p.y.floor());
            if sx < f64::from(sr.x)
                || sy < f64::from(sr.y)
                || sx >= sr.right() as f64
                || sy >= sr.bottom() as f64
            {
                continue;
            }
            let px = src.sample(sx as u32, sy as u32);
            blend_into(&dst, dst_bytes, dx, dy, op.blend, px);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/ge/soft.rs"]
mod tests;

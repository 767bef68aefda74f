use crate::foundation::core::{PhysAddr, PixelFormat};
use crate::foundation::error::{GefxError, GefxResult};
use crate::ge::op::Surface;

/// Pixel geometry attached to an image allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageLayout {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub stride: u32,
    /// Stored pixel format.
    pub format: PixelFormat,
}

/// Handle to one physically contiguous allocation in [`crate::DeviceMemory`].
///
/// The handle is a capability: it is neither `Clone` nor `Copy`, and the memory behind it is
/// only reachable through the arena that issued it. Dropping a handle does not free the
/// allocation; owners return it with [`crate::DeviceMemory::free`] or
/// [`crate::DeviceMemory::release`].
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceBuffer {
    pub(crate) addr: PhysAddr,
    pub(crate) size: usize,
    pub(crate) requested: usize,
    pub(crate) image: Option<ImageLayout>,
}

impl DeviceBuffer {
    /// Device-visible address.
    pub fn addr(&self) -> PhysAddr {
        self.addr
    }

    /// Allocated size in bytes, rounded up to the arena alignment.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size originally requested by the caller.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Image geometry, when allocated through `alloc_image`.
    pub fn image(&self) -> Option<ImageLayout> {
        self.image
    }

    /// Row stride in bytes (0 for raw allocations).
    pub fn stride(&self) -> u32 {
        self.image.map(|l| l.stride).unwrap_or(0)
    }

    /// Compositing surface covering the whole image.
    pub fn surface(&self) -> GefxResult<Surface> {
        let layout = self.image.ok_or_else(|| {
            GefxError::invalid_buffer(format!("buffer at {} has no image layout", self.addr))
        })?;
        Ok(Surface {
            addr: self.addr,
            width: layout.width,
            height: layout.height,
            stride: layout.stride,
            format: layout.format,
        })
    }

    /// Interpret a raw allocation as an image; the image must fit inside the allocation.
    pub fn as_surface(&self, width: u32, height: u32, format: PixelFormat) -> GefxResult<Surface> {
        let stride = width * format.bytes_per_pixel();
        let needed = stride as usize * height as usize;
        if needed > self.size {
            return Err(GefxError::invalid_buffer(format!(
                "{width}x{height} {format:?} needs {needed} bytes, buffer at {} holds {}",
                self.addr, self.size
            )));
        }
        Ok(Surface {
            addr: self.addr,
            width,
            height,
            stride,
            format,
        })
    }
}

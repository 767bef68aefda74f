use crate::foundation::error::{GefxError, GefxResult};

pub use kurbo::{Affine, Point, Vec2};

/// Pixel layouts understood by the display and the compositing engine.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 16-bit `RRRRRGGG GGGBBBBB`, stored little-endian.
    #[default]
    Rgb565,
    /// 32-bit `AARRGGBB`, stored little-endian.
    Argb8888,
}

impl PixelFormat {
    /// Bytes occupied by one pixel.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgb565 => 2,
            Self::Argb8888 => 4,
        }
    }
}

/// Physical (device-visible) address of a contiguous allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Address `bytes` past this one.
    pub fn offset(self, bytes: usize) -> Self {
        Self(self.0.saturating_add(bytes as u64))
    }
}

impl std::fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Axis-aligned pixel rectangle with an unsigned origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Build a rectangle from origin and size.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin covering `width x height`.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Return `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn right(self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    /// Return `true` when the rectangle lies inside a `width x height` area.
    pub fn fits_within(self, width: u32, height: u32) -> bool {
        self.right() <= u64::from(width) && self.bottom() <= u64::from(height)
    }

    /// Shrink by `inset` pixels on every side, keeping at least one pixel.
    pub fn inset(self, inset: u32) -> Self {
        let dx = inset.min(self.width.saturating_sub(1) / 2);
        let dy = inset.min(self.height.saturating_sub(1) / 2);
        Self::new(
            self.x + dx,
            self.y + dy,
            self.width - 2 * dx,
            self.height - 2 * dy,
        )
    }
}

/// Screen geometry reported by the frame-buffer device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScreenInfo {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
    /// Bytes per row (may exceed `width * bpp`).
    pub stride: u32,
    /// Scan-out pixel format.
    pub format: PixelFormat,
}

impl ScreenInfo {
    /// Tightly packed screen geometry.
    pub fn packed(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            format,
        }
    }

    /// Bytes needed for one full page.
    pub fn page_bytes(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// Full-screen rectangle.
    pub fn rect(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    /// Validate geometry reported by a device.
    pub fn validate(&self) -> GefxResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GefxError::validation("screen dimensions must be > 0"));
        }
        if self.stride < self.width * self.format.bytes_per_pixel() {
            return Err(GefxError::validation(format!(
                "screen stride {} is smaller than one row ({} px of {:?})",
                self.stride, self.width, self.format
            )));
        }
        Ok(())
    }
}

/// Round `value` up to the next multiple of `align` (a power of two).
pub fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value.saturating_add(align - 1) & !(align - 1)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

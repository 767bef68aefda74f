use smallvec::SmallVec;

use crate::foundation::core::{PhysAddr, PixelFormat, Point, Rect};
use crate::foundation::error::{GefxError, GefxResult};

/// A region of device memory interpreted as an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Surface {
    /// Device address of the first pixel.
    pub addr: PhysAddr,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub stride: u32,
    /// Stored pixel format.
    pub format: PixelFormat,
}

impl Surface {
    /// Bytes spanned from the first pixel to the end of the last row.
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// Full-surface rectangle.
    pub fn rect(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    fn validate(&self, role: &str) -> GefxResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GefxError::invalid_op(format!("{role} surface is empty")));
        }
        if self.stride < self.width * self.format.bytes_per_pixel() {
            return Err(GefxError::invalid_op(format!(
                "{role} stride {} too small for {} px",
                self.stride, self.width
            )));
        }
        Ok(())
    }

    fn check_crop(&self, role: &str, rect: Rect) -> GefxResult<()> {
        if rect.is_empty() {
            return Err(GefxError::invalid_op(format!("{role} crop {rect:?} is empty")));
        }
        if !rect.fits_within(self.width, self.height) {
            return Err(GefxError::invalid_op(format!(
                "{role} crop {rect:?} exceeds {}x{} surface",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// How source pixels combine with destination pixels.
///
/// Arithmetic happens on 8-bit channels; RGB565 channels are expanded and truncated back
/// exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendRule {
    /// Replace the destination.
    #[default]
    Overwrite,
    /// Per-channel saturating add.
    Accumulate,
    /// Bitwise XOR of the colour channels.
    Xor,
    /// `src * alpha + dst * (255 - alpha)` with a global alpha.
    SourceOver {
        /// Global source alpha.
        alpha: u8,
    },
    /// Copy the source except where its stored value equals `key`.
    ColorKey {
        /// Native source value that is treated as transparent.
        key: u32,
    },
}

bitflags::bitflags! {
    /// Mirroring applied while blitting.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flip: u8 {
        /// Mirror left to right.
        const HORIZONTAL = 0b01;
        /// Mirror top to bottom.
        const VERTICAL = 0b10;
    }
}

/// Fill a destination crop with a solid colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillOp {
    /// Target surface.
    pub dst: Surface,
    /// Area to fill.
    pub rect: Rect,
    /// `0xAARRGGBB` fill colour.
    pub color: u32,
}

impl FillOp {
    /// Fill the whole of `dst`.
    pub fn clear(dst: Surface, color: u32) -> Self {
        Self {
            dst,
            rect: dst.rect(),
            color,
        }
    }
}

/// Scaled (nearest-neighbour) copy between crops with optional mirroring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlitOp {
    /// Source surface.
    pub src: Surface,
    /// Source crop.
    pub src_rect: Rect,
    /// Target surface.
    pub dst: Surface,
    /// Destination crop; scaling maps `src_rect` onto it.
    pub dst_rect: Rect,
    /// Pixel combination rule.
    pub blend: BlendRule,
    /// Mirroring.
    pub flip: Flip,
}

impl BlitOp {
    /// Whole `src` onto whole `dst`, overwriting.
    pub fn copy(src: Surface, dst: Surface) -> Self {
        Self {
            src,
            src_rect: src.rect(),
            dst,
            dst_rect: dst.rect(),
            blend: BlendRule::Overwrite,
            flip: Flip::empty(),
        }
    }

    /// Replace the blend rule.
    pub fn with_blend(mut self, blend: BlendRule) -> Self {
        self.blend = blend;
        self
    }

    /// Replace the mirroring.
    pub fn with_flip(mut self, flip: Flip) -> Self {
        self.flip = flip;
        self
    }

    /// Replace the source crop.
    pub fn with_src_rect(mut self, rect: Rect) -> Self {
        self.src_rect = rect;
        self
    }

    /// Replace the destination crop.
    pub fn with_dst_rect(mut self, rect: Rect) -> Self {
        self.dst_rect = rect;
        self
    }
}

/// Rotation of a source crop about a centre point onto a destination point.
///
/// Destination pixels whose pre-image falls outside `src_rect` are left untouched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotateOp {
    /// Source surface.
    pub src: Surface,
    /// Source crop sampled by the rotation.
    pub src_rect: Rect,
    /// Target surface.
    pub dst: Surface,
    /// Destination clip.
    pub dst_rect: Rect,
    /// Clockwise angle in degrees.
    pub angle_deg: f64,
    /// Rotation centre in source coordinates.
    pub src_center: Point,
    /// Where `src_center` lands in destination coordinates.
    pub dst_center: Point,
    /// Pixel combination rule.
    pub blend: BlendRule,
}

impl RotateOp {
    /// Rotate whole `src` about its centre onto the centre of `dst`.
    pub fn about_centers(src: Surface, dst: Surface, angle_deg: f64) -> Self {
        Self {
            src,
            src_rect: src.rect(),
            dst,
            dst_rect: dst.rect(),
            angle_deg,
            src_center: Point::new(f64::from(src.width) / 2.0, f64::from(src.height) / 2.0),
            dst_center: Point::new(f64::from(dst.width) / 2.0, f64::from(dst.height) / 2.0),
            blend: BlendRule::Overwrite,
        }
    }

    /// Replace the blend rule.
    pub fn with_blend(mut self, blend: BlendRule) -> Self {
        self.blend = blend;
        self
    }
}

/// One unit of work for the compositing engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CompositingOp {
    /// Solid fill.
    Fill(FillOp),
    /// Scaled copy.
    Blit(BlitOp),
    /// Rotation.
    Rotate(RotateOp),
}

impl From<FillOp> for CompositingOp {
    fn from(op: FillOp) -> Self {
        Self::Fill(op)
    }
}

impl From<BlitOp> for CompositingOp {
    fn from(op: BlitOp) -> Self {
        Self::Blit(op)
    }
}

impl From<RotateOp> for CompositingOp {
    fn from(op: RotateOp) -> Self {
        Self::Rotate(op)
    }
}

fn check_key(src: &Surface, blend: BlendRule) -> GefxResult<()> {
    if let BlendRule::ColorKey { key } = blend
        && src.format == PixelFormat::Rgb565
        && key > 0xFFFF
    {
        return Err(GefxError::invalid_op(format!(
            "colour key {key:#x} does not fit an RGB565 source"
        )));
    }
    Ok(())
}

impl CompositingOp {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fill(_) => "fill",
            Self::Blit(_) => "blit",
            Self::Rotate(_) => "rotate",
        }
    }

    /// Check surfaces and crops.
    pub fn validate(&self) -> GefxResult<()> {
        match self {
            Self::Fill(op) => {
                op.dst.validate("destination")?;
                op.dst.check_crop("destination", op.rect)
            }
            Self::Blit(op) => {
                op.src.validate("source")?;
                op.dst.validate("destination")?;
                op.src.check_crop("source", op.src_rect)?;
                op.dst.check_crop("destination", op.dst_rect)?;
                check_key(&op.src, op.blend)
            }
            Self::Rotate(op) => {
                op.src.validate("source")?;
                op.dst.validate("destination")?;
                op.src.check_crop("source", op.src_rect)?;
                op.dst.check_crop("destination", op.dst_rect)?;
                if !op.angle_deg.is_finite() {
                    return Err(GefxError::invalid_op("rotation angle is not finite"));
                }
                check_key(&op.src, op.blend)
            }
        }
    }

    /// Surfaces read by the op.
    pub fn sources(&self) -> SmallVec<[Surface; 2]> {
        match self {
            Self::Fill(_) => SmallVec::new(),
            Self::Blit(op) => smallvec::smallvec![op.src],
            Self::Rotate(op) => smallvec::smallvec![op.src],
        }
    }

    /// Surface written by the op.
    pub fn target(&self) -> Surface {
        match self {
            Self::Fill(op) => op.dst,
            Self::Blit(op) => op.dst,
            Self::Rotate(op) => op.dst,
        }
    }

    /// Every surface the op touches, deduplicated by address.
    pub fn surfaces(&self) -> SmallVec<[Surface; 2]> {
        let mut out = self.sources();
        let dst = self.target();
        if !out.iter().any(|s| s.addr == dst.addr) {
            out.push(dst);
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ge/op.rs"]
mod tests;

use crate::foundation::core::{PixelFormat, Rect};
use crate::foundation::math::{argb, argb_channels, rgb565, unpack_rgb565};

impl PixelFormat {
    /// Decode one pixel stored at the start of `bytes` into `0xAARRGGBB`.
    ///
    /// RGB565 decodes as opaque.
    pub fn decode(self, bytes: &[u8]) -> u32 {
        match self {
            Self::Rgb565 => {
                let (r, g, b) = unpack_rgb565(u16::from_le_bytes([bytes[0], bytes[1]]));
                argb(0xFF, r, g, b)
            }
            Self::Argb8888 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Encode `0xAARRGGBB` into the start of `bytes`.
    pub fn encode(self, color: u32, bytes: &mut [u8]) {
        match self {
            Self::Rgb565 => {
                let [_, r, g, b] = argb_channels(color);
                bytes[..2].copy_from_slice(&rgb565(r, g, b).to_le_bytes());
            }
            Self::Argb8888 => bytes[..4].copy_from_slice(&color.to_le_bytes()),
        }
    }

    /// Native stored value of one pixel (RGB565 zero-extended).
    pub fn raw(self, bytes: &[u8]) -> u32 {
        match self {
            Self::Rgb565 => u32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            Self::Argb8888 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Store a native value (RGB565 truncated to 16 bits).
    pub fn store_raw(self, raw: u32, bytes: &mut [u8]) {
        match self {
            Self::Rgb565 => bytes[..2].copy_from_slice(&(raw as u16).to_le_bytes()),
            Self::Argb8888 => bytes[..4].copy_from_slice(&raw.to_le_bytes()),
        }
    }
}

/// Mutable 2D view over a pixel buffer with an explicit stride.
///
/// Out-of-bounds writes are clipped.
#[derive(Debug)]
pub struct PixelCanvas<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
}

impl<'a> PixelCanvas<'a> {
    /// Wrap `data`; rows that do not fit inside `data` are dropped from the view.
    pub fn new(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
    ) -> Self {
        let bpp = format.bytes_per_pixel();
        let width = width.min(stride / bpp.max(1));
        let rows = if stride == 0 {
            0
        } else {
            (data.len() / stride as usize) as u32
        };
        Self {
            data,
            width,
            height: height.min(rows),
            stride,
            format,
        }
    }

    /// Visible width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Visible height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format of the backing buffer.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride as usize + x as usize * self.format.bytes_per_pixel() as usize
    }

    /// Read a pixel as `0xAARRGGBB`; `None` outside the view.
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.format.decode(&self.data[self.offset(x, y)..]))
    }

    /// Write a pixel given as `0xAARRGGBB`.
    pub fn put(&mut self, x: u32, y: u32, color: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let off = self.offset(x, y);
        self.format.encode(color, &mut self.data[off..]);
    }

    /// Write a native value (e.g. a colour key) without conversion.
    pub fn put_raw(&mut self, x: u32, y: u32, raw: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let off = self.offset(x, y);
        self.format.store_raw(raw, &mut self.data[off..]);
    }

    /// Fill `rect` (clipped) with `0xAARRGGBB`.
    pub fn fill_rect(&mut self, rect: Rect, color: u32) {
        let bpp = self.format.bytes_per_pixel() as usize;
        let mut px = [0u8; 4];
        self.format.encode(color, &mut px);
        self.fill_rect_bytes(rect, &px[..bpp]);
    }

    /// Fill `rect` (clipped) with a native value.
    pub fn fill_rect_raw(&mut self, rect: Rect, raw: u32) {
        let bpp = self.format.bytes_per_pixel() as usize;
        let mut px = [0u8; 4];
        self.format.store_raw(raw, &mut px);
        self.fill_rect_bytes(rect, &px[..bpp]);
    }

    /// Fill the whole view with a native value.
    pub fn clear_raw(&mut self, raw: u32) {
        self.fill_rect_raw(Rect::full(self.width, self.height), raw);
    }

    fn fill_rect_bytes(&mut self, rect: Rect, px: &[u8]) {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let x1 = (rect.right().min(u64::from(self.width))) as u32;
        let y1 = (rect.bottom().min(u64::from(self.height))) as u32;
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for y in y0..y1 {
            let start = self.offset(x0, y);
            let end = self.offset(x1, y);
            for chunk in self.data[start..end].chunks_exact_mut(px.len()) {
                chunk.copy_from_slice(px);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/pixel.rs"]
mod tests;

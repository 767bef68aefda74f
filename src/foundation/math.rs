//! Fixed-point and channel helpers shared by the software devices and the built-in effects.

/// Fractional bits of the Q12 fixed-point format.
pub const Q12_SHIFT: u32 = 12;
/// `1.0` in Q12.
pub const Q12_ONE: i32 = 1 << Q12_SHIFT;

/// Convert a float to Q12.
pub fn q12(v: f32) -> i32 {
    (v * Q12_ONE as f32) as i32
}

/// Multiply two Q12 values.
pub fn q12_mul(a: i32, b: i32) -> i32 {
    ((i64::from(a) * i64::from(b)) >> Q12_SHIFT) as i32
}

/// Full-turn sine table in Q12 indexed by a wrapping phase.
#[derive(Clone, Debug)]
pub struct SinLut {
    table: Vec<i32>,
}

impl SinLut {
    /// Entries per full turn.
    pub const LEN: usize = 512;

    /// Build the table.
    pub fn new() -> Self {
        let table = (0..Self::LEN)
            .map(|i| {
                let t = i as f32 / Self::LEN as f32 * std::f32::consts::TAU;
                q12(t.sin())
            })
            .collect();
        Self { table }
    }

    /// `sin(phase * 2π / LEN)` in Q12; any phase wraps.
    pub fn sin(&self, phase: i32) -> i32 {
        self.table[(phase as usize) & (Self::LEN - 1)]
    }

    /// Cosine counterpart of [`SinLut::sin`].
    pub fn cos(&self, phase: i32) -> i32 {
        self.sin(phase.wrapping_add((Self::LEN / 4) as i32))
    }
}

impl Default for SinLut {
    fn default() -> Self {
        Self::new()
    }
}

/// Pack 8-bit channels into RGB565, truncating low bits.
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((u16::from(r) & 0xF8) << 8) | ((u16::from(g) & 0xFC) << 3) | (u16::from(b) >> 3)
}

/// Expand RGB565 into 8-bit channels with zeroed low bits.
///
/// The expansion is exact: `rgb565(unpack_rgb565(c)) == c`.
pub fn unpack_rgb565(c: u16) -> (u8, u8, u8) {
    let r = ((c & 0xF800) >> 8) as u8;
    let g = ((c & 0x07E0) >> 3) as u8;
    let b = ((c & 0x001F) << 3) as u8;
    (r, g, b)
}

/// Pack channels into `0xAARRGGBB`.
pub fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Split `0xAARRGGBB` into `[a, r, g, b]`.
pub fn argb_channels(c: u32) -> [u8; 4] {
    c.to_be_bytes()
}

/// `x * y / 255`, rounded.
pub fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// Convert an HSV-ish hue (0..=255) into a saturated RGB triple.
pub fn hue_rgb(hue: u8) -> (u8, u8, u8) {
    let region = hue / 43;
    let rem = (hue - region * 43) * 6;
    let up = rem;
    let down = 255 - rem;
    match region {
        0 => (255, up, 0),
        1 => (down, 255, 0),
        2 => (0, 255, up),
        3 => (0, down, 255),
        4 => (up, 0, 255),
        _ => (255, 0, down),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;

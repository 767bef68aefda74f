use crate::foundation::math::{argb_channels, mul_div255};
use crate::ge::op::BlendRule;

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

/// Combine one source pixel with one destination pixel.
///
/// `src_raw` is the stored source value (used by colour keying); `src` and `dst` are
/// `0xAARRGGBB`. Returns `None` when the destination must stay untouched.
pub(crate) fn blend_px(rule: BlendRule, src_raw: u32, src: u32, dst: u32) -> Option<u32> {
    match rule {
        BlendRule::Overwrite => Some(src),
        BlendRule::ColorKey { key } => (src_raw != key).then_some(src),
        BlendRule::Accumulate => {
            let s = argb_channels(src);
            let d = argb_channels(dst);
            Some(u32::from_be_bytes([
                add_sat_u8(s[0], d[0]),
                add_sat_u8(s[1], d[1]),
                add_sat_u8(s[2], d[2]),
                add_sat_u8(s[3], d[3]),
            ]))
        }
        BlendRule::Xor => {
            let a = (src | dst) & 0xFF00_0000;
            Some(a | ((src ^ dst) & 0x00FF_FFFF))
        }
        BlendRule::SourceOver { alpha } => {
            let s = argb_channels(src);
            let d = argb_channels(dst);
            let a = u16::from(alpha);
            let inv = 255 - a;
            let mut out = [0u8; 4];
            for i in 0..4 {
                out[i] = add_sat_u8(
                    mul_div255(u16::from(s[i]), a),
                    mul_div255(u16::from(d[i]), inv),
                );
            }
            Some(u32::from_be_bytes(out))
        }
    }
}

use std::time::{Duration, Instant};

use crate::display::device::{
    CcmConfig, ColorState, DisplayProps, FrameBufferDevice, FrameRGBA, GammaConfig, LayerAlpha,
    LayerConfig, LayerId,
};
use crate::foundation::core::ScreenInfo;
use crate::foundation::error::{GefxError, GefxResult};
use crate::foundation::math::{argb_channels, mul_div255};
use crate::memory::pool::DeviceMemory;

/// Display that records its configuration and composes layers from device memory on capture.
#[derive(Debug)]
pub struct SoftDisplay {
    screen: ScreenInfo,
    layers: [LayerConfig; 2],
    color: ColorState,
    vsync_period: Option<Duration>,
    next_vsync: Option<Instant>,
    vsyncs: u64,
    layer_updates: u64,
}

impl SoftDisplay {
    /// Create a display; `vsync_hz` paces `wait_for_vsync` in real time when set.
    pub fn new(screen: ScreenInfo, vsync_hz: Option<u32>) -> GefxResult<Self> {
        screen.validate()?;
        let vsync_period = match vsync_hz {
            Some(0) => return Err(GefxError::validation("vsync rate must be > 0")),
            Some(hz) => Some(Duration::from_secs(1) / hz),
            None => None,
        };
        Ok(Self {
            screen,
            layers: [
                LayerConfig::disabled(LayerId::Video),
                LayerConfig::disabled(LayerId::Ui),
            ],
            color: ColorState::neutral(),
            vsync_period,
            next_vsync: None,
            vsyncs: 0,
            layer_updates: 0,
        })
    }

    /// Vertical blanks waited for so far.
    pub fn vsync_count(&self) -> u64 {
        self.vsyncs
    }

    /// Accepted layer updates so far.
    pub fn layer_updates(&self) -> u64 {
        self.layer_updates
    }
}

impl FrameBufferDevice for SoftDisplay {
    fn name(&self) -> &'static str {
        "soft"
    }

    fn screen_info(&self) -> ScreenInfo {
        self.screen
    }

    fn layer_config(&self, id: LayerId) -> LayerConfig {
        self.layers[id.index()]
    }

    fn update_layer_config(&mut self, config: &LayerConfig) -> GefxResult<()> {
        config.validate(&self.screen)?;
        self.layers[config.id.index()] = *config;
        self.layer_updates = self.layer_updates.saturating_add(1);
        Ok(())
    }

    fn wait_for_vsync(&mut self) -> GefxResult<()> {
        if let Some(period) = self.vsync_period {
            let now = Instant::now();
            let deadline = self.next_vsync.unwrap_or(now);
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
            self.next_vsync = Some(deadline.max(now) + period);
        }
        self.vsyncs = self.vsyncs.saturating_add(1);
        Ok(())
    }

    fn set_ccm(&mut self, ccm: &CcmConfig) -> GefxResult<()> {
        self.color.ccm = *ccm;
        Ok(())
    }

    fn set_gamma(&mut self, gamma: &GammaConfig) -> GefxResult<()> {
        self.color.gamma = *gamma;
        Ok(())
    }

    fn set_display_props(&mut self, props: DisplayProps) -> GefxResult<()> {
        if [props.brightness, props.contrast, props.saturation, props.hue]
            .iter()
            .any(|&v| v > 100)
        {
            return Err(GefxError::device(format!(
                "display properties out of range: {props:?}"
            )));
        }
        self.color.props = props;
        Ok(())
    }

    fn color_state(&self) -> ColorState {
        self.color
    }

    fn capture(&self, mem: &DeviceMemory) -> GefxResult<FrameRGBA> {
        let (w, h) = (self.screen.width, self.screen.height);
        let mut data = vec![0u8; w as usize * h as usize * 4];
        for px in data.chunks_exact_mut(4) {
            px[3] = 0xFF;
        }

        for layer in &self.layers {
            if layer.enabled {
                compose_layer(mem, layer, w, &mut data)?;
            }
        }

        if !self.color.is_neutral() {
            for px in data.chunks_exact_mut(4) {
                let rgb = apply_color(&self.color, [px[0], px[1], px[2]]);
                px[..3].copy_from_slice(&rgb);
            }
        }
        Ok(FrameRGBA {
            width: w,
            height: h,
            data,
        })
    }
}

fn compose_layer(
    mem: &DeviceMemory,
    layer: &LayerConfig,
    screen_w: u32,
    out: &mut [u8],
) -> GefxResult<()> {
    let Some(surface) = layer.surface else {
        return Ok(());
    };
    let bytes = mem.device_region(surface.addr, surface.byte_len())?;
    let bpp = surface.format.bytes_per_pixel() as usize;
    let r = layer.rect;

    for y in 0..r.height {
        for x in 0..r.width {
            let px = &bytes[y as usize * surface.stride as usize + x as usize * bpp..];
            if layer.color_key == Some(surface.format.raw(px)) {
                continue;
            }
            let [a, sr, sg, sb] = argb_channels(surface.format.decode(px));
            let alpha = match layer.alpha {
                LayerAlpha::PerPixel => a,
                LayerAlpha::Global(g) => g,
            };
            let o = ((r.y + y) as usize * screen_w as usize + (r.x + x) as usize) * 4;
            let a = u16::from(alpha);
            let inv = 255 - a;
            for (c, s) in [sr, sg, sb].into_iter().enumerate() {
                out[o + c] = mul_div255(u16::from(s), a)
                    .saturating_add(mul_div255(u16::from(out[o + c]), inv));
            }
        }
    }
    Ok(())
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

fn apply_ccm(ccm: &CcmConfig, rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(i32::from);
    let t = &ccm.table;
    std::array::from_fn(|row| {
        let m = &t[row * 4..row * 4 + 4];
        clamp_u8(((m[0] * r + m[1] * g + m[2] * b) >> 8) + m[3])
    })
}

fn apply_props(p: &DisplayProps, rgb: [u8; 3]) -> [u8; 3] {
    let mut v = rgb.map(f32::from);

    if p.hue != 50 {
        let angle = (f32::from(p.hue) - 50.0) * 3.6_f32.to_radians();
        let (s, c) = angle.sin_cos();
        let k = (1.0 - c) / 3.0;
        let q = (1.0_f32 / 3.0).sqrt() * s;
        let (a, b2, c2) = (c + k, k - q, k + q);
        v = [
            a * v[0] + b2 * v[1] + c2 * v[2],
            c2 * v[0] + a * v[1] + b2 * v[2],
            b2 * v[0] + c2 * v[1] + a * v[2],
        ];
    }
    if p.saturation != 50 {
        let y = 0.299 * v[0] + 0.587 * v[1] + 0.114 * v[2];
        let f = f32::from(p.saturation) / 50.0;
        v = v.map(|c| y + (c - y) * f);
    }
    if p.contrast != 50 {
        let f = f32::from(p.contrast) / 50.0;
        v = v.map(|c| (c - 128.0) * f + 128.0);
    }
    if p.brightness != 50 {
        let off = (f32::from(p.brightness) - 50.0) * 255.0 / 50.0;
        v = v.map(|c| c + off);
    }
    v.map(|c| c.round().clamp(0.0, 255.0) as u8)
}

fn gamma_channel(points: &[u8; 16], v: u8) -> u8 {
    let idx = usize::from(v / 17);
    let frac = u16::from(v % 17);
    if idx >= 15 {
        return points[15];
    }
    let (a, b) = (u16::from(points[idx]), u16::from(points[idx + 1]));
    ((a * (17 - frac) + b * frac + 8) / 17) as u8
}

pub(crate) fn apply_color(state: &ColorState, rgb: [u8; 3]) -> [u8; 3] {
    let mut out = rgb;
    if state.ccm.enabled {
        out = apply_ccm(&state.ccm, out);
    }
    if state.props != DisplayProps::NEUTRAL {
        out = apply_props(&state.props, out);
    }
    if state.gamma.enabled {
        out = std::array::from_fn(|c| gamma_channel(&state.gamma.lut[c], out[c]));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/display/soft.rs"]
mod tests;

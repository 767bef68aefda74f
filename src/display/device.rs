use crate::foundation::core::{Rect, ScreenInfo};
use crate::foundation::error::{GefxError, GefxResult};
use crate::ge::op::Surface;
use crate::memory::pool::DeviceMemory;

/// Hardware display layers, bottom to top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerId {
    /// Background layer.
    Video,
    /// Overlay layer, composed above the video layer.
    Ui,
}

impl LayerId {
    /// Both layers in composition order.
    pub const ALL: [LayerId; 2] = [LayerId::Video, LayerId::Ui];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Video => 0,
            Self::Ui => 1,
        }
    }
}

/// Layer alpha source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerAlpha {
    /// Use each pixel's own alpha (RGB565 is opaque).
    PerPixel,
    /// One alpha for the whole layer.
    Global(u8),
}

/// Complete configuration of one hardware layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerConfig {
    /// Which layer this describes.
    pub id: LayerId,
    /// Whether the layer is scanned out.
    pub enabled: bool,
    /// On-screen position and size.
    pub rect: Rect,
    /// Image shown by the layer; its top-left `rect.width x rect.height` pixels are used.
    pub surface: Option<Surface>,
    /// Alpha source.
    pub alpha: LayerAlpha,
    /// Stored value treated as transparent, if any.
    pub color_key: Option<u32>,
}

impl LayerConfig {
    /// A disabled layer with no image.
    pub fn disabled(id: LayerId) -> Self {
        Self {
            id,
            enabled: false,
            rect: Rect::default(),
            surface: None,
            alpha: LayerAlpha::Global(255),
            color_key: None,
        }
    }

    /// Check the configuration against the screen.
    pub fn validate(&self, screen: &ScreenInfo) -> GefxResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.rect.is_empty() || !self.rect.fits_within(screen.width, screen.height) {
            return Err(GefxError::device(format!(
                "{:?} layer rect {:?} outside {}x{} screen",
                self.id, self.rect, screen.width, screen.height
            )));
        }
        let surface = self
            .surface
            .ok_or_else(|| GefxError::device(format!("{:?} layer enabled without image", self.id)))?;
        if surface.width < self.rect.width || surface.height < self.rect.height {
            return Err(GefxError::device(format!(
                "{:?} layer image {}x{} smaller than rect {:?}",
                self.id, surface.width, surface.height, self.rect
            )));
        }
        Ok(())
    }
}

/// Colour correction matrix, 3 rows of `[r, g, b, offset]`, `0x100` = 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CcmConfig {
    /// Whether the matrix is applied.
    pub enabled: bool,
    /// Row-major coefficients.
    pub table: [i32; 12],
}

impl CcmConfig {
    /// Identity coefficients.
    pub const IDENTITY: [i32; 12] = [0x100, 0, 0, 0, 0, 0x100, 0, 0, 0, 0, 0x100, 0];

    /// Disabled identity matrix.
    pub fn neutral() -> Self {
        Self {
            enabled: false,
            table: Self::IDENTITY,
        }
    }

    /// Enabled matrix with the given coefficients.
    pub fn enabled(table: [i32; 12]) -> Self {
        Self {
            enabled: true,
            table,
        }
    }
}

/// Gamma curve, 16 control points per channel, linearly interpolated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GammaConfig {
    /// Whether the curve is applied.
    pub enabled: bool,
    /// Per-channel (R, G, B) control points.
    pub lut: [[u8; 16]; 3],
}

impl GammaConfig {
    /// Identity control points (`i * 17`).
    pub fn linear_lut() -> [u8; 16] {
        std::array::from_fn(|i| (i * 17) as u8)
    }

    /// Disabled linear curve.
    pub fn neutral() -> Self {
        let lut = Self::linear_lut();
        Self {
            enabled: false,
            lut: [lut; 3],
        }
    }
}

/// Brightness, contrast, saturation and hue, each 0..=100 with 50 neutral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayProps {
    /// Brightness.
    pub brightness: u8,
    /// Contrast.
    pub contrast: u8,
    /// Saturation.
    pub saturation: u8,
    /// Hue.
    pub hue: u8,
}

impl DisplayProps {
    /// All four at 50.
    pub const NEUTRAL: Self = Self {
        brightness: 50,
        contrast: 50,
        saturation: 50,
        hue: 50,
    };
}

impl Default for DisplayProps {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Post-composition colour pipeline state of the display engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorState {
    /// Colour matrix.
    pub ccm: CcmConfig,
    /// Gamma curve.
    pub gamma: GammaConfig,
    /// Picture properties.
    pub props: DisplayProps,
}

impl ColorState {
    /// Pass-through state.
    pub fn neutral() -> Self {
        Self {
            ccm: CcmConfig::neutral(),
            gamma: GammaConfig::neutral(),
            props: DisplayProps::NEUTRAL,
        }
    }

    /// `true` when the state leaves pixels unchanged.
    pub fn is_neutral(&self) -> bool {
        !self.ccm.enabled && !self.gamma.enabled && self.props == DisplayProps::NEUTRAL
    }
}

impl Default for ColorState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// A captured scanout as straight (non-premultiplied) RGBA8.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// RGBA of one pixel; `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

/// Frame-buffer / display-engine contract.
///
/// Page flips are expressed by pointing a layer at a different surface through
/// [`FrameBufferDevice::update_layer_config`]; the change takes effect at the next vsync.
pub trait FrameBufferDevice {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Screen geometry.
    fn screen_info(&self) -> ScreenInfo;

    /// Current configuration of a layer.
    fn layer_config(&self, id: LayerId) -> LayerConfig;

    /// Replace a layer's configuration.
    fn update_layer_config(&mut self, config: &LayerConfig) -> GefxResult<()>;

    /// Block until the next vertical blank.
    fn wait_for_vsync(&mut self) -> GefxResult<()>;

    /// Program the colour matrix.
    fn set_ccm(&mut self, ccm: &CcmConfig) -> GefxResult<()>;

    /// Program the gamma curve.
    fn set_gamma(&mut self, gamma: &GammaConfig) -> GefxResult<()>;

    /// Program brightness/contrast/saturation/hue.
    fn set_display_props(&mut self, props: DisplayProps) -> GefxResult<()>;

    /// Current colour pipeline state.
    fn color_state(&self) -> ColorState;

    /// Read back what the display would show right now.
    fn capture(&self, _mem: &DeviceMemory) -> GefxResult<FrameRGBA> {
        Err(GefxError::device(format!(
            "{} does not support scanout capture",
            self.name()
        )))
    }
}

/// Available display implementations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayKind {
    /// Host-memory display that composes layers on capture.
    #[default]
    Soft,
}

/// Create a display device.
pub fn create_display(
    kind: DisplayKind,
    screen: ScreenInfo,
    vsync_hz: Option<u32>,
) -> GefxResult<Box<dyn FrameBufferDevice>> {
    match kind {
        DisplayKind::Soft => Ok(Box::new(crate::display::soft::SoftDisplay::new(
            screen, vsync_hz,
        )?)),
    }
}

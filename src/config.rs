use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::foundation::core::{PixelFormat, Rect, ScreenInfo};
use crate::foundation::error::{GefxError, GefxResult};
use crate::memory::pool::MemoryConfig;

/// Screen geometry for the software display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Scan-out format.
    pub format: PixelFormat,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            format: PixelFormat::Rgb565,
        }
    }
}

impl ScreenConfig {
    /// Packed screen geometry.
    pub fn info(&self) -> ScreenInfo {
        ScreenInfo::packed(self.width, self.height, self.format)
    }
}

/// Diagnostic overlay placement on the isolated path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Left edge on screen.
    pub x: u32,
    /// Top edge on screen.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Stored value shown as transparent.
    pub color_key: u32,
    /// Global alpha of the overlay layer.
    pub alpha: u8,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            x: 16,
            y: 16,
            width: 320,
            height: 96,
            color_key: 0x0000,
            alpha: 255,
        }
    }
}

impl OverlayConfig {
    /// On-screen rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Frame pacing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Real-time vsync rate for the software display; `None` runs unpaced.
    pub vsync_hz: Option<u32>,
    /// Sleep after each flip, in milliseconds.
    pub yield_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            vsync_hz: Some(60),
            yield_ms: 1,
        }
    }
}

/// Engine configuration, loadable from JSON. Every field is optional.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Screen geometry.
    pub screen: ScreenConfig,
    /// Overlay placement and keying.
    pub overlay: OverlayConfig,
    /// Device memory arena.
    pub memory: MemoryConfig,
    /// Frame pacing.
    pub pacing: PacingConfig,
    /// Registry index activated at startup.
    pub start_effect: usize,
    /// Draw the diagnostic overlay.
    pub osd: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            screen: ScreenConfig::default(),
            overlay: OverlayConfig::default(),
            memory: MemoryConfig::default(),
            pacing: PacingConfig::default(),
            start_effect: 0,
            osd: true,
        }
    }
}

impl EngineConfig {
    /// Defaults with pacing disabled, for tests and offline runs.
    pub fn headless() -> Self {
        Self {
            pacing: PacingConfig {
                vsync_hz: None,
                yield_ms: 0,
            },
            ..Self::default()
        }
    }

    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> GefxResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| GefxError::validation(format!("parse engine config JSON: {e}")))
    }

    /// Parse from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> GefxResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            GefxError::validation(format!("open engine config '{}': {e}", path.display()))
        })?;
        serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            GefxError::validation(format!("parse engine config '{}': {e}", path.display()))
        })
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> GefxResult<()> {
        self.screen.info().validate()?;
        self.memory.validate()?;

        let o = self.overlay;
        if o.width == 0 || o.height == 0 {
            return Err(GefxError::validation("overlay dimensions must be > 0"));
        }
        if !o.rect().fits_within(self.screen.width, self.screen.height) {
            return Err(GefxError::validation(format!(
                "overlay {:?} does not fit the {}x{} screen",
                o.rect(),
                self.screen.width,
                self.screen.height
            )));
        }
        if self.screen.format == PixelFormat::Rgb565 && o.color_key > 0xFFFF {
            return Err(GefxError::validation(format!(
                "overlay colour key {:#x} does not fit RGB565",
                o.color_key
            )));
        }
        if self.pacing.vsync_hz == Some(0) {
            return Err(GefxError::validation("vsync_hz must be > 0"));
        }

        let page = self.screen.info().page_bytes();
        let needed = 2 * page + o.width as usize * o.height as usize * 4;
        if needed > self.memory.capacity_bytes {
            return Err(GefxError::validation(format!(
                "memory capacity {} cannot hold two pages and the overlay ({needed} bytes)",
                self.memory.capacity_bytes
            )));
        }
        Ok(())
    }
}

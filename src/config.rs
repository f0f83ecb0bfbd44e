//! Render settings for PDF-to-image conversion.
//!
//! Everything a conversion run needs to know lives in [`RenderSettings`]:
//! how the render scale is chosen ([`ResolutionPreset`] plus an optional
//! custom factor), the output [`ImageFormat`], and the JPEG quality. The
//! settings are plain data so they can be logged, serialised into a JSON
//! manifest, and changed between runs without touching the loaded document.
//!
//! Build them directly, mutate them in place, or use
//! [`RenderSettings::builder()`] to get validation up front.

use crate::error::Pdf2ImgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Settings for one conversion run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2img::{ImageFormat, RenderSettings, ResolutionPreset};
///
/// let settings = RenderSettings::builder()
///     .preset(ResolutionPreset::Uhd4K)
///     .format(ImageFormat::Jpeg)
///     .quality(0.85)
///     .build()
///     .unwrap();
/// assert_eq!(settings.format.extension(), "jpeg");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// How the scale factor is derived. Default: [`ResolutionPreset::Qhd2K`].
    pub preset: ResolutionPreset,

    /// Scale applied when `preset` is [`ResolutionPreset::Custom`]. Default: 2.0.
    ///
    /// Ignored by every other preset. Set it through
    /// [`RenderSettings::set_custom_scale`] so the preset follows.
    pub custom_scale: f32,

    /// Output image format. Default: PNG.
    pub format: ImageFormat,

    /// Encode quality in `[0, 1]`, only meaningful for JPEG. Default: 1.0.
    pub quality: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            preset: ResolutionPreset::Qhd2K,
            custom_scale: 2.0,
            format: ImageFormat::Png,
            quality: 1.0,
        }
    }
}

impl RenderSettings {
    /// Create a new builder for `RenderSettings`.
    pub fn builder() -> RenderSettingsBuilder {
        RenderSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Set the custom scale, switching the active preset to `Custom`.
    pub fn set_custom_scale(&mut self, scale: f32) {
        self.custom_scale = scale;
        self.preset = ResolutionPreset::Custom;
    }

    /// JPEG encoder quality on the 1–100 scale.
    pub fn jpeg_quality(&self) -> u8 {
        jpeg_quality(self.quality)
    }

    /// Check the invariants the builder enforces.
    pub fn validate(&self) -> Result<(), Pdf2ImgError> {
        if !self.custom_scale.is_finite() || self.custom_scale <= 0.0 {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "custom scale must be a positive number, got {}",
                self.custom_scale
            )));
        }
        if !self.quality.is_finite() || !(0.0..=1.0).contains(&self.quality) {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "quality must be within 0.0–1.0, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Map a `[0, 1]` quality to the encoder's 1–100 range.
pub(crate) fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Builder for [`RenderSettings`].
#[derive(Debug)]
pub struct RenderSettingsBuilder {
    settings: RenderSettings,
}

impl RenderSettingsBuilder {
    pub fn preset(mut self, preset: ResolutionPreset) -> Self {
        self.settings.preset = preset;
        self
    }

    /// Also switches the preset to `Custom`.
    pub fn custom_scale(mut self, scale: f32) -> Self {
        self.settings.set_custom_scale(scale);
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.settings.format = format;
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.settings.quality = quality;
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<RenderSettings, Pdf2ImgError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the render scale for a page is chosen.
///
/// The three width presets pin the output width regardless of the page's
/// physical size or orientation; `Original` and `Custom` apply a fixed
/// factor to the page's native 72-units-per-inch geometry.
///
/// | Preset | Rule |
/// |--------|------|
/// | `1K` | width = 1920 px |
/// | `2K` | width = 2560 px (default) |
/// | `4K` | width = 3840 px |
/// | `Original` | scale = 1.5 |
/// | `Custom` | scale = [`RenderSettings::custom_scale`] |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResolutionPreset {
    #[serde(rename = "1K")]
    Fhd1K,
    #[default]
    #[serde(rename = "2K")]
    Qhd2K,
    #[serde(rename = "4K")]
    Uhd4K,
    Original,
    Custom,
}

impl ResolutionPreset {
    pub const ALL: [ResolutionPreset; 5] = [
        ResolutionPreset::Fhd1K,
        ResolutionPreset::Qhd2K,
        ResolutionPreset::Uhd4K,
        ResolutionPreset::Original,
        ResolutionPreset::Custom,
    ];

    /// Target pixel width for the width presets, `None` otherwise.
    pub fn target_width(self) -> Option<u32> {
        match self {
            ResolutionPreset::Fhd1K => Some(1920),
            ResolutionPreset::Qhd2K => Some(2560),
            ResolutionPreset::Uhd4K => Some(3840),
            ResolutionPreset::Original | ResolutionPreset::Custom => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResolutionPreset::Fhd1K => "1K",
            ResolutionPreset::Qhd2K => "2K",
            ResolutionPreset::Uhd4K => "4K",
            ResolutionPreset::Original => "Original",
            ResolutionPreset::Custom => "Custom",
        }
    }
}

impl fmt::Display for ResolutionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResolutionPreset {
    type Err = Pdf2ImgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1k" | "fhd" => Ok(ResolutionPreset::Fhd1K),
            "2k" | "qhd" => Ok(ResolutionPreset::Qhd2K),
            "4k" | "uhd" => Ok(ResolutionPreset::Uhd4K),
            "original" => Ok(ResolutionPreset::Original),
            "custom" => Ok(ResolutionPreset::Custom),
            other => Err(Pdf2ImgError::InvalidConfig(format!(
                "unknown resolution preset '{other}' (expected 1k, 2k, 4k, original or custom)"
            ))),
        }
    }
}

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless; quality is ignored.
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    /// File extension used for exported files, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = Pdf2ImgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(Pdf2ImgError::InvalidConfig(format!(
                "unknown image format '{other}' (expected png or jpeg)"
            ))),
        }
    }
}

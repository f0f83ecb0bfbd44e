//! Scale resolution: preset + page width → render scale factor.
//!
//! Width presets divide a fixed target width by the page's native width,
//! so the raster comes out exactly that wide whatever the page size or
//! orientation. No clamping is applied: a pathologically small page gives
//! a huge factor, and the rasterizer decides whether the surface fits.

use crate::config::{RenderSettings, ResolutionPreset};

/// Fixed factor for [`ResolutionPreset::Original`]: native 72 dpi plus 50 %
/// for legibility.
pub const ORIGINAL_SCALE: f32 = 1.5;

/// Scale factor for one page.
///
/// `intrinsic_width` is the page width at scale 1 and is only consulted by
/// the width presets.
pub fn resolve_scale(preset: ResolutionPreset, custom_scale: f32, intrinsic_width: f32) -> f32 {
    match preset {
        ResolutionPreset::Original => ORIGINAL_SCALE,
        ResolutionPreset::Custom => custom_scale,
        width_preset => {
            let target = width_preset.target_width().unwrap_or_default() as f32;
            target / intrinsic_width
        }
    }
}

impl RenderSettings {
    /// [`resolve_scale`] with these settings.
    pub fn scale_for(&self, intrinsic_width: f32) -> f32 {
        resolve_scale(self.preset, self.custom_scale, intrinsic_width)
    }
}

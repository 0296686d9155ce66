pub mod config;
pub mod mixer;
pub mod pipeline;
pub mod preset;
pub mod weights;

pub use config::{
    BasicEffectParams, BlendMode, BlendSettings, EffectMode, GlobalReactivityConfig,
    ReactivityConfig, SharedConfig,
};
pub use mixer::{
    compute_intensity, scale_by_sensitivity, smooth, FrameIntensitySnapshot, IntensityMixer,
    SmoothingState,
};
pub use pipeline::EffectPipeline;
pub use preset::{PresetManager, ReactivityPreset};
pub use weights::{BandWeights, EffectWeights};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Processing stage of an effect. Stages always run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCategory {
    Geometric,
    Color,
    Artistic,
    Corruption,
    Stylization,
    Retro,
    Blur,
}

impl EffectCategory {
    pub const ALL: [EffectCategory; 7] = [
        EffectCategory::Geometric,
        EffectCategory::Color,
        EffectCategory::Artistic,
        EffectCategory::Corruption,
        EffectCategory::Stylization,
        EffectCategory::Retro,
        EffectCategory::Blur,
    ];

    /// Effects of this category in their fixed application order.
    pub fn effects(self) -> impl Iterator<Item = EffectId> {
        EffectId::ALL.into_iter().filter(move |e| e.category() == self)
    }
}

/// Every effect the pipeline knows, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectId {
    Zoom,
    Rotation,
    ColorGrade,
    Brightness,
    PixelSort,
    Kaleidoscope,
    WaveDistortion,
    Glitch,
    DataCorruption,
    Artifacts,
    Posterization,
    EdgeDetection,
    Vhs,
    ScanLines,
    Blur,
}

impl EffectId {
    pub const COUNT: usize = 15;

    pub const ALL: [EffectId; EffectId::COUNT] = [
        EffectId::Zoom,
        EffectId::Rotation,
        EffectId::ColorGrade,
        EffectId::Brightness,
        EffectId::PixelSort,
        EffectId::Kaleidoscope,
        EffectId::WaveDistortion,
        EffectId::Glitch,
        EffectId::DataCorruption,
        EffectId::Artifacts,
        EffectId::Posterization,
        EffectId::EdgeDetection,
        EffectId::Vhs,
        EffectId::ScanLines,
        EffectId::Blur,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn category(self) -> EffectCategory {
        match self {
            EffectId::Zoom | EffectId::Rotation => EffectCategory::Geometric,
            EffectId::ColorGrade | EffectId::Brightness => EffectCategory::Color,
            EffectId::PixelSort | EffectId::Kaleidoscope | EffectId::WaveDistortion => {
                EffectCategory::Artistic
            }
            EffectId::Glitch | EffectId::DataCorruption | EffectId::Artifacts => {
                EffectCategory::Corruption
            }
            EffectId::Posterization | EffectId::EdgeDetection => EffectCategory::Stylization,
            EffectId::Vhs | EffectId::ScanLines => EffectCategory::Retro,
            EffectId::Blur => EffectCategory::Blur,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectId::Zoom => "zoom",
            EffectId::Rotation => "rotation",
            EffectId::ColorGrade => "color_grade",
            EffectId::Brightness => "brightness",
            EffectId::PixelSort => "pixel_sort",
            EffectId::Kaleidoscope => "kaleidoscope",
            EffectId::WaveDistortion => "wave_distortion",
            EffectId::Glitch => "glitch",
            EffectId::DataCorruption => "data_corruption",
            EffectId::Artifacts => "artifacts",
            EffectId::Posterization => "posterization",
            EffectId::EdgeDetection => "edge_detection",
            EffectId::Vhs => "vhs",
            EffectId::ScanLines => "scan_lines",
            EffectId::Blur => "blur",
        }
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        EffectId::ALL
            .into_iter()
            .find(|e| e.name() == wanted)
            .ok_or_else(|| format!("unknown effect '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_order_follows_categories() {
        let mut last = EffectCategory::Geometric;
        for effect in EffectId::ALL {
            assert!(effect.category() >= last, "{effect} out of category order");
            last = effect.category();
        }
    }

    #[test]
    fn test_every_effect_in_one_category() {
        let total: usize = EffectCategory::ALL.iter().map(|c| c.effects().count()).sum();
        assert_eq!(total, EffectId::COUNT);
        for (i, effect) in EffectId::ALL.iter().enumerate() {
            assert_eq!(effect.index(), i);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("pixel-sort".parse::<EffectId>().unwrap(), EffectId::PixelSort);
        assert_eq!("VHS".parse::<EffectId>().unwrap(), EffectId::Vhs);
        assert!("plasma".parse::<EffectId>().is_err());
        for effect in EffectId::ALL {
            assert_eq!(effect.name().parse::<EffectId>().unwrap(), effect);
        }
    }
}

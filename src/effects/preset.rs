use super::config::{BlendMode, EffectMode, ReactivityConfig};
use super::weights::BandWeights;
use super::EffectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactivityPreset {
    pub name: String,
    pub description: String,
    pub config: ReactivityConfig,
}

impl ReactivityPreset {
    fn new(name: &str, description: &str, config: ReactivityConfig) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            config,
        }
    }
}

fn subtle() -> ReactivityConfig {
    let mut config = ReactivityConfig::default();
    config.global.sensitivity = 0.4;
    config.global.effect_smoothing = 0.6;
    config.basic.zoom_factor = 1.1;
    config.basic.rotation_angle = 2.0;
    config.basic.hue_shift_max = 15.0;
    config.set_enabled(EffectId::Blur, false);
    config
}

fn bass_driven() -> ReactivityConfig {
    let mut config = ReactivityConfig::default();
    config.global.sensitivity = 0.9;
    config.global.effect_smoothing = 0.2;
    config.basic.zoom_factor = 1.5;
    config.set_enabled(EffectId::WaveDistortion, true);
    config.set_enabled(EffectId::Rotation, false);
    config
        .weights
        .set(EffectId::Brightness, BandWeights::new(0.3, 0.7, 0.0, 0.0, 0.0));
    config
}

fn glitch_storm() -> ReactivityConfig {
    let mut config = ReactivityConfig::default();
    config.global.sensitivity = 1.0;
    config.global.smoothness = 0.2;
    config.global.effect_smoothing = 0.0;
    for effect in [
        EffectId::PixelSort,
        EffectId::Glitch,
        EffectId::DataCorruption,
        EffectId::Artifacts,
        EffectId::EdgeDetection,
    ] {
        config.set_enabled(effect, true);
    }
    config.set_enabled(EffectId::Blur, false);
    config.blend.mode = EffectMode::Layer;
    config.blend.blend_mode = BlendMode::Difference;
    config.blend.opacity = 0.7;
    config
}

fn retro_broadcast() -> ReactivityConfig {
    let mut config = ReactivityConfig::default();
    config.global.sensitivity = 0.6;
    for effect in [EffectId::Vhs, EffectId::ScanLines, EffectId::Posterization] {
        config.set_enabled(effect, true);
    }
    config.set_enabled(EffectId::Rotation, false);
    config.blend.mode = EffectMode::Layer;
    config.blend.blend_mode = BlendMode::Screen;
    config.blend.opacity = 0.6;
    config
}

pub struct PresetManager {
    presets: Vec<ReactivityPreset>,
    current_preset: usize,
}

impl PresetManager {
    pub fn new() -> Self {
        let presets = vec![
            ReactivityPreset::new(
                "Subtle",
                "Gentle zoom and color drift with heavy smoothing",
                subtle(),
            ),
            ReactivityPreset::new(
                "Bass Driven",
                "Hard beat zooms and wave distortion following the low end",
                bass_driven(),
            ),
            ReactivityPreset::new(
                "Glitch Storm",
                "Unsmoothed corruption effects layered with difference blending",
                glitch_storm(),
            ),
            ReactivityPreset::new(
                "Retro Broadcast",
                "VHS tracking, scan lines and posterized color",
                retro_broadcast(),
            ),
        ];

        Self {
            presets,
            current_preset: 0,
        }
    }

    pub fn get_current_preset(&self) -> &ReactivityPreset {
        &self.presets[self.current_preset]
    }

    pub fn set_current_preset(&mut self, index: usize) {
        if index < self.presets.len() {
            self.current_preset = index;
        }
    }

    /// Select a preset by case-insensitive name.
    pub fn select_by_name(&mut self, name: &str) -> Option<&ReactivityPreset> {
        let index = self
            .presets
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name.trim()))?;
        self.current_preset = index;
        Some(&self.presets[index])
    }

    pub fn get_presets(&self) -> &[ReactivityPreset] {
        &self.presets
    }

    pub fn current_preset_index(&self) -> usize {
        self.current_preset
    }
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new()
    }
}

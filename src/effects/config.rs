use super::weights::EffectWeights;
use super::EffectId;
use crate::error::{ReactiveError, Result};
use arc_swap::ArcSwap;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Global reactivity controls, all in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalReactivityConfig {
    /// 0 keeps every effect at half of its band energy, 1 is fully proportional.
    pub sensitivity: f32,
    /// Width of the moving average applied to sampled band energies.
    pub smoothness: f32,
    /// Weight given to the previous frame's intensity.
    pub effect_smoothing: f32,
}

impl Default for GlobalReactivityConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.7,
            smoothness: 0.8,
            effect_smoothing: 0.3,
        }
    }
}

impl GlobalReactivityConfig {
    /// Number of video-frame-spaced energy samples averaged per frame.
    pub fn smoothing_window(&self) -> usize {
        ((self.smoothness * 5.0).floor() as usize).max(1)
    }
}

/// Maximum strengths of the basic effects and their beat triggers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicEffectParams {
    /// Scale factor at full zoom intensity.
    pub zoom_factor: f32,
    /// Degrees at full rotation intensity.
    pub rotation_angle: f32,
    /// Degrees at full color grade intensity.
    pub hue_shift_max: f32,
    pub beat_triggered_zoom: bool,
    /// Seconds either side of a bass beat during which zoom reacts.
    pub beat_window: f64,
    pub snare_triggered_flash: bool,
    pub snare_window: f64,
}

impl Default for BasicEffectParams {
    fn default() -> Self {
        Self {
            zoom_factor: 1.3,
            rotation_angle: 5.0,
            hue_shift_max: 30.0,
            beat_triggered_zoom: true,
            beat_window: 0.2,
            snare_triggered_flash: true,
            snare_window: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMode {
    /// Effects replace the frame.
    #[default]
    Direct,
    /// Effects are blended over the geometrically transformed original.
    Layer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    SoftLight,
    HardLight,
    ColorDodge,
    ColorBurn,
    Darken,
    Lighten,
    Difference,
    Exclusion,
}

impl BlendMode {
    pub const ALL: [BlendMode; 12] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::SoftLight,
        BlendMode::HardLight,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::Difference,
        BlendMode::Exclusion,
    ];
}

impl std::str::FromStr for BlendMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let quoted = format!("\"{}\"", s.trim().to_ascii_lowercase().replace(['-', ' '], "_"));
        serde_json::from_str(&quoted).map_err(|_| format!("unknown blend mode '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendSettings {
    pub mode: EffectMode,
    pub blend_mode: BlendMode,
    /// 0.0-1.0, weight of the effected layer.
    pub opacity: f32,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            mode: EffectMode::Direct,
            blend_mode: BlendMode::Normal,
            opacity: 0.5,
        }
    }
}

/// Complete user-facing configuration of the reactive pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactivityConfig {
    pub enabled: BTreeSet<EffectId>,
    pub weights: EffectWeights,
    pub global: GlobalReactivityConfig,
    pub basic: BasicEffectParams,
    pub blend: BlendSettings,
    /// Seed for the randomised effects.
    pub seed: u64,
}

impl Default for ReactivityConfig {
    fn default() -> Self {
        Self {
            enabled: [
                EffectId::Zoom,
                EffectId::Rotation,
                EffectId::ColorGrade,
                EffectId::Brightness,
                EffectId::Blur,
            ]
            .into_iter()
            .collect(),
            weights: EffectWeights::default(),
            global: GlobalReactivityConfig::default(),
            basic: BasicEffectParams::default(),
            blend: BlendSettings::default(),
            seed: 42,
        }
    }
}

impl ReactivityConfig {
    pub fn is_enabled(&self, effect: EffectId) -> bool {
        self.enabled.contains(&effect)
    }

    pub fn set_enabled(&mut self, effect: EffectId, enabled: bool) {
        if enabled {
            self.enabled.insert(effect);
        } else {
            self.enabled.remove(&effect);
        }
    }

    pub fn enable_all(&mut self) {
        self.enabled = EffectId::ALL.into_iter().collect();
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("sensitivity", self.global.sensitivity)?;
        check_unit("smoothness", self.global.smoothness)?;
        check_unit("effect_smoothing", self.global.effect_smoothing)?;
        check_unit("opacity", self.blend.opacity)?;

        let basic = &self.basic;
        if !basic.zoom_factor.is_finite() || basic.zoom_factor < 1.0 {
            return Err(ReactiveError::InvalidConfig(format!(
                "zoom_factor must be at least 1.0, got {}",
                basic.zoom_factor
            )));
        }
        for (name, value) in [
            ("rotation_angle", basic.rotation_angle),
            ("hue_shift_max", basic.hue_shift_max),
        ] {
            if !value.is_finite() {
                return Err(ReactiveError::InvalidConfig(format!(
                    "{name} must be finite"
                )));
            }
        }
        for (name, value) in [
            ("beat_window", basic.beat_window),
            ("snare_window", basic.snare_window),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ReactiveError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        self.weights.validate()?;
        for (effect, weights) in self.weights.iter() {
            if weights.sum() > 0.0 && !weights.is_normalized() {
                warn!(
                    "Weights for {} sum to {:.3}; they will be renormalized",
                    effect,
                    weights.sum()
                );
            }
        }

        Ok(())
    }

    /// Load and validate a JSON configuration. Missing fields take defaults.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ReactiveError::InvalidConfig(format!(
            "{name} must be within 0.0-1.0, got {value}"
        )));
    }
    Ok(())
}

/// Configuration shared between an editor and an in-flight render.
///
/// Writers swap in a whole new validated config; readers take an `Arc`
/// snapshot and never observe a half-applied change.
#[derive(Debug)]
pub struct SharedConfig {
    inner: ArcSwap<ReactivityConfig>,
}

impl SharedConfig {
    pub fn new(config: ReactivityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: ArcSwap::from_pointee(config),
        })
    }

    pub fn snapshot(&self) -> Arc<ReactivityConfig> {
        self.inner.load_full()
    }

    pub fn store(&self, config: ReactivityConfig) -> Result<()> {
        config.validate()?;
        self.inner.store(Arc::new(config));
        Ok(())
    }

    /// Apply an edit to a copy of the current config and publish it.
    pub fn update<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut ReactivityConfig),
    {
        let mut next = ReactivityConfig::clone(&self.inner.load());
        edit(&mut next);
        self.store(next)
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            inner: ArcSwap::from_pointee(ReactivityConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReactivityConfig::default();
        config.validate().unwrap();
        assert_eq!(config.global.sensitivity, 0.7);
        assert!(config.is_enabled(EffectId::Zoom));
        assert!(!config.is_enabled(EffectId::PixelSort));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut config = ReactivityConfig::default();
        config.global.sensitivity = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ReactiveError::InvalidConfig(_))
        ));

        let mut config = ReactivityConfig::default();
        config.global.smoothness = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = ReactivityConfig::default();
        config.basic.zoom_factor = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_smoothing_window() {
        let mut global = GlobalReactivityConfig::default();
        assert_eq!(global.smoothing_window(), 4);
        global.smoothness = 0.0;
        assert_eq!(global.smoothing_window(), 1);
        global.smoothness = 1.0;
        assert_eq!(global.smoothing_window(), 5);
    }

    #[test]
    fn test_json_round_trip_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ReactivityConfig::default();
        config.set_enabled(EffectId::Kaleidoscope, true);
        config.blend.blend_mode = BlendMode::SoftLight;
        config.save_json(&path).unwrap();
        assert_eq!(ReactivityConfig::load_json(&path).unwrap(), config);

        std::fs::write(&path, r#"{"global": {"sensitivity": 1.0}}"#).unwrap();
        let partial = ReactivityConfig::load_json(&path).unwrap();
        assert_eq!(partial.global.sensitivity, 1.0);
        assert_eq!(partial.global.smoothness, 0.8);
        assert_eq!(partial.weights, EffectWeights::default());
    }

    #[test]
    fn test_blend_mode_parse() {
        assert_eq!("soft-light".parse::<BlendMode>().unwrap(), BlendMode::SoftLight);
        assert_eq!("Color Dodge".parse::<BlendMode>().unwrap(), BlendMode::ColorDodge);
        assert!("plasma".parse::<BlendMode>().is_err());
    }

    #[test]
    fn test_shared_config_snapshots_are_stable() {
        let shared = SharedConfig::default();
        let before = shared.snapshot();
        shared.update(|c| c.global.sensitivity = 1.0).unwrap();
        assert_eq!(before.global.sensitivity, 0.7);
        assert_eq!(shared.snapshot().global.sensitivity, 1.0);

        assert!(shared.update(|c| c.global.sensitivity = 2.0).is_err());
        assert_eq!(shared.snapshot().global.sensitivity, 1.0);
    }
}

use super::EffectId;
use crate::audio::{Band, FrequencyBands};
use crate::error::{ReactiveError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weight sums this close to 1.0 are used as-is.
pub const WEIGHT_SUM_TOLERANCE: f32 = 1e-4;

/// How strongly one effect follows each band.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BandWeights {
    pub sub_bass: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub high_treble: f32,
}

impl BandWeights {
    pub const fn new(sub_bass: f32, bass: f32, mid: f32, treble: f32, high_treble: f32) -> Self {
        Self {
            sub_bass,
            bass,
            mid,
            treble,
            high_treble,
        }
    }

    pub fn to_array(&self) -> [f32; Band::COUNT] {
        [self.sub_bass, self.bass, self.mid, self.treble, self.high_treble]
    }

    pub fn get(&self, band: Band) -> f32 {
        self.to_array()[band.index()]
    }

    pub fn sum(&self) -> f32 {
        self.to_array().iter().sum()
    }

    /// `Σ weight * energy` without any normalization.
    pub fn dot(&self, energy: &FrequencyBands) -> f32 {
        self.to_array()
            .iter()
            .zip(energy.to_array())
            .map(|(w, e)| w * e)
            .sum()
    }

    /// Weighted band energy. Weights that do not sum to 1 are renormalized;
    /// an all-zero weight set yields 0.
    pub fn mix(&self, energy: &FrequencyBands) -> f32 {
        let sum = self.sum();
        if sum <= 0.0 {
            return 0.0;
        }
        let dot = self.dot(energy);
        if (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE {
            dot
        } else {
            dot / sum
        }
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }

    pub fn validate(&self, effect: EffectId) -> Result<()> {
        for band in Band::ALL {
            let w = self.get(band);
            if !w.is_finite() || w < 0.0 {
                return Err(ReactiveError::InvalidConfig(format!(
                    "{effect}: {} weight must be a non-negative number, got {w}",
                    band.name()
                )));
            }
        }
        Ok(())
    }
}

/// Per-effect band weights. Effects without an entry react to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectWeights(BTreeMap<EffectId, BandWeights>);

impl EffectWeights {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, effect: EffectId) -> BandWeights {
        self.0.get(&effect).copied().unwrap_or_default()
    }

    pub fn set(&mut self, effect: EffectId, weights: BandWeights) {
        self.0.insert(effect, weights);
    }

    pub fn iter(&self) -> impl Iterator<Item = (EffectId, &BandWeights)> {
        self.0.iter().map(|(e, w)| (*e, w))
    }

    pub fn validate(&self) -> Result<()> {
        for (effect, weights) in self.iter() {
            weights.validate(effect)?;
        }
        Ok(())
    }
}

impl Default for EffectWeights {
    fn default() -> Self {
        let table = [
            (EffectId::Zoom, BandWeights::new(1.0 / 6.0, 5.0 / 6.0, 0.0, 0.0, 0.0)),
            (EffectId::Rotation, BandWeights::new(0.0, 0.0, 0.0, 2.0 / 3.0, 1.0 / 3.0)),
            (EffectId::ColorGrade, BandWeights::new(0.0, 0.0, 1.0, 0.0, 0.0)),
            (EffectId::Brightness, BandWeights::new(0.0, 0.5, 0.5, 0.0, 0.0)),
            (EffectId::PixelSort, BandWeights::new(0.0, 0.0, 0.7, 0.3, 0.0)),
            (EffectId::Kaleidoscope, BandWeights::new(0.0, 0.0, 0.0, 0.5, 0.5)),
            (EffectId::WaveDistortion, BandWeights::new(0.3, 0.7, 0.0, 0.0, 0.0)),
            (EffectId::Glitch, BandWeights::new(0.0, 0.0, 0.0, 0.6, 0.4)),
            (EffectId::DataCorruption, BandWeights::new(0.0, 0.0, 0.0, 0.5, 0.5)),
            (EffectId::Artifacts, BandWeights::new(0.0, 0.0, 0.0, 0.5, 0.5)),
            (EffectId::Posterization, BandWeights::new(0.0, 0.0, 0.8, 0.2, 0.0)),
            (EffectId::EdgeDetection, BandWeights::new(0.0, 0.0, 0.0, 0.4, 0.6)),
            (EffectId::Vhs, BandWeights::new(0.0, 0.3, 0.3, 0.4, 0.0)),
            (EffectId::ScanLines, BandWeights::new(0.0, 0.2, 0.3, 0.5, 0.0)),
            (EffectId::Blur, BandWeights::new(0.0, 1.0, 0.0, 0.0, 0.0)),
        ];
        Self(table.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_normalized() {
        let weights = EffectWeights::default();
        for effect in EffectId::ALL {
            assert!(weights.get(effect).is_normalized(), "{effect}");
        }
        assert_eq!(weights.get(EffectId::PixelSort).mid, 0.7);
        assert_eq!(weights.get(EffectId::EdgeDetection).bass, 0.0);
    }

    #[test]
    fn test_mix_renormalizes() {
        let energy = FrequencyBands::from_array([0.0, 1.0, 0.5, 0.0, 0.0]);
        let doubled = BandWeights::new(0.0, 1.0, 1.0, 0.0, 0.0);
        assert!((doubled.mix(&energy) - 0.75).abs() < 1e-6);
        assert_eq!(BandWeights::default().mix(&energy), 0.0);
    }

    #[test]
    fn test_mix_normalized_is_plain_dot() {
        let energy = FrequencyBands::from_array([0.2, 0.4, 0.6, 0.8, 1.0]);
        let w = BandWeights::new(0.0, 0.0, 0.7, 0.3, 0.0);
        assert_eq!(w.mix(&energy), w.dot(&energy));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut weights = EffectWeights::default();
        weights.set(EffectId::Vhs, BandWeights::new(0.0, -0.1, 0.5, 0.6, 0.0));
        assert!(matches!(
            weights.validate(),
            Err(ReactiveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_uses_effect_names() {
        let json = serde_json::to_string(&EffectWeights::default()).unwrap();
        assert!(json.contains("\"wave_distortion\""));
        let back: EffectWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EffectWeights::default());
    }
}

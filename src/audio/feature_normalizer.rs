use super::{Band, FrequencyBands};
use log::debug;
use serde::{Deserialize, Serialize};

/// Parameters of the whole-track band normalization.
///
/// Every band is divided by its own reference ceiling and clamped:
/// `normalized = (raw / ceiling).clamp(0.0, 1.0)` where
/// `ceiling = max(percentile(band), relative_floor * max_over_bands(percentile))`.
///
/// The percentile keeps a single outlier transient from flattening the rest
/// of the track. The relative floor stops a band that carries nothing but
/// leakage from being stretched to full scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParameters {
    /// 0.0-1.0, position of the reference ceiling in each band's distribution.
    pub percentile: f32,
    /// Fraction of the loudest band's ceiling that any band's ceiling is raised to.
    pub relative_floor: f32,
    /// Below this raw ceiling the whole track is treated as silence.
    pub silence_threshold: f32,
}

impl Default for NormalizationParameters {
    fn default() -> Self {
        Self {
            percentile: 0.98,
            relative_floor: 0.05,
            silence_threshold: 1e-8,
        }
    }
}

/// Deterministic per-band normalizer applied to a complete track.
#[derive(Debug, Clone, Default)]
pub struct BandNormalizer {
    parameters: NormalizationParameters,
}

impl BandNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(parameters: NormalizationParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &NormalizationParameters {
        &self.parameters
    }

    /// Reference ceiling for each band of a raw series.
    pub fn reference_ceilings(&self, raw: &[FrequencyBands]) -> FrequencyBands {
        let mut ceilings = FrequencyBands::default();
        for band in Band::ALL {
            let values: Vec<f32> = raw.iter().map(|f| f.get(band)).collect();
            ceilings.set(band, percentile(&values, self.parameters.percentile));
        }

        let loudest = ceilings.to_array().into_iter().fold(0.0f32, f32::max);
        let floor = loudest * self.parameters.relative_floor;
        ceilings.map(|c| c.max(floor))
    }

    /// Normalize a whole raw series to 0.0-1.0 per band.
    pub fn normalize(&self, raw: &[FrequencyBands]) -> Vec<FrequencyBands> {
        let ceilings = self.reference_ceilings(raw);
        let loudest = ceilings.to_array().into_iter().fold(0.0f32, f32::max);

        debug!(
            "Normalization ceilings: sub_bass={:.6}, bass={:.6}, mid={:.6}, treble={:.6}, high_treble={:.6}",
            ceilings.sub_bass, ceilings.bass, ceilings.mid, ceilings.treble, ceilings.high_treble
        );

        if loudest < self.parameters.silence_threshold {
            return vec![FrequencyBands::default(); raw.len()];
        }

        let ceilings = ceilings.to_array();
        raw.iter()
            .map(|frame| {
                let mut out = [0.0f32; Band::COUNT];
                for (i, value) in frame.to_array().into_iter().enumerate() {
                    out[i] = Self::normalize_value(value, ceilings[i]);
                }
                FrequencyBands::from_array(out)
            })
            .collect()
    }

    fn normalize_value(value: f32, max_value: f32) -> f32 {
        if max_value <= 0.0 {
            return 0.0;
        }
        (value / max_value).clamp(0.0, 1.0)
    }
}

/// Nearest-rank percentile, `p` in 0.0-1.0. Empty input yields 0.
pub(crate) fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p.clamp(0.0, 1.0) * (sorted.len() - 1) as f32).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(bass: &[f32], treble: &[f32]) -> Vec<FrequencyBands> {
        bass.iter()
            .zip(treble)
            .map(|(&b, &t)| FrequencyBands {
                bass: b,
                treble: t,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let values: Vec<f32> = (0..=100).map(|v| v as f32).collect();
        assert_eq!(percentile(&values, 0.5), 50.0);
        assert_eq!(percentile(&values, 1.0), 100.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_silence_stays_zero() {
        let raw = vec![FrequencyBands::default(); 32];
        let normalized = BandNormalizer::new().normalize(&raw);
        assert_eq!(normalized.len(), 32);
        assert!(normalized.iter().all(|f| f.total() == 0.0));
    }

    #[test]
    fn test_loudest_frame_maps_to_one() {
        let bass: Vec<f32> = (0..100).map(|i| i as f32 * 0.01).collect();
        let raw = frames(&bass, &vec![0.0; 100]);
        let normalized = BandNormalizer::new().normalize(&raw);
        assert_eq!(normalized[99].bass, 1.0);
        assert_eq!(normalized[0].bass, 0.0);
        assert!(normalized.iter().all(|f| (0.0..=1.0).contains(&f.bass)));
    }

    #[test]
    fn test_leakage_band_is_not_stretched() {
        let bass = vec![1.0; 50];
        let treble = vec![1e-5; 50];
        let normalized = BandNormalizer::new().normalize(&frames(&bass, &treble));
        // 1e-5 against a floor of 0.05 * 1.0
        assert!(normalized[0].treble < 0.001);
        assert_eq!(normalized[0].bass, 1.0);
    }

    #[test]
    fn test_quiet_band_keeps_own_scale_above_floor() {
        let bass = vec![1.0; 50];
        let treble = vec![0.2; 50];
        let normalized = BandNormalizer::new().normalize(&frames(&bass, &treble));
        assert_eq!(normalized[10].treble, 1.0);
    }
}

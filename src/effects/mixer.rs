use super::config::{GlobalReactivityConfig, ReactivityConfig};
use super::weights::EffectWeights;
use super::EffectId;
use crate::audio::{sample_at, sample_at_strict, AudioAnalysis, BeatKind, FrequencyBands};
use crate::error::{ReactiveError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Apply the global sensitivity to a mixed band energy.
///
/// Sensitivity 0 halves the energy, sensitivity 1 passes it through; the
/// result is clamped to 0.0-1.0.
pub fn scale_by_sensitivity(base: f32, sensitivity: f32) -> f32 {
    (base * (0.5 + sensitivity * 0.5)).clamp(0.0, 1.0)
}

/// One step of exponential smoothing. With no history the current value is
/// returned unchanged.
pub fn smooth(current: f32, previous: Option<f32>, factor: f32) -> f32 {
    match previous {
        Some(previous) => previous * factor + current * (1.0 - factor),
        None => current,
    }
}

/// Intensity of one effect from its weighted band energy.
pub fn compute_intensity(
    effect: EffectId,
    energy: &FrequencyBands,
    weights: &EffectWeights,
    global: &GlobalReactivityConfig,
    previous: Option<f32>,
) -> f32 {
    let base = weights.get(effect).mix(energy);
    let scaled = scale_by_sensitivity(base, global.sensitivity);
    smooth(scaled, previous, global.effect_smoothing)
}

/// Previous-frame intensity per effect. This is the only state carried from
/// one frame to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmoothingState {
    previous: [Option<f32>; EffectId::COUNT],
}

impl SmoothingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self, effect: EffectId) -> Option<f32> {
        self.previous[effect.index()]
    }

    pub fn record(&mut self, effect: EffectId, intensity: f32) {
        self.previous[effect.index()] = Some(intensity);
    }

    pub fn forget(&mut self, effect: EffectId) {
        self.previous[effect.index()] = None;
    }

    pub fn reset(&mut self) {
        self.previous = [None; EffectId::COUNT];
    }
}

/// Per-effect intensities for one output frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameIntensitySnapshot {
    pub frame_index: usize,
    pub timestamp: f64,
    /// Smoothed band energy the intensities were mixed from.
    pub energy: FrequencyBands,
    intensities: [f32; EffectId::COUNT],
}

impl FrameIntensitySnapshot {
    /// A snapshot with every effect at zero.
    pub fn idle(frame_index: usize, timestamp: f64) -> Self {
        Self {
            frame_index,
            timestamp,
            energy: FrequencyBands::default(),
            intensities: [0.0; EffectId::COUNT],
        }
    }

    pub fn get(&self, effect: EffectId) -> f32 {
        self.intensities[effect.index()]
    }

    pub fn set(&mut self, effect: EffectId, intensity: f32) {
        self.intensities[effect.index()] = intensity.clamp(0.0, 1.0);
    }

    pub fn is_idle(&self) -> bool {
        self.intensities.iter().all(|&i| i <= 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EffectId, f32)> + '_ {
        EffectId::ALL.into_iter().map(|e| (e, self.get(e)))
    }
}

/// Turns an analysed track into per-frame effect intensities.
///
/// Frame `i` sits at `i / fps` seconds. Band energies are averaged over a
/// small window of neighbouring frame times (see
/// [`GlobalReactivityConfig::smoothing_window`]), mixed per effect with the
/// configured weights, scaled by sensitivity and finally smoothed against the
/// previous frame.
#[derive(Debug, Clone)]
pub struct IntensityMixer {
    analysis: Arc<AudioAnalysis>,
    fps: f64,
}

impl IntensityMixer {
    pub fn new(analysis: Arc<AudioAnalysis>, fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ReactiveError::InvalidConfig(format!(
                "frame rate must be positive, got {fps}"
            )));
        }
        Ok(Self { analysis, fps })
    }

    pub fn analysis(&self) -> &Arc<AudioAnalysis> {
        &self.analysis
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn timestamp(&self, frame_index: usize) -> f64 {
        frame_index as f64 / self.fps
    }

    /// Number of output frames covering the whole track.
    pub fn frame_count(&self) -> usize {
        ((self.analysis.duration_seconds() * self.fps).ceil() as usize).max(1)
    }

    /// Centred moving average of the band energies around a frame.
    pub fn energy_at(&self, frame_index: usize, global: &GlobalReactivityConfig) -> FrequencyBands {
        let window = global.smoothing_window();
        let t = self.timestamp(frame_index);
        if window == 1 {
            return sample_at(&self.analysis.series, t);
        }

        let center = (window - 1) as f64 / 2.0;
        let mut sum = [0.0f32; 5];
        for k in 0..window {
            let offset = (k as f64 - center) / self.fps;
            for (acc, value) in sum.iter_mut().zip(sample_at(&self.analysis.series, t + offset).to_array()) {
                *acc += value;
            }
        }
        FrequencyBands::from_array(sum.map(|s| s / window as f32))
    }

    /// Mixed energy for one effect before sensitivity and smoothing, with the
    /// beat triggers applied to zoom and brightness.
    pub fn base_intensity(
        &self,
        effect: EffectId,
        energy: &FrequencyBands,
        t: f64,
        config: &ReactivityConfig,
    ) -> f32 {
        let mixed = config.weights.get(effect).mix(energy);
        let basic = &config.basic;

        match effect {
            EffectId::Zoom if basic.beat_triggered_zoom => {
                match self.proximity(BeatKind::BassBeat, t, basic.beat_window) {
                    Some(Some(proximity)) => 0.7 * proximity + 0.3 * mixed,
                    // Outside the window of every beat.
                    Some(None) => 0.0,
                    // No beats at all, follow the bands continuously.
                    None => mixed,
                }
            }
            EffectId::Brightness if basic.snare_triggered_flash => {
                match self.proximity(BeatKind::SnareHit, t, basic.snare_window) {
                    Some(Some(proximity)) => (mixed + 0.8 * proximity).min(1.0),
                    _ => mixed,
                }
            }
            _ => mixed,
        }
    }

    /// `None` when there are no events of `kind`; otherwise the 0.0-1.0
    /// closeness to the nearest one, or `Some(None)` outside its window.
    fn proximity(&self, kind: BeatKind, t: f64, window: f64) -> Option<Option<f32>> {
        let nearest = self.analysis.nearest_event(kind, t)?;
        let distance = (nearest.timestamp - t).abs();
        if distance <= window {
            Some(Some((1.0 - distance / window).clamp(0.0, 1.0) as f32))
        } else {
            Some(None)
        }
    }

    /// Intensities for one frame, advancing the smoothing state.
    ///
    /// Disabled effects get 0 and lose their history, so re-enabling one
    /// starts from its raw intensity.
    pub fn frame_intensities(
        &self,
        frame_index: usize,
        config: &ReactivityConfig,
        state: &mut SmoothingState,
    ) -> FrameIntensitySnapshot {
        let t = self.timestamp(frame_index);
        let energy = self.energy_at(frame_index, &config.global);
        let mut snapshot = FrameIntensitySnapshot::idle(frame_index, t);
        snapshot.energy = energy;

        for effect in EffectId::ALL {
            if !config.is_enabled(effect) {
                state.forget(effect);
                continue;
            }

            let base = self.base_intensity(effect, &energy, t, config);
            let scaled = scale_by_sensitivity(base, config.global.sensitivity);
            let intensity = smooth(
                scaled,
                state.previous(effect),
                config.global.effect_smoothing,
            );
            state.record(effect, intensity);
            snapshot.set(effect, intensity);
        }

        snapshot
    }

    /// Like [`IntensityMixer::frame_intensities`] but fails with
    /// [`ReactiveError::FrameIndexOutOfRange`] when the frame lies past the
    /// end of the analysed audio. The state is left untouched on failure.
    pub fn frame_intensities_strict(
        &self,
        frame_index: usize,
        config: &ReactivityConfig,
        state: &mut SmoothingState,
    ) -> Result<FrameIntensitySnapshot> {
        sample_at_strict(&self.analysis.series, self.timestamp(frame_index))?;
        Ok(self.frame_intensities(frame_index, config, state))
    }

    /// Smoothing state as it stands after frames `0..frame_index` have been
    /// mixed in order. Only the mixer runs; no pixels are touched.
    pub fn state_before(&self, frame_index: usize, config: &ReactivityConfig) -> SmoothingState {
        let mut state = SmoothingState::new();
        if config.global.effect_smoothing <= 0.0 {
            return state;
        }
        for i in 0..frame_index {
            self.frame_intensities(i, config, &mut state);
        }
        debug!("Warmed smoothing state over {} frames", frame_index);
        state
    }
}

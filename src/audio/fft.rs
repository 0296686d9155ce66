use log::{debug, info};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::{Band, BandEnergySeries, BandNormalizer, FrequencyBands};
use crate::error::{ReactiveError, Result};

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const DEFAULT_HOP_LENGTH: usize = 512;

/// Short-time band energy extractor.
///
/// Runs a Hann-windowed STFT over the whole buffer at a fixed hop, averages
/// FFT magnitudes inside each of the five bands and hands the raw envelopes
/// to a [`BandNormalizer`]. The hop is independent of any video frame rate.
pub struct BandExtractor {
    fft_size: usize,
    hop_length: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    normalizer: BandNormalizer,
}

impl BandExtractor {
    pub fn new(fft_size: usize, hop_length: usize) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft_size,
            hop_length: hop_length.max(1),
            fft,
            window: Self::hann_window(fft_size),
            normalizer: BandNormalizer::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: BandNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    fn hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect()
    }

    /// Convert a mono sample buffer into a normalized band energy series.
    pub fn extract(&self, samples: &[f32], sample_rate: f32) -> Result<BandEnergySeries> {
        validate_input(samples, sample_rate)?;

        let raw = self.raw_band_energies(samples, sample_rate);
        let normalized = self.normalizer.normalize(&raw);
        let duration_seconds = samples.len() as f64 / sample_rate as f64;

        info!(
            "Extracted {} analysis frames ({:.2}s at {} Hz, hop {})",
            normalized.len(),
            duration_seconds,
            sample_rate,
            self.hop_length
        );

        BandEnergySeries::new(sample_rate, self.hop_length, duration_seconds, normalized)
    }

    /// Un-normalized mean magnitude per band for every hop.
    pub fn raw_band_energies(&self, samples: &[f32], sample_rate: f32) -> Vec<FrequencyBands> {
        let bins = self.band_bins(sample_rate);
        let half = self.fft_size / 2;
        let frame_count = samples.len() / self.hop_length + 1;

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];
        let mut spectrum = vec![0.0f32; half + 1];
        let mut frames = Vec::with_capacity(frame_count);

        for i in 0..frame_count {
            // Frames are centred on their hop position and zero padded at the edges.
            let center = (i * self.hop_length) as isize;
            for (j, slot) in buffer.iter_mut().enumerate() {
                let pos = center + j as isize - half as isize;
                let sample = if pos >= 0 && (pos as usize) < samples.len() {
                    samples[pos as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[j], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (k, magnitude) in spectrum.iter_mut().enumerate() {
                *magnitude = buffer[k].norm() * 2.0 / self.fft_size as f32;
            }

            let mut bands = FrequencyBands::default();
            for band in Band::ALL {
                let (start, end) = bins[band.index()];
                bands.set(band, Self::average_range(&spectrum, start, end));
            }
            frames.push(bands);
        }

        frames
    }

    /// Half-open FFT bin range `[start, end)` for each band.
    fn band_bins(&self, sample_rate: f32) -> [(usize, usize); Band::COUNT] {
        let bin_width = sample_rate / self.fft_size as f32;
        let last_bin = self.fft_size / 2;
        let mut ranges = [(0usize, 0usize); Band::COUNT];

        for band in Band::ALL {
            let (low, high) = band.frequency_range();
            let start = (low / bin_width).ceil() as usize;
            let end = ((high / bin_width).floor() as usize + 1).min(last_bin + 1);
            ranges[band.index()] = (start, end.max(start));
            debug!(
                "Band {} ({}-{} Hz) -> bins {}..{}",
                band.name(),
                low,
                high,
                start,
                end
            );
        }

        ranges
    }

    fn average_range(data: &[f32], start: usize, end: usize) -> f32 {
        if start >= end || start >= data.len() {
            return 0.0;
        }

        let end = end.min(data.len());
        let sum: f32 = data[start..end].iter().sum();
        sum / (end - start) as f32
    }
}

impl Default for BandExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE, DEFAULT_HOP_LENGTH)
    }
}

/// Extract a band energy series with the default analysis settings.
pub fn extract(samples: &[f32], sample_rate: f32) -> Result<BandEnergySeries> {
    BandExtractor::default().extract(samples, sample_rate)
}

fn validate_input(samples: &[f32], sample_rate: f32) -> Result<()> {
    if samples.is_empty() {
        return Err(ReactiveError::InvalidAudio("sample buffer is empty".to_string()));
    }
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ReactiveError::InvalidAudio(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
        return Err(ReactiveError::InvalidAudio(format!(
            "sample buffer is corrupt: non-finite value at index {pos}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, seconds: f32) -> Vec<f32> {
        let count = (sample_rate * seconds) as usize;
        (0..count)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_rejects_empty_buffer() {
        let err = extract(&[], 44100.0).unwrap_err();
        assert!(matches!(err, ReactiveError::InvalidAudio(_)));
    }

    #[test]
    fn test_rejects_bad_sample_rate() {
        assert!(extract(&[0.1, 0.2], 0.0).is_err());
        assert!(extract(&[0.1, 0.2], -44100.0).is_err());
        assert!(extract(&[0.1, 0.2], f32::NAN).is_err());
    }

    #[test]
    fn test_rejects_non_finite_samples() {
        let err = extract(&[0.0, f32::INFINITY, 0.0], 22050.0).unwrap_err();
        assert!(matches!(err, ReactiveError::InvalidAudio(_)));
    }

    #[test]
    fn test_frame_count_and_timing() {
        let samples = vec![0.0; 22050];
        let series = extract(&samples, 22050.0).unwrap();
        assert_eq!(series.len(), 22050 / DEFAULT_HOP_LENGTH + 1);
        assert!((series.duration_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_silence_is_all_zero() {
        let series = extract(&vec![0.0; 44100], 44100.0).unwrap();
        assert!(series.frames().iter().all(|f| f.total() == 0.0));
    }

    #[test]
    fn test_tone_lands_in_its_band() {
        let extractor = BandExtractor::default();
        let samples = sine(1000.0, 44100.0, 0.5);
        let raw = extractor.raw_band_energies(&samples, 44100.0);
        let middle = raw[raw.len() / 2];
        assert!(middle.mid > middle.bass * 10.0);
        assert!(middle.mid > middle.treble * 10.0);
    }

    #[test]
    fn test_normalized_values_in_unit_range() {
        let mut samples = sine(100.0, 22050.0, 1.0);
        samples.extend(sine(3000.0, 22050.0, 1.0));
        let series = extract(&samples, 22050.0).unwrap();
        for frame in series.frames() {
            for value in frame.to_array() {
                assert!((0.0..=1.0).contains(&value));
            }
        }
    }
}

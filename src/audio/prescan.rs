use super::beat_detector::{BeatDetector, TempoEstimator};
use super::fft::BandExtractor;
use super::{Band, BandEnergySeries, BeatEvent, BeatKind, FrequencyBands};
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mono PCM buffer handed to the analysis stage.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: f32,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Load a WAV file and mix it down to mono.
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let samples: Vec<f32> = interleaved
        .chunks(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect();

    info!(
        "Loaded {} ({} Hz, {} channel(s), {:.2}s)",
        path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len() as f64 / spec.sample_rate as f64
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate as f32,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyProfile {
    Low,
    Medium,
    High,
    Dynamic,
}

/// Whole-track summary of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub peak: FrequencyBands,
    pub mean: FrequencyBands,

    pub bass_beats: u32,
    pub snare_hits: u32,
    /// None when there are too few regular bass beats to tell.
    pub estimated_bpm: Option<f32>,

    pub dominant_band: Band,
    pub energy_profile: EnergyProfile,
}

impl AnalysisStatistics {
    pub fn compute(series: &BandEnergySeries, beats: &[BeatEvent]) -> Self {
        let frames = series.frames();
        let count = frames.len().max(1) as f32;

        let mut peak = FrequencyBands::default();
        let mut sum = [0.0f32; Band::COUNT];
        for frame in frames {
            for band in Band::ALL {
                let value = frame.get(band);
                peak.set(band, peak.get(band).max(value));
                sum[band.index()] += value;
            }
        }
        let mean = FrequencyBands::from_array(sum.map(|s| s / count));

        let mut dominant_band = Band::SubBass;
        for band in Band::ALL {
            if mean.get(band) > mean.get(dominant_band) {
                dominant_band = band;
            }
        }

        let levels: Vec<f32> = frames.iter().map(|f| f.total() / Band::COUNT as f32).collect();
        let avg_level = levels.iter().sum::<f32>() / count;
        let variance = levels.iter().map(|l| (l - avg_level).powi(2)).sum::<f32>() / count;

        let energy_profile = if variance > 0.1 {
            EnergyProfile::Dynamic
        } else if avg_level > 0.3 {
            EnergyProfile::High
        } else if avg_level > 0.1 {
            EnergyProfile::Medium
        } else {
            EnergyProfile::Low
        };

        Self {
            peak,
            mean,
            bass_beats: beats.iter().filter(|e| e.kind == BeatKind::BassBeat).count() as u32,
            snare_hits: beats.iter().filter(|e| e.kind == BeatKind::SnareHit).count() as u32,
            estimated_bpm: TempoEstimator::default().estimate(beats),
            dominant_band,
            energy_profile,
        }
    }
}

/// Everything the render stage needs from one audio asset.
///
/// Computed once per asset and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAnalysis {
    pub series: BandEnergySeries,
    pub beats: Vec<BeatEvent>,
    pub statistics: AnalysisStatistics,
}

impl AudioAnalysis {
    pub fn from_series(series: BandEnergySeries, detector: &BeatDetector) -> Self {
        let beats = detector.detect(&series);
        let statistics = AnalysisStatistics::compute(&series, &beats);
        Self {
            series,
            beats,
            statistics,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.series.duration_seconds()
    }

    pub fn events(&self, kind: BeatKind) -> impl Iterator<Item = &BeatEvent> {
        self.beats.iter().filter(move |e| e.kind == kind)
    }

    /// The event of `kind` closest to `t`, if any.
    pub fn nearest_event(&self, kind: BeatKind, t: f64) -> Option<&BeatEvent> {
        self.events(kind)
            .min_by(|a, b| (a.timestamp - t).abs().total_cmp(&(b.timestamp - t).abs()))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Analyse a mono buffer with the default extractor and beat detector.
pub fn analyze(samples: &[f32], sample_rate: f32) -> Result<AudioAnalysis> {
    let series = BandExtractor::default().extract(samples, sample_rate)?;
    let analysis = AudioAnalysis::from_series(series, &BeatDetector::default());

    info!(
        "Analysis complete: {} frames, {} bass beats, {} snare hits, {}",
        analysis.series.len(),
        analysis.statistics.bass_beats,
        analysis.statistics.snare_hits,
        match analysis.statistics.estimated_bpm {
            Some(bpm) => format!("{bpm:.1} BPM"),
            None => "tempo unknown".to_string(),
        }
    );

    Ok(analysis)
}

pub mod beat_detector;
pub mod cache;
pub mod feature_normalizer;
pub mod fft;
pub mod prescan;
pub mod rva_format;
pub mod sampler;

pub use beat_detector::{BeatDetector, BeatDetectorConfig, TempoEstimator};
pub use cache::AnalysisCache;
pub use feature_normalizer::{BandNormalizer, NormalizationParameters};
pub use fft::BandExtractor;
pub use prescan::{
    analyze, load_wav, AnalysisStatistics, AudioAnalysis, DecodedAudio, EnergyProfile,
};
pub use rva_format::RvaFormat;
pub use sampler::{sample_at, sample_at_strict};

use crate::error::{ReactiveError, Result};
use serde::{Deserialize, Serialize};

/// One of the five fixed analysis bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    SubBass,
    Bass,
    Mid,
    Treble,
    HighTreble,
}

impl Band {
    pub const COUNT: usize = 5;

    pub const ALL: [Band; Band::COUNT] = [
        Band::SubBass,
        Band::Bass,
        Band::Mid,
        Band::Treble,
        Band::HighTreble,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Inclusive frequency range in Hz.
    pub fn frequency_range(self) -> (f32, f32) {
        match self {
            Band::SubBass => (20.0, 60.0),
            Band::Bass => (60.0, 250.0),
            Band::Mid => (250.0, 2000.0),
            Band::Treble => (2000.0, 6000.0),
            Band::HighTreble => (6000.0, 12000.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::SubBass => "sub_bass",
            Band::Bass => "bass",
            Band::Mid => "mid",
            Band::Treble => "treble",
            Band::HighTreble => "high_treble",
        }
    }
}

/// Energy of the five bands at one instant, each normalized to 0.0-1.0
/// once it leaves the analysis stage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrequencyBands {
    pub sub_bass: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub high_treble: f32,
}

impl FrequencyBands {
    pub fn from_array(values: [f32; Band::COUNT]) -> Self {
        Self {
            sub_bass: values[0],
            bass: values[1],
            mid: values[2],
            treble: values[3],
            high_treble: values[4],
        }
    }

    pub fn to_array(&self) -> [f32; Band::COUNT] {
        [self.sub_bass, self.bass, self.mid, self.treble, self.high_treble]
    }

    pub fn get(&self, band: Band) -> f32 {
        self.to_array()[band.index()]
    }

    pub fn set(&mut self, band: Band, value: f32) {
        match band {
            Band::SubBass => self.sub_bass = value,
            Band::Bass => self.bass = value,
            Band::Mid => self.mid = value,
            Band::Treble => self.treble = value,
            Band::HighTreble => self.high_treble = value,
        }
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        let values = self.to_array();
        Self::from_array(values.map(f))
    }

    /// Per-band linear interpolation, `t` in 0.0-1.0.
    pub fn lerp(&self, other: &FrequencyBands, t: f32) -> Self {
        let a = self.to_array();
        let b = other.to_array();
        let mut out = [0.0; Band::COUNT];
        for i in 0..Band::COUNT {
            out[i] = a[i] + (b[i] - a[i]) * t;
        }
        Self::from_array(out)
    }

    pub fn total(&self) -> f32 {
        self.to_array().iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatKind {
    BassBeat,
    SnareHit,
}

/// A detected transient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Seconds from the start of the audio.
    pub timestamp: f64,
    pub kind: BeatKind,
    /// 0.0-1.0
    pub strength: f32,
}

/// Time series of normalized band energies, one entry per analysis hop.
///
/// Frame `i` is centred on sample `i * hop_length`, so its timestamp is
/// `i * hop_length / sample_rate`. The series is immutable once built, and
/// deserialising one runs the same checks as [`BandEnergySeries::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesFields")]
pub struct BandEnergySeries {
    sample_rate: f32,
    hop_length: usize,
    duration_seconds: f64,
    frames: Vec<FrequencyBands>,
}

impl BandEnergySeries {
    pub fn new(
        sample_rate: f32,
        hop_length: usize,
        duration_seconds: f64,
        frames: Vec<FrequencyBands>,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(ReactiveError::InvalidAudio(
                "band energy series has no frames".to_string(),
            ));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 || hop_length == 0 {
            return Err(ReactiveError::InvalidAudio(format!(
                "invalid analysis timing: sample rate {sample_rate}, hop {hop_length}"
            )));
        }
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(ReactiveError::InvalidAudio(format!(
                "invalid duration {duration_seconds}"
            )));
        }
        Ok(Self {
            sample_rate,
            hop_length,
            duration_seconds,
            frames,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Seconds between consecutive analysis frames.
    pub fn hop_seconds(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }

    /// Duration of the analysed sample buffer.
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[FrequencyBands] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&FrequencyBands> {
        self.frames.get(index)
    }

    pub fn timestamp(&self, index: usize) -> f64 {
        index as f64 * self.hop_seconds()
    }

    /// Values of one band across the whole series.
    pub fn band(&self, band: Band) -> Vec<f32> {
        self.frames.iter().map(|f| f.get(band)).collect()
    }
}

/// Unchecked wire form of [`BandEnergySeries`].
#[derive(Deserialize)]
struct SeriesFields {
    sample_rate: f32,
    hop_length: usize,
    duration_seconds: f64,
    frames: Vec<FrequencyBands>,
}

impl TryFrom<SeriesFields> for BandEnergySeries {
    type Error = ReactiveError;

    fn try_from(fields: SeriesFields) -> Result<Self> {
        Self::new(
            fields.sample_rate,
            fields.hop_length,
            fields.duration_seconds,
            fields.frames,
        )
    }
}

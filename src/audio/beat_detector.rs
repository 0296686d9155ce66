use super::feature_normalizer::percentile;
use super::{Band, BandEnergySeries, BeatEvent, BeatKind};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatDetectorConfig {
    /// Minimum spacing between two events of the same kind.
    pub refractory_seconds: f64,
    /// Length of the trailing window used for the adaptive threshold.
    pub history_seconds: f64,
    pub bass_threshold_k: f32,
    pub bass_floor: f32,
    /// Whole-track percentile that a bass peak must also reach.
    pub bass_percentile: f32,
    /// Width of the moving average the bass band is peak-picked on, in
    /// analysis frames (about one STFT window).
    pub bass_smoothing_frames: usize,
    /// How far a bass peak must climb above the quietest point since the
    /// previous bass beat. A held note never re-triggers.
    pub bass_min_rise: f32,
    pub snare_threshold_k: f32,
    pub snare_floor: f32,
}

impl Default for BeatDetectorConfig {
    fn default() -> Self {
        Self {
            refractory_seconds: 0.08,
            history_seconds: 0.5,
            bass_threshold_k: 1.5,
            bass_floor: 0.3,
            bass_percentile: 0.75,
            bass_smoothing_frames: 5,
            bass_min_rise: 0.2,
            snare_threshold_k: 2.0,
            snare_floor: 0.15,
        }
    }
}

/// Derives bass beats and snare hits from a normalized band series.
///
/// Bass beats are peaks of the lightly smoothed bass band that clear an
/// adaptive threshold (`mean + k * std` of the trailing history, the
/// track-wide percentile and an absolute floor) and rise far enough above
/// the trough since the previous beat. A flat top reports its middle frame.
/// Snare hits use the threshold rule on the positive frame-to-frame rise of
/// the averaged mid and treble bands. Detection is a pure function of the
/// series.
#[derive(Debug, Clone, Default)]
pub struct BeatDetector {
    config: BeatDetectorConfig,
}

impl BeatDetector {
    pub fn new(config: BeatDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BeatDetectorConfig {
        &self.config
    }

    /// All events in non-decreasing timestamp order. On equal timestamps
    /// bass beats come first.
    pub fn detect(&self, series: &BandEnergySeries) -> Vec<BeatEvent> {
        let hop = series.hop_seconds();
        let history_len = ((self.config.history_seconds / hop).round() as usize).max(1);

        let bass = series.band(Band::Bass);
        let mut events = self.detect_bass(&bass, hop, history_len);

        let transient = broadband_rise(series);
        events.extend(self.detect_snare(&transient, hop, history_len));

        // Stable sort keeps bass-before-snare on ties.
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        debug!(
            "Detected {} bass beats and {} snare hits",
            events.iter().filter(|e| e.kind == BeatKind::BassBeat).count(),
            events.iter().filter(|e| e.kind == BeatKind::SnareHit).count()
        );

        events
    }

    fn detect_bass(&self, bass: &[f32], hop: f64, history_len: usize) -> Vec<BeatEvent> {
        let half = self.config.bass_smoothing_frames / 2;
        let smoothed = moving_average(bass, half);
        let global = percentile(&smoothed, self.config.bass_percentile);
        let mut events = Vec::new();
        let mut last_beat: Option<f64> = None;
        // Quietest smoothed energy since the previous beat.
        let mut trough = f32::INFINITY;
        let mut scanned = 0;

        for peak in find_peaks(&smoothed) {
            let energy = smoothed[peak];
            trough = smoothed[scanned..=peak].iter().copied().fold(trough, f32::min);
            scanned = peak + 1;

            if energy - trough < self.config.bass_min_rise {
                continue;
            }

            let (mean, std_dev) = history_stats(&smoothed[peak.saturating_sub(history_len)..peak]);
            let threshold = (mean + std_dev * self.config.bass_threshold_k)
                .max(global)
                .max(self.config.bass_floor);
            if energy < threshold {
                continue;
            }

            let timestamp = peak as f64 * hop;
            if let Some(last) = last_beat {
                if timestamp - last < self.config.refractory_seconds {
                    continue;
                }
            }

            let loudest = bass[peak.saturating_sub(half)..(peak + half + 1).min(bass.len())]
                .iter()
                .copied()
                .fold(0.0f32, f32::max);
            events.push(BeatEvent {
                timestamp,
                kind: BeatKind::BassBeat,
                strength: loudest.clamp(0.0, 1.0),
            });
            last_beat = Some(timestamp);
            trough = energy;
        }

        events
    }

    fn detect_snare(&self, rise: &[f32], hop: f64, history_len: usize) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        let mut last_hit: Option<f64> = None;

        for i in 0..rise.len() {
            let value = rise[i];
            if value <= 0.0 || !is_local_peak(rise, i) {
                continue;
            }

            let (mean, std_dev) = history_stats(&rise[i.saturating_sub(history_len)..i]);
            let threshold =
                (mean + std_dev * self.config.snare_threshold_k).max(self.config.snare_floor);
            if value < threshold {
                continue;
            }

            let timestamp = i as f64 * hop;
            if let Some(last) = last_hit {
                if timestamp - last < self.config.refractory_seconds {
                    continue;
                }
            }

            events.push(BeatEvent {
                timestamp,
                kind: BeatKind::SnareHit,
                // a rise across half the range counts as a full-strength hit
                strength: (value * 2.0).min(1.0),
            });
            last_hit = Some(timestamp);
        }

        events
    }
}

/// Detect beats with the default configuration.
pub fn detect_beats(series: &BandEnergySeries) -> Vec<BeatEvent> {
    BeatDetector::default().detect(series)
}

/// Positive frame-to-frame rise of the mean of mid and treble.
fn broadband_rise(series: &BandEnergySeries) -> Vec<f32> {
    let mut previous = 0.0f32;
    series
        .frames()
        .iter()
        .map(|frame| {
            let level = (frame.mid + frame.treble) * 0.5;
            let rise = (level - previous).max(0.0);
            previous = level;
            rise
        })
        .collect()
}

/// Centred moving average over `2 * half + 1` frames, shrinking at the ends.
fn moving_average(data: &[f32], half: usize) -> Vec<f32> {
    if half == 0 {
        return data.to_vec();
    }
    (0..data.len())
        .map(|i| {
            let window = &data[i.saturating_sub(half)..(i + half + 1).min(data.len())];
            window.iter().sum::<f32>() / window.len() as f32
        })
        .collect()
}

/// Indices of positive peaks. A run of equal values counts once, at its
/// middle, when both neighbours are lower; values outside the series are 0.
fn find_peaks(data: &[f32]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let value = data[i];
        let prev = if i > 0 { data[i - 1] } else { 0.0 };
        if value <= prev || value <= 0.0 {
            i += 1;
            continue;
        }
        let mut end = i;
        while end + 1 < data.len() && data[end + 1] == value {
            end += 1;
        }
        let next = data.get(end + 1).copied().unwrap_or(0.0);
        if next < value {
            peaks.push((i + end) / 2);
        }
        i = end + 1;
    }
    peaks
}

/// Plateau-tolerant local maximum.
fn is_local_peak(data: &[f32], i: usize) -> bool {
    let prev = if i > 0 { data[i - 1] } else { 0.0 };
    let next = data.get(i + 1).copied().unwrap_or(0.0);
    data[i] >= prev && data[i] >= next
}

fn history_stats(history: &[f32]) -> (f32, f32) {
    if history.is_empty() {
        return (0.0, 0.0);
    }
    let mean = history.iter().sum::<f32>() / history.len() as f32;
    if history.len() < 2 {
        return (mean, 0.0);
    }
    let variance = history.iter().map(|&x| (x - mean).powi(2)).sum::<f32>()
        / (history.len() - 1) as f32;
    (mean, variance.sqrt())
}

/// Tempo estimate from the spacing of bass beats.
#[derive(Debug, Clone)]
pub struct TempoEstimator {
    min_interval: f64,
    max_interval: f64,
}

impl Default for TempoEstimator {
    fn default() -> Self {
        // 30-200 BPM
        Self {
            min_interval: 0.3,
            max_interval: 2.0,
        }
    }
}

impl TempoEstimator {
    pub fn estimate(&self, events: &[BeatEvent]) -> Option<f32> {
        let beats: Vec<f64> = events
            .iter()
            .filter(|e| e.kind == BeatKind::BassBeat)
            .map(|e| e.timestamp)
            .collect();

        let intervals: Vec<f64> = beats
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|&d| d > self.min_interval && d < self.max_interval)
            .collect();

        if intervals.is_empty() {
            return None;
        }

        let avg_interval = intervals.iter().sum::<f64>() / intervals.len() as f64;
        Some((60.0 / avg_interval) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FrequencyBands;

    fn series_from_bass(bass: &[f32], hop_seconds: f64) -> BandEnergySeries {
        let frames = bass
            .iter()
            .map(|&b| FrequencyBands {
                bass: b,
                ..Default::default()
            })
            .collect::<Vec<_>>();
        // sample rate 1000 Hz, hop expressed in samples
        let hop = (hop_seconds * 1000.0).round() as usize;
        let duration = frames.len() as f64 * hop_seconds;
        BandEnergySeries::new(1000.0, hop, duration, frames).unwrap()
    }

    #[test]
    fn test_single_pulse_gives_one_beat() {
        let mut bass = vec![0.0; 100];
        bass[40] = 0.5;
        bass[41] = 1.0;
        bass[42] = 0.5;
        let events = detect_beats(&series_from_bass(&bass, 0.01));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, BeatKind::BassBeat);
        assert!((events[0].timestamp - 0.41).abs() < 1e-9);
        assert_eq!(events[0].strength, 1.0);
    }

    #[test]
    fn test_refractory_interval_respected() {
        // Peaks every 3 frames at 10ms hop: 30ms apart, closer than 80ms.
        let bass: Vec<f32> = (0..300)
            .map(|i| if i % 3 == 0 { 1.0 } else { 0.0 })
            .collect();
        let detector = BeatDetector::new(BeatDetectorConfig {
            bass_threshold_k: 0.0,
            bass_percentile: 0.0,
            bass_min_rise: 0.0,
            ..Default::default()
        });
        let events = detector.detect(&series_from_bass(&bass, 0.01));
        let beats: Vec<f64> = events
            .iter()
            .filter(|e| e.kind == BeatKind::BassBeat)
            .map(|e| e.timestamp)
            .collect();
        assert!(beats.len() > 10);
        for pair in beats.windows(2) {
            assert!(pair[1] - pair[0] >= detector.config().refractory_seconds);
        }
    }

    #[test]
    fn test_held_note_gives_one_beat() {
        // Onset and release splatter on top of a rippling plateau.
        let mut bass = vec![0.0; 500];
        for (i, value) in bass.iter_mut().enumerate().take(250).skip(50) {
            *value = 0.9 + 0.01 * (i as f32 * 0.7).sin();
        }
        bass[50] = 1.0;
        bass[249] = 1.0;

        let events = detect_beats(&series_from_bass(&bass, 0.01));
        let beats: Vec<f64> = events
            .iter()
            .filter(|e| e.kind == BeatKind::BassBeat)
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(beats.len(), 1, "beats at {beats:?}");
        assert!((0.5..=0.6).contains(&beats[0]), "beat at {}", beats[0]);
    }

    #[test]
    fn test_new_hit_over_held_note() {
        let mut bass = vec![0.0; 300];
        for value in bass.iter_mut().take(250).skip(50) {
            *value = 0.5;
        }
        bass[50] = 0.8;
        for (offset, level) in [0.9, 1.0, 0.9].into_iter().enumerate() {
            bass[150 + offset] = level;
        }

        let beats: Vec<f64> = detect_beats(&series_from_bass(&bass, 0.01))
            .iter()
            .filter(|e| e.kind == BeatKind::BassBeat)
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(beats.len(), 2, "beats at {beats:?}");
        assert!((beats[0] - 0.52).abs() < 1e-9);
        assert!((1.49..=1.53).contains(&beats[1]), "hit at {}", beats[1]);
    }

    #[test]
    fn test_find_peaks_reports_plateau_middle() {
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 1.0, 0.5]), vec![2]);
        assert_eq!(find_peaks(&[0.2, 0.1, 0.4, 0.4, 0.6]), vec![0, 4]);
        assert!(find_peaks(&[0.0, 0.0]).is_empty());
        assert_eq!(moving_average(&[0.0, 3.0, 0.0], 1), vec![1.5, 1.0, 1.5]);
    }

    #[test]
    fn test_silence_has_no_events() {
        let events = detect_beats(&series_from_bass(&vec![0.0; 200], 0.01));
        assert!(events.is_empty());
    }

    #[test]
    fn test_snare_from_broadband_rise() {
        let mut frames = vec![FrequencyBands::default(); 100];
        frames[50].mid = 0.9;
        frames[50].treble = 0.9;
        frames[51].mid = 0.4;
        frames[51].treble = 0.4;
        let series = BandEnergySeries::new(1000.0, 10, 1.0, frames).unwrap();
        let events = detect_beats(&series);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, BeatKind::SnareHit);
        assert!((events[0].timestamp - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_events_sorted_and_deterministic() {
        let mut frames = vec![FrequencyBands::default(); 200];
        for i in (10..200).step_by(25) {
            frames[i - 1].bass = 0.5;
            frames[i].bass = 1.0;
            frames[i + 1].bass = 0.5;
            frames[i + 5].mid = 0.8;
            frames[i + 5].treble = 0.8;
        }
        let series = BandEnergySeries::new(1000.0, 10, 2.0, frames).unwrap();
        let first = detect_beats(&series);
        let second = detect_beats(&series);
        assert_eq!(first, second);
        for pair in first.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn test_tempo_from_regular_beats() {
        let events: Vec<BeatEvent> = (0..8)
            .map(|i| BeatEvent {
                timestamp: i as f64 * 0.5,
                kind: BeatKind::BassBeat,
                strength: 1.0,
            })
            .collect();
        let bpm = TempoEstimator::default().estimate(&events).unwrap();
        assert!((bpm - 120.0).abs() < 0.01);
        assert!(TempoEstimator::default().estimate(&events[..1]).is_none());
    }
}

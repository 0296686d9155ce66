use super::{BandEnergySeries, FrequencyBands};
use crate::error::{ReactiveError, Result};

/// Band energies at an arbitrary timestamp.
///
/// Linearly interpolates between the two analysis hops surrounding `t`.
/// Timestamps before the first hop or after the last one clamp to that
/// hop's value. An exact hop timestamp returns that hop unchanged.
pub fn sample_at(series: &BandEnergySeries, t: f64) -> FrequencyBands {
    let frames = series.frames();
    let last = frames.len() - 1;

    if !t.is_finite() || t <= 0.0 {
        return frames[0];
    }

    let position = t / series.hop_seconds();
    let nearest = position.round();
    // Snap hop timestamps that picked up rounding error.
    if (position - nearest).abs() < 1e-9 {
        return frames[(nearest as usize).min(last)];
    }

    let lower = position.floor();
    if lower >= last as f64 {
        return frames[last];
    }

    let index = lower as usize;
    let fraction = (position - lower) as f32;
    frames[index].lerp(&frames[index + 1], fraction)
}

/// Like [`sample_at`] but rejects timestamps outside `[0, duration]`.
pub fn sample_at_strict(series: &BandEnergySeries, t: f64) -> Result<FrequencyBands> {
    if !t.is_finite() || t < 0.0 || t > series.duration_seconds() {
        return Err(ReactiveError::FrameIndexOutOfRange {
            timestamp: t,
            duration: series.duration_seconds(),
        });
    }
    Ok(sample_at(series, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_series() -> BandEnergySeries {
        let frames = (0..11)
            .map(|i| {
                let v = i as f32 / 10.0;
                FrequencyBands::from_array([v, 1.0 - v, v, 0.5, 0.0])
            })
            .collect();
        BandEnergySeries::new(1000.0, 100, 1.0, frames).unwrap()
    }

    #[test]
    fn test_exact_hop_is_unchanged() {
        let series = ramp_series();
        let hop = series.hop_seconds();
        for i in 0..series.len() {
            assert_eq!(sample_at(&series, i as f64 * hop), series.frames()[i]);
        }
    }

    #[test]
    fn test_interpolates_between_hops() {
        let series = ramp_series();
        let bands = sample_at(&series, 0.25);
        assert!((bands.sub_bass - 0.25).abs() < 1e-5);
        assert!((bands.bass - 0.75).abs() < 1e-5);
        assert!((bands.treble - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let series = ramp_series();
        assert_eq!(sample_at(&series, -3.0), series.frames()[0]);
        assert_eq!(sample_at(&series, 50.0), series.frames()[10]);
    }

    #[test]
    fn test_strict_rejects_out_of_range() {
        let series = ramp_series();
        assert!(sample_at_strict(&series, 0.5).is_ok());
        assert!(sample_at_strict(&series, 1.0).is_ok());
        let err = sample_at_strict(&series, 1.5).unwrap_err();
        assert!(matches!(err, ReactiveError::FrameIndexOutOfRange { .. }));
        assert!(sample_at_strict(&series, -0.1).is_err());
    }
}

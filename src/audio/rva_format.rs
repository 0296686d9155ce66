use super::prescan::{AnalysisStatistics, AudioAnalysis};
use super::{BandEnergySeries, BeatEvent, BeatKind, FrequencyBands};
use crate::error::{ReactiveError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Reactive Video Analysis (.rva) - compact binary form of an [`AudioAnalysis`].
///
/// Layout, all integers little endian:
/// - Magic bytes: "RVAF" (4 bytes)
/// - Version: u8
/// - Header length: u32, then the JSON header (timing and statistics)
/// - Frame count: u32, then 10 bytes per frame (5x u16 bands, 0-65535 maps to 0.0-1.0)
/// - Event count: u32, then 10 bytes per event (f64 timestamp, u8 kind, u8 strength)
const MAGIC_BYTES: &[u8; 4] = b"RVAF";
const FORMAT_VERSION: u8 = 1;
const BYTES_PER_FRAME: usize = 10;
const BYTES_PER_EVENT: usize = 10;

#[derive(Debug, Serialize, Deserialize)]
struct RvaHeader {
    sample_rate: f32,
    hop_length: usize,
    duration_seconds: f64,
    statistics: AnalysisStatistics,
}

/// Convert normalized float (0.0-1.0) to u16 (0-65535)
fn pack_float(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * 65535.0).round() as u16
}

fn unpack_float(value: u16) -> f32 {
    value as f32 / 65535.0
}

fn pack_frame(bands: &FrequencyBands) -> [u8; BYTES_PER_FRAME] {
    let mut bytes = [0u8; BYTES_PER_FRAME];
    for (i, value) in bands.to_array().into_iter().enumerate() {
        bytes[i * 2..i * 2 + 2].copy_from_slice(&pack_float(value).to_le_bytes());
    }
    bytes
}

fn unpack_frame(bytes: &[u8; BYTES_PER_FRAME]) -> FrequencyBands {
    let mut values = [0.0f32; 5];
    for (i, value) in values.iter_mut().enumerate() {
        *value = unpack_float(u16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]));
    }
    FrequencyBands::from_array(values)
}

fn pack_event(event: &BeatEvent) -> [u8; BYTES_PER_EVENT] {
    let mut bytes = [0u8; BYTES_PER_EVENT];
    bytes[..8].copy_from_slice(&event.timestamp.to_le_bytes());
    bytes[8] = match event.kind {
        BeatKind::BassBeat => 0,
        BeatKind::SnareHit => 1,
    };
    bytes[9] = (event.strength.clamp(0.0, 1.0) * 255.0).round() as u8;
    bytes
}

fn unpack_event(bytes: &[u8; BYTES_PER_EVENT]) -> Result<BeatEvent> {
    let mut timestamp = [0u8; 8];
    timestamp.copy_from_slice(&bytes[..8]);
    let kind = match bytes[8] {
        0 => BeatKind::BassBeat,
        1 => BeatKind::SnareHit,
        other => {
            return Err(ReactiveError::CacheFormat(format!(
                "unknown event kind {other}"
            )))
        }
    };
    Ok(BeatEvent {
        timestamp: f64::from_le_bytes(timestamp),
        kind,
        strength: bytes[9] as f32 / 255.0,
    })
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

pub struct RvaFormat;

impl RvaFormat {
    pub fn write<W: Write>(analysis: &AudioAnalysis, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC_BYTES)?;
        writer.write_all(&[FORMAT_VERSION])?;

        let header = RvaHeader {
            sample_rate: analysis.series.sample_rate(),
            hop_length: analysis.series.hop_length(),
            duration_seconds: analysis.series.duration_seconds(),
            statistics: analysis.statistics.clone(),
        };
        let header_json = serde_json::to_vec(&header)?;
        writer.write_all(&(header_json.len() as u32).to_le_bytes())?;
        writer.write_all(&header_json)?;

        writer.write_all(&(analysis.series.len() as u32).to_le_bytes())?;
        for frame in analysis.series.frames() {
            writer.write_all(&pack_frame(frame))?;
        }

        writer.write_all(&(analysis.beats.len() as u32).to_le_bytes())?;
        for event in &analysis.beats {
            writer.write_all(&pack_event(event))?;
        }

        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<AudioAnalysis> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC_BYTES {
            return Err(ReactiveError::CacheFormat("bad magic bytes".to_string()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != FORMAT_VERSION {
            return Err(ReactiveError::CacheFormat(format!(
                "unsupported version {}",
                version[0]
            )));
        }

        let header_len = read_u32(reader)? as usize;
        let mut header_json = vec![0u8; header_len];
        reader.read_exact(&mut header_json)?;
        let header: RvaHeader = serde_json::from_slice(&header_json)?;

        let frame_count = read_u32(reader)? as usize;
        let mut frames = Vec::with_capacity(frame_count);
        let mut packed = [0u8; BYTES_PER_FRAME];
        for _ in 0..frame_count {
            reader.read_exact(&mut packed)?;
            frames.push(unpack_frame(&packed));
        }

        let event_count = read_u32(reader)? as usize;
        let mut beats = Vec::with_capacity(event_count);
        let mut packed = [0u8; BYTES_PER_EVENT];
        for _ in 0..event_count {
            reader.read_exact(&mut packed)?;
            beats.push(unpack_event(&packed)?);
        }

        let series = BandEnergySeries::new(
            header.sample_rate,
            header.hop_length,
            header.duration_seconds,
            frames,
        )
        .map_err(|e| ReactiveError::CacheFormat(e.to_string()))?;

        Ok(AudioAnalysis {
            series,
            beats,
            statistics: header.statistics,
        })
    }

    pub fn save<P: AsRef<Path>>(analysis: &AudioAnalysis, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write(analysis, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<AudioAnalysis> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    /// Get compression ratio compared to JSON
    pub fn compression_ratio(rva_size: u64, json_size: u64) -> f64 {
        if json_size == 0 {
            return 0.0;
        }
        1.0 - (rva_size as f64 / json_size as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analyze;

    #[test]
    fn test_float_packing() {
        assert_eq!(pack_float(0.0), 0);
        assert_eq!(pack_float(1.0), 65535);
        assert_eq!(pack_float(2.0), 65535);

        let original = 0.12345;
        let unpacked = unpack_float(pack_float(original));
        assert!((original - unpacked).abs() < 0.0001);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes: &[u8] = b"NOPE\x01";
        let err = RvaFormat::read(&mut bytes).unwrap_err();
        assert!(matches!(err, ReactiveError::CacheFormat(_)));
    }

    #[test]
    fn test_file_round_trip_is_smaller_than_json() {
        let samples: Vec<f32> = (0..22050)
            .map(|i| (i as f32 * 0.03).sin() * if (i / 4000) % 2 == 0 { 0.8 } else { 0.1 })
            .collect();
        let analysis = analyze(&samples, 22050.0).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let rva_path = dir.path().join("track.rva");
        let json_path = dir.path().join("track.json");
        RvaFormat::save(&analysis, &rva_path).unwrap();
        analysis.save_json(&json_path).unwrap();

        let loaded = RvaFormat::load(&rva_path).unwrap();
        assert_eq!(loaded.series.len(), analysis.series.len());
        assert_eq!(loaded.series.hop_length(), analysis.series.hop_length());
        assert_eq!(loaded.statistics, analysis.statistics);
        assert_eq!(loaded.beats.len(), analysis.beats.len());
        for (a, b) in loaded.series.frames().iter().zip(analysis.series.frames()) {
            assert!((a.bass - b.bass).abs() < 1e-4);
        }

        let rva_size = std::fs::metadata(&rva_path).unwrap().len();
        let json_size = std::fs::metadata(&json_path).unwrap().len();
        assert!(RvaFormat::compression_ratio(rva_size, json_size) > 0.5);
    }
}

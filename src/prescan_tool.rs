use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use reactive_video::audio::{load_wav, AudioAnalysis, Band, BandExtractor, BeatDetector, RvaFormat};

#[derive(Parser)]
#[command(name = "prescan-tool")]
#[command(about = "Analyse a WAV file once so renders can reuse its band energies and beats")]
struct Args {
    /// WAV file to analyse
    #[arg()]
    input_file: String,

    /// Output analysis file
    #[arg(short, long, default_value = "analysis.rva")]
    output: String,

    /// Output format: 'rva' (binary) or 'json' (text)
    #[arg(long, default_value = "rva")]
    format: String,

    /// FFT window in samples
    #[arg(long, default_value = "2048")]
    fft_size: usize,

    /// Hop between analysis frames in samples
    #[arg(long, default_value = "512")]
    hop_length: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let format = args.format.to_lowercase();
    if format != "rva" && format != "json" {
        bail!("unknown format '{}', expected 'rva' or 'json'", args.format);
    }
    if args.fft_size == 0 || args.hop_length == 0 {
        bail!("fft size and hop length must be positive");
    }

    info!("Reactive video pre-scan");
    info!("Input file: {}", args.input_file);
    info!("Output file: {}", args.output);

    let audio = load_wav(&args.input_file)
        .with_context(|| format!("loading {}", args.input_file))?;
    info!(
        "Analysing {:.2}s at {}Hz (FFT {}, hop {})",
        audio.duration_seconds(),
        audio.sample_rate,
        args.fft_size,
        args.hop_length
    );

    let series = BandExtractor::new(args.fft_size, args.hop_length)
        .extract(&audio.samples, audio.sample_rate)
        .context("band extraction failed")?;
    let analysis = AudioAnalysis::from_series(series, &BeatDetector::default());
    log_statistics(&analysis);

    let json_size = serde_json::to_vec(&analysis)?.len() as u64;
    if format == "rva" {
        RvaFormat::save(&analysis, &args.output)?;
    } else {
        analysis.save_json(&args.output)?;
    }
    let file_size = std::fs::metadata(&args.output)?.len();
    info!(
        "Analysis saved ({:.1} KB)",
        file_size as f64 / 1024.0
    );
    if format == "rva" {
        info!(
            "Compression ratio: {:.1}% smaller than JSON",
            RvaFormat::compression_ratio(file_size, json_size) * 100.0
        );
    }

    Ok(())
}

fn log_statistics(analysis: &AudioAnalysis) {
    let stats = &analysis.statistics;
    info!("=== ANALYSIS RESULTS ===");
    info!("Duration: {:.2} seconds", analysis.duration_seconds());
    info!("Analysis frames: {}", analysis.series.len());
    info!("Frame rate: {:.2} Hz", 1.0 / analysis.series.hop_seconds());
    info!("Bass beats: {}", stats.bass_beats);
    info!("Snare hits: {}", stats.snare_hits);
    match stats.estimated_bpm {
        Some(bpm) => info!("Estimated tempo: {:.1} BPM", bpm),
        None => info!("Estimated tempo: unknown"),
    }
    info!("Dominant band: {}", stats.dominant_band.name());
    info!("Energy profile: {:?}", stats.energy_profile);
    for band in Band::ALL {
        info!(
            "{:<12} peak {:.3}  mean {:.3}",
            band.name(),
            stats.peak.get(band),
            stats.mean.get(band)
        );
    }
}

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use reactive_video::audio::{analyze, load_wav, AudioAnalysis, RvaFormat};
use reactive_video::effects::{PresetManager, ReactivityConfig};
use reactive_video::graphics::{
    CancellationToken, FrameSource, ImageDirectorySource, Renderer, StillImageSource,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Frames rendered and written per batch.
const BATCH_SIZE: usize = 120;

#[derive(Parser)]
#[command(name = "reactive-video")]
#[command(about = "Render audio-reactive effects over an image or a frame sequence")]
struct Args {
    /// WAV file driving the effects
    #[arg()]
    audio: PathBuf,

    /// Still image, or a directory of numbered frames
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for the numbered PNG output frames
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,

    /// Output frame rate
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Reactivity configuration (JSON); overrides --preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Named preset, e.g. "Bass Driven"
    #[arg(long)]
    preset: Option<String>,

    /// Precomputed analysis (.rva or .json) from prescan-tool
    #[arg(long)]
    analysis: Option<PathBuf>,

    /// First frame to render
    #[arg(long, default_value = "0")]
    start: usize,

    /// Frame after the last one to render (defaults to the end of the audio)
    #[arg(long)]
    end: Option<usize>,

    /// Fail on frames past the end of the audio instead of holding its last value
    #[arg(long)]
    strict_bounds: bool,

    /// Write the effective configuration to this file and continue
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// List the built-in presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_presets {
        for preset in PresetManager::new().get_presets() {
            println!("{:<16} {}", preset.name, preset.description);
        }
        return Ok(());
    }

    info!("Reactive video renderer");
    let config = load_config(&args)?;
    if let Some(path) = &args.save_config {
        config
            .save_json(path)
            .with_context(|| format!("writing config to {}", path.display()))?;
        info!("Saved configuration to {}", path.display());
    }

    let analysis = load_analysis(&args)?;
    let renderer =
        Renderer::new(Arc::new(analysis), args.fps)?.with_strict_bounds(args.strict_bounds);

    let source: Box<dyn FrameSource> = if args.input.is_dir() {
        Box::new(ImageDirectorySource::open(&args.input)?)
    } else {
        Box::new(
            StillImageSource::open(&args.input)
                .with_context(|| format!("opening {}", args.input.display()))?,
        )
    };

    let mut end = args.end.unwrap_or_else(|| renderer.frame_count());
    if let Some(count) = source.frame_count() {
        end = end.min(count);
    }
    if args.start >= end {
        bail!("nothing to render: frame range {}..{} is empty", args.start, end);
    }

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let cancel = CancellationToken::new();
    let mut batch_start = args.start;
    while batch_start < end {
        let batch_end = (batch_start + BATCH_SIZE).min(end);
        let frames = renderer
            .render_sequence(batch_start..batch_end, source.as_ref(), &config, None, &cancel)
            .context("render failed")?;
        for (offset, frame) in frames.iter().enumerate() {
            write_frame(&args.output, batch_start + offset, frame)?;
        }
        batch_start = batch_end;
    }

    info!(
        "Wrote {} frames to {}",
        end - args.start,
        args.output.display()
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<ReactivityConfig> {
    if let Some(path) = &args.config {
        info!("Loading configuration from {}", path.display());
        return ReactivityConfig::load_json(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    if let Some(name) = &args.preset {
        let mut presets = PresetManager::new();
        let preset = presets
            .select_by_name(name)
            .with_context(|| format!("unknown preset '{name}' (see --list-presets)"))?;
        info!("Using preset: {}", preset.name);
        return Ok(preset.config.clone());
    }
    Ok(ReactivityConfig::default())
}

fn load_analysis(args: &Args) -> Result<AudioAnalysis> {
    if let Some(path) = &args.analysis {
        info!("Loading analysis from {}", path.display());
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let analysis = if is_json {
            AudioAnalysis::load_json(path)
        } else {
            RvaFormat::load(path)
        };
        return analysis.with_context(|| format!("loading analysis {}", path.display()));
    }

    let audio = load_wav(&args.audio)
        .with_context(|| format!("loading audio {}", args.audio.display()))?;
    Ok(analyze(&audio.samples, audio.sample_rate)?)
}

fn write_frame(dir: &Path, index: usize, frame: &image::RgbImage) -> Result<()> {
    let path = dir.join(format!("frame_{index:06}.png"));
    frame
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))
}

use super::source::FrameSource;
use crate::audio::AudioAnalysis;
use crate::effects::{
    EffectPipeline, FrameIntensitySnapshot, IntensityMixer, ReactivityConfig, SharedConfig,
    SmoothingState,
};
use crate::error::{ReactiveError, Result};
use crossbeam_channel::Sender;
use image::RgbImage;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Rendered frames between progress log lines.
const LOG_INTERVAL: usize = 30;

/// Progress of a batch render, published after every finished frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderProgress {
    pub completed: usize,
    pub total: usize,
    /// `completed / total`, 0.0-1.0.
    pub fraction: f32,
}

impl RenderProgress {
    fn new(completed: usize, total: usize) -> Self {
        let fraction = if total == 0 {
            1.0
        } else {
            (completed as f32 / total as f32).clamp(0.0, 1.0)
        };
        Self {
            completed,
            total,
            fraction,
        }
    }
}

/// Cooperative cancellation flag, checked before every frame.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Renders output frames from an analysed track and a frame source.
///
/// Frame `i` is rendered at `i / fps` seconds. The only state carried between
/// frames is the [`SmoothingState`]; with `effect_smoothing == 0` every frame
/// is independent and batch renders run in parallel.
///
/// Frames past the end of the audio hold its last value unless strict bounds
/// are requested with [`Renderer::with_strict_bounds`], in which case they
/// fail with [`ReactiveError::FrameIndexOutOfRange`].
pub struct Renderer {
    mixer: IntensityMixer,
    pipeline: EffectPipeline,
    strict_bounds: bool,
}

impl Renderer {
    pub fn new(analysis: Arc<AudioAnalysis>, fps: f64) -> Result<Self> {
        let mixer = IntensityMixer::new(analysis, fps)?;
        info!(
            "Renderer ready: {:.2}s of audio at {} fps ({} frames)",
            mixer.analysis().duration_seconds(),
            fps,
            mixer.frame_count()
        );
        Ok(Self {
            mixer,
            pipeline: EffectPipeline::new(),
            strict_bounds: false,
        })
    }

    pub fn with_strict_bounds(mut self, strict: bool) -> Self {
        self.strict_bounds = strict;
        self
    }

    pub fn strict_bounds(&self) -> bool {
        self.strict_bounds
    }

    pub fn mixer(&self) -> &IntensityMixer {
        &self.mixer
    }

    /// Output frames needed to cover the whole track.
    pub fn frame_count(&self) -> usize {
        self.mixer.frame_count()
    }

    /// Intensities for a frame without touching any pixels.
    pub fn intensities(
        &self,
        index: usize,
        config: &ReactivityConfig,
        state: &mut SmoothingState,
    ) -> FrameIntensitySnapshot {
        self.mixer.frame_intensities(index, config, state)
    }

    /// Render one frame, advancing `state`.
    pub fn render_frame(
        &self,
        index: usize,
        input: &RgbImage,
        config: &ReactivityConfig,
        state: &mut SmoothingState,
    ) -> Result<RgbImage> {
        let (w, h) = input.dimensions();
        if w == 0 || h == 0 {
            return Err(ReactiveError::CorruptFrame(format!(
                "input frame is {w}x{h}"
            )));
        }

        let snapshot = if self.strict_bounds {
            self.mixer.frame_intensities_strict(index, config, state)?
        } else {
            self.mixer.frame_intensities(index, config, state)
        };
        debug!(
            "Frame {} at {:.3}s: energy {:?}",
            index,
            snapshot.timestamp,
            snapshot.energy.to_array()
        );
        Ok(self.pipeline.apply(input, &snapshot, config))
    }

    /// Smoothing state for starting a render at `target`, recomputed from
    /// frame 0 so a seek matches an uninterrupted render.
    pub fn warm_smoothing(&self, target: usize, config: &ReactivityConfig) -> SmoothingState {
        self.mixer.state_before(target, config)
    }

    /// Render `range` with one configuration.
    ///
    /// Fails fast: the first failing frame aborts the batch and the error
    /// names its index. Cancellation yields [`ReactiveError::Cancelled`].
    pub fn render_sequence(
        &self,
        range: Range<usize>,
        source: &dyn FrameSource,
        config: &ReactivityConfig,
        progress: Option<&Sender<RenderProgress>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RgbImage>> {
        config.validate()?;
        self.check_range(&range, source)?;
        info!(
            "Rendering frames {}..{} ({} frames)",
            range.start,
            range.end,
            range.len()
        );

        if config.global.effect_smoothing <= 0.0 {
            return self.render_parallel(range, source, config, progress, cancel);
        }

        let config = Arc::new(config.clone());
        self.render_sequential(range, source, || Arc::clone(&config), progress, cancel)
    }

    /// Render `range` sequentially, taking a fresh snapshot of `shared` for
    /// every frame so edits apply from the next frame on.
    pub fn render_sequence_live(
        &self,
        range: Range<usize>,
        source: &dyn FrameSource,
        shared: &SharedConfig,
        progress: Option<&Sender<RenderProgress>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RgbImage>> {
        self.check_range(&range, source)?;
        info!("Live rendering frames {}..{}", range.start, range.end);
        self.render_sequential(range, source, || shared.snapshot(), progress, cancel)
    }

    fn check_range(&self, range: &Range<usize>, source: &dyn FrameSource) -> Result<()> {
        if range.start > range.end {
            return Err(ReactiveError::InvalidConfig(format!(
                "frame range {}..{} is reversed",
                range.start, range.end
            )));
        }
        if let Some(count) = source.frame_count() {
            if range.end > count {
                return Err(ReactiveError::InvalidConfig(format!(
                    "frame range {}..{} exceeds the {} input frames",
                    range.start, range.end, count
                )));
            }
        }
        if range.end > self.frame_count() && !self.strict_bounds {
            warn!(
                "Frames past {} are beyond the audio and hold its last value",
                self.frame_count()
            );
        }
        Ok(())
    }

    fn render_sequential<F>(
        &self,
        range: Range<usize>,
        source: &dyn FrameSource,
        config_for_frame: F,
        progress: Option<&Sender<RenderProgress>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RgbImage>>
    where
        F: Fn() -> Arc<ReactivityConfig>,
    {
        let total = range.len();
        let frames_in_track = self.frame_count().max(range.end);
        let mut state = self.warm_smoothing(range.start, &config_for_frame());
        let mut frames = Vec::with_capacity(total);

        for index in range {
            if cancel.is_cancelled() {
                info!("Render cancelled at frame {}", index);
                return Err(ReactiveError::Cancelled { frame_index: index });
            }
            let config = config_for_frame();
            let output = source
                .frame(index)
                .and_then(|input| self.render_frame(index, &input, &config, &mut state))
                .map_err(|e| e.at_frame(index, frames_in_track))?;
            frames.push(output);
            report(frames.len(), total, progress);
        }

        Ok(frames)
    }

    fn render_parallel(
        &self,
        range: Range<usize>,
        source: &dyn FrameSource,
        config: &ReactivityConfig,
        progress: Option<&Sender<RenderProgress>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RgbImage>> {
        let total = range.len();
        let frames_in_track = self.frame_count().max(range.end);
        let completed = AtomicUsize::new(0);

        let frames = range
            .into_par_iter()
            .map(|index| {
                if cancel.is_cancelled() {
                    return Err(ReactiveError::Cancelled { frame_index: index });
                }
                let mut state = SmoothingState::new();
                let output = source
                    .frame(index)
                    .and_then(|input| self.render_frame(index, &input, config, &mut state))
                    .map_err(|e| e.at_frame(index, frames_in_track))?;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                report(done, total, progress);
                Ok(output)
            })
            .collect::<Result<Vec<_>>>();

        if let Err(e) = &frames {
            if e.is_cancelled() {
                info!("Render cancelled");
            }
        }
        frames
    }
}

fn report(completed: usize, total: usize, progress: Option<&Sender<RenderProgress>>) {
    let update = RenderProgress::new(completed, total);
    if completed % LOG_INTERVAL == 0 || completed == total {
        info!(
            "Rendered {}/{} frames ({:.1}%)",
            completed,
            total,
            update.fraction * 100.0
        );
    }
    if let Some(sender) = progress {
        if sender.send(update).is_err() {
            debug!("Progress receiver dropped");
        }
    }
}

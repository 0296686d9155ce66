//! Audio-reactive video effects.
//!
//! A track is analysed once into per-band energy envelopes and beat events
//! ([`audio::analyze`]). Each output frame samples that analysis at its own
//! timestamp, mixes per-effect intensities ([`effects::IntensityMixer`]) and
//! runs the enabled effects over the input frame ([`graphics::Renderer`]).

pub mod audio;
pub mod effects;
pub mod error;
pub mod graphics;

pub use audio::{analyze, AnalysisCache, AudioAnalysis, BandEnergySeries, BeatEvent, BeatKind, FrequencyBands};
pub use effects::{EffectId, ReactivityConfig, SharedConfig};
pub use error::{ReactiveError, Result};
pub use graphics::{CancellationToken, FrameSource, RenderProgress, Renderer};

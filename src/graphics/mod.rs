pub mod artistic;
pub mod blend;
pub mod blur;
pub mod color;
pub mod corruption;
pub mod engine;
pub mod geometric;
pub mod retro;
pub mod source;
pub mod stylize;
pub mod texture;

pub use engine::{CancellationToken, RenderProgress, Renderer};
pub use source::{FrameSequence, FrameSource, ImageDirectorySource, StillImageSource};
pub use texture::BorderMode;

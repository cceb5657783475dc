pub mod assets;
pub mod context;
pub mod pipeline;

pub use assets::{AssetManifest, AssetManifestCache};
pub use pipeline::{RenderError, RenderPipeline};

#![forbid(unsafe_code)]

pub mod atlas;
pub mod cache;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod mask;
pub mod random;
pub mod raster;
pub mod sprite;

pub use atlas::{generate, generate_with};
pub use cache::{MaskCache, default_image_mask, default_mask, prepare_default_mask};
pub use codec::{FORMAT_VERSION, Validator, deserialize, serialize};
pub use descriptor::MaskDescriptor;
pub use error::{VeilError, VeilResult};
pub use mask::{CachedMask, FRAMES_PER_ROW, FrameRect, MaskFrame};
pub use random::BufferedRandom;
pub use raster::{Raster, Rgba8};

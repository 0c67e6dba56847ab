pub mod aspect;
pub mod codec;
pub mod providers;

pub use aspect::AspectRatio;
pub use codec::ImageCodec;

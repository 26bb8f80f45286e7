pub mod decoder;
pub mod encoder;
mod support;

pub use decoder::{DecoderConfig, FrameDecoder};
pub use encoder::{EncoderConfig, FrameEncoder};

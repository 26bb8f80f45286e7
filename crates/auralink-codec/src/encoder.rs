//! Encoder adapter: Opus compression glue around the index-preserving
//! pipeline.
//!
//! The codec itself is index-agnostic — `audiopus::coder::Encoder` knows
//! nothing about frame indices. The index simply rides alongside each call;
//! one submitted frame always yields exactly one compressed frame, so there
//! is no queue to maintain here (contrast the Resampler, where one input may
//! yield zero or several outputs).

use audiopus::{coder::Encoder as OpusEncoder, Application};

use auralink_foundation::CodecError;

use crate::support::{channels_from_count, sample_rate_from_hz};

/// Generous relative to what Opus actually emits per frame (typically a few
/// hundred bytes at voice bitrates) but keeps the per-call scratch buffer
/// bounded, matching the data model's informal 4 KiB payload ceiling.
const MAX_PAYLOAD_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy)]
pub struct EncoderConfig {
    pub codec_rate: u32,
    pub channels: u16,
    pub frame_samples: usize,
}

/// Wraps one `audiopus` encoder instance. Not `Send`-shared across frames
/// concurrently — a single pipeline's encode stage owns it exclusively, per
/// the single-producer/single-consumer ownership model.
pub struct FrameEncoder {
    inner: OpusEncoder,
    cfg: EncoderConfig,
    scratch: Vec<u8>,
}

impl FrameEncoder {
    pub fn new(cfg: EncoderConfig) -> Result<Self, CodecError> {
        let sample_rate = sample_rate_from_hz(cfg.codec_rate)?;
        let channels = channels_from_count(cfg.channels)?;
        let inner = OpusEncoder::new(sample_rate, channels, Application::Voip)
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;
        Ok(Self {
            inner,
            cfg,
            scratch: vec![0u8; MAX_PAYLOAD_BYTES],
        })
    }

    /// Encode one indexed frame of interleaved float32 PCM
    /// (`frame_samples * channels` samples) into an indexed compressed
    /// payload. The index passes through unchanged.
    pub fn encode(&mut self, index: u32, samples: &[f32]) -> Result<(u32, Vec<u8>), CodecError> {
        debug_assert_eq!(
            samples.len(),
            self.cfg.frame_samples * self.cfg.channels as usize,
            "encoder fed a frame of the wrong length"
        );
        let len = self
            .inner
            .encode_float(samples, &mut self.scratch)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok((index, self.scratch[..len].to_vec()))
    }
}

//! Decoder adapter: Opus decompression glue, including the loss-concealment
//! path an empty payload requests.
//!
//! A zero-length payload is treated as a request for the codec's native
//! packet-loss concealment, not as "decode nothing". `audiopus` surfaces
//! that by passing `None` for the input rather than `Some(&[])`.

use audiopus::coder::Decoder as OpusDecoder;

use auralink_foundation::CodecError;

use crate::support::{channels_from_count, sample_rate_from_hz};

#[derive(Debug, Clone, Copy)]
pub struct DecoderConfig {
    pub codec_rate: u32,
    pub channels: u16,
    pub frame_samples: usize,
}

pub struct FrameDecoder {
    inner: OpusDecoder,
    cfg: DecoderConfig,
    scratch: Vec<f32>,
}

impl FrameDecoder {
    pub fn new(cfg: DecoderConfig) -> Result<Self, CodecError> {
        let sample_rate = sample_rate_from_hz(cfg.codec_rate)?;
        let channels = channels_from_count(cfg.channels)?;
        let inner = OpusDecoder::new(sample_rate, channels)
            .map_err(|e| CodecError::DecoderInit(e.to_string()))?;
        Ok(Self {
            inner,
            cfg,
            scratch: vec![0.0f32; cfg.frame_samples * cfg.channels as usize],
        })
    }

    /// Decode one indexed compressed payload into `frame_samples * channels`
    /// interleaved float32 PCM samples. An empty `payload` requests
    /// concealment: Opus synthesizes a continuation frame from its internal
    /// state rather than producing silence.
    pub fn decode(&mut self, index: u32, payload: &[u8]) -> Result<(u32, Vec<f32>), CodecError> {
        let input = if payload.is_empty() {
            None
        } else {
            Some(payload)
        };
        let decoded_samples = self
            .inner
            .decode_float(input, &mut self.scratch, false)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        let len = decoded_samples * self.cfg.channels as usize;
        Ok((index, self.scratch[..len].to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{EncoderConfig, FrameEncoder};

    fn cfg() -> DecoderConfig {
        DecoderConfig {
            codec_rate: 48_000,
            channels: 1,
            frame_samples: 960,
        }
    }

    #[test]
    fn round_trip_through_encoder_decodes_finite_samples() {
        let mut enc = FrameEncoder::new(EncoderConfig {
            codec_rate: 48_000,
            channels: 1,
            frame_samples: 960,
        })
        .unwrap();
        let mut dec = FrameDecoder::new(cfg()).unwrap();

        let samples: Vec<f32> = (0..960)
            .map(|i| ((i as f32) / 960.0 * std::f32::consts::TAU).sin() * 0.2)
            .collect();

        let (index, payload) = enc.encode(5, &samples).unwrap();
        let (out_index, pcm) = dec.decode(index, &payload).unwrap();

        assert_eq!(out_index, 5);
        assert_eq!(pcm.len(), 960);
        assert!(pcm.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn empty_payload_triggers_concealment_with_full_frame_length() {
        let mut dec = FrameDecoder::new(cfg()).unwrap();
        let (index, pcm) = dec.decode(9, &[]).unwrap();
        assert_eq!(index, 9);
        assert_eq!(pcm.len(), 960);
        assert!(pcm.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn concealment_after_real_frames_still_produces_a_full_frame() {
        let mut enc = FrameEncoder::new(EncoderConfig {
            codec_rate: 48_000,
            channels: 1,
            frame_samples: 960,
        })
        .unwrap();
        let mut dec = FrameDecoder::new(cfg()).unwrap();

        let samples = vec![0.1f32; 960];
        for i in 0..3u32 {
            let (index, payload) = enc.encode(i, &samples).unwrap();
            let (_, pcm) = dec.decode(index, &payload).unwrap();
            assert_eq!(pcm.len(), 960);
        }

        let (_, concealed) = dec.decode(3, &[]).unwrap();
        assert_eq!(concealed.len(), 960);
    }
}

//! Opus only operates at a fixed set of sample rates and channel counts;
//! these helpers translate the pipeline's plain `u32`/`u16` configuration
//! fields into `audiopus`'s enums and reject anything else at construction
//! time rather than deep inside an encode/decode call.

use audiopus::{Channels, SampleRate};

use auralink_foundation::CodecError;

pub fn sample_rate_from_hz(hz: u32) -> Result<SampleRate, CodecError> {
    match hz {
        8_000 => Ok(SampleRate::Hz8000),
        12_000 => Ok(SampleRate::Hz12000),
        16_000 => Ok(SampleRate::Hz16000),
        24_000 => Ok(SampleRate::Hz24000),
        48_000 => Ok(SampleRate::Hz48000),
        other => Err(CodecError::EncoderInit(format!(
            "unsupported opus sample rate: {other} Hz (must be one of 8000/12000/16000/24000/48000)"
        ))),
    }
}

pub fn channels_from_count(channels: u16) -> Result<Channels, CodecError> {
    match channels {
        1 => Ok(Channels::Mono),
        2 => Ok(Channels::Stereo),
        other => Err(CodecError::EncoderInit(format!(
            "unsupported channel count: {other} (opus supports mono or stereo)"
        ))),
    }
}

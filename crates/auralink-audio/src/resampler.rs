//! Converts indexed PCM chunks at the source rate into indexed float32 frames
//! at the codec's rate, preserving the 1:1 mapping between input chunk index
//! and output frame index even when a single input produces zero or several
//! output frames.
//!
//! The heavy lifting (polyphase sinc interpolation) is Rubato's; this module
//! adds the index bookkeeping and the zero-copy circular output buffer the
//! rest of the pipeline reads frames out of.

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;

use rubato::{
    Resampler as _, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

use auralink_telemetry::{BufferType, PipelineMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplerQuality {
    Fast,
    Balanced,
    Quality,
}

impl ResamplerQuality {
    fn sinc_params(self) -> SincInterpolationParameters {
        match self {
            ResamplerQuality::Fast => SincInterpolationParameters {
                sinc_len: 32,
                f_cutoff: 0.92,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 64,
                window: WindowFunction::Blackman,
            },
            ResamplerQuality::Balanced => SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 128,
                window: WindowFunction::Blackman2,
            },
            ResamplerQuality::Quality => SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.97,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResamplerConfig {
    pub channels: u16,
    pub in_rate: u32,
    pub out_rate: u32,
    pub frame_samples: usize,
    pub max_latency_ms: u64,
    pub quality: ResamplerQuality,
}

impl ResamplerConfig {
    pub fn output_frame_bytes(&self) -> usize {
        self.frame_samples * self.channels as usize * 4
    }

    fn alignment_capacity(&self) -> usize {
        let raw = (self.max_latency_ms as usize * self.out_rate as usize / 1000)
            * self.channels as usize
            * 4;
        let frame_bytes = self.output_frame_bytes();
        // Round up to an integer multiple of output_frame_bytes, per the
        // circular buffer's sizing invariant.
        let frames = raw.div_ceil(frame_bytes).max(1);
        frames * frame_bytes
    }
}

/// The engine's own internal chunking (Rubato requires fixed-size input).
const RUBATO_CHUNK_SIZE: usize = 512;

/// Index-preserving streaming resampler with a zero-copy circular output.
///
/// Output frames are delivered as byte ranges into an internal buffer via
/// [`StreamResampler::view`] — valid until overwritten by roughly
/// `max_latency_ms` worth of subsequent output.
pub struct StreamResampler {
    engine: Option<SincFixedIn<f32>>,
    input_buffer: Vec<f32>,
    chunk_size: usize,
    cfg: ResamplerConfig,

    alignment_buffer: Vec<u8>,
    capacity: usize,
    write_offset: usize,
    buffered_bytes: usize,
    pending_indices: VecDeque<u32>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl StreamResampler {
    pub fn new(cfg: ResamplerConfig) -> Self {
        let capacity = cfg.alignment_capacity();
        assert_eq!(
            capacity % cfg.output_frame_bytes(),
            0,
            "alignment buffer capacity must be a multiple of output_frame_bytes"
        );

        let engine = if cfg.in_rate == cfg.out_rate {
            None
        } else {
            Some(
                SincFixedIn::<f32>::new(
                    cfg.out_rate as f64 / cfg.in_rate as f64,
                    2.0,
                    cfg.quality.sinc_params(),
                    RUBATO_CHUNK_SIZE,
                    cfg.channels as usize,
                )
                .expect("failed to construct rubato resampler"),
            )
        };

        Self {
            engine,
            input_buffer: Vec::with_capacity(RUBATO_CHUNK_SIZE * 2),
            chunk_size: RUBATO_CHUNK_SIZE,
            cfg,
            alignment_buffer: vec![0u8; capacity],
            capacity,
            write_offset: 0,
            buffered_bytes: 0,
            pending_indices: VecDeque::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether the resampler has a functioning conversion path. The
    /// "not yet initialized" drop path is degenerate here — construction
    /// always succeeds — but is kept so callers that build resamplers
    /// lazily (once the source's actual rate is known) have somewhere to
    /// route chunks arriving before that point.
    pub fn is_initialized(&self) -> bool {
        true
    }

    /// Feed one indexed PCM chunk (interleaved i16, `cfg.channels` channels).
    /// Returns every output frame this call (and any previously buffered
    /// input) made available, in order. Each entry's `Range` indexes into
    /// the buffer returned by [`StreamResampler::view`].
    pub fn process_chunk(&mut self, index: u32, pcm: &[i16]) -> Vec<(u32, Range<usize>)> {
        self.pending_indices.push_back(index);

        let out_bytes = self.resample_to_bytes(pcm);
        if !out_bytes.is_empty() {
            self.write_into_alignment_buffer(&out_bytes);
            self.report_fill();
        }

        let output_frame_bytes = self.cfg.output_frame_bytes();
        let mut emitted = Vec::new();

        while self.buffered_bytes >= output_frame_bytes {
            let Some(j) = self.pending_indices.pop_front() else {
                break;
            };
            let r = (self.write_offset + self.capacity - self.buffered_bytes) % self.capacity;
            emitted.push((j, r..r + output_frame_bytes));
            self.buffered_bytes -= output_frame_bytes;
        }

        emitted
    }

    /// Resolve a range returned by `process_chunk` into actual bytes. The
    /// range may wrap the buffer end, so this always returns an owned copy
    /// rather than a borrowed slice when a wrap is present; callers that
    /// need a true zero-copy view for the non-wrapping common case should
    /// use [`StreamResampler::view`] directly.
    pub fn view(&self, range: Range<usize>) -> &[u8] {
        assert!(
            range.end <= self.alignment_buffer.len(),
            "non-wrapping range expected; caller must split wrapped ranges"
        );
        &self.alignment_buffer[range]
    }

    /// Resolve a range returned by `process_chunk` into an owned byte
    /// vector, transparently handling the case where the range wraps the
    /// end of the alignment buffer. Callers that don't need to special-case
    /// the non-wrapping path should prefer this over [`StreamResampler::view`].
    pub fn view_owned(&self, range: Range<usize>) -> Vec<u8> {
        if range.end <= self.alignment_buffer.len() {
            return self.alignment_buffer[range].to_vec();
        }
        let wrapped_end = range.end - self.alignment_buffer.len();
        let mut out = Vec::with_capacity(range.end - range.start);
        out.extend_from_slice(&self.alignment_buffer[range.start..]);
        out.extend_from_slice(&self.alignment_buffer[..wrapped_end]);
        out
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.input_buffer.clear();
        self.alignment_buffer.iter_mut().for_each(|b| *b = 0);
        self.write_offset = 0;
        self.buffered_bytes = 0;
        self.pending_indices.clear();
        if let Some(engine) = &mut self.engine {
            engine.reset();
        }
    }

    fn resample_to_bytes(&mut self, pcm: &[i16]) -> Vec<u8> {
        let Some(engine) = &mut self.engine else {
            // Passthrough: in_rate == out_rate, convert i16 -> f32 directly.
            let mut bytes = Vec::with_capacity(pcm.len() * 4);
            for &s in pcm {
                bytes.extend_from_slice(&(s as f32 / 32768.0).to_le_bytes());
            }
            return bytes;
        };

        for &sample in pcm {
            self.input_buffer.push(sample as f32 / 32768.0);
        }

        let mut out_bytes = Vec::new();
        while self.input_buffer.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.input_buffer.drain(..self.chunk_size).collect();
            let input_frames = vec![chunk];

            let output_frames = match engine.process(&input_frames, None) {
                Ok(frames) => frames,
                Err(e) => {
                    tracing::warn!("resampler: process error, dropping chunk: {e}");
                    continue;
                }
            };

            if let Some(channel0) = output_frames.first() {
                for &sample in channel0 {
                    out_bytes.extend_from_slice(&sample.to_le_bytes());
                }
            }
        }
        out_bytes
    }

    fn write_into_alignment_buffer(&mut self, out_bytes: &[u8]) {
        let len = out_bytes.len();
        if len >= self.capacity {
            // More output than the buffer can ever hold; keep only the tail.
            let start = len - self.capacity;
            self.alignment_buffer.copy_from_slice(&out_bytes[start..]);
            self.write_offset = 0;
            self.buffered_bytes = self.capacity;
            return;
        }

        let first_len = (self.capacity - self.write_offset).min(len);
        self.alignment_buffer[self.write_offset..self.write_offset + first_len]
            .copy_from_slice(&out_bytes[..first_len]);
        if first_len < len {
            let rest = len - first_len;
            self.alignment_buffer[..rest].copy_from_slice(&out_bytes[first_len..]);
        }
        self.write_offset = (self.write_offset + len) % self.capacity;
        self.buffered_bytes = (self.buffered_bytes + len).min(self.capacity);
    }

    fn report_fill(&self) {
        if let Some(metrics) = &self.metrics {
            let pct = (self.buffered_bytes * 100) / self.capacity.max(1);
            metrics.update_buffer_fill(BufferType::ResamplerAlignment, pct);
        }
    }
}

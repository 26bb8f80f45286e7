//! Shared numeric defaults for the chunking/resampling stages.
//!
//! These are defaults, not hardcoded limits: every value here is also a field
//! on the corresponding config struct (`ChunkerConfig`, `ResamplerConfig`) so a
//! deployment can override them. They exist centrally so the invariants that
//! relate them (e.g. `FRAME_SAMPLES = CODEC_RATE / CHUNKS_PER_SECOND`) are
//! defined once.

/// Codec operating rate in Hz.
pub const CODEC_RATE: u32 = 48_000;

/// Chunk emission cadence, in chunks per second.
pub const CHUNKS_PER_SECOND: u32 = 50;

/// Duration of one chunk/frame, in milliseconds. `1000 / CHUNKS_PER_SECOND`.
pub const CHUNK_DURATION_MS: u64 = 1000 / CHUNKS_PER_SECOND as u64;

/// Samples per resampled/codec frame at `CODEC_RATE`. `CODEC_RATE / CHUNKS_PER_SECOND`.
pub const FRAME_SAMPLES: usize = (CODEC_RATE / CHUNKS_PER_SECOND) as usize;

/// End-to-end latency ceiling in milliseconds. Bounds the resampler's
/// alignment buffer and the orderer's practical reordering window.
pub const MAX_LATENCY_MS: u64 = 120;

/// Maximum number of out-of-order frames the Orderer tolerates before forcing
/// forward progress.
pub const MAX_UNORDERED: usize = 10;

/// Consecutive empty reads the Chunker tolerates before stopping its timer
/// and re-anchoring to wall-clock time on the next "readable" signal.
pub const MAX_LOOP_ITERATIONS_WITHOUT_DATA: u32 = 5;

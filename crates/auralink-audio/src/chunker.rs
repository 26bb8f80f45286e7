//! Time-driven chunking: turns a bursty byte source into a clock-paced
//! sequence of fixed-size, indexed PCM chunks.
//!
//! The index is derived from wall-clock elapsed time, not from a running
//! sample counter, so a chunk's position in the stream survives a source
//! stall without drifting: after `max_loop_iterations_without_data`
//! consecutive empty reads the worker drops its running index and
//! re-anchors to `floor(elapsed / chunk_duration_ms)` on the next attempt.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use crate::constants::MAX_LOOP_ITERATIONS_WITHOUT_DATA;
use auralink_telemetry::{FpsTracker, PipelineMetrics};

/// One fixed-size PCM chunk tagged with its position in the time grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedChunk {
    pub index: u32,
    pub bytes: Vec<u8>,
}

/// The Chunker's view of its upstream byte producer: a non-blocking,
/// possibly-partial read plus a permanent-closure signal. Implementors need
/// not block; returning 0 is equivalent to "not readable right now".
pub trait ChunkSource: Send {
    /// Fill as much of `buf` as data is available, without blocking. Returns
    /// the number of bytes written, which may be less than `buf.len()` or 0.
    fn try_read(&mut self, buf: &mut [u8]) -> usize;

    /// Whether the source has closed permanently (end of a finite stream).
    fn is_closed(&self) -> bool {
        false
    }
}

/// Adapts the ring-buffer-backed [`crate::frame_reader::FrameReader`] (which
/// yields `i16` sample frames) into the Chunker's raw-byte source contract.
pub struct RingBufferSource {
    frame_reader: crate::frame_reader::FrameReader,
    leftover: VecDeque<u8>,
}

impl RingBufferSource {
    pub fn new(frame_reader: crate::frame_reader::FrameReader) -> Self {
        Self {
            frame_reader,
            leftover: VecDeque::new(),
        }
    }
}

impl ChunkSource for RingBufferSource {
    fn try_read(&mut self, buf: &mut [u8]) -> usize {
        while self.leftover.len() < buf.len() {
            match self.frame_reader.read_frame(4096) {
                Some(frame) => {
                    for sample in frame.samples {
                        self.leftover.extend(sample.to_le_bytes());
                    }
                }
                None => break,
            }
        }

        let n = buf.len().min(self.leftover.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.leftover.pop_front().expect("checked len above");
        }
        n
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub source_rate: u32,
    pub channels: u16,
    pub chunks_per_second: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            source_rate: 48_000,
            channels: 1,
            chunks_per_second: 50,
        }
    }
}

impl ChunkerConfig {
    pub fn chunk_duration_ms(&self) -> u64 {
        1000 / self.chunks_per_second as u64
    }

    pub fn chunk_bytes(&self) -> usize {
        (self.source_rate as usize / self.chunks_per_second as usize)
            * self.channels as usize
            * 2
    }
}

pub struct AudioChunker<S: ChunkSource> {
    worker: ChunkerWorker<S>,
    running: Arc<AtomicBool>,
}

impl<S: ChunkSource + 'static> AudioChunker<S> {
    pub fn new(source: S, output_tx: broadcast::Sender<IndexedChunk>, cfg: ChunkerConfig) -> Self {
        Self {
            worker: ChunkerWorker::new(source, output_tx, cfg),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.worker.metrics = Some(metrics);
        self
    }

    pub fn spawn(mut self) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let tick = Duration::from_millis(self.worker.cfg.chunk_duration_ms());

        tokio::spawn(async move {
            let mut interval = time::interval(tick);
            tracing::info!("chunker started, chunk_duration_ms={}", tick.as_millis());

            while running.load(Ordering::SeqCst) {
                interval.tick().await;
                self.worker.drain_at(Instant::now());
            }

            tracing::info!("chunker stopped");
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

struct ChunkerWorker<S: ChunkSource> {
    source: S,
    output_tx: broadcast::Sender<IndexedChunk>,
    cfg: ChunkerConfig,
    start_time: Instant,
    last_emitted_index: Option<u32>,
    idle_iterations: u32,
    metrics: Option<Arc<PipelineMetrics>>,
    fps_tracker: FpsTracker,
}

impl<S: ChunkSource> ChunkerWorker<S> {
    fn new(source: S, output_tx: broadcast::Sender<IndexedChunk>, cfg: ChunkerConfig) -> Self {
        Self {
            source,
            output_tx,
            cfg,
            start_time: Instant::now(),
            last_emitted_index: None,
            idle_iterations: 0,
            metrics: None,
            fps_tracker: FpsTracker::new(),
        }
    }

    /// Run the drain loop as of wall-clock time `now`, emitting every chunk
    /// whose target time has arrived and the source has (or pretends to
    /// have, via zero-padding) data for.
    fn drain_at(&mut self, now: Instant) {
        let chunk_duration_ms = self.cfg.chunk_duration_ms();
        let chunk_bytes = self.cfg.chunk_bytes();

        loop {
            let elapsed_ms = now.duration_since(self.start_time).as_millis() as u64;

            let target = match self.last_emitted_index {
                Some(last) => last + 1,
                None => (elapsed_ms / chunk_duration_ms) as u32,
            };

            if elapsed_ms < target as u64 * chunk_duration_ms {
                break;
            }

            let mut chunk = vec![0u8; chunk_bytes];
            let n = self.source.try_read(&mut chunk);

            if n == 0 {
                self.idle_iterations += 1;
                if self.idle_iterations >= MAX_LOOP_ITERATIONS_WITHOUT_DATA {
                    tracing::debug!("chunker: source idle, re-anchoring to wall clock");
                    self.last_emitted_index = None;
                    self.idle_iterations = 0;
                    if let Some(metrics) = &self.metrics {
                        metrics.increment_chunker_reanchors();
                    }
                }
                break;
            }
            // n < chunk_bytes: remainder is already zero from the fresh Vec.
            self.idle_iterations = 0;

            let indexed = IndexedChunk {
                index: target,
                bytes: chunk,
            };
            let _ = self.output_tx.send(indexed);
            self.last_emitted_index = Some(target);

            if let Some(metrics) = &self.metrics {
                metrics.increment_chunks_emitted();
                if let Some(fps) = self.fps_tracker.tick() {
                    metrics.update_chunker_fps(fps);
                }
            }

            if self.source.is_closed() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource {
        data: VecDeque<u8>,
        infinite_zeros: bool,
    }

    impl FakeSource {
        fn infinite() -> Self {
            Self {
                data: VecDeque::new(),
                infinite_zeros: true,
            }
        }

        fn finite(bytes: Vec<u8>) -> Self {
            Self {
                data: bytes.into_iter().collect(),
                infinite_zeros: false,
            }
        }

        fn empty() -> Self {
            Self {
                data: VecDeque::new(),
                infinite_zeros: false,
            }
        }
    }

    impl ChunkSource for FakeSource {
        fn try_read(&mut self, buf: &mut [u8]) -> usize {
            if self.infinite_zeros {
                return buf.len();
            }
            let n = buf.len().min(self.data.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.data.pop_front().unwrap();
            }
            n
        }
    }

    fn small_cfg() -> ChunkerConfig {
        // 4 bytes/chunk: source_rate=50, channels=1, chunks_per_second=50 -> 1 sample/chunk * 2 bytes...
        // use numbers that divide cleanly: 100 Hz source, 50 cps, 1 channel => 2 samples/chunk * 2 bytes = 4 bytes
        ChunkerConfig {
            source_rate: 100,
            channels: 1,
            chunks_per_second: 50,
        }
    }

    #[test]
    fn steady_state_emits_sequential_indices_s1() {
        let cfg = small_cfg();
        let (tx, mut rx) = broadcast::channel(1024);
        let mut worker = ChunkerWorker::new(FakeSource::infinite(), tx, cfg);
        let start = worker.start_time;

        for i in 0..200u64 {
            worker.drain_at(start + Duration::from_millis(i * cfg.chunk_duration_ms()));
        }

        let mut indices = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            assert_eq!(chunk.bytes.len(), cfg.chunk_bytes());
            indices.push(chunk.index);
        }
        assert_eq!(indices, (0..200).collect::<Vec<u32>>());
    }

    #[test]
    fn source_stall_reanchors_index_s2() {
        let cfg = small_cfg();
        let (tx, mut rx) = broadcast::channel(1024);
        let mut worker = ChunkerWorker::new(FakeSource::empty(), tx, cfg);
        let start = worker.start_time;

        // 5 idle ticks trips the re-anchor.
        for i in 0..6u64 {
            worker.drain_at(start + Duration::from_millis(i * cfg.chunk_duration_ms()));
        }
        assert!(worker.last_emitted_index.is_none());

        worker.source = FakeSource::infinite();
        let resume_at = start + Duration::from_millis(30 * cfg.chunk_duration_ms());
        worker.drain_at(resume_at);

        let chunk = rx.try_recv().expect("one chunk emitted on resume");
        assert!((chunk.index as i64 - 30).abs() <= 1);
    }

    #[test]
    fn short_tail_is_zero_padded_s3() {
        let cfg = small_cfg();
        let (tx, mut rx) = broadcast::channel(1024);
        let partial = vec![0xAAu8, 0xBB, 0xCC]; // 3 bytes, chunk_bytes() == 4
        let mut worker = ChunkerWorker::new(FakeSource::finite(partial), tx, cfg);
        let start = worker.start_time;

        worker.drain_at(start);

        let chunk = rx.try_recv().expect("chunk emitted");
        assert_eq!(chunk.bytes, vec![0xAA, 0xBB, 0xCC, 0x00]);
    }
}

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared metrics for cross-thread pipeline monitoring. Every field is cheap
/// to update from a hot audio callback: plain atomics, no locking.
#[derive(Clone, Default)]
pub struct PipelineMetrics {
    // Frame rate tracking (frames per second * 10, for one decimal of precision
    // without floats in the atomic).
    pub chunker_fps: Arc<AtomicU64>,
    pub resampler_fps: Arc<AtomicU64>,
    pub encoder_fps: Arc<AtomicU64>,
    pub decoder_fps: Arc<AtomicU64>,

    // Buffer fill percentage (0..=100).
    pub resampler_buffer_fill: Arc<AtomicUsize>,
    pub orderer_buffer_fill: Arc<AtomicUsize>,

    // Event counters.
    pub chunks_emitted: Arc<AtomicU64>,
    pub chunker_reanchors: Arc<AtomicU64>,
    pub resampler_frames_dropped_uninitialized: Arc<AtomicU64>,
    pub frames_encoded: Arc<AtomicU64>,
    pub frames_decoded: Arc<AtomicU64>,
    pub wire_records_sent: Arc<AtomicU64>,
    pub wire_records_malformed: Arc<AtomicU64>,
    pub orderer_late_frames: Arc<AtomicU64>,
    pub orderer_concealed_frames: Arc<AtomicU64>,
    pub orderer_skipped_frames: Arc<AtomicU64>,

    // Latency tracking.
    pub end_to_end_ms: Arc<AtomicU64>,
}

impl PipelineMetrics {
    pub fn update_chunker_fps(&self, fps: f64) {
        self.chunker_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_resampler_fps(&self, fps: f64) {
        self.resampler_fps
            .store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_encoder_fps(&self, fps: f64) {
        self.encoder_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_decoder_fps(&self, fps: f64) {
        self.decoder_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_buffer_fill(&self, buffer: BufferType, fill_percent: usize) {
        let fill = fill_percent.min(100);
        match buffer {
            BufferType::ResamplerAlignment => {
                self.resampler_buffer_fill.store(fill, Ordering::Relaxed)
            }
            BufferType::OrdererWindow => self.orderer_buffer_fill.store(fill, Ordering::Relaxed),
        }
    }

    pub fn increment_chunks_emitted(&self) {
        self.chunks_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunker_reanchors(&self) {
        self.chunker_reanchors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames_encoded(&self) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_wire_records_sent(&self) {
        self.wire_records_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_wire_records_malformed(&self) {
        self.wire_records_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_orderer_late_frames(&self) {
        self.orderer_late_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_orderer_concealed_frames(&self) {
        self.orderer_concealed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_orderer_skipped_frames(&self) {
        self.orderer_skipped_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_end_to_end_latency(&self, latency_ms: u64) {
        self.end_to_end_ms.store(latency_ms, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BufferType {
    ResamplerAlignment,
    OrdererWindow,
}

/// Tracks a rolling per-second rate from per-item `tick()` calls.
#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    /// Record one item. Returns `Some(fps)` once per second elapsed, `None` otherwise.
    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_fill_clamped_to_100() {
        let metrics = PipelineMetrics::default();
        metrics.update_buffer_fill(BufferType::OrdererWindow, 250);
        assert_eq!(metrics.orderer_buffer_fill.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn fps_tracker_waits_a_full_second() {
        let mut tracker = FpsTracker::new();
        assert_eq!(tracker.tick(), None);
    }

    #[test]
    fn counters_increment() {
        let metrics = PipelineMetrics::default();
        metrics.increment_orderer_concealed_frames();
        metrics.increment_orderer_concealed_frames();
        assert_eq!(metrics.orderer_concealed_frames.load(Ordering::Relaxed), 2);
    }
}

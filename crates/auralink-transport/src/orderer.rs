//! Restores an in-order sequence from an unordered, lossy stream of indexed
//! compressed frames, with bounded buffering and bounded delay.
//!
//! Late frames (index below the current watermark) are dropped. A buffer
//! that fills before its gap closes forces forward progress: a one-frame
//! gap is bridged with a synthetic empty payload (triggering the decoder's
//! concealment path), a larger gap is simply skipped.

use std::collections::BTreeMap;
use std::sync::Arc;

use auralink_telemetry::{BufferType, PipelineMetrics};

#[derive(Debug, Clone, Copy)]
pub struct OrdererConfig {
    pub max_unordered: usize,
}

impl Default for OrdererConfig {
    fn default() -> Self {
        Self { max_unordered: 10 }
    }
}

pub struct Orderer {
    cfg: OrdererConfig,
    buffer: BTreeMap<u32, Vec<u8>>,
    next_index: Option<u32>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl Orderer {
    pub fn new(cfg: OrdererConfig) -> Self {
        Self {
            cfg,
            buffer: BTreeMap::new(),
            next_index: None,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Feed one received `(index, payload)`. Returns every frame now ready to
    /// emit, in index order — zero, one, or a run of several (overflow can
    /// release a whole contiguous span of previously-buffered frames at
    /// once, plus a synthetic concealment frame ahead of them).
    pub fn receive(&mut self, index: u32, payload: Vec<u8>) -> Vec<(u32, Vec<u8>)> {
        let mut out = Vec::new();

        let next = *self.next_index.get_or_insert(index);

        if index < next {
            if let Some(metrics) = &self.metrics {
                metrics.increment_orderer_late_frames();
            }
            self.report_fill();
            return out;
        }

        if index == next {
            out.push((index, payload));
            self.next_index = Some(index + 1);
            self.drain_contiguous(&mut out);
        } else {
            self.buffer.insert(index, payload);
            self.drain_contiguous(&mut out);
        }

        self.enforce_overflow(&mut out);
        self.report_fill();
        out
    }

    fn drain_contiguous(&mut self, out: &mut Vec<(u32, Vec<u8>)>) {
        loop {
            let next = self.next_index.expect("anchored before drain_contiguous runs");
            match self.buffer.remove(&next) {
                Some(payload) => {
                    out.push((next, payload));
                    self.next_index = Some(next + 1);
                }
                None => break,
            }
        }
    }

    fn enforce_overflow(&mut self, out: &mut Vec<(u32, Vec<u8>)>) {
        while self.buffer.len() >= self.cfg.max_unordered {
            let head_index = *self
                .buffer
                .keys()
                .next()
                .expect("buffer non-empty per loop guard");
            let next = self.next_index.expect("anchored before enforce_overflow runs");

            if head_index - next == 1 {
                out.push((next, Vec::new()));
                if let Some(metrics) = &self.metrics {
                    metrics.increment_orderer_concealed_frames();
                }
            } else if let Some(metrics) = &self.metrics {
                metrics.increment_orderer_skipped_frames();
            }

            self.next_index = Some(head_index);
            self.drain_contiguous(out);
        }
    }

    fn report_fill(&self) {
        if let Some(metrics) = &self.metrics {
            let pct = (self.buffer.len() * 100) / self.cfg.max_unordered.max(1);
            metrics.update_buffer_fill(BufferType::OrdererWindow, pct);
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(orderer: &mut Orderer, indices: &[u32]) -> Vec<u32> {
        indices
            .iter()
            .flat_map(|&i| orderer.receive(i, vec![i as u8]))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn reorders_out_of_order_input_s5() {
        let mut orderer = Orderer::new(OrdererConfig { max_unordered: 10 });
        let emitted = feed(&mut orderer, &[0, 2, 1, 3, 5, 4]);
        assert_eq!(emitted, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn single_gap_is_concealed_then_drained_s6() {
        let mut orderer = Orderer::new(OrdererConfig { max_unordered: 10 });
        let emitted = feed(&mut orderer, &[0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(emitted, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn single_gap_conceal_emits_empty_payload() {
        let mut orderer = Orderer::new(OrdererConfig { max_unordered: 10 });
        let mut conceal_payload = None;
        for &i in &[0u32, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11] {
            for (index, payload) in orderer.receive(i, vec![0xAB]) {
                if index == 1 {
                    conceal_payload = Some(payload);
                }
            }
        }
        assert_eq!(conceal_payload, Some(Vec::new()));
    }

    #[test]
    fn large_gap_is_skipped_without_concealment_s7() {
        let mut orderer = Orderer::new(OrdererConfig { max_unordered: 10 });
        let emitted = feed(&mut orderer, &[0, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
        // Index 5 arrives as a real frame (skip, not conceal) — 1..4 are
        // simply never emitted.
        assert_eq!(emitted, vec![0, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn late_frame_is_discarded() {
        let mut orderer = Orderer::new(OrdererConfig { max_unordered: 10 });
        assert_eq!(feed(&mut orderer, &[5]), vec![5]);
        assert_eq!(feed(&mut orderer, &[3]), Vec::<u32>::new());
    }

    #[test]
    fn duplicate_frame_is_discarded_as_late() {
        let mut orderer = Orderer::new(OrdererConfig { max_unordered: 10 });
        assert_eq!(feed(&mut orderer, &[0, 1]), vec![0, 1]);
        assert_eq!(feed(&mut orderer, &[1]), Vec::<u32>::new());
    }

    #[test]
    fn buffer_never_exceeds_max_unordered() {
        let mut orderer = Orderer::new(OrdererConfig { max_unordered: 4 });
        orderer.receive(0, vec![]);
        // Every index after 0 is spaced by 2, so the gap behind the buffer
        // head never closes on its own and overflow handling triggers
        // repeatedly as the run progresses.
        for i in (1..200u32).step_by(2) {
            orderer.receive(i, vec![]);
            assert!(orderer.buffered_len() <= 4);
        }
    }

    #[test]
    fn emitted_indices_are_strictly_increasing() {
        let mut orderer = Orderer::new(OrdererConfig { max_unordered: 5 });
        let emitted = feed(
            &mut orderer,
            &[3, 1, 0, 2, 4, 9, 10, 11, 12, 13, 14, 15, 16],
        );
        for pair in emitted.windows(2) {
            assert!(pair[1] > pair[0], "emitted indices must strictly increase");
        }
    }
}

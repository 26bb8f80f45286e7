use std::time::Instant;

use super::capture::AudioFrame;
use super::ring_buffer::AudioConsumer;

/// Non-blocking byte source the Chunker polls. Wraps the ring buffer consumer
/// fed by the capture callback and reconstructs a timestamp from the running
/// sample count, since the ring buffer itself carries no timing metadata.
pub struct FrameReader {
    consumer: AudioConsumer,
    device_sample_rate: u32,
    device_channels: u16,
    samples_read: u64,
    start_time: Instant,
    capacity: usize,
}

impl FrameReader {
    pub fn new(
        consumer: AudioConsumer,
        device_sample_rate: u32,
        device_channels: u16,
        capacity: usize,
    ) -> Self {
        Self {
            consumer,
            device_sample_rate,
            device_channels,
            samples_read: 0,
            start_time: Instant::now(),
            capacity,
        }
    }

    /// Non-blocking read of up to `max_samples`. Returns `None` if nothing is
    /// available — the caller (Chunker) treats this identically to a closed
    /// or momentarily starved source, per the "readable" contract.
    pub fn read_frame(&mut self, max_samples: usize) -> Option<AudioFrame> {
        let mut buffer = vec![0i16; max_samples];
        let samples_read = self.consumer.read(&mut buffer);

        if samples_read == 0 {
            return None;
        }

        buffer.truncate(samples_read);

        let elapsed_samples = self.samples_read;
        let elapsed_ms = (elapsed_samples * 1000) / self.device_sample_rate as u64;
        let timestamp = self.start_time + std::time::Duration::from_millis(elapsed_ms);

        self.samples_read += samples_read as u64;

        Some(AudioFrame {
            samples: buffer,
            timestamp,
            sample_rate: self.device_sample_rate,
            channels: self.device_channels,
        })
    }

    /// Samples currently queued and ready to read.
    pub fn available_samples(&self) -> usize {
        self.consumer.slots()
    }

    /// Ring buffer fill percentage, for telemetry.
    pub fn fill_percent(&self) -> usize {
        if self.capacity == 0 {
            0
        } else {
            (self.available_samples() * 100) / self.capacity
        }
    }

    pub fn update_device_config(&mut self, sample_rate: u32, channels: u16) {
        if self.device_sample_rate != sample_rate || self.device_channels != channels {
            tracing::info!(
                "FrameReader: device config changed from {}Hz {}ch to {}Hz {}ch",
                self.device_sample_rate,
                self.device_channels,
                sample_rate,
                channels
            );
            self.device_sample_rate = sample_rate;
            self.device_channels = channels;
        }
    }
}

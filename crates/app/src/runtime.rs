//! Wires the pipeline stages together into a running send side (capture →
//! chunker → resampler → encoder → framer → UDP) and receive side (UDP →
//! deframer → orderer → decoder → playback), using a dedicated thread for
//! the capture/playback devices and tokio tasks for everything else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use auralink_audio::ring_buffer::{AudioConsumer, AudioProducer};
use auralink_audio::{
    AudioCaptureThread, AudioChunker, AudioRingBuffer, ChunkerConfig, FrameReader, IndexedChunk,
    ResamplerConfig, ResamplerQuality, RingBufferSource, StreamResampler,
};
use auralink_codec::{DecoderConfig, EncoderConfig, FrameDecoder, FrameEncoder};
use auralink_foundation::{AudioConfig, AuralinkError};
use auralink_telemetry::PipelineMetrics;
use auralink_transport::{deframe, frame, Orderer, OrdererConfig};

use crate::transport_udp::UdpTransport;

#[derive(Debug, Clone)]
pub struct AppRuntimeOptions {
    pub device: Option<String>,
    pub chunks_per_second: u32,
    pub codec_rate: u32,
    pub resampler_quality: ResamplerQuality,
    pub max_latency_ms: u64,
    pub max_unordered: usize,
    pub bind_addr: String,
    pub peer_addr: Option<String>,
    pub capture_buffer_samples: usize,
}

impl Default for AppRuntimeOptions {
    fn default() -> Self {
        Self {
            device: None,
            chunks_per_second: auralink_audio::constants::CHUNKS_PER_SECOND,
            codec_rate: auralink_audio::constants::CODEC_RATE,
            resampler_quality: ResamplerQuality::Balanced,
            max_latency_ms: auralink_audio::constants::MAX_LATENCY_MS,
            max_unordered: auralink_audio::constants::MAX_UNORDERED,
            bind_addr: "0.0.0.0:0".to_string(),
            peer_addr: None,
            capture_buffer_samples: 65_536,
        }
    }
}

/// Handle to the running send + receive pipeline. Call [`AppHandle::shutdown`]
/// to tear both halves down cleanly.
pub struct AppHandle {
    pub metrics: Arc<PipelineMetrics>,
    pub local_addr: std::net::SocketAddr,
    audio_capture: AudioCaptureThread,
    chunker_handle: JoinHandle<()>,
    send_handle: JoinHandle<()>,
    recv_handle: JoinHandle<()>,
    playback_running: Arc<AtomicBool>,
    playback_handle: std::thread::JoinHandle<()>,
}

impl AppHandle {
    pub async fn shutdown(self) {
        debug!("Shutting down auralink runtime...");
        self.audio_capture.stop();
        self.chunker_handle.abort();
        self.send_handle.abort();
        self.recv_handle.abort();
        self.playback_running.store(false, Ordering::SeqCst);

        let _ = self.chunker_handle.await;
        let _ = self.send_handle.await;
        let _ = self.recv_handle.await;
        let _ = self.playback_handle.join();
        info!("Runtime shutdown complete");
    }
}

/// Start the full send + receive pipeline: opens a capture device, binds the
/// UDP transport, and spawns the chunker/encode/send and receive/decode
/// tasks plus a dedicated playback thread.
pub async fn start(options: AppRuntimeOptions) -> Result<AppHandle, AuralinkError> {
    let metrics = Arc::new(PipelineMetrics::default());

    let capture_ring = AudioRingBuffer::new(options.capture_buffer_samples);
    let (capture_producer, capture_consumer) = capture_ring.split();

    let audio_config = AudioConfig {
        capture_buffer_samples: options.capture_buffer_samples,
        ..AudioConfig::default()
    };
    let (audio_capture, device_cfg, _device_cfg_rx) =
        AudioCaptureThread::spawn(audio_config, capture_producer, options.device.clone())?;
    info!(
        "capture device opened: sample_rate={} channels={}",
        device_cfg.sample_rate, device_cfg.channels
    );

    let frame_reader = FrameReader::new(
        capture_consumer,
        device_cfg.sample_rate,
        device_cfg.channels,
        options.capture_buffer_samples,
    );
    let chunk_source = RingBufferSource::new(frame_reader);

    let chunker_cfg = ChunkerConfig {
        source_rate: device_cfg.sample_rate,
        channels: device_cfg.channels,
        chunks_per_second: options.chunks_per_second,
    };
    let (chunk_tx, chunk_rx) = broadcast::channel::<IndexedChunk>(1024);
    let chunker =
        AudioChunker::new(chunk_source, chunk_tx, chunker_cfg).with_metrics(metrics.clone());
    let chunker_handle = chunker.spawn();

    let transport = UdpTransport::bind(&options.bind_addr, options.peer_addr.as_deref()).await?;
    let local_addr = transport
        .local_addr()
        .map_err(|e| AuralinkError::Fatal(format!("failed to read bound UDP address: {e}")))?;
    let transport = Arc::new(tokio::sync::Mutex::new(transport));

    let resampler_cfg = ResamplerConfig {
        channels: device_cfg.channels,
        in_rate: device_cfg.sample_rate,
        out_rate: options.codec_rate,
        frame_samples: (options.codec_rate / options.chunks_per_second) as usize,
        max_latency_ms: options.max_latency_ms,
        quality: options.resampler_quality,
    };
    let encoder_cfg = EncoderConfig {
        codec_rate: options.codec_rate,
        channels: device_cfg.channels,
        frame_samples: resampler_cfg.frame_samples,
    };

    let send_handle = spawn_send_task(
        chunk_rx,
        resampler_cfg,
        encoder_cfg,
        transport.clone(),
        metrics.clone(),
    );

    let decoder_cfg = DecoderConfig {
        codec_rate: options.codec_rate,
        channels: device_cfg.channels,
        frame_samples: resampler_cfg.frame_samples,
    };
    let orderer_cfg = OrdererConfig {
        max_unordered: options.max_unordered,
    };

    let playback_ring = AudioRingBuffer::new(options.capture_buffer_samples);
    let (playback_producer, playback_consumer) = playback_ring.split();
    let playback_producer = Arc::new(Mutex::new(playback_producer));

    let recv_handle = spawn_recv_task(
        transport,
        orderer_cfg,
        decoder_cfg,
        playback_producer,
        metrics.clone(),
    );

    let playback_running = Arc::new(AtomicBool::new(true));
    let playback_handle = spawn_playback_thread(
        playback_consumer,
        options.codec_rate,
        device_cfg.channels,
        playback_running.clone(),
    )?;

    Ok(AppHandle {
        metrics,
        local_addr,
        audio_capture,
        chunker_handle,
        send_handle,
        recv_handle,
        playback_running,
        playback_handle,
    })
}

fn bytes_to_f32_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn spawn_send_task(
    mut chunk_rx: broadcast::Receiver<IndexedChunk>,
    resampler_cfg: ResamplerConfig,
    encoder_cfg: EncoderConfig,
    transport: Arc<tokio::sync::Mutex<UdpTransport>>,
    metrics: Arc<PipelineMetrics>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut resampler = StreamResampler::new(resampler_cfg).with_metrics(metrics.clone());
        let mut encoder = match FrameEncoder::new(encoder_cfg) {
            Ok(e) => e,
            Err(e) => {
                error!("failed to construct encoder, send task exiting: {e}");
                return;
            }
        };

        loop {
            let chunk = match chunk_rx.recv().await {
                Ok(chunk) => chunk,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("send task lagged behind chunker, skipped {skipped} chunks");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let pcm: Vec<i16> = chunk
                .bytes
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect();

            for (frame_index, range) in resampler.process_chunk(chunk.index, &pcm) {
                let samples = bytes_to_f32_samples(&resampler.view_owned(range));
                let (index, payload) = match encoder.encode(frame_index, &samples) {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("encode failed for frame {index}, dropping: {e}");
                        continue;
                    }
                };
                let record = frame(index, &payload);
                let transport = transport.lock().await;
                if let Err(e) = transport.send(&record).await {
                    warn!("send failed for frame {index}: {e}");
                    continue;
                }
                metrics.increment_wire_records_sent();
                metrics.increment_frames_encoded();
            }
        }
        debug!("send task exiting");
    })
}

fn spawn_recv_task(
    transport: Arc<tokio::sync::Mutex<UdpTransport>>,
    orderer_cfg: OrdererConfig,
    decoder_cfg: DecoderConfig,
    playback_producer: Arc<Mutex<AudioProducer>>,
    metrics: Arc<PipelineMetrics>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut orderer = Orderer::new(orderer_cfg).with_metrics(metrics.clone());
        let mut decoder = match FrameDecoder::new(decoder_cfg) {
            Ok(d) => d,
            Err(e) => {
                error!("failed to construct decoder, recv task exiting: {e}");
                return;
            }
        };

        let mut buf = [0u8; 1500];
        loop {
            let len = {
                let mut transport = transport.lock().await;
                match transport.recv(&mut buf).await {
                    Ok(len) => len,
                    Err(e) => {
                        warn!("recv failed: {e}");
                        continue;
                    }
                }
            };

            let (index, payload) = match deframe(&buf[..len]) {
                Ok(pair) => pair,
                Err(e) => {
                    metrics.increment_wire_records_malformed();
                    warn!("dropping malformed wire record: {e}");
                    continue;
                }
            };

            for (index, payload) in orderer.receive(index, payload) {
                let (_, pcm) = match decoder.decode(index, &payload) {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("decode failed for frame {index}: {e}");
                        continue;
                    }
                };
                metrics.increment_frames_decoded();

                let i16_samples: Vec<i16> = pcm
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .collect();
                let _ = playback_producer.lock().write(&i16_samples);
            }
        }
    })
}

fn spawn_playback_thread(
    mut consumer: AudioConsumer,
    sample_rate: u32,
    channels: u16,
    running: Arc<AtomicBool>,
) -> Result<std::thread::JoinHandle<()>, AuralinkError> {
    let handle = std::thread::Builder::new()
        .name("audio-playback".to_string())
        .spawn(move || {
            let host = cpal::default_host();
            let Some(device) = host.default_output_device() else {
                error!("no default output device available; playback disabled");
                return;
            };
            let config = cpal::StreamConfig {
                channels,
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let err_fn = |err| error!("playback stream error: {err}");
            let stream = match device.build_output_stream(
                &config,
                move |data: &mut [i16], _| {
                    let read = consumer.read(data);
                    for sample in data.iter_mut().skip(read) {
                        *sample = 0;
                    }
                },
                err_fn,
                None,
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    error!("failed to build playback stream: {e}");
                    return;
                }
            };

            if let Err(e) = stream.play() {
                error!("failed to start playback stream: {e}");
                return;
            }

            while running.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            drop(stream);
        })
        .map_err(|e| AuralinkError::Fatal(format!("failed to spawn playback thread: {e}")))?;
    Ok(handle)
}

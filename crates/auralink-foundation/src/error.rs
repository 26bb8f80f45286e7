use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the auralink binary and its direct glue code.
///
/// Per the pipeline's error handling design, most hot-path failures (source
/// starvation, late frames, malformed wire records) never reach this type —
/// they are counted and logged in place. This enum exists for construction-time
/// and teardown-time failures: device/codec/transport setup, configuration.
#[derive(Error, Debug)]
pub enum AuralinkError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Component failed health check: {component}")]
    HealthCheckFailed { component: String },

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Transient error, will retry: {0}")]
    Transient(String),
}

impl From<std::io::Error> for AuralinkError {
    fn from(err: std::io::Error) -> Self {
        AuralinkError::Transport(TransportError::Io(err))
    }
}

impl From<tokio::task::JoinError> for AuralinkError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuralinkError::Transient(format!("Task join failed: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("Buffer overflow, dropped {count} samples")]
    BufferOverflow { count: usize },

    #[error("No audio data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("Silence detected for {duration:?}")]
    SilenceDetected { duration: Duration },

    #[error("CPAL error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),
}

/// Failures from the codec adapter (encoder/decoder construction and one-shot
/// submit/receive calls that the codec itself rejects outright, as opposed to
/// a concealment request, which is not an error).
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to construct encoder: {0}")]
    EncoderInit(String),

    #[error("failed to construct decoder: {0}")]
    DecoderInit(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// Failures from the transport-facing edges of the pipeline: socket bind/send
/// errors and malformed wire records. A malformed record is counted at the
/// Deframer, not propagated as an error to the rest of the pipeline; this
/// variant exists for the binary's own transport plumbing.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire record too short: {len} bytes, need at least 4")]
    RecordTooShort { len: usize },

    #[error("no peer address configured for send")]
    NoPeer,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration parsing error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Environment variable error: {0}")]
    EnvVar(String),
}

/// Device status events for monitoring audio device changes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    DeviceAdded { name: String },
    DeviceRemoved { name: String },
    CurrentDeviceDisconnected { name: String },
    DeviceSwitched { from: Option<String>, to: String },
    DeviceSwitchFailed {
        attempted: String,
        fallback: Option<String>,
    },
    DeviceSwitchRequested { target: String },
}

#[derive(Debug, Clone)]
pub struct DeviceStatus {
    pub name: String,
    pub is_current: bool,
    pub is_available: bool,
    pub is_default: bool,
    pub last_seen: std::time::Instant,
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Fallback { to: String },
    Restart,
    Ignore,
    Fatal,
}

impl AuralinkError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            AuralinkError::Audio(AudioError::DeviceDisconnected) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            AuralinkError::Audio(AudioError::DeviceNotFound { .. }) => RecoveryStrategy::Fallback {
                to: "default".into(),
            },
            AuralinkError::Audio(AudioError::BufferOverflow { .. }) => RecoveryStrategy::Ignore,
            AuralinkError::Fatal(_) | AuralinkError::ShutdownRequested => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Restart,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    pub silence_threshold: i16,
    /// Ring buffer capacity in samples. At 16kHz mono, 65536 samples ≈ 4.1 seconds.
    /// Larger buffers provide more headroom for downstream processing spikes but increase
    /// worst-case latency.
    pub capture_buffer_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 100,
            capture_buffer_samples: 65_536,
        }
    }
}

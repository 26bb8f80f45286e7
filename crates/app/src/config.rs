//! Layered configuration for the demo binary: built-in defaults, optionally
//! overridden by an `auralink.toml` file, then by `AURALINK__SECTION__FIELD`
//! environment variables, then by CLI flags in `main.rs`.

use serde::{Deserialize, Serialize};

use auralink_foundation::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerSettings {
    pub chunks_per_second: u32,
}

impl Default for ChunkerSettings {
    fn default() -> Self {
        Self {
            chunks_per_second: auralink_audio::constants::CHUNKS_PER_SECOND,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResamplerQualitySetting {
    Fast,
    Balanced,
    Quality,
}

impl From<ResamplerQualitySetting> for auralink_audio::ResamplerQuality {
    fn from(value: ResamplerQualitySetting) -> Self {
        match value {
            ResamplerQualitySetting::Fast => auralink_audio::ResamplerQuality::Fast,
            ResamplerQualitySetting::Balanced => auralink_audio::ResamplerQuality::Balanced,
            ResamplerQualitySetting::Quality => auralink_audio::ResamplerQuality::Quality,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplerSettings {
    pub codec_rate: u32,
    pub quality: ResamplerQualitySetting,
    pub max_latency_ms: u64,
}

impl Default for ResamplerSettings {
    fn default() -> Self {
        Self {
            codec_rate: auralink_audio::constants::CODEC_RATE,
            quality: ResamplerQualitySetting::Balanced,
            max_latency_ms: auralink_audio::constants::MAX_LATENCY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdererSettings {
    pub max_unordered: usize,
}

impl Default for OrdererSettings {
    fn default() -> Self {
        Self {
            max_unordered: auralink_audio::constants::MAX_UNORDERED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub bind: String,
    pub peer: Option<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:0".to_string(),
            peer: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub retention_days: u64,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { retention_days: 7 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: Option<String>,
    pub chunker: ChunkerSettings,
    pub resampler: ResamplerSettings,
    pub orderer: OrdererSettings,
    pub transport: TransportSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load layered configuration: built-in defaults, `auralink.toml` in the
    /// working directory if present, then `AURALINK__SECTION__FIELD` env
    /// overrides. Set `AURALINK_SKIP_CONFIG_DISCOVERY=1` to skip the file
    /// layer entirely (used by tests that only want env/CLI behavior).
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?);

        let skip_file = std::env::var("AURALINK_SKIP_CONFIG_DISCOVERY")
            .map(|v| v == "1")
            .unwrap_or(false);
        if !skip_file {
            builder = builder.add_source(config::File::with_name("auralink").required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("AURALINK")
                .separator("__")
                .try_parsing(true),
        );

        let raw: Settings = builder.build()?.try_deserialize()?;
        let mut settings = raw;
        settings.validate();
        Ok(settings)
    }

    /// Clamp out-of-range values to the nearest sane bound, warning rather
    /// than failing outright.
    pub fn validate(&mut self) {
        if self.chunker.chunks_per_second == 0 {
            tracing::warn!("chunks_per_second=0 is invalid, clamping to 50");
            self.chunker.chunks_per_second = 50;
        }
        if self.resampler.codec_rate == 0 {
            tracing::warn!("codec_rate=0 is invalid, clamping to 48000");
            self.resampler.codec_rate = 48_000;
        }
        if self.resampler.max_latency_ms == 0 {
            tracing::warn!("max_latency_ms=0 is invalid, clamping to 120");
            self.resampler.max_latency_ms = 120;
        }
        if self.orderer.max_unordered == 0 {
            tracing::warn!("max_unordered=0 is invalid, clamping to 10");
            self.orderer.max_unordered = 10;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_match_pipeline_constants() {
        let settings = Settings::default();
        assert_eq!(settings.chunker.chunks_per_second, 50);
        assert_eq!(settings.resampler.codec_rate, 48_000);
        assert_eq!(settings.orderer.max_unordered, 10);
    }

    #[test]
    fn validate_clamps_zero_chunks_per_second() {
        let mut settings = Settings {
            chunker: ChunkerSettings {
                chunks_per_second: 0,
            },
            ..Settings::default()
        };
        settings.validate();
        assert_eq!(settings.chunker.chunks_per_second, 50);
    }

    #[test]
    fn validate_clamps_zero_max_unordered() {
        let mut settings = Settings {
            orderer: OrdererSettings { max_unordered: 0 },
            ..Settings::default()
        };
        settings.validate();
        assert_eq!(settings.orderer.max_unordered, 10);
    }

    #[test]
    #[serial]
    fn new_skips_file_discovery_when_env_set() {
        std::env::set_var("AURALINK_SKIP_CONFIG_DISCOVERY", "1");
        let settings = Settings::new().expect("settings load without a config file");
        std::env::remove_var("AURALINK_SKIP_CONFIG_DISCOVERY");
        assert_eq!(settings.resampler.codec_rate, 48_000);
    }

    #[test]
    #[serial]
    fn env_override_wins_over_default() {
        std::env::set_var("AURALINK_SKIP_CONFIG_DISCOVERY", "1");
        std::env::set_var("AURALINK__ORDERER__MAX_UNORDERED", "4");
        let settings = Settings::new().expect("settings load with env override");
        std::env::remove_var("AURALINK__ORDERER__MAX_UNORDERED");
        std::env::remove_var("AURALINK_SKIP_CONFIG_DISCOVERY");
        assert_eq!(settings.orderer.max_unordered, 4);
    }
}

//! Runtime configuration
//!
//! Loaded from JSON or from `VROOM_*` environment variables. Durations use
//! humantime syntax (`33ms`, `4s`, `1m 30s`). Anything not given keeps its
//! default.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vroom_capture::{CameraConstraints, CaptureConfig};
use vroom_core::{VroomError, VroomResult};
use vroom_state::{ReconcilerConfig, DEFAULT_AVATAR_URL};
use vroom_transport::ChannelConfig;

use crate::LogFormat;

/// Call runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Camera frame pull cadence
    #[serde(with = "humantime_duration")]
    pub frame_interval: Duration,
    /// Minimum spacing between capture emissions
    #[serde(with = "humantime_duration")]
    pub emit_interval: Duration,
    /// Minimum spacing between outbound telemetry messages
    #[serde(with = "humantime_duration")]
    pub telemetry_min_interval: Duration,
    #[serde(with = "humantime_duration")]
    pub reaction_ttl: Duration,
    #[serde(with = "humantime_duration")]
    pub sweep_interval: Duration,
    pub camera_width: u32,
    pub camera_height: u32,
    /// Capacity of the capture-to-loop sample queue
    pub sample_buffer: usize,
    /// Capacity of the command queue
    pub command_buffer: usize,
    pub default_avatar_url: String,
    pub log_format: LogFormat,
    /// Used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let capture = CaptureConfig::default();
        let channel = ChannelConfig::default();
        let reconciler = ReconcilerConfig::default();
        RuntimeConfig {
            frame_interval: capture.frame_interval,
            emit_interval: capture.emit_interval,
            telemetry_min_interval: channel.telemetry_min_interval,
            reaction_ttl: reconciler.reaction_ttl,
            sweep_interval: reconciler.sweep_interval,
            camera_width: capture.constraints.width,
            camera_height: capture.constraints.height,
            sample_buffer: 4,
            command_buffer: 32,
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
            log_format: LogFormat::Pretty,
            log_filter: "vroom=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> VroomResult<Self> {
        let config: RuntimeConfig =
            serde_json::from_str(json).map_err(|e| VroomError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `VROOM_*` environment variables
    pub fn from_env() -> VroomResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `VROOM_*` key
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> VroomResult<Self> {
        let mut config = RuntimeConfig::default();

        override_duration(&lookup, "VROOM_FRAME_INTERVAL", &mut config.frame_interval)?;
        override_duration(&lookup, "VROOM_EMIT_INTERVAL", &mut config.emit_interval)?;
        override_duration(
            &lookup,
            "VROOM_TELEMETRY_MIN_INTERVAL",
            &mut config.telemetry_min_interval,
        )?;
        override_duration(&lookup, "VROOM_REACTION_TTL", &mut config.reaction_ttl)?;
        override_duration(&lookup, "VROOM_SWEEP_INTERVAL", &mut config.sweep_interval)?;
        override_parsed(&lookup, "VROOM_CAMERA_WIDTH", &mut config.camera_width)?;
        override_parsed(&lookup, "VROOM_CAMERA_HEIGHT", &mut config.camera_height)?;
        override_parsed(&lookup, "VROOM_SAMPLE_BUFFER", &mut config.sample_buffer)?;
        override_parsed(&lookup, "VROOM_COMMAND_BUFFER", &mut config.command_buffer)?;
        override_parsed(&lookup, "VROOM_LOG_FORMAT", &mut config.log_format)?;
        if let Some(url) = lookup("VROOM_DEFAULT_AVATAR_URL") {
            config.default_avatar_url = url;
        }
        if let Some(filter) = lookup("VROOM_LOG") {
            config.log_filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VroomResult<()> {
        let intervals = [
            ("frame_interval", self.frame_interval),
            ("emit_interval", self.emit_interval),
            ("sweep_interval", self.sweep_interval),
            ("reaction_ttl", self.reaction_ttl),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(VroomError::Config(format!("{name} must be non-zero")));
            }
        }
        if self.sample_buffer == 0 || self.command_buffer == 0 {
            return Err(VroomError::Config("queue capacities must be non-zero".into()));
        }
        if self.camera_width == 0 || self.camera_height == 0 {
            return Err(VroomError::Config("camera resolution must be non-zero".into()));
        }
        if self.sweep_interval > self.reaction_ttl {
            tracing::warn!(
                sweep = %humantime::format_duration(self.sweep_interval),
                ttl = %humantime::format_duration(self.reaction_ttl),
                "Sweep interval exceeds reaction TTL; expired reactions linger in memory"
            );
        }
        Ok(())
    }

    pub fn capture(&self) -> CaptureConfig {
        CaptureConfig {
            frame_interval: self.frame_interval,
            emit_interval: self.emit_interval,
            constraints: CameraConstraints {
                width: self.camera_width,
                height: self.camera_height,
                ..CameraConstraints::default()
            },
        }
    }

    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig {
            telemetry_min_interval: self.telemetry_min_interval,
        }
    }

    pub fn reconciler(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            reaction_ttl: self.reaction_ttl,
            sweep_interval: self.sweep_interval,
            default_avatar_url: self.default_avatar_url.clone(),
        }
    }
}

fn override_duration(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut Duration,
) -> VroomResult<()> {
    if let Some(raw) = lookup(key) {
        *slot = humantime::parse_duration(raw.trim())
            .map_err(|e| VroomError::Config(format!("{key}: {e}")))?;
    }
    Ok(())
}

fn override_parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) -> VroomResult<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e: T::Err| VroomError::Config(format!("{key}: {e}")))?;
    }
    Ok(())
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.reaction_ttl, Duration::from_millis(4000));
        assert_eq!(config.sweep_interval, Duration::from_millis(500));
        assert_eq!(config.telemetry_min_interval, Duration::from_millis(33));
        assert_eq!((config.camera_width, config.camera_height), (1280, 720));
    }

    #[test]
    fn test_from_json_partial() {
        let config = RuntimeConfig::from_json(
            r#"{"reaction_ttl": "2s", "emit_interval": "50ms", "log_format": "json"}"#,
        )
        .unwrap();

        assert_eq!(config.reaction_ttl, Duration::from_secs(2));
        assert_eq!(config.emit_interval, Duration::from_millis(50));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.sweep_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            RuntimeConfig::from_json(r#"{"reaction_ttl": "soon"}"#),
            Err(VroomError::Config(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_json(r#"{"reaction_tll": "2s"}"#),
            Err(VroomError::Config(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_json(r#"{"sweep_interval": "0s"}"#),
            Err(VroomError::Config(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_keeps_durations_readable() {
        let json = serde_json::to_string(&RuntimeConfig::default()).unwrap();
        assert!(json.contains(r#""reaction_ttl":"4s""#), "{json}");
        assert_eq!(RuntimeConfig::from_json(&json).unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[
            ("VROOM_SWEEP_INTERVAL", "250ms"),
            ("VROOM_CAMERA_WIDTH", "640"),
            ("VROOM_LOG", "vroom=debug"),
        ]))
        .unwrap();

        assert_eq!(config.sweep_interval, Duration::from_millis(250));
        assert_eq!(config.camera_width, 640);
        assert_eq!(config.capture().constraints.width, 640);
        assert_eq!(config.log_filter, "vroom=debug");
    }

    #[test]
    fn test_lookup_reports_bad_key() {
        let err = RuntimeConfig::from_lookup(lookup_from(&[("VROOM_SAMPLE_BUFFER", "lots")]))
            .unwrap_err();
        match err {
            VroomError::Config(msg) => assert!(msg.starts_with("VROOM_SAMPLE_BUFFER"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[serial]
    fn test_from_process_env() {
        std::env::set_var("VROOM_REACTION_TTL", "6s");
        std::env::set_var("VROOM_LOG_FORMAT", "json");
        let config = RuntimeConfig::from_env();
        std::env::remove_var("VROOM_REACTION_TTL");
        std::env::remove_var("VROOM_LOG_FORMAT");

        let config = config.unwrap();
        assert_eq!(config.reaction_ttl, Duration::from_secs(6));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.reconciler().reaction_ttl, Duration::from_secs(6));
    }

    #[test]
    #[serial]
    fn test_from_process_env_defaults() {
        std::env::remove_var("VROOM_REACTION_TTL");
        let config = RuntimeConfig::from_env().unwrap();
        assert_eq!(config.reaction_ttl, Duration::from_millis(4000));
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use psyche_consciousness::ConsciousnessConfig;
use psyche_emergence::{EmergenceConfig, MAX_EMERGENT_TRAITS};
use psyche_persona::DEFAULT_HISTORY_LIMIT;
use psyche_self_awareness::SelfAwarenessConfig;
use serde::Deserialize;
use thiserror::Error;

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A probability or weight outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange {
        /// Dotted field path.
        field: &'static str,
        /// Offending value.
        value: f32,
    },
    /// A count or duration that must be positive.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    /// A count above its hard limit.
    #[error("{field} must be at most {max}, got {value}")]
    AboveLimit {
        /// Dotted field path.
        field: &'static str,
        /// Offending value.
        value: usize,
        /// Largest accepted value.
        max: usize,
    },
}

/// Whole runtime configuration, usually read from `psyche.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PsycheConfig {
    /// Turn orchestration.
    #[serde(default)]
    pub dialogue: DialogueConfig,
    /// Consciousness manager tunables.
    #[serde(default)]
    pub consciousness: ConsciousnessConfig,
    /// Self-awareness engine tunables.
    #[serde(default)]
    pub self_awareness: SelfAwarenessConfig,
    /// Emergent behaviour tunables.
    #[serde(default)]
    pub emergence: EmergenceConfig,
    /// Log and event sinks.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Seed for every random source; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl PsycheConfig {
    /// Loads and validates a TOML file. Relative telemetry paths resolve
    /// against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading psyche config {}", path.display()))?;
        let mut config = Self::parse(&raw).with_context(|| format!("loading {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.telemetry.resolve_against(&base);
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("parsing psyche config")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges the engines rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |field: &'static str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::OutOfUnitRange { field, value })
            }
        };
        let d = &self.dialogue;
        unit("dialogue.emergent_probability", d.emergent_probability)?;
        unit("dialogue.strong_pressure_threshold", d.strong_pressure_threshold)?;
        unit("dialogue.emotion_blend_weight", d.emotion_blend_weight)?;
        if d.turn_timeout_ms == 0 {
            return Err(ConfigError::Zero("dialogue.turn_timeout_ms"));
        }
        if d.history_limit == 0 {
            return Err(ConfigError::Zero("dialogue.history_limit"));
        }
        if d.self_awareness_interval == 0 {
            return Err(ConfigError::Zero("dialogue.self_awareness_interval"));
        }
        unit(
            "consciousness.metacognitive_insight_probability",
            self.consciousness.metacognitive_insight_probability,
        )?;
        unit(
            "consciousness.fluctuation_amplitude",
            self.consciousness.fluctuation_amplitude,
        )?;
        if self.consciousness.idle_interval_ms == 0 {
            return Err(ConfigError::Zero("consciousness.idle_interval_ms"));
        }
        if self.consciousness.fluctuation_period_ms == 0 {
            return Err(ConfigError::Zero("consciousness.fluctuation_period_ms"));
        }
        let e = &self.emergence;
        unit("emergence.novel_synthesis_probability", e.novel_synthesis_probability)?;
        unit("emergence.adaptive_gene_chance", e.adaptive_gene_chance)?;
        unit("emergence.learned_gene_chance", e.learned_gene_chance)?;
        unit("emergence.mutation_noise", e.mutation_noise)?;
        if e.max_traits == 0 {
            return Err(ConfigError::Zero("emergence.max_traits"));
        }
        if e.max_traits > MAX_EMERGENT_TRAITS {
            return Err(ConfigError::AboveLimit {
                field: "emergence.max_traits",
                value: e.max_traits,
                max: MAX_EMERGENT_TRAITS,
            });
        }
        Ok(())
    }
}

/// Turn orchestration settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DialogueConfig {
    /// Dialogue API URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Budget for a whole turn, in milliseconds.
    #[serde(default = "default_turn_timeout_ms")]
    pub turn_timeout_ms: u64,
    /// Dialogue entries kept per player.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Self-awareness runs on every n-th turn.
    #[serde(default = "default_self_awareness_interval")]
    pub self_awareness_interval: usize,
    /// Chance of running emergent behaviour on a calm turn.
    #[serde(default = "default_emergent_probability")]
    pub emergent_probability: f32,
    /// Pressure intensity that forces emergent behaviour.
    #[serde(default = "default_strong_pressure_threshold")]
    pub strong_pressure_threshold: f32,
    /// Memories retrieved per turn.
    #[serde(default = "default_max_memories")]
    pub max_memories: usize,
    /// Weight of the reply emotions when blending into the player's.
    #[serde(default = "default_emotion_blend_weight")]
    pub emotion_blend_weight: f32,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            turn_timeout_ms: default_turn_timeout_ms(),
            history_limit: default_history_limit(),
            self_awareness_interval: default_self_awareness_interval(),
            emergent_probability: default_emergent_probability(),
            strong_pressure_threshold: default_strong_pressure_threshold(),
            max_memories: default_max_memories(),
            emotion_blend_weight: default_emotion_blend_weight(),
        }
    }
}

impl DialogueConfig {
    /// Turn budget as a [`Duration`].
    #[must_use]
    pub const fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }
}

/// Where telemetry goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TelemetryConfig {
    /// Directory receiving one JSON-lines log per module.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// JSON-lines file receiving published events.
    #[serde(default)]
    pub event_log: Option<PathBuf>,
}

impl TelemetryConfig {
    fn resolve_against(&mut self, base: &Path) {
        for path in [&mut self.log_dir, &mut self.event_log].into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8080/v1/dialogue".into()
}

fn default_api_key_env() -> String {
    "PSYCHE_API_KEY".into()
}

const fn default_turn_timeout_ms() -> u64 {
    4_000
}

const fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

const fn default_self_awareness_interval() -> usize {
    3
}

const fn default_emergent_probability() -> f32 {
    0.4
}

const fn default_strong_pressure_threshold() -> f32 {
    0.7
}

const fn default_max_memories() -> usize {
    5
}

const fn default_emotion_blend_weight() -> f32 {
    0.3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = PsycheConfig::parse("").unwrap();
        assert_eq!(config, PsycheConfig::default());
        assert_eq!(config.dialogue.turn_timeout(), Duration::from_secs(4));
        assert_eq!(config.dialogue.self_awareness_interval, 3);
        assert!((config.dialogue.emergent_probability - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn sections_override_defaults() {
        let config = PsycheConfig::parse(
            r#"
            seed = 42

            [dialogue]
            endpoint = "https://dialogue.example/v2"
            turn_timeout_ms = 1500

            [consciousness]
            processing_delay_ms = 0

            [emergence]
            max_traits = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.dialogue.endpoint, "https://dialogue.example/v2");
        assert_eq!(config.dialogue.history_limit, 50);
        assert_eq!(config.consciousness.processing_delay_ms, 0);
        assert_eq!(config.emergence.max_traits, 3);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = PsycheConfig::parse("[dialogue]\nemergent_probability = 1.5\n").unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(
            *config_err,
            ConfigError::OutOfUnitRange {
                field: "dialogue.emergent_probability",
                value: 1.5
            }
        );
        assert!(PsycheConfig::parse("[dialogue]\nhistory_limit = 0\n").is_err());
    }

    #[test]
    fn emergence_limits_are_enforced() {
        let err = PsycheConfig::parse("[emergence]\nmax_traits = 12\n").unwrap_err();
        assert_eq!(
            *err.downcast_ref::<ConfigError>().unwrap(),
            ConfigError::AboveLimit {
                field: "emergence.max_traits",
                value: 12,
                max: 5
            }
        );
        let err = PsycheConfig::parse("[emergence]\nmutation_noise = nan\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::OutOfUnitRange {
                field: "emergence.mutation_noise",
                ..
            })
        ));
        assert!(PsycheConfig::parse("[consciousness]\nfluctuation_amplitude = nan\n").is_err());
        assert!(PsycheConfig::parse("[emergence]\nmax_traits = 5\nmutation_noise = 0.2\n").is_ok());
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("psyche.toml");
        fs::write(&path, "[telemetry]\nlog_dir = \"logs\"\n").unwrap();
        let config = PsycheConfig::load(&path).unwrap();
        assert_eq!(config.telemetry.log_dir, Some(dir.path().join("logs")));
        assert!(config.telemetry.event_log.is_none());
    }
}

//! Tunable parameters of the monitor.
//!
//! Every threshold the detectors use lives here. They are heuristics, not
//! truths: a 2500ms interaction window or a 16px border ceiling are
//! defaults, and a host is expected to override them from TOML.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub phase: PhaseConfig,
    pub geometry: GeometryConfig,
    pub animation: AnimationConfig,
    pub timing: TimingConfig,
    pub snapshots: SnapshotConfig,
    pub exit: ExitConfig,
}

impl MonitorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phase.interaction_window_ms <= 0.0 {
            return Err(ConfigError::Invalid("phase.interaction_window_ms must be > 0"));
        }
        if self.phase.max_windows == 0 {
            return Err(ConfigError::Invalid("phase.max_windows must be > 0"));
        }
        if self.geometry.min_thickness_px <= 0.0
            || self.geometry.max_thickness_px < self.geometry.min_thickness_px
        {
            return Err(ConfigError::Invalid(
                "geometry thickness range must be positive and ordered",
            ));
        }
        if self.snapshots.interval_ms <= 0.0 || self.exit.probe_interval_ms <= 0.0 {
            return Err(ConfigError::Invalid("intervals must be > 0"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// How long after a gesture new requests count as user-triggered.
    pub interaction_window_ms: f64,
    /// Expired windows linger this long before pruning, so late timing
    /// records can still land in them.
    pub interaction_grace_ms: f64,
    pub max_windows: usize,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            interaction_window_ms: 2500.0,
            interaction_grace_ms: 500.0,
            max_windows: 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub min_thickness_px: f32,
    pub max_thickness_px: f32,
    /// DOM edges must sit this close to the viewport edge.
    pub edge_tolerance_px: f32,
    /// Canvas paths must reach this close to the surface edge.
    pub canvas_tolerance_px: f32,
    pub max_elements: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            min_thickness_px: 1.0,
            max_thickness_px: 16.0,
            edge_tolerance_px: 1.0,
            canvas_tolerance_px: 2.0,
            max_elements: 3000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Scan times, relative to content-ready.
    pub scan_offsets_ms: Vec<f64>,
    pub max_elements: usize,
    /// Loop count reported once any animation runs forever.
    pub infinite_loop_sentinel: u32,
    /// Global names of timeline libraries worth hooking.
    pub library_names: Vec<String>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            scan_offsets_ms: vec![600.0, 2000.0, 5000.0, 10_000.0, 30_000.0],
            max_elements: 3000,
            infinite_loop_sentinel: 999,
            library_names: vec![
                "gsap".into(),
                "TweenMax".into(),
                "TweenLite".into(),
                "TimelineMax".into(),
                "anime".into(),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// The long-task observer disconnects this long after injection.
    pub long_task_window_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            long_task_window_ms: 3000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub interval_ms: f64,
    pub max_emissions: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000.0,
            max_emissions: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    pub probe_interval_ms: f64,
    pub probe_max_attempts: u32,
    /// Globals that expose an exit call, in preference order. The first
    /// one names the fallback shim.
    pub api_names: Vec<String>,
    /// Globals that carry a destination URL.
    pub destination_globals: Vec<String>,
    pub timeout_ms: u64,
    pub max_redirects: usize,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 250.0,
            probe_max_attempts: 20,
            api_names: vec!["ExitApi".into(), "Enabler".into(), "mraid".into()],
            destination_globals: vec!["clickTag".into(), "clickTAG".into(), "clicktag".into()],
            timeout_ms: 5000,
            max_redirects: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let c = MonitorConfig::default();
        assert_eq!(c.phase.interaction_window_ms, 2500.0);
        assert_eq!(c.phase.max_windows, 20);
        assert_eq!(c.geometry.max_thickness_px, 16.0);
        assert_eq!(c.timing.long_task_window_ms, 3000.0);
        assert_eq!(c.snapshots.max_emissions, 10);
        assert_eq!(c.exit.probe_max_attempts, 20);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let c = MonitorConfig::from_toml_str(
            "[phase]\ninteraction_window_ms = 1000.0\n\n[exit]\napi_names = [\"mraid\"]\n",
        )
        .unwrap();
        assert_eq!(c.phase.interaction_window_ms, 1000.0);
        assert_eq!(c.phase.max_windows, 20);
        assert_eq!(c.exit.api_names, vec!["mraid".to_string()]);
        assert_eq!(c.exit.max_redirects, 1);
    }

    #[test]
    fn rejects_inverted_thickness_range() {
        let err = MonitorConfig::from_toml_str(
            "[geometry]\nmin_thickness_px = 20.0\nmax_thickness_px = 2.0\n",
        );
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            MonitorConfig::from_toml_str("[phase"),
            Err(ConfigError::Parse(_))
        ));
    }
}

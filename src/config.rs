//! Runtime configuration.
//!
//! Defaults are compiled in; a JSON file and `CAMPUSD_`-prefixed environment
//! variables (nested keys split on `__`) are merged on top, in that order.
//! Keys are snake_case so `CAMPUSD_ATTENDANCE__LOW_THRESHOLD` lines up with
//! `attendance.low_threshold` in the file.

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendancePolicy {
    /// Percentage reported when a student has no matching records.
    #[serde(default = "default_empty_percentage")]
    pub empty_percentage: f64,
    /// LOW_ATTENDANCE is raised strictly below this percentage.
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
}

fn default_empty_percentage() -> f64 {
    100.0
}

fn default_low_threshold() -> f64 {
    60.0
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            empty_percentage: default_empty_percentage(),
            low_threshold: default_low_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingPolicy {
    /// Whether grading an already GRADED submission overwrites it.
    #[serde(default = "default_allow_regrade")]
    pub allow_regrade: bool,
    /// Upper bound used for assignments that carry no `maxMarks`.
    #[serde(default = "default_max_marks")]
    pub default_max_marks: f64,
}

fn default_allow_regrade() -> bool {
    true
}

fn default_max_marks() -> f64 {
    100.0
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            allow_regrade: default_allow_regrade(),
            default_max_marks: default_max_marks(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub attendance: AttendancePolicy,
    #[serde(default)]
    pub grading: GradingPolicy,
}

impl CoreConfig {
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(CoreConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Json::file(path));
        }
        figment.merge(Env::prefixed("CAMPUSD_").split("__"))
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config: CoreConfig = Self::figment(path).extract()?;
        if !(0.0..=100.0).contains(&config.attendance.empty_percentage) {
            anyhow::bail!("attendance.empty_percentage must be within 0..=100");
        }
        if config.grading.default_max_marks < 0.0 {
            anyhow::bail!("grading.default_max_marks must not be negative");
        }
        Ok(config)
    }
}

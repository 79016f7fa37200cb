use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HeuristicError, HeuristicResult};
use crate::heuristic::sub_solve::SubSolverBackend;

/// Seed of the per heuristic random stream unless configured otherwise
pub const DEFAULT_SEED: u64 = 1_234_567;

/// Share of matching branching decisions below which two nodes count as far apart
pub const DEFAULT_FAR_THRESHOLD: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Search tree positions at which a heuristic fires
pub enum When {
    Off,
    AtRoot,
    NotAtRoot,
    Always,
}

impl When {
    /// Classic integer codes: 0 off, 1 at root, 2 other than root, 3 always.
    /// Adding 10 means "trust odd problems", returned as second value.
    pub fn from_code(code: i32) -> HeuristicResult<(When, bool)> {
        let trust_odd = code >= 10;
        let when = match code % 10 {
            0 => When::Off,
            1 => When::AtRoot,
            2 => When::NotAtRoot,
            3 => When::Always,
            _ => {
                return Err(HeuristicError::InvalidConfig {
                    field: "when",
                    reason: format!("unknown code {code}"),
                })
            }
        };
        if !(0..=13).contains(&code) {
            return Err(HeuristicError::InvalidConfig {
                field: "when",
                reason: format!("unknown code {code}"),
            });
        }
        Ok((when, trust_odd))
    }

    pub fn to_code(self, trust_odd: bool) -> i32 {
        let base = match self {
            When::Off => 0,
            When::AtRoot => 1,
            When::NotAtRoot => 2,
            When::Always => 3,
        };
        if trust_odd { base + 10 } else { base }
    }

    pub fn fires_at(self, is_root: bool) -> bool {
        match self {
            When::Off => false,
            When::AtRoot => is_root,
            When::NotAtRoot => !is_root,
            When::Always => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Configuration shared by every heuristic
pub struct HeuristicSettings {
    pub name: String,
    pub when: When,
    /// user knows odd objects (e.g. SOS) are fine, `validate` keeps the heuristic on
    pub trust_odd_problems: bool,
    /// node cap of any sub-solve
    pub number_nodes: usize,
    /// feasibility pump options, -1 is off
    pub feasibility_pump_options: i32,
    /// max new(rows+columns)/old(rows+columns) before a sub-solve is attempted
    pub fraction_small: f64,
    /// run every n-th eligible node
    pub how_often: u32,
    /// growth of `how_often` after an unsuccessful run
    pub decay_factor: f64,
    pub seed: u64,
    pub far_threshold: f64,
    pub sub_solver: SubSolverBackend,
}

impl Default for HeuristicSettings {
    fn default() -> Self {
        HeuristicSettings {
            name: "Unknown".to_string(),
            when: When::NotAtRoot,
            trust_odd_problems: false,
            number_nodes: 200,
            feasibility_pump_options: -1,
            fraction_small: 1.0,
            how_often: 1,
            decay_factor: 0.0,
            seed: DEFAULT_SEED,
            far_threshold: DEFAULT_FAR_THRESHOLD,
            sub_solver: SubSolverBackend::default(),
        }
    }
}

pub(crate) fn check_fraction_small(value: f64) -> HeuristicResult<()> {
    if value.is_nan() || value <= 0.0 {
        return Err(HeuristicError::InvalidConfig {
            field: "fraction_small",
            reason: format!("{value} is not positive"),
        });
    }
    Ok(())
}

pub(crate) fn check_far_threshold(value: f64) -> HeuristicResult<()> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(HeuristicError::InvalidConfig {
            field: "far_threshold",
            reason: format!("{value} is outside (0, 1]"),
        });
    }
    Ok(())
}

pub(crate) fn check_how_often(value: u32) -> HeuristicResult<()> {
    if value == 0 {
        return Err(HeuristicError::InvalidConfig {
            field: "how_often",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_decay_factor(value: f64) -> HeuristicResult<()> {
    if value.is_nan() || value < 0.0 {
        return Err(HeuristicError::InvalidConfig {
            field: "decay_factor",
            reason: format!("{value} is negative"),
        });
    }
    Ok(())
}

impl HeuristicSettings {
    pub fn validate_settings(&self) -> HeuristicResult<()> {
        check_fraction_small(self.fraction_small)?;
        check_far_threshold(self.far_threshold)?;
        check_how_often(self.how_often)?;
        check_decay_factor(self.decay_factor)
    }

    /// Parse and validate, missing fields take their defaults
    pub fn from_json(json: &str) -> HeuristicResult<Self> {
        let settings: HeuristicSettings = serde_json::from_str(json)?;
        settings.validate_settings()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> HeuristicResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Fields that differ from `defaults`, in declaration order
    pub fn replay_statements(&self, defaults: &HeuristicSettings) -> Vec<ConfigStatement> {
        diff_fields(self, defaults)
    }
}

/// Serialize both values and keep the top level fields of `current` that differ
pub(crate) fn diff_fields<T: Serialize>(current: &T, defaults: &T) -> Vec<ConfigStatement> {
    let (Ok(Value::Object(current)), Ok(Value::Object(defaults))) =
        (serde_json::to_value(current), serde_json::to_value(defaults))
    else {
        return Vec::new();
    };

    current
        .into_iter()
        .filter(|(field, value)| defaults.get(field) != Some(value))
        .map(|(field, value)| ConfigStatement { field, value })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
/// One replayable configuration step, e.g. `set_number_nodes(500)`
pub struct ConfigStatement {
    pub field: String,
    pub value: Value,
}

impl Display for ConfigStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "set_{}({})", self.field, self.value)
    }
}

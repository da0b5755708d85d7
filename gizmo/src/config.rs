//! Controller tuning loaded from the environment.
//!
//! Every knob has a typed default in [`crate::consts`]. `from_env` reads the
//! process environment; `from_lookup` takes any key lookup so tests never
//! touch global state.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::str::FromStr;

use crate::consts::{DEFAULT_EVENT_CAPACITY, DEFAULT_MID_DEPTH, DEFAULT_NEAR_DEPTH, PARALLEL_EPSILON};

pub const NEAR_DEPTH_VAR: &str = "GIZMO_NEAR_DEPTH";
pub const MID_DEPTH_VAR: &str = "GIZMO_MID_DEPTH";
pub const EVENT_CAPACITY_VAR: &str = "GIZMO_EVENT_CAPACITY";
pub const PARALLEL_EPSILON_VAR: &str = "GIZMO_PARALLEL_EPSILON";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("near depth {near} must be below mid depth {mid}")]
    DepthOrder { near: f64, mid: f64 },
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "E_CONFIG_INVALID",
            Self::DepthOrder { .. } => "E_CONFIG_DEPTH_ORDER",
        }
    }
}

/// Tuning for a [`crate::engine::Manipulator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// NDC depth of the first pointer-ray sample.
    pub near_depth: f64,
    /// NDC depth of the second pointer-ray sample.
    pub mid_depth: f64,
    /// Buffer size of each event subscriber channel.
    pub event_capacity: usize,
    /// Threshold below which `|cross|²` counts as parallel.
    pub parallel_epsilon: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            near_depth: DEFAULT_NEAR_DEPTH,
            mid_depth: DEFAULT_MID_DEPTH,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            parallel_epsilon: PARALLEL_EPSILON,
        }
    }
}

impl ControllerConfig {
    /// Load from `GIZMO_*` variables, falling back to defaults for unset keys.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a set variable does not parse or the
    /// depths are out of order.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Load through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            near_depth: parse_var(&lookup, NEAR_DEPTH_VAR, defaults.near_depth)?,
            mid_depth: parse_var(&lookup, MID_DEPTH_VAR, defaults.mid_depth)?,
            event_capacity: parse_var(&lookup, EVENT_CAPACITY_VAR, defaults.event_capacity)?,
            parallel_epsilon: parse_var(&lookup, PARALLEL_EPSILON_VAR, defaults.parallel_epsilon)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns a [`ConfigError`] for non-finite or misordered depths, a zero
    /// event capacity or a non-positive epsilon.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.near_depth.is_finite() {
            return Err(ConfigError::Invalid { key: NEAR_DEPTH_VAR, value: self.near_depth.to_string() });
        }
        if !self.mid_depth.is_finite() {
            return Err(ConfigError::Invalid { key: MID_DEPTH_VAR, value: self.mid_depth.to_string() });
        }
        if self.near_depth >= self.mid_depth {
            return Err(ConfigError::DepthOrder { near: self.near_depth, mid: self.mid_depth });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid { key: EVENT_CAPACITY_VAR, value: "0".into() });
        }
        if !(self.parallel_epsilon.is_finite() && self.parallel_epsilon > 0.0) {
            return Err(ConfigError::Invalid { key: PARALLEL_EPSILON_VAR, value: self.parallel_epsilon.to_string() });
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

//! Solver configuration.
//!
//! ```toml
//! max_invocations_factor = 64
//! strict_shapes = false
//! file = 0
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tyrel_diagnostics::FileId;

/// Errors from loading a [`SolverConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML could not be parsed into a configuration.
    #[error("invalid solver configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The invocation factor must be positive.
    #[error("`max_invocations_factor` must be greater than zero")]
    ZeroInvocationFactor,
}

/// Knobs for one solver session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// A session may invoke resolution functions at most
    /// `max_invocations_factor * (relations + 1)` times.
    pub max_invocations_factor: usize,
    /// Treat undecidable dimension comparisons during unification as
    /// mismatches instead of deferred obligations.
    pub strict_shapes: bool,
    /// Program unit used when labelling diagnostics.
    pub file: FileId,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_invocations_factor: 64,
            strict_shapes: false,
            file: FileId::default(),
        }
    }
}

impl SolverConfig {
    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML, unknown keys or invalid values.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroInvocationFactor`] if the factor is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_invocations_factor == 0 {
            return Err(ConfigError::ZeroInvocationFactor);
        }
        Ok(())
    }

    /// The invocation budget for `num_relations` relations.
    #[must_use]
    pub fn invocation_budget(&self, num_relations: usize) -> usize {
        self.max_invocations_factor
            .saturating_mul(num_relations.saturating_add(1))
    }
}

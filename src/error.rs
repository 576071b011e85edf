use thiserror::Error;

/// Configuration errors surfaced when the engine is built or a parameter is changed.
///
/// Numeric trouble inside a step (zero densities, probabilities outside [0, 1])
/// is guarded silently and never shows up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("lattice dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid value {value} for `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Checks that `value` is finite.
pub(crate) fn check_finite(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(SimError::InvalidParameter { name, value, reason: "must be finite" });
    }
    Ok(())
}

/// Checks that `value` is finite and `>= 0`.
pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimError::InvalidParameter { name, value, reason: "must be a finite number >= 0" });
    }
    Ok(())
}

/// Checks that `value` is finite and `> 0`.
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimError::InvalidParameter { name, value, reason: "must be a finite number > 0" });
    }
    Ok(())
}

/// Checks that `value` lies in `[0, 1]`.
pub(crate) fn check_unit_interval(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimError::InvalidParameter { name, value, reason: "must lie in [0, 1]" });
    }
    Ok(())
}

use crate::models::Category;

/// Reasons a submission is rejected before any footprint is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FootprintError {
    /// A field is negative, not a number, or not one of the accepted values.
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// The factor table has no entry for the requested key.
    #[error("no emission factor for {category}/{key}")]
    UnknownFactorKey { category: Category, key: String },
}

impl FootprintError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FootprintError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Rejects negative, NaN and infinite quantities.
pub fn ensure_quantity(field: &str, value: f64) -> Result<f64, FootprintError> {
    if !value.is_finite() {
        return Err(FootprintError::invalid(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(FootprintError::invalid(
            field,
            format!("must not be negative (got {value})"),
        ));
    }
    Ok(value)
}

/// Quantity check plus the form's upper bound for the field.
pub fn ensure_within(field: &str, value: f64, max: f64) -> Result<f64, FootprintError> {
    let value = ensure_quantity(field, value)?;
    if value > max {
        return Err(FootprintError::invalid(
            field,
            format!("must be at most {max} (got {value})"),
        ));
    }
    Ok(value)
}

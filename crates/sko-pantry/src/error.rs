//! Error taxonomy for the pantry service.
//!
//! Two failure classes, one normal outcome:
//! - [`ValidationError`] — malformed input, rejected before any store
//!   contact; nothing is mutated.
//! - `Storage` — the store was unreachable or a write was rejected; the
//!   surrounding transaction has been rolled back in full.
//! - Shortages are **not** errors: they travel in-band inside the
//!   reconcile report.

/// Input rejections surfaced before the store is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Adjustment quantity must be strictly positive for every kind.
    NonPositiveQuantity { qty_milli: i64 },
    /// A planned usage carried a negative quantity.
    NegativePlannedQuantity { display_name: String, qty_milli: i64 },
    /// The given item_id does not resolve to a catalog item.
    UnknownItem { item_id: i64 },
    /// Item registration requires a non-empty name.
    EmptyItemName,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveQuantity { qty_milli } => {
                write!(f, "adjust quantity must be > 0, got {qty_milli} milli")
            }
            Self::NegativePlannedQuantity {
                display_name,
                qty_milli,
            } => write!(
                f,
                "planned quantity for '{display_name}' must be >= 0, got {qty_milli} milli"
            ),
            Self::UnknownItem { item_id } => {
                write!(f, "item_id {item_id} does not resolve to a catalog item")
            }
            Self::EmptyItemName => write!(f, "item name must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// All failures the pantry service can surface.
#[derive(Debug)]
pub enum PantryError {
    /// Rejected input; no partial effect.
    Validation(ValidationError),
    /// Store unreachable or a write rejected; the batch was rolled back.
    Storage(anyhow::Error),
}

impl PantryError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PantryError::Validation(_))
    }
}

impl std::fmt::Display for PantryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PantryError::Validation(e) => write!(f, "validation error: {e}"),
            PantryError::Storage(e) => write!(f, "storage failure: {e:#}"),
        }
    }
}

impl std::error::Error for PantryError {}

impl From<ValidationError> for PantryError {
    fn from(e: ValidationError) -> Self {
        PantryError::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_value() {
        let e = ValidationError::NonPositiveQuantity { qty_milli: 0 };
        assert_eq!(e.to_string(), "adjust quantity must be > 0, got 0 milli");

        let e = ValidationError::UnknownItem { item_id: 42 };
        assert!(e.to_string().contains("42"));
    }

    #[test]
    fn validation_converts_into_pantry_error() {
        let e: PantryError = ValidationError::EmptyItemName.into();
        assert!(e.is_validation());
        assert!(e.to_string().starts_with("validation error:"));
    }

    #[test]
    fn storage_is_not_validation() {
        let e = PantryError::Storage(anyhow::anyhow!("connection refused"));
        assert!(!e.is_validation());
    }
}

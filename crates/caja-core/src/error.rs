//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caja-db errors (separate crate)                                       │
//! │  └── DbError          - Storage failures, wraps CoreError as Domain    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → HTTP layer              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is request-scoped: the transaction that raised it is
//! rolled back and nothing it touched survives.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id does not exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Sale id does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    /// Customer id does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    /// Movement id does not exist.
    #[error("Inventory movement not found: {0}")]
    MovementNotFound(i64),

    /// Not enough units on hand to take `requested`.
    ///
    /// ## User Workflow
    /// ```text
    /// Ring up (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Café de olla", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Stock insuficiente para Café de olla"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Cart has no lines left after dropping non-positive quantities.
    #[error("Sale cannot be empty")]
    EmptyCart,

    /// Normalized SKU already belongs to another product.
    #[error("SKU already exists: {0}")]
    DuplicateSku(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed amount, bad email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Café de olla".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Café de olla: available 3, requested 5"
        );
        assert_eq!(
            CoreError::DuplicateSku("SKU-00007".to_string()).to_string(),
            "SKU already exists: SKU-00007"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::Negative {
            field: "stock".to_string(),
        };
        assert_eq!(err.to_string(), "stock cannot be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

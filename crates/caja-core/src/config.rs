//! # Sale Settings
//!
//! Engine defaults that vary per store. Read once at startup.
//!
//! | Variable              | Meaning                          | Default            |
//! |-----------------------|----------------------------------|--------------------|
//! | `CAJA_TAX_RATE`       | Tax as a percentage (`16`)       | 16 %               |
//! | `CAJA_WALK_IN_NAME`   | Name on anonymous receipts       | `Venta al público` |
//! | `CAJA_PAYMENT_METHOD` | Payment method when none given   | `EFECTIVO`         |

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::TaxRate;
use crate::validation::validate_tax_rate_bps;
use crate::{DEFAULT_PAYMENT_METHOD, WALK_IN_CUSTOMER};

/// Store-level defaults applied by the sale engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleSettings {
    pub tax_rate: TaxRate,
    pub walk_in_name: String,
    pub default_payment_method: String,
}

impl Default for SaleSettings {
    fn default() -> Self {
        Self {
            tax_rate: TaxRate::default(),
            walk_in_name: WALK_IN_CUSTOMER.to_string(),
            default_payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        }
    }
}

impl SaleSettings {
    /// Loads settings from `CAJA_*` environment variables.
    ///
    /// Unset or blank variables keep their default; a tax rate that is not a
    /// number in `0..=100` is an error.
    pub fn from_env() -> Result<Self, ValidationError> {
        let mut settings = Self::default();

        if let Some(raw) = non_blank("CAJA_TAX_RATE") {
            settings.tax_rate = parse_tax_percentage(&raw)?;
        }
        if let Some(name) = non_blank("CAJA_WALK_IN_NAME") {
            settings.walk_in_name = name;
        }
        if let Some(method) = non_blank("CAJA_PAYMENT_METHOD") {
            settings.default_payment_method = method;
        }

        Ok(settings)
    }

    pub fn with_tax_rate(mut self, rate: TaxRate) -> Self {
        self.tax_rate = rate;
        self
    }
}

fn non_blank(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a percentage such as `16` or `8.25` into basis points.
pub fn parse_tax_percentage(raw: &str) -> Result<TaxRate, ValidationError> {
    let pct: f64 = raw
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: "CAJA_TAX_RATE".to_string(),
            reason: format!("'{raw}' is not a number"),
        })?;

    if !pct.is_finite() || pct < 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "CAJA_TAX_RATE".to_string(),
            min: 0,
            max: 100,
        });
    }

    let rate = TaxRate::from_percentage(pct);
    validate_tax_rate_bps(rate.bps())?;
    Ok(rate)
}

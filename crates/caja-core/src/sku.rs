//! # Business Identifiers
//!
//! SKU normalization and receipt folios.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SKU                                                                    │
//! │    "sku-7"  ──► uppercase ──► trailing digits "7" ──► "SKU-00007"      │
//! │    "ABC"    ──► no digits ──► 0                    ──► "SKU-00000"      │
//! │                                                                         │
//! │  Folio (two-phase: row first, then its id)                             │
//! │    INSERT sale ──► id = 42 ──► "V-0042" ──► UPDATE sale SET folio      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

/// Prefix of every canonical SKU.
pub const SKU_PREFIX: &str = "SKU-";

/// Prefix of every receipt folio.
pub const FOLIO_PREFIX: &str = "V-";

/// Extracts the trailing numeric run of a raw SKU, if any.
///
/// Runs too long for a `u64` saturate.
pub fn sku_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let digits_start = raw
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;

    let digits = &raw[digits_start..];
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// Formats a SKU sequence number as `SKU-00000`.
#[inline]
pub fn format_sku(number: u64) -> String {
    format!("{SKU_PREFIX}{number:05}")
}

/// Normalizes user input to the canonical `SKU-00000` form.
///
/// ## Example
/// ```rust
/// use caja_core::sku::normalize_sku;
///
/// assert_eq!(normalize_sku("sku-7"), "SKU-00007");
/// assert_eq!(normalize_sku("sku007"), "SKU-00007");
/// ```
pub fn normalize_sku(raw: &str) -> String {
    format_sku(sku_number(&raw.to_uppercase()).unwrap_or(0))
}

/// Next free SKU given every SKU currently in the catalog.
///
/// Takes the highest trailing number, not the row count, so gaps left by
/// deleted products are never refilled.
pub fn next_sku<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(sku_number)
        .max()
        .unwrap_or(0);
    format_sku(max.saturating_add(1))
}

/// Receipt folio for a sale id: `V-` plus the id padded to 4 digits.
///
/// Ids above 9999 simply grow wider.
#[inline]
pub fn format_folio(sale_id: i64) -> String {
    format!("{FOLIO_PREFIX}{sale_id:04}")
}

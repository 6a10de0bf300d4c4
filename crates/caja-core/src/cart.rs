//! # Cart Pricing and Stock Reconciliation
//!
//! The pure half of the sale engine. Everything that can be decided without
//! touching the database lives here; caja-db feeds in product snapshots read
//! inside its transaction and applies the results.
//!
//! ## Create / Update Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  requested lines                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  normalize_lines()   drop qty <= 0, merge duplicates, EmptyCart        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PricedLine::from_product()   snapshot sku/name/price, line total      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleTotals::compute()   Σ cents, tax rounded once                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reconcile(previous, next)   per-product deltas → StockChange list     │
//! │       │                        (create = reconcile against nothing)    │
//! │       ▼                                                                 │
//! │  check_stock() on every OUT, then the ledger applies them              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartLine, MovementType, Product, TaxRate};

// =============================================================================
// Line Normalization
// =============================================================================

/// Drops non-positive quantities and merges repeated products.
///
/// Merged lines keep the position of the first occurrence. An empty result
/// is [`CoreError::EmptyCart`].
pub fn normalize_lines(lines: &[CartLine]) -> CoreResult<Vec<CartLine>> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    let mut position: HashMap<i64, usize> = HashMap::new();

    for line in lines.iter().filter(|l| l.quantity > 0) {
        match position.get(&line.product_id) {
            Some(&idx) => {
                let merged_line = &mut merged[idx];
                merged_line.quantity = merged_line
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| ValidationError::OutOfRange {
                        field: "quantity".to_string(),
                        min: 1,
                        max: i64::MAX,
                    })?;
            }
            None => {
                position.insert(line.product_id, merged.len());
                merged.push(*line);
            }
        }
    }

    if merged.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    Ok(merged)
}

// =============================================================================
// Pricing
// =============================================================================

/// A cart line priced against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedLine {
    pub product_id: i64,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl PricedLine {
    /// Snapshots the product's current sku, name and price.
    ///
    /// Fails with a `ValidationError` when the line total overflows.
    pub fn from_product(product: &Product, quantity: i64) -> CoreResult<Self> {
        let line_total = product.price().multiply_quantity(quantity)?;
        Ok(PricedLine {
            product_id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            line_total_cents: line_total.cents(),
        })
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// Sale header amounts.
///
/// `total == subtotal + tax` always holds; tax is rounded once on the
/// subtotal, never per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl SaleTotals {
    pub fn compute(lines: &[PricedLine], rate: TaxRate) -> CoreResult<Self> {
        let subtotal = lines
            .iter()
            .map(PricedLine::line_total)
            .try_fold(Money::zero(), Money::checked_add)?;
        let tax = subtotal.calculate_tax(rate);
        Ok(SaleTotals {
            subtotal,
            tax,
            total: subtotal.checked_add(tax)?,
        })
    }
}

// =============================================================================
// Stock
// =============================================================================

/// Fails with `InsufficientStock` (naming the product) when `requested`
/// exceeds what is on hand.
pub fn check_stock(product: &Product, requested: i64) -> CoreResult<()> {
    if product.can_supply(requested) {
        Ok(())
    } else {
        Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested,
        })
    }
}

/// One ledger movement the engine must write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockChange {
    pub product_id: i64,
    pub kind: MovementType,
    pub quantity: i64,
}

/// Plans the movements that take stock from `previous` item quantities to
/// `next` lines.
///
/// ```text
/// previous [A:2, B:1]   next [A:1, C:2]
///   A: 1 - 2 = -1  → IN 1     (shrunk)
///   C: 2 - 0 = +2  → OUT 2    (new)
///   B: removed     → IN 1     (restore all)
/// ```
///
/// `previous` may repeat a product; quantities are summed. Unchanged
/// products produce nothing. Changes come in `next` order, then removed
/// products by ascending id.
pub fn reconcile(previous: &[(i64, i64)], next: &[CartLine]) -> Vec<StockChange> {
    let mut old: BTreeMap<i64, i64> = BTreeMap::new();
    for &(product_id, quantity) in previous {
        *old.entry(product_id).or_insert(0) += quantity;
    }

    let mut changes = Vec::new();

    for line in next {
        let before = old.remove(&line.product_id).unwrap_or(0);
        // Stock moves by old - new.
        if let Some((kind, quantity)) = MovementType::from_delta(before - line.quantity) {
            changes.push(StockChange {
                product_id: line.product_id,
                kind,
                quantity,
            });
        }
    }

    for (product_id, quantity) in old {
        if quantity > 0 {
            changes.push(StockChange {
                product_id,
                kind: MovementType::In,
                quantity,
            });
        }
    }

    changes
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: i64, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id,
            sku: crate::sku::format_sku(id as u64),
            name: format!("Producto {id}"),
            price_cents,
            stock,
            min_stock: 0,
            max_stock: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_normalize_filters_and_merges() {
        let lines = [
            CartLine::new(2, 1),
            CartLine::new(1, 0),
            CartLine::new(3, -4),
            CartLine::new(2, 2),
            CartLine::new(1, 5),
        ];
        let merged = normalize_lines(&lines).unwrap();
        assert_eq!(merged, vec![CartLine::new(2, 3), CartLine::new(1, 5)]);
    }

    #[test]
    fn test_normalize_empty_cart() {
        assert!(matches!(normalize_lines(&[]), Err(CoreError::EmptyCart)));
        assert!(matches!(
            normalize_lines(&[CartLine::new(1, 0), CartLine::new(2, -1)]),
            Err(CoreError::EmptyCart)
        ));
    }

    #[test]
    fn test_normalize_rejects_quantity_overflow() {
        let lines = [CartLine::new(1, i64::MAX), CartLine::new(1, 2)];
        assert!(matches!(
            normalize_lines(&lines),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_priced_line_rejects_overflowing_total() {
        let err = PricedLine::from_product(&product(1, 1999, 10), i64::MAX / 2).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_priced_line_snapshots_product() {
        let line = PricedLine::from_product(&product(7, 1999, 10), 3).unwrap();
        assert_eq!(line.sku, "SKU-00007");
        assert_eq!(line.unit_price_cents, 1999);
        assert_eq!(line.line_total_cents, 5997);
    }

    #[test]
    fn test_totals_round_tax_once() {
        // 3 × $0.03 = $0.09; per-line tax would be 3 × 0 = 0, aggregate is 1
        let lines = vec![
            PricedLine::from_product(&product(1, 3, 10), 1).unwrap(),
            PricedLine::from_product(&product(2, 3, 10), 1).unwrap(),
            PricedLine::from_product(&product(3, 3, 10), 1).unwrap(),
        ];
        let totals = SaleTotals::compute(&lines, TaxRate::default()).unwrap();
        assert_eq!(totals.subtotal.cents(), 9);
        assert_eq!(totals.tax.cents(), 1);
        assert_eq!(totals.total.cents(), 10);
    }

    #[test]
    fn test_totals_match_iva() {
        let lines = vec![PricedLine::from_product(&product(1, 1250, 10), 3).unwrap()];
        let totals = SaleTotals::compute(&lines, TaxRate::default()).unwrap();
        assert_eq!(totals.subtotal.cents(), 3750);
        assert_eq!(totals.tax.cents(), 600);
        assert_eq!(totals.total, totals.subtotal + totals.tax);
    }

    #[test]
    fn test_check_stock() {
        let p = product(1, 100, 2);
        assert!(check_stock(&p, 2).is_ok());
        match check_stock(&p, 3) {
            Err(CoreError::InsufficientStock {
                product,
                available,
                requested,
            }) => {
                assert_eq!(product, "Producto 1");
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_reconcile_fresh_sale() {
        let changes = reconcile(&[], &[CartLine::new(4, 2), CartLine::new(1, 1)]);
        assert_eq!(
            changes,
            vec![
                StockChange { product_id: 4, kind: MovementType::Out, quantity: 2 },
                StockChange { product_id: 1, kind: MovementType::Out, quantity: 1 },
            ]
        );
    }

    #[test]
    fn test_reconcile_shrink() {
        let changes = reconcile(&[(1, 3)], &[CartLine::new(1, 1)]);
        assert_eq!(
            changes,
            vec![StockChange { product_id: 1, kind: MovementType::In, quantity: 2 }]
        );
    }

    #[test]
    fn test_reconcile_swap_products() {
        // A=1, B=2, C=3
        let changes = reconcile(&[(1, 2), (2, 1)], &[CartLine::new(1, 1), CartLine::new(3, 2)]);
        assert_eq!(
            changes,
            vec![
                StockChange { product_id: 1, kind: MovementType::In, quantity: 1 },
                StockChange { product_id: 3, kind: MovementType::Out, quantity: 2 },
                StockChange { product_id: 2, kind: MovementType::In, quantity: 1 },
            ]
        );
    }

    #[test]
    fn test_reconcile_unchanged_is_silent() {
        assert!(reconcile(&[(1, 2), (1, 1)], &[CartLine::new(1, 3)]).is_empty());
    }
}

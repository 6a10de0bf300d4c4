//! # Domain Types
//!
//! Core domain types used throughout Caja POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (rowid)     │   │  id (rowid)     │   │  id (rowid)     │       │
//! │  │  sku SKU-00000  │   │  folio V-0000   │   │  name           │       │
//! │  │  price_cents    │   │  total_cents    │   │  email / phone  │       │
//! │  │  stock          │   │  customer_name  │   └─────────────────┘       │
//! │  └────────┬────────┘   └────────┬────────┘                              │
//! │           │                     │ owns                                  │
//! │  ┌────────▼──────────┐ ┌────────▼────────┐                              │
//! │  │InventoryMovement  │ │    SaleItem     │                              │
//! │  │ IN / OUT, qty > 0 │ │ sku/name/price  │                              │
//! │  │ sale ref (opt.)   │ │ snapshots       │                              │
//! │  └───────────────────┘ └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: integer assigned by the database, stable and never reused
//! - Business ID: `sku`, `folio` - human-readable, derived from a sequence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1600 bps = 16% (IVA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (configuration input only).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    /// IVA general rate.
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
///
/// `stock` is a materialized counter: it always equals the sum of the
/// product's inventory movements and is only written by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Canonical `SKU-00000` form.
    pub sku: String,

    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Units on hand.
    pub stock: i64,

    /// Low-stock threshold.
    pub min_stock: i64,

    /// Optional upper bound used for reorder suggestions.
    pub max_stock: Option<i64>,

    pub image_url: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn can_supply(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }

    /// Classifies the stock level the way the inventory screen badges it.
    pub fn stock_status(&self) -> StockStatus {
        if self.stock <= 0 {
            StockStatus::OutOfStock
        } else if self.stock <= self.min_stock {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }
}

/// Stock badge shown next to each product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// Nothing left to sell.
    OutOfStock,
    /// At or below the minimum threshold.
    Low,
    /// Comfortably stocked.
    InStock,
}

/// Input for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    /// Raw SKU as typed; normalized before storage. `None` takes the next
    /// available number.
    pub sku: Option<String>,
    pub name: String,
    pub price_cents: i64,
    /// Opening stock, recorded as an `IN` movement.
    pub stock: i64,
    pub min_stock: i64,
    pub max_stock: Option<i64>,
    pub image_url: Option<String>,
}

/// Partial product update. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    /// Target stock; applied as an adjustment movement.
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    /// Removes the maximum threshold; wins over `max_stock`.
    #[serde(default)]
    pub clear_max_stock: bool,
    pub image_url: Option<String>,
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating or replacing a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Inventory Movement
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Units added to stock.
    In,
    /// Units taken from stock.
    Out,
}

impl MovementType {
    /// Signed stock delta for `quantity` units moving this way.
    #[inline]
    pub const fn signed(&self, quantity: i64) -> i64 {
        match self {
            MovementType::In => quantity,
            MovementType::Out => -quantity,
        }
    }

    /// The opposite direction.
    #[inline]
    pub const fn inverse(&self) -> Self {
        match self {
            MovementType::In => MovementType::Out,
            MovementType::Out => MovementType::In,
        }
    }

    /// Direction and size of a signed delta; `None` for zero.
    pub fn from_delta(delta: i64) -> Option<(MovementType, i64)> {
        match delta {
            0 => None,
            d if d > 0 => Some((MovementType::In, d)),
            d => Some((MovementType::Out, -d)),
        }
    }
}

/// One entry of the append-only stock ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: i64,
    pub product_id: i64,
    pub kind: MovementType,
    /// Always positive; the direction lives in `kind`.
    pub quantity: i64,
    pub note: Option<String>,
    pub user_id: Option<i64>,
    /// Sale that caused the movement, if any.
    pub sale_id: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// Effect of this movement on the product's stock counter.
    #[inline]
    pub fn stock_delta(&self) -> i64 {
        self.kind.signed(self.quantity)
    }
}

/// Request to record a movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMovement {
    pub product_id: i64,
    pub kind: MovementType,
    pub quantity: i64,
    pub note: Option<String>,
    pub user_id: Option<i64>,
    pub sale_id: Option<i64>,
}

impl NewMovement {
    /// A manual movement with no sale attached.
    pub fn manual(product_id: i64, kind: MovementType, quantity: i64) -> Self {
        NewMovement {
            product_id,
            kind,
            quantity,
            note: None,
            user_id: None,
            sale_id: None,
        }
    }

    /// Attaches a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attaches the acting user.
    pub fn by_user(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A persisted sale header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    /// Receipt number `V-0000`; assigned right after the row exists.
    pub folio: Option<String>,
    pub customer_id: Option<i64>,
    /// Customer name at the time of sale (frozen).
    pub customer_name: String,
    pub payment_method: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity, before tax.
    pub line_total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A sale with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Row of the sales list: header plus item count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleSummary {
    pub id: i64,
    pub folio: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub payment_method: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub items_count: i64,
}

/// Request to ring up a new sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    /// Registered customer, if any.
    pub customer_id: Option<i64>,
    /// Name printed on the receipt. Falls back to the registered customer's
    /// name, then to the walk-in label.
    pub customer_name: Option<String>,
    /// Free-form (`EFECTIVO`, `TARJETA`, `TRANSFERENCIA`, ...).
    pub payment_method: Option<String>,
    pub items: Vec<CartLine>,
}

/// Request to edit an existing sale. Items are replaced wholesale;
/// `None` header fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleUpdate {
    pub items: Vec<CartLine>,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub payment_method: Option<String>,
    pub folio: Option<String>,
}

/// One requested line of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
}

impl CartLine {
    pub const fn new(product_id: i64, quantity: i64) -> Self {
        CartLine {
            product_id,
            quantity,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min_stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            sku: "SKU-00001".to_string(),
            name: "Café de olla".to_string(),
            price_cents: 2500,
            stock,
            min_stock,
            max_stock: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tax_rate_default_is_iva() {
        let rate = TaxRate::default();
        assert_eq!(rate.bps(), 1600);
        assert!((rate.percentage() - 16.0).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(product(0, 3).stock_status(), StockStatus::OutOfStock);
        assert_eq!(product(3, 3).stock_status(), StockStatus::Low);
        assert_eq!(product(4, 3).stock_status(), StockStatus::InStock);
    }

    #[test]
    fn test_can_supply() {
        let p = product(5, 0);
        assert!(p.can_supply(5));
        assert!(!p.can_supply(6));
    }

    #[test]
    fn test_movement_direction() {
        assert_eq!(MovementType::In.signed(3), 3);
        assert_eq!(MovementType::Out.signed(3), -3);
        assert_eq!(MovementType::Out.inverse(), MovementType::In);
        assert_eq!(MovementType::from_delta(0), None);
        assert_eq!(MovementType::from_delta(-4), Some((MovementType::Out, 4)));
        assert_eq!(MovementType::from_delta(2), Some((MovementType::In, 2)));
    }

    #[test]
    fn test_movement_type_serializes_uppercase() {
        let json = serde_json::to_string(&MovementType::Out).unwrap();
        assert_eq!(json, "\"OUT\"");
    }
}

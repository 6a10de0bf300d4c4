//! # caja-core: Pure Business Logic for Caja POS
//!
//! This crate holds the rules of the sale engine as pure functions with zero
//! I/O dependencies. caja-db reads rows inside a transaction, asks this
//! crate what to do, and writes the answer back.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              HTTP layer + browser UI (not in this repo)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │   sku   │ │ report  │  │   │
//! │  │   │ Product │ │  Money  │ │ pricing │ │ SKU-... │ │ windows │  │   │
//! │  │   │  Sale   │ │ TaxRate │ │ deltas  │ │ V-0000  │ │ gaps    │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-db (Database Layer)                     │   │
//! │  │       SQLite, inventory ledger, sale engine, reports            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, InventoryMovement, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart normalization, pricing and stock reconciliation plans
//! - [`sku`] - SKU normalization and receipt folios
//! - [`report`] - Report windows and daily gap filling
//! - [`config`] - Store-level sale settings
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::money::Money;
//! use caja_core::types::TaxRate;
//!
//! let subtotal = Money::from_cents(3750); // $37.50
//! let tax = subtotal.calculate_tax(TaxRate::default()); // 16 % IVA
//!
//! assert_eq!(tax.cents(), 600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod config;
pub mod error;
pub mod money;
pub mod report;
pub mod sku;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use caja_core::Money` instead of
// `use caja_core::money::Money`

pub use config::SaleSettings;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use report::{DailySales, DateRange, ReportWindow, SalesSeries, TopProduct};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// IVA general rate, 16 %.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1600;

/// Name printed on receipts without a customer.
pub const WALK_IN_CUSTOMER: &str = "Venta al público";

/// Payment method when the cashier does not pick one.
pub const DEFAULT_PAYMENT_METHOD: &str = "EFECTIVO";

/// Report window when none is given.
pub const DEFAULT_REPORT_DAYS: u32 = 30;

/// Longest report window.
pub const MAX_REPORT_DAYS: u32 = 365;

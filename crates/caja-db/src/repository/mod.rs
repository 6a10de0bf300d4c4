//! # Repository Module
//!
//! Database repository implementations for Caja POS.
//!
//! ## Who Writes What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and the Write Gate                      │
//! │                                                                         │
//! │  ProductRepository ───┐                                                 │
//! │  InventoryRepository ─┼──► WriteGate::begin() ──► UnitOfWork (tx)      │
//! │  SaleRepository ──────┘         one writer at a time                    │
//! │                                                                         │
//! │  CustomerRepository ──┐                                                 │
//! │  ReportRepository ────┴──► pool directly (no stock effects)            │
//! │                                                                         │
//! │  Every write that touches `products.stock` also writes a row in        │
//! │  `stock_movements`, inside the same unit of work.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog CRUD, SKU assignment, low stock
//! - [`CustomerRepository`] - Customer registry and search
//! - [`InventoryRepository`] - Stock movement ledger
//! - [`SaleRepository`] - Sale create / edit / delete engine
//! - [`ReportRepository`] - Daily sales series and top seller

pub mod customer;
pub mod inventory;
pub mod product;
pub mod report;
pub mod sale;

pub use customer::CustomerRepository;
pub use inventory::InventoryRepository;
pub use product::ProductRepository;
pub use report::ReportRepository;
pub use sale::SaleRepository;

//! # caja-db: Database Layer and Sale Engine for Caja POS
//!
//! SQLite storage through sqlx, plus the transactional sale engine that keeps
//! receipts and stock counters consistent.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Data Flow                               │
//! │                                                                         │
//! │  Caller (HTTP handler, CLI, seed)                                      │
//! │       │  db.sales().create_sale(cart)                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     caja-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo │    │ 001_initial  │  │   │
//! │  │   │ WriteGate     │    │ ProductRepo   │    │ _schema.sql  │  │   │
//! │  │   │ SaleSettings  │    │ ReportRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │             pricing / validation from caja-core               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL) or in-memory database                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_core::{CartLine, NewSale};
//! use caja_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("caja.db")).await?;
//!
//! let detail = db
//!     .sales()
//!     .create_sale(NewSale {
//!         items: vec![CartLine::new(1, 2)],
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{}", detail.sale.folio.unwrap_or_default());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::{UnitOfWork, WriteGate};

// Repository re-exports for convenience
pub use repository::{
    CustomerRepository, InventoryRepository, ProductRepository, ReportRepository, SaleRepository,
};

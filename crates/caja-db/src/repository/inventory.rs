//! # Inventory Ledger
//!
//! Every stock change is a row in `stock_movements`; `products.stock` is the
//! running total of those rows and is only ever written together with one.
//!
//! ## Ledger Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock == Σ qty(IN) − Σ qty(OUT)   for every product          │
//! │                                                                         │
//! │  apply_movement()    INSERT movement  +  stock ± qty    (same tx)      │
//! │  unapply_movement()  DELETE movement  +  stock ∓ qty    (same tx)      │
//! │  adjust_to()         delta = target − stock → one IN or OUT movement   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The crate-level primitives take a `&mut SqliteConnection` so the sale
//! engine can run them inside its own unit of work. They do bookkeeping
//! only: availability checks belong to the caller. The public
//! [`InventoryRepository`] wraps them for manual adjustments and does check.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use caja_core::validation::{validate_quantity, validate_stock_level};
use caja_core::{CoreError, InventoryMovement, MovementType, NewMovement};

use crate::error::DbResult;
use crate::repository::product::fetch_product;
use crate::unit_of_work::WriteGate;

// =============================================================================
// Ledger Primitives
// =============================================================================

/// Writes a movement and moves the product's stock counter with it.
///
/// Does not check availability. An OUT larger than stock trips the schema's
/// `CHECK (stock >= 0)` and fails the statement.
pub(crate) async fn apply_movement(
    conn: &mut SqliteConnection,
    movement: &NewMovement,
) -> DbResult<InventoryMovement> {
    validate_quantity(movement.quantity)?;

    let now = Utc::now();
    let delta = movement.kind.signed(movement.quantity);

    let updated = sqlx::query("UPDATE products SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3")
        .bind(delta)
        .bind(now)
        .bind(movement.product_id)
        .execute(&mut *conn)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(movement.product_id).into());
    }

    let recorded: InventoryMovement = sqlx::query_as(
        r#"
        INSERT INTO stock_movements (product_id, kind, quantity, note, user_id, sale_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING id, product_id, kind, quantity, note, user_id, sale_id, created_at
        "#,
    )
    .bind(movement.product_id)
    .bind(movement.kind)
    .bind(movement.quantity)
    .bind(&movement.note)
    .bind(movement.user_id)
    .bind(movement.sale_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    debug!(
        movement_id = recorded.id,
        product_id = recorded.product_id,
        kind = ?recorded.kind,
        quantity = recorded.quantity,
        "Movement applied"
    );

    Ok(recorded)
}

/// Deletes a movement and takes its effect back off the stock counter.
pub(crate) async fn unapply_movement(
    conn: &mut SqliteConnection,
    movement: &InventoryMovement,
) -> DbResult<()> {
    sqlx::query("UPDATE products SET stock = stock - ?1, updated_at = ?2 WHERE id = ?3")
        .bind(movement.stock_delta())
        .bind(Utc::now())
        .bind(movement.product_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM stock_movements WHERE id = ?1")
        .bind(movement.id)
        .execute(&mut *conn)
        .await?;

    debug!(movement_id = movement.id, "Movement reversed");
    Ok(())
}

/// Records whatever movement takes the product to `target` units.
///
/// Zero delta writes nothing and returns `None`.
pub(crate) async fn adjust_to(
    conn: &mut SqliteConnection,
    product_id: i64,
    target: i64,
    note: Option<String>,
    user_id: Option<i64>,
) -> DbResult<Option<InventoryMovement>> {
    validate_stock_level(target)?;

    let product = fetch_product(&mut *conn, product_id)
        .await?
        .ok_or(CoreError::ProductNotFound(product_id))?;

    let Some((kind, quantity)) = MovementType::from_delta(target - product.stock) else {
        debug!(product_id, target, "Stock already at target");
        return Ok(None);
    };

    let movement = NewMovement::manual(product_id, kind, quantity)
        .with_note(note.unwrap_or_else(|| "Ajuste de inventario".to_string()))
        .by_user(user_id);

    apply_movement(conn, &movement).await.map(Some)
}

pub(crate) async fn fetch_movement(
    conn: &mut SqliteConnection,
    id: i64,
) -> DbResult<Option<InventoryMovement>> {
    let movement = sqlx::query_as(
        r#"
        SELECT id, product_id, kind, quantity, note, user_id, sale_id, created_at
        FROM stock_movements
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(movement)
}

// =============================================================================
// Repository
// =============================================================================

/// Public face of the ledger: manual adjustments and history.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        InventoryRepository { pool, gate }
    }

    /// Records a manual movement (receiving goods, shrinkage, ...).
    ///
    /// ## Errors
    /// - `Validation` when quantity is not positive
    /// - `ProductNotFound`
    /// - `InsufficientStock` when an OUT exceeds what is on hand
    pub async fn record_movement(&self, movement: NewMovement) -> DbResult<InventoryMovement> {
        validate_quantity(movement.quantity)?;

        let mut uow = self.gate.begin(&self.pool).await?;

        let product = fetch_product(uow.conn(), movement.product_id)
            .await?
            .ok_or(CoreError::ProductNotFound(movement.product_id))?;

        if movement.kind == MovementType::Out {
            caja_core::cart::check_stock(&product, movement.quantity)?;
        }

        let recorded = apply_movement(uow.conn(), &movement).await?;
        uow.commit().await?;

        info!(
            movement_id = recorded.id,
            product_id = recorded.product_id,
            kind = ?recorded.kind,
            quantity = recorded.quantity,
            "Stock movement recorded"
        );

        Ok(recorded)
    }

    /// Deletes a movement and undoes its effect on stock.
    ///
    /// ## Errors
    /// - `MovementNotFound`
    /// - `InsufficientStock` when undoing an IN would take stock below zero
    pub async fn reverse_movement(&self, id: i64) -> DbResult<InventoryMovement> {
        let mut uow = self.gate.begin(&self.pool).await?;

        let movement = fetch_movement(uow.conn(), id)
            .await?
            .ok_or(CoreError::MovementNotFound(id))?;

        if movement.kind == MovementType::In {
            if let Some(product) = fetch_product(uow.conn(), movement.product_id).await? {
                caja_core::cart::check_stock(&product, movement.quantity)?;
            }
        }

        unapply_movement(uow.conn(), &movement).await?;
        uow.commit().await?;

        info!(movement_id = id, product_id = movement.product_id, "Stock movement reversed");
        Ok(movement)
    }

    /// Brings a product's stock to `new_stock` through one movement.
    ///
    /// Returns `None` when the stock already matches.
    pub async fn set_stock(
        &self,
        product_id: i64,
        new_stock: i64,
        note: Option<String>,
        user_id: Option<i64>,
    ) -> DbResult<Option<InventoryMovement>> {
        validate_stock_level(new_stock)?;

        let mut uow = self.gate.begin(&self.pool).await?;
        let movement = adjust_to(uow.conn(), product_id, new_stock, note, user_id).await?;
        uow.commit().await?;

        if movement.is_some() {
            info!(product_id, new_stock, "Stock set");
        }
        Ok(movement)
    }

    /// Movement history, newest first, optionally for one product.
    pub async fn list_movements(&self, product_id: Option<i64>) -> DbResult<Vec<InventoryMovement>> {
        debug!(product_id = ?product_id, "Listing movements");

        let movements = sqlx::query_as(
            r#"
            SELECT id, product_id, kind, quantity, note, user_id, sale_id, created_at
            FROM stock_movements
            WHERE ?1 IS NULL OR product_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Movements written on behalf of a sale, oldest first.
    pub async fn movements_for_sale(&self, sale_id: i64) -> DbResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as(
            r#"
            SELECT id, product_id, kind, quantity, note, user_id, sale_id, created_at
            FROM stock_movements
            WHERE sale_id = ?1
            ORDER BY id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Σ IN − Σ OUT for a product. Equals `products.stock` at all times.
    pub async fn movement_balance(&self, product_id: i64) -> DbResult<i64> {
        let balance: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE kind WHEN 'IN' THEN quantity ELSE -quantity END), 0)
            FROM stock_movements
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

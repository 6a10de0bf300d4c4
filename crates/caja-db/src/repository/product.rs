//! # Product Repository
//!
//! Catalog operations and SKU rules.
//!
//! ## SKU Ownership Check
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  raw "sku7" ──► normalize_sku ──► "SKU-00007"                           │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │        SELECT id FROM products WHERE sku = ? (COLLATE NOCASE)          │
//! │                                      │                                  │
//! │            ┌─────────────────────────┼──────────────────────┐           │
//! │            ▼                         ▼                      ▼           │
//! │        no owner               owner == self            other owner     │
//! │          OK                        OK                 DuplicateSku     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is never written here directly: opening stock and stock edits are
//! ledger movements.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use caja_core::sku::{next_sku, normalize_sku};
use caja_core::validation::{
    validate_price_cents, validate_product_name, validate_stock_level, validate_thresholds,
};
use caja_core::{CoreError, MovementType, NewMovement, NewProduct, Product, ProductUpdate};

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{adjust_to, apply_movement};
use crate::unit_of_work::WriteGate;

// =============================================================================
// Shared Queries
// =============================================================================

/// Loads a product on an existing connection (inside a unit of work).
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: i64,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as(
        r#"
        SELECT id, sku, name, price_cents, stock, min_stock, max_stock, image_url,
               created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// Id of the product that owns a (normalized) SKU, if any.
async fn sku_owner(conn: &mut SqliteConnection, sku: &str) -> DbResult<Option<i64>> {
    let owner = sqlx::query_scalar("SELECT id FROM products WHERE sku = ?1 COLLATE NOCASE")
        .bind(sku)
        .fetch_optional(conn)
        .await?;

    Ok(owner)
}

async fn next_free_sku(conn: &mut SqliteConnection) -> DbResult<String> {
    let skus: Vec<String> = sqlx::query_scalar("SELECT sku FROM products")
        .fetch_all(conn)
        .await?;

    Ok(next_sku(skus.iter().map(String::as_str)))
}

/// A duplicate SKU that slipped past the ownership check hits the unique
/// index instead; report it the same way.
fn map_sku_conflict(err: DbError, sku: &str) -> DbError {
    match err {
        DbError::UniqueViolation { ref field, .. } if field.contains("sku") => {
            CoreError::DuplicateSku(sku.to_string()).into()
        }
        other => other,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        ProductRepository { pool, gate }
    }

    /// All products by id.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products: Vec<Product> = sqlx::query_as(
            r#"
            SELECT id, sku, name, price_cents, stock, min_stock, max_stock, image_url,
                   created_at, updated_at
            FROM products
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product by SKU. The input is normalized first, so `sku7`
    /// finds `SKU-00007`.
    pub async fn get_by_sku(&self, raw_sku: &str) -> DbResult<Option<Product>> {
        let sku = normalize_sku(raw_sku);

        let product = sqlx::query_as(
            r#"
            SELECT id, sku, name, price_cents, stock, min_stock, max_stock, image_url,
                   created_at, updated_at
            FROM products
            WHERE sku = ?1 COLLATE NOCASE
            "#,
        )
        .bind(&sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Whether the normalized form of `raw_sku` is taken by a product other
    /// than `exclude_id`. Returns the normalized SKU alongside, for the form
    /// to display.
    pub async fn sku_exists(&self, raw_sku: &str, exclude_id: Option<i64>) -> DbResult<(bool, String)> {
        let sku = normalize_sku(raw_sku);
        let mut conn = self.pool.acquire().await?;
        let owner = sku_owner(&mut conn, &sku).await?;

        let exists = matches!(owner, Some(id) if Some(id) != exclude_id);
        Ok((exists, sku))
    }

    /// Next SKU a new product would get.
    pub async fn next_sku(&self) -> DbResult<String> {
        let mut conn = self.pool.acquire().await?;
        next_free_sku(&mut conn).await
    }

    /// Creates a product.
    ///
    /// Opening stock is recorded as an `IN` movement noted `Stock inicial`.
    ///
    /// ## Errors
    /// - `Validation` for a blank name, negative price/stock/thresholds
    /// - `DuplicateSku` when the normalized SKU is taken
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        validate_product_name(&new.name)?;
        validate_price_cents(new.price_cents)?;
        validate_stock_level(new.stock)?;
        validate_thresholds(new.min_stock, new.max_stock)?;

        let mut uow = self.gate.begin(&self.pool).await?;

        let sku = match non_blank(new.sku.as_deref()) {
            Some(raw) => normalize_sku(raw),
            None => next_free_sku(uow.conn()).await?,
        };

        if sku_owner(uow.conn(), &sku).await?.is_some() {
            return Err(CoreError::DuplicateSku(sku).into());
        }

        debug!(sku = %sku, "Inserting product");

        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (sku, name, price_cents, stock, min_stock, max_stock, image_url,
                                  created_at, updated_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7, ?7)
            RETURNING id
            "#,
        )
        .bind(&sku)
        .bind(new.name.trim())
        .bind(new.price_cents)
        .bind(new.min_stock)
        .bind(new.max_stock)
        .bind(non_blank(new.image_url.as_deref()))
        .bind(now)
        .fetch_one(uow.conn())
        .await
        .map_err(|e| map_sku_conflict(e.into(), &sku))?;

        if new.stock > 0 {
            let opening = NewMovement::manual(id, MovementType::In, new.stock).with_note("Stock inicial");
            apply_movement(uow.conn(), &opening).await?;
        }

        let product = fetch_product(uow.conn(), id)
            .await?
            .ok_or(CoreError::ProductNotFound(id))?;
        uow.commit().await?;

        info!(id, sku = %product.sku, stock = product.stock, "Product created");
        Ok(product)
    }

    /// Updates a product. `None` fields keep their value.
    ///
    /// A new `stock` becomes an adjustment movement; a new SKU is normalized
    /// and checked against every other product.
    pub async fn update(&self, id: i64, changes: ProductUpdate) -> DbResult<Product> {
        if let Some(name) = &changes.name {
            validate_product_name(name)?;
        }
        if let Some(price) = changes.price_cents {
            validate_price_cents(price)?;
        }
        if let Some(stock) = changes.stock {
            validate_stock_level(stock)?;
        }

        let mut uow = self.gate.begin(&self.pool).await?;

        let current = fetch_product(uow.conn(), id)
            .await?
            .ok_or(CoreError::ProductNotFound(id))?;

        let sku = match non_blank(changes.sku.as_deref()) {
            Some(raw) => {
                let sku = normalize_sku(raw);
                if matches!(sku_owner(uow.conn(), &sku).await?, Some(owner) if owner != id) {
                    return Err(CoreError::DuplicateSku(sku).into());
                }
                sku
            }
            None => current.sku.clone(),
        };

        let min_stock = changes.min_stock.unwrap_or(current.min_stock);
        let max_stock = if changes.clear_max_stock {
            None
        } else {
            changes.max_stock.or(current.max_stock)
        };
        validate_thresholds(min_stock, max_stock)?;

        debug!(id, "Updating product");

        sqlx::query(
            r#"
            UPDATE products
            SET sku = ?1, name = ?2, price_cents = ?3, min_stock = ?4, max_stock = ?5,
                image_url = ?6, updated_at = ?7
            WHERE id = ?8
            "#,
        )
        .bind(&sku)
        .bind(changes.name.as_deref().map(str::trim).unwrap_or(&current.name))
        .bind(changes.price_cents.unwrap_or(current.price_cents))
        .bind(min_stock)
        .bind(max_stock)
        .bind(changes.image_url.or(current.image_url))
        .bind(Utc::now())
        .bind(id)
        .execute(uow.conn())
        .await
        .map_err(|e| map_sku_conflict(e.into(), &sku))?;

        if let Some(target) = changes.stock {
            adjust_to(uow.conn(), id, target, None, None).await?;
        }

        let product = fetch_product(uow.conn(), id)
            .await?
            .ok_or(CoreError::ProductNotFound(id))?;
        uow.commit().await?;

        info!(id, sku = %product.sku, "Product updated");
        Ok(product)
    }

    /// Deletes a product and its movement history.
    ///
    /// Sale items keep their sku/name/price snapshots.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut uow = self.gate.begin(&self.pool).await?;

        sqlx::query("DELETE FROM stock_movements WHERE product_id = ?1")
            .bind(id)
            .execute(uow.conn())
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(uow.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id).into());
        }

        uow.commit().await?;
        info!(id, "Product deleted");
        Ok(())
    }

    /// Products at or below their minimum, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as(
            r#"
            SELECT id, sku, name, price_cents, stock, min_stock, max_stock, image_url,
                   created_at, updated_at
            FROM products
            WHERE stock <= min_stock
            ORDER BY stock, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use caja_core::StockStatus;

    fn new_product(sku: Option<&str>, name: &str, stock: i64) -> NewProduct {
        NewProduct {
            sku: sku.map(str::to_string),
            name: name.to_string(),
            price_cents: 1500,
            stock,
            min_stock: 2,
            ..Default::default()
        }
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_normalizes_sku_and_records_opening_stock() {
        let db = setup().await;
        let product = db
            .products()
            .create(new_product(Some("sku007"), "Frijol negro", 12))
            .await
            .unwrap();

        assert_eq!(product.sku, "SKU-00007");
        assert_eq!(product.stock, 12);

        let movements = db.inventory().list_movements(Some(product.id)).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementType::In);
        assert_eq!(movements[0].quantity, 12);
        assert_eq!(movements[0].note.as_deref(), Some("Stock inicial"));
    }

    #[tokio::test]
    async fn test_zero_opening_stock_writes_no_movement() {
        let db = setup().await;
        let product = db.products().create(new_product(None, "Arroz", 0)).await.unwrap();
        assert!(db.inventory().list_movements(Some(product.id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = setup().await;
        let repo = db.products();
        repo.create(new_product(Some("sku007"), "Frijol negro", 1)).await.unwrap();

        let err = repo
            .create(new_product(Some("SKU-7"), "Frijol bayo", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::DuplicateSku(ref s)) if s == "SKU-00007"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_auto_sku_takes_max_plus_one() {
        let db = setup().await;
        let repo = db.products();
        repo.create(new_product(Some("SKU-00041"), "A", 0)).await.unwrap();
        repo.create(new_product(Some("3"), "B", 0)).await.unwrap();

        assert_eq!(repo.next_sku().await.unwrap(), "SKU-00042");
        let auto = repo.create(new_product(Some("  "), "C", 0)).await.unwrap();
        assert_eq!(auto.sku, "SKU-00042");
    }

    #[tokio::test]
    async fn test_sku_exists() {
        let db = setup().await;
        let repo = db.products();
        let product = repo.create(new_product(Some("SKU-00005"), "A", 0)).await.unwrap();

        assert_eq!(
            repo.sku_exists("sku5", None).await.unwrap(),
            (true, "SKU-00005".to_string())
        );
        assert_eq!(
            repo.sku_exists("sku5", Some(product.id)).await.unwrap(),
            (false, "SKU-00005".to_string())
        );
        assert!(!repo.sku_exists("sku6", None).await.unwrap().0);
    }

    #[tokio::test]
    async fn test_get_by_sku_normalizes_input() {
        let db = setup().await;
        let repo = db.products();
        let product = repo.create(new_product(Some("SKU-00010"), "A", 0)).await.unwrap();

        let found = repo.get_by_sku("sku-10").await.unwrap().unwrap();
        assert_eq!(found.id, product.id);
        assert!(repo.get_by_sku("sku-11").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_fields_and_stock_through_ledger() {
        let db = setup().await;
        let repo = db.products();
        let product = repo.create(new_product(None, "Leche", 10)).await.unwrap();

        let updated = repo
            .update(
                product.id,
                ProductUpdate {
                    name: Some("Leche entera".to_string()),
                    price_cents: Some(2800),
                    stock: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Leche entera");
        assert_eq!(updated.price_cents, 2800);
        assert_eq!(updated.sku, product.sku);
        assert_eq!(updated.stock, 4);
        assert_eq!(db.inventory().movement_balance(product.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_update_sku_collision() {
        let db = setup().await;
        let repo = db.products();
        repo.create(new_product(Some("1"), "A", 0)).await.unwrap();
        let b = repo.create(new_product(Some("2"), "B", 0)).await.unwrap();

        // Keeping its own SKU is fine
        repo.update(b.id, ProductUpdate { sku: Some("sku-2".into()), ..Default::default() })
            .await
            .unwrap();

        let err = repo
            .update(b.id, ProductUpdate { sku: Some("sku1".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::DuplicateSku(_))));
    }

    #[tokio::test]
    async fn test_update_sets_and_clears_max_stock() {
        let db = setup().await;
        let repo = db.products();
        let p = repo.create(new_product(None, "Azúcar", 5)).await.unwrap();

        let capped = repo
            .update(p.id, ProductUpdate { max_stock: Some(50), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(capped.max_stock, Some(50));

        // Untouched fields keep the cap
        let renamed = repo
            .update(p.id, ProductUpdate { name: Some("Azúcar 1kg".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(renamed.max_stock, Some(50));

        let cleared = repo
            .update(p.id, ProductUpdate { clear_max_stock: true, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(cleared.max_stock, None);
        assert_eq!(cleared.min_stock, 2);
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = setup().await;
        let err = db
            .products()
            .update(404, ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(404))));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup().await;
        let repo = db.products();
        let product = repo.create(new_product(None, "A", 3)).await.unwrap();

        repo.delete(product.id).await.unwrap();
        assert!(repo.get_by_id(product.id).await.unwrap().is_none());
        assert!(db.inventory().list_movements(Some(product.id)).await.unwrap().is_empty());

        let err = repo.delete(product.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_low_stock_and_status() {
        let db = setup().await;
        let repo = db.products();
        let empty = repo.create(new_product(None, "Vacío", 0)).await.unwrap();
        let low = repo.create(new_product(None, "Bajo", 2)).await.unwrap();
        repo.create(new_product(None, "Lleno", 30)).await.unwrap();

        let flagged = repo.low_stock().await.unwrap();
        assert_eq!(
            flagged.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![empty.id, low.id]
        );
        assert_eq!(flagged[0].stock_status(), StockStatus::OutOfStock);
        assert_eq!(flagged[1].stock_status(), StockStatus::Low);
    }

    #[tokio::test]
    async fn test_validation() {
        let db = setup().await;
        let repo = db.products();

        let blank = repo.create(new_product(None, "  ", 0)).await.unwrap_err();
        assert!(matches!(blank, DbError::Domain(CoreError::Validation(_))));

        let negative = repo.create(new_product(None, "A", -1)).await.unwrap_err();
        assert!(matches!(negative, DbError::Domain(CoreError::Validation(_))));
    }
}

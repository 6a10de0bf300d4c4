//! # Sale Repository
//!
//! The sale transaction engine: create, edit and delete sales together with
//! their inventory effects, each as one unit of work.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE   create_sale()                                             │
//! │     ├── normalize cart (drop qty <= 0, merge)   → EmptyCart            │
//! │     ├── load products, check stock              → ProductNotFound /    │
//! │     │                                             InsufficientStock    │
//! │     ├── INSERT sale (folio NULL) + items                               │
//! │     ├── UPDATE folio = V-{id:04}                                       │
//! │     └── OUT movement per product  "Venta V-0001"                       │
//! │                                                                         │
//! │  2. EDIT     update_sale()                                             │
//! │     ├── old qty per product vs new qty per product                     │
//! │     ├── OUT for growth (checked), IN for shrink / removal              │
//! │     ├── replace items, re-price at current catalog prices              │
//! │     └── movements noted  "Edición de venta V-0001"                     │
//! │                                                                         │
//! │  3. DELETE   delete_sale()                                             │
//! │     ├── IN movement per product  "Cancelación de venta V-0001"         │
//! │     └── DELETE items, DELETE sale                                      │
//! │                                                                         │
//! │  Any error before commit drops the unit of work: nothing survives.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use caja_core::cart::{check_stock, normalize_lines, reconcile, PricedLine, SaleTotals, StockChange};
use caja_core::sku::format_folio;
use caja_core::{
    CartLine, CoreError, MovementType, NewMovement, NewSale, Product, Sale, SaleDetail, SaleItem,
    SaleSettings, SaleSummary, SaleUpdate,
};

use crate::error::{DbError, DbResult};
use crate::repository::inventory::apply_movement;
use crate::repository::product::fetch_product;
use crate::unit_of_work::WriteGate;

// =============================================================================
// Row Access
// =============================================================================

async fn fetch_sale(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as(
        r#"
        SELECT id, folio, customer_id, customer_name, payment_method,
               subtotal_cents, tax_cents, total_cents, created_at, updated_at
        FROM sales
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(sale)
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as(
        r#"
        SELECT id, sale_id, product_id, sku_snapshot, name_snapshot,
               unit_price_cents, quantity, line_total_cents
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY id
        "#,
    )
    .bind(sale_id)
    .fetch_all(conn)
    .await?;

    Ok(items)
}

async fn load_detail(conn: &mut SqliteConnection, id: i64) -> DbResult<SaleDetail> {
    let sale = fetch_sale(&mut *conn, id)
        .await?
        .ok_or(CoreError::SaleNotFound(id))?;
    let items = fetch_items(conn, id).await?;
    Ok(SaleDetail { sale, items })
}

async fn customer_name(conn: &mut SqliteConnection, customer_id: i64) -> DbResult<String> {
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM customers WHERE id = ?1")
        .bind(customer_id)
        .fetch_optional(conn)
        .await?;

    name.ok_or_else(|| CoreError::CustomerNotFound(customer_id).into())
}

async fn insert_items(
    conn: &mut SqliteConnection,
    sale_id: i64,
    lines: &[PricedLine],
) -> DbResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO sale_items (sale_id, product_id, sku_snapshot, name_snapshot,
                                    unit_price_cents, quantity, line_total_cents)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(sale_id)
        .bind(line.product_id)
        .bind(&line.sku)
        .bind(&line.name)
        .bind(line.unit_price_cents)
        .bind(line.quantity)
        .bind(line.line_total_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Planning
// =============================================================================

/// Everything a create or edit will write, decided before the first write.
struct SalePlan {
    lines: Vec<PricedLine>,
    changes: Vec<StockChange>,
    totals: SaleTotals,
}

/// Plans the stock movements from `previous` item quantities to `lines`,
/// then prices `lines` at current catalog prices.
///
/// Every OUT is checked against the stock read inside the caller's unit of
/// work before any line is priced, so an absurd quantity fails as
/// `InsufficientStock`.
async fn plan_sale(
    conn: &mut SqliteConnection,
    previous: &[(i64, i64)],
    lines: &[CartLine],
    settings: &SaleSettings,
) -> DbResult<SalePlan> {
    let mut catalog: HashMap<i64, Product> = HashMap::with_capacity(lines.len());

    for line in lines {
        let product = fetch_product(&mut *conn, line.product_id)
            .await?
            .ok_or(CoreError::ProductNotFound(line.product_id))?;
        catalog.insert(product.id, product);
    }

    let changes = reconcile(previous, lines);
    for change in changes.iter().filter(|c| c.kind == MovementType::Out) {
        // OUT changes only come from lines, which were all loaded above
        if let Some(product) = catalog.get(&change.product_id) {
            check_stock(product, change.quantity)?;
        }
    }

    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(product) = catalog.get(&line.product_id) {
            priced.push(PricedLine::from_product(product, line.quantity)?);
        }
    }

    let totals = SaleTotals::compute(&priced, settings.tax_rate)?;
    Ok(SalePlan {
        lines: priced,
        changes,
        totals,
    })
}

/// Writes the planned movements for a sale.
///
/// Restoring stock to a product that has since left the catalog is skipped;
/// there is no counter left to restore.
async fn apply_changes(
    conn: &mut SqliteConnection,
    sale_id: i64,
    changes: &[StockChange],
    note: &str,
) -> DbResult<()> {
    for change in changes {
        let movement = NewMovement {
            product_id: change.product_id,
            kind: change.kind,
            quantity: change.quantity,
            note: Some(note.to_string()),
            user_id: None,
            sale_id: Some(sale_id),
        };

        match apply_movement(&mut *conn, &movement).await {
            Ok(_) => {}
            Err(DbError::Domain(CoreError::ProductNotFound(product_id)))
                if change.kind == MovementType::In =>
            {
                warn!(sale_id, product_id, quantity = change.quantity, "Product gone, stock not restored");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// The sale transaction engine.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    gate: WriteGate,
    settings: SaleSettings,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, gate: WriteGate, settings: SaleSettings) -> Self {
        SaleRepository {
            pool,
            gate,
            settings,
        }
    }

    /// Rings up a sale.
    ///
    /// ## Errors
    /// - `EmptyCart` when no line has a positive quantity
    /// - `CustomerNotFound` for an unknown `customer_id`
    /// - `ProductNotFound` / `InsufficientStock` (naming the product)
    ///
    /// On any error nothing is written: no sale, no items, no movement.
    pub async fn create_sale(&self, new: NewSale) -> DbResult<SaleDetail> {
        let lines = normalize_lines(&new.items)?;

        let mut uow = self.gate.begin(&self.pool).await?;

        let registered = match new.customer_id {
            Some(id) => Some(customer_name(uow.conn(), id).await?),
            None => None,
        };
        let customer_name = non_blank(new.customer_name)
            .or(registered)
            .unwrap_or_else(|| self.settings.walk_in_name.clone());
        let payment_method = non_blank(new.payment_method)
            .unwrap_or_else(|| self.settings.default_payment_method.clone());

        let plan = plan_sale(uow.conn(), &[], &lines, &self.settings).await?;

        debug!(lines = plan.lines.len(), total_cents = plan.totals.total.cents(), "Creating sale");

        let now = Utc::now();
        let sale_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sales (folio, customer_id, customer_name, payment_method,
                               subtotal_cents, tax_cents, total_cents, created_at, updated_at)
            VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING id
            "#,
        )
        .bind(new.customer_id)
        .bind(&customer_name)
        .bind(&payment_method)
        .bind(plan.totals.subtotal.cents())
        .bind(plan.totals.tax.cents())
        .bind(plan.totals.total.cents())
        .bind(now)
        .fetch_one(uow.conn())
        .await?;

        insert_items(uow.conn(), sale_id, &plan.lines).await?;

        // The folio embeds the id, so it can only be written now
        let folio = format_folio(sale_id);
        sqlx::query("UPDATE sales SET folio = ?1 WHERE id = ?2")
            .bind(&folio)
            .bind(sale_id)
            .execute(uow.conn())
            .await?;

        apply_changes(uow.conn(), sale_id, &plan.changes, &format!("Venta {folio}")).await?;

        let detail = load_detail(uow.conn(), sale_id).await?;
        uow.commit().await?;

        info!(
            sale_id,
            folio = %folio,
            total_cents = detail.sale.total_cents,
            "Sale created"
        );
        Ok(detail)
    }

    /// Edits a sale in place: items are replaced wholesale and stock moves
    /// only by the per-product difference.
    ///
    /// Header fields left `None` keep their stored value. Giving only a
    /// `customer_id` takes that customer's name.
    ///
    /// ## Errors
    /// - `SaleNotFound`, then `EmptyCart`
    /// - `CustomerNotFound` for an unknown `customer_id`
    /// - `ProductNotFound` / `InsufficientStock` for a line that grows
    pub async fn update_sale(&self, id: i64, update: SaleUpdate) -> DbResult<SaleDetail> {
        let mut uow = self.gate.begin(&self.pool).await?;

        let current = fetch_sale(uow.conn(), id)
            .await?
            .ok_or(CoreError::SaleNotFound(id))?;

        let lines = normalize_lines(&update.items)?;

        let registered = match update.customer_id {
            Some(customer_id) => Some(customer_name(uow.conn(), customer_id).await?),
            None => None,
        };
        let customer_name = non_blank(update.customer_name)
            .or(registered)
            .unwrap_or(current.customer_name);
        let customer_id = update.customer_id.or(current.customer_id);
        let payment_method = non_blank(update.payment_method).unwrap_or(current.payment_method);
        let folio = non_blank(update.folio)
            .or(current.folio)
            .unwrap_or_else(|| format_folio(id));

        let previous: Vec<(i64, i64)> = fetch_items(uow.conn(), id)
            .await?
            .into_iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();

        let plan = plan_sale(uow.conn(), &previous, &lines, &self.settings).await?;

        debug!(sale_id = id, changes = plan.changes.len(), "Updating sale");

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(id)
            .execute(uow.conn())
            .await?;
        insert_items(uow.conn(), id, &plan.lines).await?;

        sqlx::query(
            r#"
            UPDATE sales
            SET folio = ?1, customer_id = ?2, customer_name = ?3, payment_method = ?4,
                subtotal_cents = ?5, tax_cents = ?6, total_cents = ?7, updated_at = ?8
            WHERE id = ?9
            "#,
        )
        .bind(&folio)
        .bind(customer_id)
        .bind(&customer_name)
        .bind(&payment_method)
        .bind(plan.totals.subtotal.cents())
        .bind(plan.totals.tax.cents())
        .bind(plan.totals.total.cents())
        .bind(Utc::now())
        .bind(id)
        .execute(uow.conn())
        .await?;

        apply_changes(
            uow.conn(),
            id,
            &plan.changes,
            &format!("Edición de venta {folio}"),
        )
        .await?;

        let detail = load_detail(uow.conn(), id).await?;
        uow.commit().await?;

        info!(
            sale_id = id,
            folio = %folio,
            total_cents = detail.sale.total_cents,
            "Sale updated"
        );
        Ok(detail)
    }

    /// Deletes a sale, returning every item's quantity to stock.
    pub async fn delete_sale(&self, id: i64) -> DbResult<()> {
        let mut uow = self.gate.begin(&self.pool).await?;

        let sale = fetch_sale(uow.conn(), id)
            .await?
            .ok_or(CoreError::SaleNotFound(id))?;
        let folio = sale.folio.unwrap_or_else(|| format_folio(id));

        let mut restore: BTreeMap<i64, i64> = BTreeMap::new();
        for item in fetch_items(uow.conn(), id).await? {
            *restore.entry(item.product_id).or_insert(0) += item.quantity;
        }

        let changes: Vec<StockChange> = restore
            .into_iter()
            .filter(|(_, quantity)| *quantity > 0)
            .map(|(product_id, quantity)| StockChange {
                product_id,
                kind: MovementType::In,
                quantity,
            })
            .collect();

        apply_changes(
            uow.conn(),
            id,
            &changes,
            &format!("Cancelación de venta {folio}"),
        )
        .await?;

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(id)
            .execute(uow.conn())
            .await?;
        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(uow.conn())
            .await?;

        uow.commit().await?;

        info!(sale_id = id, folio = %folio, "Sale deleted");
        Ok(())
    }

    /// A sale with its items.
    pub async fn get_sale(&self, id: i64) -> DbResult<SaleDetail> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, id).await
    }

    /// Every sale, newest first, with its item count.
    pub async fn list_sales(&self) -> DbResult<Vec<SaleSummary>> {
        let sales: Vec<SaleSummary> = sqlx::query_as(
            r#"
            SELECT s.id, s.folio, s.created_at, s.customer_name, s.payment_method,
                   s.subtotal_cents, s.tax_cents, s.total_cents,
                   COUNT(si.id) AS items_count
            FROM sales s
            LEFT JOIN sale_items si ON si.sale_id = s.id
            GROUP BY s.id
            ORDER BY s.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    /// Counts sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! End-to-end behavior of the sale engine against a real SQLite database.

use caja_core::{
    CartLine, CoreError, MovementType, NewProduct, NewSale, SaleSettings, SaleUpdate, TaxRate,
};
use caja_db::{Database, DbConfig, DbError};

async fn setup() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn product(db: &Database, name: &str, price_cents: i64, stock: i64) -> i64 {
    db.products()
        .create(NewProduct {
            name: name.to_string(),
            price_cents,
            stock,
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

async fn stock(db: &Database, id: i64) -> i64 {
    db.products().get_by_id(id).await.unwrap().unwrap().stock
}

fn lines(items: &[(i64, i64)]) -> Vec<CartLine> {
    items.iter().map(|&(p, q)| CartLine::new(p, q)).collect()
}

fn cart(items: &[(i64, i64)]) -> NewSale {
    NewSale {
        items: lines(items),
        ..Default::default()
    }
}

fn edit(items: &[(i64, i64)]) -> SaleUpdate {
    SaleUpdate {
        items: lines(items),
        ..Default::default()
    }
}

/// Stock counter equals the sum of its movements, for every product.
async fn assert_ledger_balanced(db: &Database) {
    for product in db.products().list().await.unwrap() {
        let balance = db.inventory().movement_balance(product.id).await.unwrap();
        assert_eq!(product.stock, balance, "ledger out of balance for {}", product.sku);
    }
}

#[tokio::test]
async fn sale_decrements_stock_and_adds_tax() {
    let db = setup().await;
    let x = product(&db, "Café", 1000, 5).await;

    let sale = db.sales().create_sale(cart(&[(x, 3)])).await.unwrap().sale;

    assert_eq!(stock(&db, x).await, 2);
    assert_eq!(sale.subtotal_cents, 3000);
    assert_eq!(sale.tax_cents, 480);
    assert_eq!(sale.total_cents, 3480);
    assert_eq!(sale.total_cents, sale.subtotal_cents + sale.tax_cents);
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn tax_rounds_half_up_on_the_subtotal() {
    let db = setup().await;
    // 3 x $0.33 = $0.99; 16% = 15.84 cents
    let x = product(&db, "Chicle", 33, 10).await;

    let sale = db.sales().create_sale(cart(&[(x, 3)])).await.unwrap().sale;

    assert_eq!(sale.subtotal_cents, 99);
    assert_eq!(sale.tax_cents, 16);
    assert_eq!(sale.total_cents, 115);
}

#[tokio::test]
async fn configured_tax_rate_is_used() {
    let settings = SaleSettings::default().with_tax_rate(TaxRate::from_bps(800));
    let db = Database::new(DbConfig::in_memory().sale_settings(settings))
        .await
        .unwrap();
    let x = product(&db, "Pan", 1000, 5).await;

    let sale = db.sales().create_sale(cart(&[(x, 1)])).await.unwrap().sale;
    assert_eq!(sale.tax_cents, 80);
}

#[tokio::test]
async fn insufficient_stock_leaves_everything_untouched() {
    let db = setup().await;
    let x = product(&db, "Café", 1000, 2).await;

    let err = db.sales().create_sale(cart(&[(x, 3)])).await.unwrap_err();
    assert!(err.is_business());

    match err {
        DbError::Domain(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(stock(&db, x).await, 2);
    assert_eq!(db.sales().count().await.unwrap(), 0);
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn shortage_on_a_later_line_rolls_back_earlier_lines() {
    let db = setup().await;
    let a = product(&db, "A", 100, 10).await;
    let b = product(&db, "B", 100, 1).await;

    let err = db.sales().create_sale(cart(&[(a, 4), (b, 2)])).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));

    assert_eq!(stock(&db, a).await, 10);
    assert_eq!(stock(&db, b).await, 1);
    assert_eq!(db.inventory().list_movements(Some(a)).await.unwrap().len(), 1);
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn shrinking_a_line_restores_the_difference() {
    let db = setup().await;
    let x = product(&db, "X", 100, 10).await;
    let sale = db.sales().create_sale(cart(&[(x, 3)])).await.unwrap().sale;
    assert_eq!(stock(&db, x).await, 7);

    let updated = db.sales().update_sale(sale.id, edit(&[(x, 1)])).await.unwrap();

    assert_eq!(stock(&db, x).await, 9);
    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.items[0].quantity, 1);
    assert_eq!(updated.sale.subtotal_cents, 100);

    let movements = db.inventory().movements_for_sale(sale.id).await.unwrap();
    let restore = movements
        .iter()
        .find(|m| m.kind == MovementType::In)
        .unwrap();
    assert_eq!(restore.quantity, 2);
    assert_eq!(restore.note.as_deref(), Some("Edición de venta V-0001"));
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn editing_swaps_products_by_net_difference() {
    let db = setup().await;
    let a = product(&db, "A", 100, 10).await;
    let b = product(&db, "B", 200, 10).await;
    let c = product(&db, "C", 300, 10).await;

    let sale = db
        .sales()
        .create_sale(cart(&[(a, 2), (b, 1)]))
        .await
        .unwrap()
        .sale;
    assert_eq!((stock(&db, a).await, stock(&db, b).await), (8, 9));

    let updated = db
        .sales()
        .update_sale(sale.id, edit(&[(a, 1), (c, 2)]))
        .await
        .unwrap();

    assert_eq!(stock(&db, a).await, 9);
    assert_eq!(stock(&db, b).await, 10);
    assert_eq!(stock(&db, c).await, 8);

    let products: Vec<i64> = updated.items.iter().map(|i| i.product_id).collect();
    assert_eq!(products, vec![a, c]);
    assert_eq!(updated.sale.subtotal_cents, 700);
    assert_eq!(
        updated.sale.total_cents,
        updated.sale.subtotal_cents + updated.sale.tax_cents
    );
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn growing_a_line_beyond_stock_fails_atomically() {
    let db = setup().await;
    let a = product(&db, "A", 100, 3).await;
    let b = product(&db, "B", 100, 10).await;
    let sale = db
        .sales()
        .create_sale(cart(&[(a, 2), (b, 2)]))
        .await
        .unwrap()
        .sale;

    // A grows by 2 with only 1 left; B shrinks
    let err = db
        .sales()
        .update_sale(sale.id, edit(&[(a, 4), (b, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));

    assert_eq!(stock(&db, a).await, 1);
    assert_eq!(stock(&db, b).await, 8);
    let kept = db.sales().get_sale(sale.id).await.unwrap();
    assert_eq!(kept.items.len(), 2);
    assert_eq!(kept.sale.subtotal_cents, 400);
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn an_edit_can_use_the_units_it_already_holds() {
    let db = setup().await;
    let x = product(&db, "X", 100, 3).await;
    let sale = db.sales().create_sale(cart(&[(x, 3)])).await.unwrap().sale;
    assert_eq!(stock(&db, x).await, 0);

    // Same quantity needs no stock at all
    db.sales().update_sale(sale.id, edit(&[(x, 3)])).await.unwrap();
    assert_eq!(stock(&db, x).await, 0);
}

#[tokio::test]
async fn emptying_a_sale_is_rejected() {
    let db = setup().await;
    let x = product(&db, "X", 100, 5).await;
    let sale = db.sales().create_sale(cart(&[(x, 1)])).await.unwrap().sale;

    let err = db
        .sales()
        .update_sale(sale.id, edit(&[(x, 0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));
    assert_eq!(stock(&db, x).await, 4);
}

#[tokio::test]
async fn deleting_a_sale_restores_stock() {
    let db = setup().await;
    let a = product(&db, "A", 100, 5).await;
    let sale = db.sales().create_sale(cart(&[(a, 3)])).await.unwrap().sale;
    assert_eq!(stock(&db, a).await, 2);

    db.sales().delete_sale(sale.id).await.unwrap();

    assert_eq!(stock(&db, a).await, 5);
    assert!(matches!(
        db.sales().get_sale(sale.id).await.unwrap_err(),
        DbError::Domain(CoreError::SaleNotFound(_))
    ));
    let remaining_items: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE sale_id = ?1")
            .bind(sale.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(remaining_items, 0);

    let notes: Vec<String> = db
        .inventory()
        .list_movements(Some(a))
        .await
        .unwrap()
        .into_iter()
        .filter_map(|m| m.note)
        .collect();
    assert!(notes.contains(&"Cancelación de venta V-0001".to_string()));
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn deleting_an_edited_sale_restores_the_final_quantities() {
    let db = setup().await;
    let a = product(&db, "A", 100, 10).await;
    let b = product(&db, "B", 100, 10).await;
    let sale = db.sales().create_sale(cart(&[(a, 4)])).await.unwrap().sale;
    db.sales()
        .update_sale(sale.id, edit(&[(a, 1), (b, 2)]))
        .await
        .unwrap();

    db.sales().delete_sale(sale.id).await.unwrap();

    assert_eq!(stock(&db, a).await, 10);
    assert_eq!(stock(&db, b).await, 10);
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn folios_keep_counting_after_a_delete() {
    let db = setup().await;
    let x = product(&db, "X", 100, 10).await;

    let first = db.sales().create_sale(cart(&[(x, 1)])).await.unwrap().sale;
    db.sales().delete_sale(first.id).await.unwrap();
    let second = db.sales().create_sale(cart(&[(x, 1)])).await.unwrap().sale;

    assert!(second.id > first.id);
    assert_eq!(second.folio.as_deref(), Some("V-0002"));
}

#[tokio::test]
async fn delete_then_recreate_returns_to_the_same_stock() {
    let db = setup().await;
    let a = product(&db, "A", 250, 10).await;
    let b = product(&db, "B", 400, 6).await;
    let items = [(a, 3), (b, 2), (a, 1)];

    let first = db.sales().create_sale(cart(&items)).await.unwrap().sale;
    assert_eq!((stock(&db, a).await, stock(&db, b).await), (6, 4));

    db.sales().delete_sale(first.id).await.unwrap();
    assert_eq!((stock(&db, a).await, stock(&db, b).await), (10, 6));
    assert_ledger_balanced(&db).await;

    let second = db.sales().create_sale(cart(&items)).await.unwrap().sale;
    assert_eq!((stock(&db, a).await, stock(&db, b).await), (6, 4));
    assert_eq!(second.total_cents, first.total_cents);

    db.sales().delete_sale(second.id).await.unwrap();
    assert_eq!((stock(&db, a).await, stock(&db, b).await), (10, 6));
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn huge_quantities_fail_without_writing() {
    let db = setup().await;
    let x = product(&db, "X", 1999, 5).await;

    let err = db
        .sales()
        .create_sale(cart(&[(x, i64::MAX / 2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));

    let err = db
        .sales()
        .create_sale(cart(&[(x, i64::MAX)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));

    // Merging these two lines cannot be represented at all
    let err = db
        .sales()
        .create_sale(cart(&[(x, i64::MAX), (x, 2)]))
        .await
        .unwrap_err();
    assert!(err.is_business());
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

    let sale = db.sales().create_sale(cart(&[(x, 2)])).await.unwrap().sale;
    let err = db
        .sales()
        .update_sale(sale.id, edit(&[(x, i64::MAX)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));

    assert_eq!(stock(&db, x).await, 3);
    assert_eq!(db.sales().count().await.unwrap(), 1);
    assert_ledger_balanced(&db).await;
}

#[tokio::test]
async fn receipts_survive_catalog_changes() {
    let db = setup().await;
    let x = product(&db, "Leche", 2650, 10).await;
    let sale = db.sales().create_sale(cart(&[(x, 2)])).await.unwrap().sale;

    db.products().delete(x).await.unwrap();

    let detail = db.sales().get_sale(sale.id).await.unwrap();
    assert_eq!(detail.items[0].name_snapshot, "Leche");
    assert_eq!(detail.items[0].unit_price_cents, 2650);
    assert_eq!(detail.sale.subtotal_cents, 5300);
}

#[tokio::test]
async fn duplicate_normalized_sku_is_rejected() {
    let db = setup().await;
    let first = db
        .products()
        .create(NewProduct {
            sku: Some("sku007".to_string()),
            name: "Siete".to_string(),
            price_cents: 700,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(first.sku, "SKU-00007");

    let err = db
        .products()
        .create(NewProduct {
            sku: Some("SKU-7".to_string()),
            name: "Otro siete".to_string(),
            price_cents: 700,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::DuplicateSku(ref s)) if s == "SKU-00007"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn the_last_unit_is_sold_only_once() {
    let path = std::env::temp_dir().join(format!("caja-last-unit-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let db = Database::new(DbConfig::new(&path).max_connections(4))
        .await
        .unwrap();
    let x = product(&db, "Último", 100, 1).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let sales = db.sales();
        handles.push(tokio::spawn(async move {
            sales.create_sale(cart(&[(x, 1)])).await
        }));
    }

    let mut sold = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(err) => assert!(
                matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })),
                "unexpected error: {err:?}"
            ),
        }
    }

    assert_eq!(sold, 1);
    assert_eq!(stock(&db, x).await, 0);
    assert_ledger_balanced(&db).await;

    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

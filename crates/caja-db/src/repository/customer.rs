//! # Customer Repository
//!
//! Registry of known customers. Sales reference a customer optionally and
//! keep their own copy of the name, so deleting a customer never touches a
//! receipt.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use caja_core::validation::{validate_customer_name, validate_email, validate_search_query};
use caja_core::{CoreError, Customer, CustomerInput};

use crate::error::DbResult;

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(input: &CustomerInput) -> DbResult<()> {
    validate_customer_name(&input.name)?;
    validate_email(input.email.as_deref())?;
    Ok(())
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, input: CustomerInput) -> DbResult<Customer> {
        validate(&input)?;

        let customer: Customer = sqlx::query_as(
            r#"
            INSERT INTO customers (name, email, phone, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, name, email, phone, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(clean(input.email))
        .bind(clean(input.phone))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!(id = customer.id, "Customer created");
        Ok(customer)
    }

    /// All customers by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as(
            "SELECT id, name, email, phone, created_at FROM customers ORDER BY name COLLATE NOCASE, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as(
            "SELECT id, name, email, phone, created_at FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Replaces name, email and phone.
    pub async fn update(&self, id: i64, input: CustomerInput) -> DbResult<Customer> {
        validate(&input)?;

        let customer: Option<Customer> = sqlx::query_as(
            r#"
            UPDATE customers SET name = ?1, email = ?2, phone = ?3
            WHERE id = ?4
            RETURNING id, name, email, phone, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(clean(input.email))
        .bind(clean(input.phone))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let customer = customer.ok_or(CoreError::CustomerNotFound(id))?;
        info!(id, "Customer updated");
        Ok(customer)
    }

    /// Deletes a customer. Their sales stay, with the reference cleared.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CustomerNotFound(id).into());
        }

        info!(id, "Customer deleted");
        Ok(())
    }

    /// Case-insensitive match on name, email or phone.
    pub async fn search(&self, term: &str) -> DbResult<Vec<Customer>> {
        let term = validate_search_query(term)?;
        debug!(term = %term, "Searching customers");

        if term.is_empty() {
            return self.list().await;
        }

        let pattern = format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"));
        let customers = sqlx::query_as(
            r#"
            SELECT id, name, email, phone, created_at
            FROM customers
            WHERE name LIKE ?1 ESCAPE '\'
               OR email LIKE ?1 ESCAPE '\'
               OR phone LIKE ?1 ESCAPE '\'
            ORDER BY name COLLATE NOCASE, id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    fn input(name: &str, email: Option<&str>) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            email: email.map(str::to_string),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let ana = repo.create(input("Ana López", Some("ana@example.com"))).await.unwrap();
        assert_eq!(repo.get_by_id(ana.id).await.unwrap().unwrap().name, "Ana López");

        let renamed = repo
            .update(ana.id, input("Ana María López", None))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Ana María López");
        assert_eq!(renamed.email, None);

        repo.delete(ana.id).await.unwrap();
        assert!(repo.get_by_id(ana.id).await.unwrap().is_none());

        let err = repo.delete(ana.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CustomerNotFound(_))));
    }

    #[tokio::test]
    async fn test_validation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        assert!(repo.create(input("", None)).await.is_err());
        assert!(repo.create(input("Luis", Some("luis-at-example"))).await.is_err());
        assert!(repo.create(input("Luis", Some("  "))).await.unwrap().email.is_none());
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();
        repo.create(input("zoe", None)).await.unwrap();
        repo.create(input("Beto", Some("beto@tienda.mx"))).await.unwrap();
        repo.create(input("alma", None)).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["alma", "Beto", "zoe"]);

        let found = repo.search("TIENDA").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Beto");

        assert_eq!(repo.search("").await.unwrap().len(), 3);
    }
}

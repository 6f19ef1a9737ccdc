use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::Customer;

use super::repo_error::RepositoryError;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn all_customers(&self) -> Result<Vec<Customer>, RepositoryError>;
    async fn get_customer(&self, id: i32) -> Result<Customer, RepositoryError>;
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, RepositoryError>;
    async fn update_customer(
        &self,
        id: i32,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError>;
    async fn delete_customer(&self, id: i32) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub number: Option<String>,
}

/// Fields not supplied are left unchanged.
#[derive(Debug, Clone)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub number: Option<String>,
}

pub struct CustomerRepositoryImpl {
    pool: PgPool,
}

impl CustomerRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for CustomerRepositoryImpl {
    async fn all_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, number, created_at
            FROM customers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    async fn get_customer(&self, id: i32) -> Result<Customer, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, number, created_at
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        customer.ok_or_else(|| RepositoryError::NotFound(format!("customer {id}")))
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, RepositoryError> {
        let created = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (name, number)
            VALUES ($1, $2)
            RETURNING id, name, number, created_at
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.number)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_customer(
        &self,
        id: i32,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError> {
        let updated = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET name = COALESCE($2, name),
                number = COALESCE($3, number)
            WHERE id = $1
            RETURNING id, name, number, created_at
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.number)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| RepositoryError::NotFound(format!("customer {id}")))
    }

    async fn delete_customer(&self, id: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM customers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
                RepositoryError::Conflict("customer is referenced by time entries".to_string())
            }
            _ => RepositoryError::from(err),
        })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("customer {id}")));
        }

        Ok(())
    }
}

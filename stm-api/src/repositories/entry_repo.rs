use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;

use crate::domain::{Code, TimeEntry, TimeOfDay};

use super::repo_error::RepositoryError;

#[async_trait]
pub trait EntryRepository: Send + Sync {
    async fn entries_for_day(
        &self,
        user_id: i32,
        date: Date,
    ) -> Result<Vec<TimeEntry>, RepositoryError>;
    async fn entries_in_range(
        &self,
        user_id: i32,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<TimeEntry>, RepositoryError>;
    async fn get_entry(&self, user_id: i32, id: i32) -> Result<TimeEntry, RepositoryError>;
    async fn create_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry, RepositoryError>;
    async fn update_entry(&self, entry: &UpdateTimeEntry) -> Result<TimeEntry, RepositoryError>;
    async fn delete_entry(&self, user_id: i32, id: i32) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone)]
pub struct NewTimeEntry {
    pub user_id: i32,
    pub date: Date,
    pub code: Code,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub area_or_customer: Option<String>,
    pub customer_id: Option<i32>,
    pub description: Option<String>,
    pub order_number: Option<String>,
    pub todo: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateTimeEntry {
    pub id: i32,
    pub user_id: i32,
    pub code: Code,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub area_or_customer: Option<String>,
    pub customer_id: Option<i32>,
    pub description: Option<String>,
    pub order_number: Option<String>,
    pub todo: bool,
}

pub struct EntryRepositoryImpl {
    pool: PgPool,
}

impl EntryRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntryRepository for EntryRepositoryImpl {
    async fn entries_for_day(
        &self,
        user_id: i32,
        date: Date,
    ) -> Result<Vec<TimeEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, date, code, start_min, end_min,
                   area_or_customer, customer_id, description, order_number, todo, created_at
            FROM time_entries
            WHERE user_id = $1 AND date = $2
            ORDER BY start_min
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn entries_in_range(
        &self,
        user_id: i32,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<TimeEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, date, code, start_min, end_min,
                   area_or_customer, customer_id, description, order_number, todo, created_at
            FROM time_entries
            WHERE user_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date, start_min
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn get_entry(&self, user_id: i32, id: i32) -> Result<TimeEntry, RepositoryError> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, date, code, start_min, end_min,
                   area_or_customer, customer_id, description, order_number, todo, created_at
            FROM time_entries
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        entry.ok_or_else(|| RepositoryError::NotFound(format!("time entry {id}")))
    }

    async fn create_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry, RepositoryError> {
        let created = sqlx::query_as::<_, TimeEntry>(
            r#"
            INSERT INTO time_entries
                (user_id, date, code, start_min, end_min,
                 area_or_customer, customer_id, description, order_number, todo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, date, code, start_min, end_min,
                      area_or_customer, customer_id, description, order_number, todo, created_at
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.date)
        .bind(entry.code.to_string())
        .bind(i32::from(entry.start.minutes()))
        .bind(i32::from(entry.end.minutes()))
        .bind(&entry.area_or_customer)
        .bind(entry.customer_id)
        .bind(&entry.description)
        .bind(&entry.order_number)
        .bind(entry.todo)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_entry(&self, entry: &UpdateTimeEntry) -> Result<TimeEntry, RepositoryError> {
        let updated = sqlx::query_as::<_, TimeEntry>(
            r#"
            UPDATE time_entries
            SET code = $3,
                start_min = $4,
                end_min = $5,
                area_or_customer = $6,
                customer_id = $7,
                description = $8,
                order_number = $9,
                todo = $10
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, date, code, start_min, end_min,
                      area_or_customer, customer_id, description, order_number, todo, created_at
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.code.to_string())
        .bind(i32::from(entry.start.minutes()))
        .bind(i32::from(entry.end.minutes()))
        .bind(&entry.area_or_customer)
        .bind(entry.customer_id)
        .bind(&entry.description)
        .bind(&entry.order_number)
        .bind(entry.todo)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| RepositoryError::NotFound(format!("time entry {}", entry.id)))
    }

    async fn delete_entry(&self, user_id: i32, id: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM time_entries
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("time entry {id}")));
        }

        Ok(())
    }
}

//! Mock repository implementations for testing, backed by in-memory maps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use crate::domain::{Customer, TimeEntry};

use super::{
    CustomerRepository, CustomerUpdate, EntryRepository, NewCustomer, NewTimeEntry,
    RepositoryError, UpdateTimeEntry,
};

#[derive(Clone)]
pub struct MockEntryRepository {
    entries: Arc<RwLock<HashMap<i32, TimeEntry>>>,
    next_id: Arc<AtomicI32>,
}

#[allow(dead_code)]
impl MockEntryRepository {
    pub fn new() -> Self {
        Self::with_entries(vec![])
    }

    pub fn with_entries(entries: Vec<TimeEntry>) -> Self {
        let next_id = entries.iter().map(|entry| entry.id).max().unwrap_or(0) + 1;
        let map = entries.into_iter().map(|entry| (entry.id, entry)).collect();
        Self {
            entries: Arc::new(RwLock::new(map)),
            next_id: Arc::new(AtomicI32::new(next_id)),
        }
    }

    pub fn all(&self) -> Vec<TimeEntry> {
        self.entries.read().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl EntryRepository for MockEntryRepository {
    async fn entries_for_day(
        &self,
        user_id: i32,
        date: Date,
    ) -> Result<Vec<TimeEntry>, RepositoryError> {
        let mut entries: Vec<TimeEntry> = self
            .entries
            .read()
            .unwrap()
            .values()
            .filter(|entry| entry.user_id == user_id && entry.date == date)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.start);
        Ok(entries)
    }

    async fn entries_in_range(
        &self,
        user_id: i32,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<TimeEntry>, RepositoryError> {
        let mut entries: Vec<TimeEntry> = self
            .entries
            .read()
            .unwrap()
            .values()
            .filter(|entry| {
                entry.user_id == user_id
                    && from.map_or(true, |from| entry.date >= from)
                    && to.map_or(true, |to| entry.date <= to)
            })
            .cloned()
            .collect();
        entries.sort_by_key(|entry| (entry.date, entry.start));
        Ok(entries)
    }

    async fn get_entry(&self, user_id: i32, id: i32) -> Result<TimeEntry, RepositoryError> {
        self.entries
            .read()
            .unwrap()
            .get(&id)
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("time entry {id}")))
    }

    async fn create_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = TimeEntry {
            id,
            user_id: entry.user_id,
            date: entry.date,
            code: entry.code,
            start: entry.start,
            end: entry.end,
            area_or_customer: entry.area_or_customer.clone(),
            customer_id: entry.customer_id,
            description: entry.description.clone(),
            order_number: entry.order_number.clone(),
            todo: entry.todo,
            created_at: OffsetDateTime::now_utc(),
        };
        self.entries.write().unwrap().insert(id, created.clone());
        Ok(created)
    }

    async fn update_entry(&self, entry: &UpdateTimeEntry) -> Result<TimeEntry, RepositoryError> {
        let mut entries = self.entries.write().unwrap();
        let stored = entries
            .get_mut(&entry.id)
            .filter(|stored| stored.user_id == entry.user_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("time entry {}", entry.id)))?;

        stored.code = entry.code;
        stored.start = entry.start;
        stored.end = entry.end;
        stored.area_or_customer = entry.area_or_customer.clone();
        stored.customer_id = entry.customer_id;
        stored.description = entry.description.clone();
        stored.order_number = entry.order_number.clone();
        stored.todo = entry.todo;
        Ok(stored.clone())
    }

    async fn delete_entry(&self, user_id: i32, id: i32) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().unwrap();
        match entries.get(&id) {
            Some(entry) if entry.user_id == user_id => {
                entries.remove(&id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound(format!("time entry {id}"))),
        }
    }
}

#[derive(Clone)]
pub struct MockCustomerRepository {
    customers: Arc<RwLock<HashMap<i32, Customer>>>,
    next_id: Arc<AtomicI32>,
}

#[allow(dead_code)]
impl MockCustomerRepository {
    pub fn new() -> Self {
        Self::with_customers(&[])
    }

    pub fn with_customers(customers: &[(i32, &str)]) -> Self {
        let next_id = customers.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        let map = customers
            .iter()
            .map(|(id, name)| {
                (
                    *id,
                    Customer {
                        id: *id,
                        name: name.to_string(),
                        number: None,
                        created_at: OffsetDateTime::now_utc(),
                    },
                )
            })
            .collect();
        Self {
            customers: Arc::new(RwLock::new(map)),
            next_id: Arc::new(AtomicI32::new(next_id)),
        }
    }
}

#[async_trait]
impl CustomerRepository for MockCustomerRepository {
    async fn all_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        let mut customers: Vec<Customer> =
            self.customers.read().unwrap().values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn get_customer(&self, id: i32) -> Result<Customer, RepositoryError> {
        self.customers
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("customer {id}")))
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = Customer {
            id,
            name: customer.name.clone(),
            number: customer.number.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.customers.write().unwrap().insert(id, created.clone());
        Ok(created)
    }

    async fn update_customer(
        &self,
        id: i32,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError> {
        let mut customers = self.customers.write().unwrap();
        let stored = customers
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("customer {id}")))?;

        if let Some(name) = &update.name {
            stored.name = name.clone();
        }
        if let Some(number) = &update.number {
            stored.number = Some(number.clone());
        }
        Ok(stored.clone())
    }

    async fn delete_customer(&self, id: i32) -> Result<(), RepositoryError> {
        self.customers
            .write()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("customer {id}")))
    }
}

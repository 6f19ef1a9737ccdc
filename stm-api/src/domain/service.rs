use std::collections::HashMap;
use std::sync::Arc;

use time::Date;
use tokio::sync::Mutex;

use crate::repositories::{
    CustomerRepository, EntryRepository, NewTimeEntry, UpdateTimeEntry,
};

use super::classifier::{classify, Classification};
use super::conflict::check_overlap;
use super::time_entry::parse_entry_date;
use super::{Code, EntryDraft, EntryError, TimeEntry, TimeOfDay};

/// Validates and persists time entries.
///
/// All writes for one (user, day) are serialized through a per-key mutex so
/// that the read-validate-write sequence cannot interleave with another
/// request for the same day. The database exclusion constraint backs this up;
/// its violations come back as [`EntryError::OverlapDetected`] as well.
pub struct EntryService {
    entries: Arc<dyn EntryRepository>,
    customers: Arc<dyn CustomerRepository>,
    day_locks: Mutex<HashMap<(i32, Date), Arc<Mutex<()>>>>,
}

impl EntryService {
    pub fn new(entries: Arc<dyn EntryRepository>, customers: Arc<dyn CustomerRepository>) -> Self {
        Self {
            entries,
            customers,
            day_locks: Mutex::new(HashMap::new()),
        }
    }

    // The map keeps one mutex per touched (user, day) pair and is never
    // pruned; the key space stays small for realistic traffic.
    async fn day_guard(&self, user_id: i32, date: Date) -> Arc<Mutex<()>> {
        let mut locks = self.day_locks.lock().await;
        locks.entry((user_id, date)).or_default().clone()
    }

    pub async fn list(
        &self,
        user_id: i32,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<TimeEntry>, EntryError> {
        Ok(self.entries.entries_in_range(user_id, from, to).await?)
    }

    pub async fn create(&self, user_id: i32, draft: EntryDraft) -> Result<TimeEntry, EntryError> {
        let (Some(raw_date), Some(raw_code), Some(raw_start), Some(raw_end)) = (
            draft.date.as_deref(),
            draft.code.as_deref(),
            draft.start.as_deref(),
            draft.end.as_deref(),
        ) else {
            return Err(EntryError::MissingFields);
        };

        let start = parse_time(raw_start)?;
        let end = parse_time(raw_end)?;
        if start >= end {
            return Err(EntryError::InvalidRange);
        }

        let code: Code = raw_code
            .parse()
            .map_err(|_| EntryError::InvalidCode(raw_code.to_string()))?;
        let classified = classify(
            code,
            draft.customer_id,
            draft.description.clone(),
            self.customers.as_ref(),
        )
        .await?;

        let date = parse_entry_date(raw_date)
            .map_err(|_| EntryError::InvalidFormat(raw_date.to_string()))?;

        let guard = self.day_guard(user_id, date).await;
        let _locked = guard.lock().await;

        let same_day = self.entries.entries_for_day(user_id, date).await?;
        check_overlap(start, end, &same_day)?;

        let new_entry = NewTimeEntry {
            user_id,
            date,
            code,
            start,
            end,
            area_or_customer: classified.area_or_customer,
            customer_id: classified.customer_id,
            description: classified.description,
            order_number: draft.order_number,
            todo: draft.todo.unwrap_or(false),
        };
        Ok(self.entries.create_entry(&new_entry).await?)
    }

    pub async fn update(
        &self,
        user_id: i32,
        entry_id: i32,
        draft: EntryDraft,
    ) -> Result<TimeEntry, EntryError> {
        let current = self.entries.get_entry(user_id, entry_id).await?;

        let start_override = draft.start.as_deref().map(parse_time).transpose()?;
        let end_override = draft.end.as_deref().map(parse_time).transpose()?;
        let code_override = draft
            .code
            .as_deref()
            .map(|raw| {
                raw.parse::<Code>()
                    .map_err(|_| EntryError::InvalidCode(raw.to_string()))
            })
            .transpose()?;

        let guard = self.day_guard(user_id, current.date).await;
        let _locked = guard.lock().await;

        // Re-read now that the day is locked.
        let current = self.entries.get_entry(user_id, entry_id).await?;

        let start = start_override.unwrap_or(current.start);
        let end = end_override.unwrap_or(current.end);
        if start >= end {
            return Err(EntryError::InvalidRange);
        }

        let description = draft.description.or_else(|| current.description.clone());

        // Derived fields change only when the code or the customer does.
        let (code, classified) = if let Some(code) = code_override {
            let classified =
                classify(code, draft.customer_id, description, self.customers.as_ref()).await?;
            (code, classified)
        } else if let Some(customer_id) = draft.customer_id {
            if current.code != Code::Akn {
                return Err(EntryError::CustomerNotAllowed);
            }
            let classified = classify(
                Code::Akn,
                Some(customer_id),
                description,
                self.customers.as_ref(),
            )
            .await?;
            (current.code, classified)
        } else {
            let classified = Classification {
                area_or_customer: current.area_or_customer.clone(),
                customer_id: current.customer_id,
                description,
            };
            (current.code, classified)
        };

        let same_day = self.entries.entries_for_day(user_id, current.date).await?;
        let others: Vec<TimeEntry> = same_day
            .into_iter()
            .filter(|entry| entry.id != entry_id)
            .collect();
        check_overlap(start, end, &others)?;

        let update = UpdateTimeEntry {
            id: entry_id,
            user_id,
            code,
            start,
            end,
            area_or_customer: classified.area_or_customer,
            customer_id: classified.customer_id,
            description: classified.description,
            order_number: draft.order_number.or(current.order_number),
            todo: draft.todo.unwrap_or(current.todo),
        };
        Ok(self.entries.update_entry(&update).await?)
    }

    pub async fn delete(&self, user_id: i32, entry_id: i32) -> Result<(), EntryError> {
        Ok(self.entries.delete_entry(user_id, entry_id).await?)
    }
}

fn parse_time(raw: &str) -> Result<TimeOfDay, EntryError> {
    raw.parse()
        .map_err(|_| EntryError::InvalidFormat(raw.to_string()))
}

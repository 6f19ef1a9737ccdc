use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::client::{ApiClient, ApiError};
use crate::db::{self, StoreError};
use crate::domain::{Credentials, Customer, EntryPayload, TimeEntry, User};
use crate::replay::{ReplayCoordinator, ReplaySummary};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What happened to a mutating call: applied on the server right away, or
/// parked in the offline queue for replay.
#[derive(Debug, Clone, PartialEq)]
pub enum Written<T> {
    Applied(T),
    Queued { queue_id: i64 },
}

/// Ties the HTTP client, the durable queue and the replay coordinator
/// together. All writes go through one path: direct while the queue is
/// empty, parked behind earlier pending writes otherwise, so replay can
/// never reorder a user's day.
pub struct OfflineClient {
    api: Arc<ApiClient>,
    conn: Arc<Mutex<Connection>>,
    replay: Arc<ReplayCoordinator>,
}

impl OfflineClient {
    pub fn new(base_url: &str, store_path: &str) -> Result<Self, ClientError> {
        let api = Arc::new(ApiClient::new(base_url)?);
        let conn = Arc::new(Mutex::new(db::open_connection(store_path)?));
        let replay = Arc::new(ReplayCoordinator::new(api.clone(), conn.clone()));
        Ok(Self { api, conn, replay })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        Ok(self.api.login(&credentials).await?)
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        Ok(self.api.me().await?)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        Ok(self.api.logout().await?)
    }

    /// Current entries, refreshed from the server when reachable, otherwise
    /// served from the local mirror.
    pub async fn entries(&self) -> Result<Vec<TimeEntry>, ClientError> {
        match self.api.fetch_entries(None, None).await {
            Ok(entries) => {
                let mut conn = self.conn.lock().await;
                db::replace_entries(&mut conn, &entries)?;
                db::set_meta(&conn, "last_synced_at", &now_stamp())?;
                Ok(entries)
            }
            Err(err) if err.is_transport() => {
                tracing::info!("serving entries from the local mirror: {err}");
                let conn = self.conn.lock().await;
                Ok(db::cached_entries(&conn)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn customers(&self) -> Result<Vec<Customer>, ClientError> {
        match self.api.fetch_customers().await {
            Ok(customers) => {
                let mut conn = self.conn.lock().await;
                db::replace_customers(&mut conn, &customers)?;
                db::set_meta(&conn, "last_synced_at", &now_stamp())?;
                Ok(customers)
            }
            Err(err) if err.is_transport() => {
                tracing::info!("serving customers from the local mirror: {err}");
                let conn = self.conn.lock().await;
                Ok(db::cached_customers(&conn)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn create_entry(
        &self,
        payload: &EntryPayload,
    ) -> Result<Written<TimeEntry>, ClientError> {
        let body = serde_json::to_string(payload).map_err(StoreError::from)?;
        if self.has_backlog().await? {
            return Ok(self.park("POST", "/entries", Some(&body)).await?);
        }

        match self.api.create_entry(payload).await {
            Ok(entry) => Ok(Written::Applied(entry)),
            Err(err) if err.is_transport() => {
                tracing::info!("queueing entry create while offline: {err}");
                Ok(self.park("POST", "/entries", Some(&body)).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_entry(
        &self,
        id: i32,
        payload: &EntryPayload,
    ) -> Result<Written<TimeEntry>, ClientError> {
        let body = serde_json::to_string(payload).map_err(StoreError::from)?;
        let path = format!("/entries/{id}");
        if self.has_backlog().await? {
            return Ok(self.park("PUT", &path, Some(&body)).await?);
        }

        match self.api.update_entry(id, payload).await {
            Ok(entry) => Ok(Written::Applied(entry)),
            Err(err) if err.is_transport() => {
                tracing::info!("queueing entry update while offline: {err}");
                Ok(self.park("PUT", &path, Some(&body)).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_entry(&self, id: i32) -> Result<Written<()>, ClientError> {
        let path = format!("/entries/{id}");
        if self.has_backlog().await? {
            return Ok(self.park("DELETE", &path, None).await?);
        }

        match self.api.delete_entry(id).await {
            Ok(()) => Ok(Written::Applied(())),
            Err(err) if err.is_transport() => {
                tracing::info!("queueing entry delete while offline: {err}");
                Ok(self.park("DELETE", &path, None).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Replays queued writes now. Normally driven by
    /// [`ReplayCoordinator::spawn_on_reconnect`].
    pub async fn trigger_replay(&self) -> Result<ReplaySummary, ClientError> {
        Ok(self.replay.trigger().await?)
    }

    pub async fn pending_writes(&self) -> Result<usize, ClientError> {
        Ok(self.replay.queue_len().await?)
    }

    pub fn replay_coordinator(&self) -> Arc<ReplayCoordinator> {
        Arc::clone(&self.replay)
    }

    pub async fn last_synced_at(&self) -> Result<Option<String>, ClientError> {
        let conn = self.conn.lock().await;
        Ok(db::get_meta(&conn, "last_synced_at")?)
    }

    async fn has_backlog(&self) -> Result<bool, ClientError> {
        let conn = self.conn.lock().await;
        Ok(db::queue_len(&conn)? > 0)
    }

    async fn park<T>(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<Written<T>, StoreError> {
        let conn = self.conn.lock().await;
        let queue_id = db::enqueue(&conn, method, path, body)?;
        Ok(Written::Queued { queue_id })
    }
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::EntryService;
use crate::repositories::{CustomerRepository, CustomerRepositoryImpl, EntryRepositoryImpl};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Arc<PgPool>,
    pub entry_service: Arc<EntryService>,
    pub customer_repo: Arc<dyn CustomerRepository>,
}

impl AppState {
    pub fn new(db_pool: PgPool) -> Self {
        let entry_repo = Arc::new(EntryRepositoryImpl::new(db_pool.clone()));
        let customer_repo: Arc<dyn CustomerRepository> =
            Arc::new(CustomerRepositoryImpl::new(db_pool.clone()));
        let entry_service = Arc::new(EntryService::new(entry_repo, customer_repo.clone()));

        Self {
            db_pool: Arc::new(db_pool),
            entry_service,
            customer_repo,
        }
    }
}

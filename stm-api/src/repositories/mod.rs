mod customer_repo;
mod entry_repo;
mod repo_error;
mod user_repo;

#[cfg(test)]
pub(crate) mod mock;

pub use customer_repo::*;
pub use entry_repo::*;
pub use repo_error::RepositoryError;
pub use user_repo::*;

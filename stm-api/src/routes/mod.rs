pub(crate) mod customers;
pub(crate) mod entries;
pub(crate) mod error;
pub(crate) mod export;

pub(crate) use error::ApiError;

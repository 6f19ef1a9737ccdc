pub mod classifier;
mod code;
mod conflict;
mod customer;
mod error;
mod service;
mod time_entry;
mod time_of_day;
mod user;

pub use code::*;
pub use conflict::*;
pub use customer::*;
pub use error::*;
pub use service::*;
pub use time_entry::*;
pub use time_of_day::*;
pub use user::*;

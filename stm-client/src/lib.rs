mod client;
mod domain;
mod offline;
mod replay;

pub mod db;

pub use client::*;
pub use domain::*;
pub use offline::*;
pub use replay::*;

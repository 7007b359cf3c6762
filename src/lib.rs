pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::Config;
pub use db::Database;
pub use error::{DirectoryError, Result};
pub use models::{Client, ClientChanges, ClientFilter, ClientPhone, NewClient, Phone, PhoneUpdate};

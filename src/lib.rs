pub mod cli;
pub mod config;
pub mod database;
pub mod filter;
pub mod models;
pub mod placeholder;
pub mod sql;
pub mod time;
pub mod utils;
pub mod values;

pub use config::Config;
pub use database::Database;
pub use filter::Filter;
pub use models::{TagData, Task};
pub use time::Clock;
pub use utils::Profile;

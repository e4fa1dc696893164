pub mod bot;
pub mod cleaner;
pub mod config;
pub mod db;
pub mod deliver;
pub mod events;
pub mod matcher;
pub mod models;
pub mod schema;

pub use config::Config;

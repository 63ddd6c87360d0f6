// Core of keeperbook: domain model, canonical store abstraction, SQLite
// persistence and league configuration.

pub mod config;
pub mod db;
pub mod model;
pub mod store;

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod news;
pub mod queries;
pub mod routes;
pub mod scoring;
pub mod stats;
pub mod tasks;
pub mod types;
pub mod utils;

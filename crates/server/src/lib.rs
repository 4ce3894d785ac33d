pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod jobs;
pub mod routes;

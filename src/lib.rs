pub mod app;
pub mod client;
pub mod config;
pub mod densified;
pub mod domain;
pub mod error;
pub mod export;
pub mod ingest;
pub mod output;
pub mod records;
pub mod staging;

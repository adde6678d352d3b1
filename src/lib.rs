pub mod analysis;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod source;

//! Request Store
//!
//! Keeps the last-used query parameters per wallet address so an analyze
//! request can be replayed without translating the prompt again.

pub mod dao;
pub mod db;
pub mod error;

pub use dao::AnalyzeRequestStore;
pub use db::StoreDb;
pub use error::{StoreError, StoreResult};

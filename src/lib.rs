//! Offline worker and page behavior layer for a sales website.

pub mod cache;
pub mod config;
pub mod http;
pub mod logging;
pub mod page;
pub mod worker;

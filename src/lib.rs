// src/lib.rs

pub mod config;
pub mod error;

pub mod models {
    pub mod order;
}

pub mod services {
    pub mod supabase;
    pub mod duplicate_grouping;
    pub mod timeline;
    pub mod phone;
    pub mod report;
}

pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, Result};

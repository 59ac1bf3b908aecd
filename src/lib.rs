pub mod audience;
pub mod config;
pub mod content;
pub mod deals;
pub mod display;
pub mod enrichment;
pub mod ordering;
pub mod output;
pub mod recommend;
pub mod server;

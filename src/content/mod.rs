pub mod client;

use serde::Serialize;

pub use client::ContentClient;

/// Content type of every recommendations query.
pub const DEAL_CONTENT_TYPE: &str = "deal";
/// Upper bound on entries per query; pagination happens client-side.
pub const ENTRIES_LIMIT: u32 = 30;
pub const ENTRIES_LOCALE: &str = "en";

/// Query sent to the content API's entries endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntriesQuery {
    pub content_type: &'static str,
    pub limit: u32,
    pub order_by: String,
    pub locale: &'static str,
}

impl EntriesQuery {
    /// Deal entries ranked by `order_by`; type, limit and locale are fixed.
    pub fn deals(order_by: String) -> Self {
        Self {
            content_type: DEAL_CONTENT_TYPE,
            limit: ENTRIES_LIMIT,
            order_by,
            locale: ENTRIES_LOCALE,
        }
    }
}

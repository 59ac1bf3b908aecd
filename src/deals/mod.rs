pub mod formatter;

use serde::{Deserialize, Serialize};

use crate::audience::AudienceType;

pub use formatter::format_deal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub name: String,
    pub logo: String,
}

/// Display-ready record for one recommended deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub name: String,
    pub brands: Vec<Brand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default)]
    pub audience_type: AudienceType,
    pub url: String,
    pub logo: String,
}

impl Deal {
    pub fn brand_names(&self) -> String {
        self.brands
            .iter()
            .map(|b| b.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationData {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
}

/// One page of recommendations as shown to the visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsPage {
    pub audience: AudienceType,
    pub deals: Vec<Deal>,
    pub pagination: PaginationData,
    pub accent_color: String,
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const BRAND_ENRICHMENT_CATEGORY: &str = "brand";

/// A scored visitor signal, e.g. `brand` / `acme` / `5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandEnrichment {
    pub enrichment_category: String,
    pub enrichment_value: String,
    pub enrichment_score: f64,
}

impl BrandEnrichment {
    pub fn brand(value: impl Into<String>, score: f64) -> Self {
        Self {
            enrichment_category: BRAND_ENRICHMENT_CATEGORY.to_string(),
            enrichment_value: value.into(),
            enrichment_score: score,
        }
    }

    pub fn is_brand(&self) -> bool {
        self.enrichment_category == BRAND_ENRICHMENT_CATEGORY
    }
}

/// Turns `brand_<id>` visitor scores into brand enrichments, keeping the
/// mapping's insertion order. Non-numeric scores are skipped.
pub fn extract_brand_enrichments(scores: &Map<String, Value>) -> Vec<BrandEnrichment> {
    let prefix = format!("{BRAND_ENRICHMENT_CATEGORY}_");
    scores
        .iter()
        .filter(|(key, _)| key.starts_with(&prefix))
        .filter_map(|(key, score)| {
            let score = score.as_f64()?;
            Some(BrandEnrichment::brand(key.replacen(&prefix, "", 1), score))
        })
        .collect()
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::audience::AudienceType;
use crate::enrichment::{extract_brand_enrichments, BrandEnrichment};

/// Local-storage key the tracking script persists the visitor record under.
pub const VISITOR_STORAGE_KEY: &str = "ufvisitor";

/// Strength added per visit to a tracked enrichment.
pub const DEFAULT_ENRICHMENT_STRENGTH: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitorSignals {
    pub audience: AudienceType,
    pub enrichments: Vec<BrandEnrichment>,
}

impl Default for VisitorSignals {
    fn default() -> Self {
        Self {
            audience: AudienceType::DEFAULT,
            enrichments: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisitorRecord {
    #[serde(default)]
    visitor_data: Option<VisitorData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisitorData {
    #[serde(default)]
    session_scores: Option<Map<String, Value>>,
    #[serde(default)]
    scores: Option<Map<String, Value>>,
}

/// Picks the regional audience with the strictly higher session score.
pub fn resolve_audience(session_scores: &Map<String, Value>) -> AudienceType {
    let american = score_of(session_scores, AudienceType::American);
    let spanish = score_of(session_scores, AudienceType::Spanish);

    if american > spanish {
        AudienceType::American
    } else if spanish > american {
        AudienceType::Spanish
    } else {
        AudienceType::DEFAULT
    }
}

/// Resolves audience and brand enrichments from the raw stored visitor record.
///
/// A missing or unreadable record yields the default audience with no
/// enrichments; parse failures are only logged.
pub fn resolve_visitor(raw: Option<&str>) -> VisitorSignals {
    let Some(raw) = raw else {
        debug!("no stored visitor record, using default audience");
        return VisitorSignals::default();
    };

    let record: VisitorRecord = match serde_json::from_str(raw) {
        Ok(record) => record,
        Err(err) => {
            warn!("error parsing {VISITOR_STORAGE_KEY} data: {err}");
            return VisitorSignals::default();
        }
    };

    let data = record.visitor_data.unwrap_or_default();
    let session_scores = data.session_scores.unwrap_or_default();
    let scores = data.scores.unwrap_or_default();

    VisitorSignals {
        audience: resolve_audience(&session_scores),
        enrichments: extract_brand_enrichments(&scores),
    }
}

/// Adds `strength` to `visitorData.scores["{category}_{value}"]` and returns
/// the updated record.
///
/// An absent or malformed record starts from an empty one. Existing keys keep
/// their position; a new score is appended. A blank category or value leaves
/// the scores untouched.
pub fn record_enrichment(raw: Option<&str>, category: &str, value: &str, strength: f64) -> String {
    let mut record = raw
        .and_then(|raw| match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(record)) => Some(record),
            Ok(_) => {
                warn!("{VISITOR_STORAGE_KEY} data is not an object, starting a new record");
                None
            }
            Err(err) => {
                warn!("error parsing {VISITOR_STORAGE_KEY} data: {err}");
                None
            }
        })
        .unwrap_or_default();

    let category = category.trim();
    let value = value.trim();
    if category.is_empty() || value.is_empty() {
        debug!("enrichment category or value missing, nothing recorded");
        return Value::Object(record).to_string();
    }

    let data_slot = record.entry("visitorData").or_insert(Value::Null);
    let mut visitor_data = take_object(data_slot);
    let scores_slot = visitor_data.entry("scores").or_insert(Value::Null);
    let mut scores = take_object(scores_slot);

    let key = format!("{category}_{value}");
    let current = scores.get(&key).and_then(Value::as_f64).unwrap_or(0.0);
    scores.insert(key, score_value(current + strength));

    *scores_slot = Value::Object(scores);
    *data_slot = Value::Object(visitor_data);
    Value::Object(record).to_string()
}

/// Takes the object out of `slot`; anything else becomes an empty object.
fn take_object(slot: &mut Value) -> Map<String, Value> {
    match std::mem::take(slot) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn score_value(score: f64) -> Value {
    if score.fract() == 0.0 && score.abs() < i64::MAX as f64 {
        Value::from(score as i64)
    } else {
        Value::from(score)
    }
}

fn score_of(scores: &Map<String, Value>, audience: AudienceType) -> f64 {
    scores
        .get(audience.as_slug())
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

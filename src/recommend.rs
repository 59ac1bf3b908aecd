use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::audience::AudienceType;
use crate::config::ContentConfig;
use crate::content::{ContentClient, EntriesQuery};
use crate::deals::{format_deal, Deal};
use crate::enrichment::BrandEnrichment;
use crate::ordering::build_order_by_clause;

/// Validated body of a recommendations request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub user_type: AudienceType,
    pub enrichments: Vec<BrandEnrichment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("invalid request body ({} issue(s))", .0.len())]
    Validation(Vec<ValidationIssue>),
    #[error("content API credentials are not configured")]
    MissingConfiguration,
    #[error("content query failed: {0:#}")]
    Upstream(#[from] anyhow::Error),
}

impl RecommendationRequest {
    /// Checks the raw payload field by field and reports every problem found.
    pub fn validate(payload: &Value) -> Result<Self, RecommendationError> {
        let Some(body) = payload.as_object() else {
            return Err(RecommendationError::Validation(vec![ValidationIssue::new(
                "",
                "expected object",
            )]));
        };

        let mut issues = Vec::new();

        let user_type = match body.get("userType") {
            Some(Value::String(raw)) => match AudienceType::from_str(raw) {
                Ok(audience) => Some(audience),
                Err(_) => {
                    issues.push(ValidationIssue::new(
                        "userType",
                        format!(
                            "expected one of {}, received '{raw}'",
                            AudienceType::ALL.map(|a| a.as_slug()).join(" | ")
                        ),
                    ));
                    None
                }
            },
            Some(_) => {
                issues.push(ValidationIssue::new("userType", "expected string"));
                None
            }
            None => {
                issues.push(ValidationIssue::new("userType", "required"));
                None
            }
        };

        let mut enrichments = Vec::new();
        match body.get("enrichments") {
            Some(Value::Array(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    if let Some(enrichment) = validate_enrichment(idx, item, &mut issues) {
                        enrichments.push(enrichment);
                    }
                }
            }
            Some(_) => issues.push(ValidationIssue::new("enrichments", "expected array")),
            None => issues.push(ValidationIssue::new("enrichments", "required")),
        }

        match user_type {
            Some(user_type) if issues.is_empty() => Ok(Self {
                user_type,
                enrichments,
            }),
            _ => Err(RecommendationError::Validation(issues)),
        }
    }
}

fn validate_enrichment(
    idx: usize,
    item: &Value,
    issues: &mut Vec<ValidationIssue>,
) -> Option<BrandEnrichment> {
    let Some(object) = item.as_object() else {
        issues.push(ValidationIssue::new(
            format!("enrichments.{idx}"),
            "expected object",
        ));
        return None;
    };

    let mut text_field = |field: &str| match object.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => {
            issues.push(ValidationIssue::new(
                format!("enrichments.{idx}.{field}"),
                "expected string",
            ));
            None
        }
    };
    let category = text_field("enrichmentCategory");
    let value = text_field("enrichmentValue");

    let score = match object.get("enrichmentScore").and_then(Value::as_f64) {
        Some(score) => Some(score),
        None => {
            issues.push(ValidationIssue::new(
                format!("enrichments.{idx}.enrichmentScore"),
                "expected number",
            ));
            None
        }
    };

    Some(BrandEnrichment {
        enrichment_category: category?,
        enrichment_value: value?,
        enrichment_score: score?,
    })
}

/// Validates the payload, queries the content API once and formats every
/// returned entry. All-or-nothing: any upstream failure fails the request.
pub async fn handle_recommendations(
    config: &ContentConfig,
    payload: &Value,
) -> Result<Vec<Deal>, RecommendationError> {
    let request = RecommendationRequest::validate(payload)?;
    recommend(config, &request).await
}

pub async fn recommend(
    config: &ContentConfig,
    request: &RecommendationRequest,
) -> Result<Vec<Deal>, RecommendationError> {
    let Some(credentials) = config.credentials() else {
        error!("missing required environment variables for the content API");
        return Err(RecommendationError::MissingConfiguration);
    };

    let order_by = build_order_by_clause(request.user_type, &request.enrichments);
    let client = ContentClient::new(config, credentials);
    let entries = client
        .get_entries(&EntriesQuery::deals(order_by))
        .await?;

    let deals = entries.iter().map(format_deal).collect::<Vec<_>>();
    info!(
        audience = %request.user_type,
        enrichments = request.enrichments.len(),
        deals = deals.len(),
        "served recommendations"
    );
    Ok(deals)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::audience::AudienceType;
    use crate::config::{Config, ContentConfig};
    use crate::enrichment::BrandEnrichment;
    use crate::recommend::{handle_recommendations, RecommendationError, RecommendationRequest};

    fn configured(base_url: String) -> ContentConfig {
        ContentConfig {
            api_base_url: base_url,
            project_id: Some("proj-1".to_string()),
            api_key: Some("key-1".to_string()),
            ..ContentConfig::default()
        }
    }

    fn issue_paths(err: RecommendationError) -> Vec<String> {
        match err {
            RecommendationError::Validation(issues) => {
                issues.into_iter().map(|issue| issue.path).collect()
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_payload() {
        let payload = json!({
            "userType": "spanishsignal",
            "enrichments": [
                { "enrichmentCategory": "brand", "enrichmentValue": "acme", "enrichmentScore": 5 }
            ]
        });
        let request = RecommendationRequest::validate(&payload).expect("valid");
        assert_eq!(request.user_type, AudienceType::Spanish);
        assert_eq!(request.enrichments, vec![BrandEnrichment::brand("acme", 5.0)]);
    }

    #[test]
    fn rejects_unknown_audience_and_missing_enrichments() {
        let paths = issue_paths(
            RecommendationRequest::validate(&json!({ "userType": "unknown", "enrichments": [] }))
                .expect_err("unknown audience"),
        );
        assert_eq!(paths, vec!["userType"]);

        let paths = issue_paths(
            RecommendationRequest::validate(&json!({ "userType": "everyone" }))
                .expect_err("missing enrichments"),
        );
        assert_eq!(paths, vec!["enrichments"]);
    }

    #[test]
    fn reports_each_bad_enrichment_field() {
        let payload = json!({
            "userType": "everyone",
            "enrichments": [
                { "enrichmentCategory": "brand", "enrichmentValue": "acme", "enrichmentScore": "5" },
                { "enrichmentValue": 3, "enrichmentScore": 1 },
                "brand_acme"
            ]
        });
        let paths = issue_paths(RecommendationRequest::validate(&payload).expect_err("invalid"));
        assert_eq!(
            paths,
            vec![
                "enrichments.0.enrichmentScore",
                "enrichments.1.enrichmentCategory",
                "enrichments.1.enrichmentValue",
                "enrichments.2",
            ]
        );
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = ContentConfig {
            api_base_url: server.uri(),
            ..ContentConfig::default()
        };
        let payload = json!({ "userType": "everyone", "enrichments": [] });
        let err = handle_recommendations(&config, &payload)
            .await
            .expect_err("no credentials");
        assert!(matches!(err, RecommendationError::MissingConfiguration));
    }

    #[tokio::test]
    async fn formats_entries_sorted_by_computed_clause() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param(
                "orderBy",
                "boost|fields.programmaticPersonalizationAudience:americansignal:3\
                 |fields.programmaticPersonalizationAudience:everyone:2\
                 |fields.programmaticPersonalizationEnrichmentScore:acme:5_DSC",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [
                    { "entry": { "fields": {
                        "displayName": { "value": "Acme week" },
                        "programmaticPersonalizationAudience": { "value": "americansignal" }
                    } } },
                    { "entry": {} }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = json!({
            "userType": "americansignal",
            "enrichments": [
                { "enrichmentCategory": "brand", "enrichmentValue": "acme", "enrichmentScore": 5 }
            ]
        });
        let deals = handle_recommendations(&configured(server.uri()), &payload)
            .await
            .expect("deals");
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].name, "Acme week");
        assert_eq!(deals[0].audience_type, AudienceType::American);
        assert_eq!(deals[1].name, "Unknown Name");
    }

    #[tokio::test]
    async fn config_file_cannot_change_the_entries_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("filters.type[eq]", "deal"))
            .and(query_param("limit", "30"))
            .and(query_param("locale", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "entries": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let file = format!(
            r#"
[content]
api_base_url = "{}"
content_type = "article"
limit = 500
locale = "fr"
"#,
            server.uri()
        );
        let mut config: Config = toml::from_str(&file).expect("config parses");
        config.content.project_id = Some("proj-1".to_string());
        config.content.api_key = Some("key-1".to_string());

        let payload = json!({ "userType": "everyone", "enrichments": [] });
        let deals = handle_recommendations(&config.content, &payload)
            .await
            .expect("deals");
        assert!(deals.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_is_all_or_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let payload = json!({ "userType": "everyone", "enrichments": [] });
        let err = handle_recommendations(&configured(server.uri()), &payload)
            .await
            .expect_err("upstream down");
        assert!(matches!(err, RecommendationError::Upstream(_)));
    }
}

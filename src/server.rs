use std::net::SocketAddr;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::audience::AudienceType;
use crate::config::Config;
use crate::deals::Deal;
use crate::recommend::{handle_recommendations, RecommendationError, ValidationIssue};

#[derive(Clone)]
pub struct ApiState {
    config: Config,
}

impl ApiState {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationIssue>>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: &'static str,
    details: Option<Vec<ValidationIssue>>,
}

impl ApiError {
    fn bad_request(details: Vec<ValidationIssue>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid request body",
            details: Some(details),
        }
    }

    fn configuration() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Server configuration error",
            details: None,
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal Server Error",
            details: None,
        }
    }
}

impl From<RecommendationError> for ApiError {
    fn from(err: RecommendationError) -> Self {
        match err {
            RecommendationError::Validation(issues) => Self::bad_request(issues),
            RecommendationError::MissingConfiguration => Self::configuration(),
            RecommendationError::Upstream(err) => {
                error!("error in recommendations route: {err:#}");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct AudienceInfo {
    slug: &'static str,
    label: &'static str,
    icon: &'static str,
    accent_color: &'static str,
    order_by: &'static str,
    default: bool,
}

pub fn build_app(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/audiences", get(audiences))
        .route("/api/recommendations", post(recommendations))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    if config.content.credentials().is_none() {
        error!("content API credentials missing; recommendation requests will fail");
    }
    let app = build_app(ApiState::new(config));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("recommendations API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn audiences() -> Json<Vec<AudienceInfo>> {
    Json(
        AudienceType::ALL
            .iter()
            .map(|audience| AudienceInfo {
                slug: audience.as_slug(),
                label: audience.label(),
                icon: audience.icon(),
                accent_color: audience.accent_color(),
                order_by: audience.base_boost_clause(),
                default: *audience == AudienceType::DEFAULT,
            })
            .collect(),
    )
}

async fn recommendations(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<Vec<Deal>>, ApiError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|err| {
        ApiError::bad_request(vec![ValidationIssue {
            path: String::new(),
            message: format!("malformed JSON: {err}"),
        }])
    })?;
    let deals = handle_recommendations(&state.config.content, &payload).await?;
    Ok(Json(deals))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::Config;
    use crate::server::{build_app, ApiState};

    fn config_with_credentials(base_url: String) -> Config {
        let mut config = Config::default();
        config.content.api_base_url = base_url;
        config.content.project_id = Some("proj-1".to_string());
        config.content.api_key = Some("super-secret-key".to_string());
        config
    }

    async fn post_recommendations(config: Config, body: String) -> (StatusCode, Value) {
        let response = build_app(ApiState::new(config))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/recommendations")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&bytes).expect("json body");
        (status, json)
    }

    #[tokio::test]
    async fn unknown_audience_is_bad_request() {
        let body = json!({ "userType": "unknown", "enrichments": [] }).to_string();
        let (status, json) = post_recommendations(Config::default(), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid request body");
        assert_eq!(json["details"][0]["path"], "userType");
    }

    #[tokio::test]
    async fn missing_enrichments_and_malformed_json_are_bad_requests() {
        let body = json!({ "userType": "everyone" }).to_string();
        let (status, _) = post_recommendations(Config::default(), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = post_recommendations(Config::default(), "{oops".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["details"].is_array());
    }

    #[tokio::test]
    async fn missing_credentials_is_opaque_server_error() {
        let body = json!({ "userType": "everyone", "enrichments": [] }).to_string();
        let (status, json) = post_recommendations(Config::default(), body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({ "error": "Server configuration error" }));
    }

    #[tokio::test]
    async fn upstream_failure_is_opaque_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let body = json!({ "userType": "everyone", "enrichments": [] }).to_string();
        let (status, json) =
            post_recommendations(config_with_credentials(server.uri()), body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({ "error": "Internal Server Error" }));
        assert!(!json.to_string().contains("super-secret-key"));
    }

    #[tokio::test]
    async fn returns_formatted_deals() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [
                    { "entry": { "fields": {
                        "displayName": { "value": "Spring deal" },
                        "url": { "value": { "path": "/spring" } },
                        "programmaticPersonalizationAudience": { "value": "spanishsignal" }
                    } } }
                ]
            })))
            .mount(&server)
            .await;

        let body = json!({
            "userType": "spanishsignal",
            "enrichments": [
                { "enrichmentCategory": "brand", "enrichmentValue": "acme", "enrichmentScore": 1 }
            ]
        })
        .to_string();
        let (status, json) =
            post_recommendations(config_with_credentials(server.uri()), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!([{
                "name": "Spring deal",
                "brands": [],
                "audienceType": "spanishsignal",
                "url": "/spring",
                "logo": "#"
            }])
        );
    }

    #[tokio::test]
    async fn lists_audiences() {
        let response = build_app(ApiState::new(Config::default()))
            .oneshot(
                Request::builder()
                    .uri("/api/audiences")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: Value = serde_json::from_slice(&bytes).expect("json body");
        let items = json.as_array().expect("array");
        assert_eq!(items.len(), 3);
        assert_eq!(items[2]["slug"], "everyone");
        assert_eq!(items[2]["default"], true);
    }
}

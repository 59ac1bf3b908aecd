//! Client-side view of the recommendations: resolve the visitor, fetch once,
//! then paginate the fetched list locally.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::audience::{resolve_visitor, AudienceType, VisitorSignals};
use crate::config::ContentConfig;
use crate::deals::{Deal, PaginationData, RecommendationsPage};
use crate::recommend::{recommend, RecommendationRequest};

pub const DEFAULT_DEALS_PER_PAGE: usize = 3;

/// Anything able to answer a recommendations request.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn fetch(&self, request: &RecommendationRequest) -> Result<Vec<Deal>>;
}

/// Calls a running server's `/api/recommendations` endpoint.
pub struct HttpRecommendationSource {
    client: Client,
    endpoint: String,
}

impl HttpRecommendationSource {
    pub fn new(server_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/api/recommendations", server_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl RecommendationSource for HttpRecommendationSource {
    async fn fetch(&self, request: &RecommendationRequest) -> Result<Vec<Deal>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .with_context(|| format!("failed POST request: {}", self.endpoint))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "Error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            ));
        }
        response
            .json::<Vec<Deal>>()
            .await
            .with_context(|| format!("invalid recommendations body: {}", self.endpoint))
    }
}

/// Runs the request handler in-process against the content API.
pub struct DirectRecommendationSource {
    config: ContentConfig,
}

impl DirectRecommendationSource {
    pub fn new(config: ContentConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RecommendationSource for DirectRecommendationSource {
    async fn fetch(&self, request: &RecommendationRequest) -> Result<Vec<Deal>> {
        Ok(recommend(&self.config, request).await?)
    }
}

/// Result of the single fetch; a failure still renders as an empty list.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Loaded(Vec<Deal>),
    Failed(String),
}

impl FetchOutcome {
    pub fn deals(&self) -> &[Deal] {
        match self {
            Self::Loaded(deals) => deals,
            Self::Failed(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState {
    ResolvingAudience,
    Loading(VisitorSignals),
    Ready {
        signals: VisitorSignals,
        outcome: FetchOutcome,
        current_page: usize,
    },
}

pub struct DisplayController {
    deals_per_page: usize,
    state: DisplayState,
}

impl DisplayController {
    pub fn new(deals_per_page: usize) -> Self {
        Self {
            deals_per_page: deals_per_page.max(1),
            state: DisplayState::ResolvingAudience,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Resolves the visitor from the stored record; never blocks on bad data.
    pub fn resolve(&mut self, stored_record: Option<&str>) -> VisitorSignals {
        let signals = resolve_visitor(stored_record);
        info!(
            audience = %signals.audience,
            enrichments = signals.enrichments.len(),
            "resolved visitor"
        );
        self.state = DisplayState::Loading(signals.clone());
        signals
    }

    /// Issues the one fetch for this session and lands on page 1.
    pub async fn load(&mut self, source: &dyn RecommendationSource) {
        let signals = match &self.state {
            DisplayState::ResolvingAudience => resolve_visitor(None),
            DisplayState::Loading(signals) | DisplayState::Ready { signals, .. } => {
                signals.clone()
            }
        };
        let request = RecommendationRequest {
            user_type: signals.audience,
            enrichments: signals.enrichments.clone(),
        };

        let outcome = match source.fetch(&request).await {
            Ok(deals) => FetchOutcome::Loaded(deals),
            Err(err) => {
                warn!("error fetching recommendations: {err:#}");
                FetchOutcome::Failed(format!("{err:#}"))
            }
        };
        self.state = DisplayState::Ready {
            signals,
            outcome,
            current_page: 1,
        };
    }

    pub fn outcome(&self) -> Option<&FetchOutcome> {
        match &self.state {
            DisplayState::Ready { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// Switches to a 1-based page of the already fetched list. Page 0 and
    /// pages past the end render empty.
    pub fn go_to_page(&mut self, page: usize) {
        if let DisplayState::Ready { current_page, .. } = &mut self.state {
            *current_page = page;
        }
    }

    pub fn total_pages(&self) -> usize {
        match &self.state {
            DisplayState::Ready { outcome, .. } => {
                outcome.deals().len().div_ceil(self.deals_per_page)
            }
            _ => 0,
        }
    }

    /// The current page view, or `None` until the fetch has completed.
    pub fn page(&self) -> Option<RecommendationsPage> {
        let DisplayState::Ready {
            signals,
            outcome,
            current_page,
        } = &self.state
        else {
            return None;
        };

        let all = outcome.deals();
        let deals = page_slice(all, *current_page, self.deals_per_page).to_vec();
        let accent_color = dominant_audience(&deals).accent_color().to_string();
        Some(RecommendationsPage {
            audience: signals.audience,
            pagination: PaginationData {
                current_page: *current_page,
                total_pages: all.len().div_ceil(self.deals_per_page),
                total_count: all.len(),
            },
            deals,
            accent_color,
        })
    }
}

/// Slice for a 1-based page; out of range pages, including 0, are empty.
pub fn page_slice(deals: &[Deal], page: usize, per_page: usize) -> &[Deal] {
    if page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(per_page);
    if start >= deals.len() {
        return &[];
    }
    let end = start.saturating_add(per_page).min(deals.len());
    &deals[start..end]
}

/// Most common audience among `deals`.
///
/// Exact ties go to the later audience in American, Spanish, Everyone order,
/// so an empty page resolves to Everyone.
pub fn dominant_audience(deals: &[Deal]) -> AudienceType {
    const TALLY_ORDER: [AudienceType; 3] = [
        AudienceType::American,
        AudienceType::Spanish,
        AudienceType::Everyone,
    ];

    let mut counts = [0usize; 3];
    for deal in deals {
        if let Some(idx) = TALLY_ORDER.iter().position(|a| *a == deal.audience_type) {
            counts[idx] += 1;
        }
    }

    let mut best = 0;
    for idx in 1..TALLY_ORDER.len() {
        if counts[idx] >= counts[best] {
            best = idx;
        }
    }
    TALLY_ORDER[best]
}

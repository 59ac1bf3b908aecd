pub mod resolver;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use resolver::{
    record_enrichment, resolve_audience, resolve_visitor, VisitorSignals, DEFAULT_ENRICHMENT_STRENGTH,
    VISITOR_STORAGE_KEY,
};

/// Content field holding a deal's audience classification.
pub const AUDIENCE_ENTRY_FIELD: &str = "programmaticPersonalizationAudience";

/// Visitor classification used to bias deal ranking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AudienceType {
    #[serde(rename = "spanishsignal")]
    Spanish,
    #[serde(rename = "americansignal")]
    American,
    #[serde(rename = "everyone")]
    Everyone,
}

impl AudienceType {
    pub const ALL: [AudienceType; 3] = [
        AudienceType::Spanish,
        AudienceType::American,
        AudienceType::Everyone,
    ];

    pub const DEFAULT: AudienceType = AudienceType::Everyone;

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Spanish => "spanishsignal",
            Self::American => "americansignal",
            Self::Everyone => "everyone",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Spanish => "Spanishsignal",
            Self::American => "Americansignal",
            Self::Everyone => "Everyone",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Spanish => "🇪🇸",
            Self::American => "🇺🇸",
            Self::Everyone => "🌐",
        }
    }

    /// Accent colour for cards and the active page marker.
    pub fn accent_color(&self) -> &'static str {
        match self {
            Self::Spanish => "#3730A3",
            Self::American => "#166434",
            Self::Everyone => "#991B1B",
        }
    }

    /// Weighted audience boosts, always terminated by the `_DSC` sort marker.
    pub fn base_boost_clause(&self) -> &'static str {
        match self {
            Self::American => concat!(
                "boost",
                "|fields.programmaticPersonalizationAudience:americansignal:3",
                "|fields.programmaticPersonalizationAudience:everyone:2_DSC",
            ),
            Self::Spanish => concat!(
                "boost",
                "|fields.programmaticPersonalizationAudience:spanishsignal:3",
                "|fields.programmaticPersonalizationAudience:everyone:2_DSC",
            ),
            Self::Everyone => "boost|fields.programmaticPersonalizationAudience:everyone:3_DSC",
        }
    }
}

impl Default for AudienceType {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Display for AudienceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown audience: {0}")]
pub struct AudienceParseError(pub String);

impl FromStr for AudienceType {
    type Err = AudienceParseError;

    /// Exact slug match; the wire format is case sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spanishsignal" => Ok(Self::Spanish),
            "americansignal" => Ok(Self::American),
            "everyone" => Ok(Self::Everyone),
            _ => Err(AudienceParseError(s.to_string())),
        }
    }
}

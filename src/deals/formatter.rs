use std::str::FromStr;

use serde_json::Value;

use crate::audience::{AudienceType, AUDIENCE_ENTRY_FIELD};
use crate::deals::{Brand, Deal};

const UNKNOWN_NAME: &str = "Unknown Name";
const UNKNOWN_BRAND: &str = "Unknown Brand";
const MISSING_LINK: &str = "#";

/// Maps one raw content entry (`{"entry": {...}}`) onto a [`Deal`].
///
/// Total over arbitrarily sparse input: every missing or mistyped field falls
/// back to its default instead of failing.
pub fn format_deal(raw: &Value) -> Deal {
    let entry = raw.get("entry").unwrap_or(&Value::Null);

    let name = string_at(entry, &["fields", "displayName", "value"])
        .unwrap_or(UNKNOWN_NAME)
        .to_string();
    let url = string_at(entry, &["fields", "url", "value", "path"])
        .unwrap_or(MISSING_LINK)
        .to_string();
    let logo = first_asset_url(entry, "responsiveImage")
        .unwrap_or(MISSING_LINK)
        .to_string();

    let brands = value_at(entry, &["fields", "brands", "value"])
        .and_then(Value::as_array)
        .map(|items| items.iter().map(format_brand).collect())
        .unwrap_or_default();

    let audience = string_at(
        entry,
        &["fields", "audience", "value", "entry", "fields", "name", "value"],
    )
    .map(str::to_string);

    let audience_type = string_at(entry, &["fields", AUDIENCE_ENTRY_FIELD, "value"])
        .and_then(|raw| AudienceType::from_str(raw).ok())
        .unwrap_or(AudienceType::DEFAULT);

    Deal {
        name,
        brands,
        audience,
        audience_type,
        url,
        logo,
    }
}

fn format_brand(raw: &Value) -> Brand {
    let entry = raw.get("entry").unwrap_or(&Value::Null);
    Brand {
        name: string_at(entry, &["fields", "displayname", "value"])
            .unwrap_or(UNKNOWN_BRAND)
            .to_string(),
        logo: first_asset_url(entry, "brandLogo")
            .unwrap_or(MISSING_LINK)
            .to_string(),
    }
}

/// Asset parameters hold a list of assets; only the first one is shown.
fn first_asset_url<'a>(entry: &'a Value, field: &str) -> Option<&'a str> {
    let first = value_at(entry, &["fields", field, "value"])?
        .as_array()?
        .first()?;
    string_at(first, &["fields", "url", "value"])
}

fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

fn string_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    value_at(value, path)?.as_str()
}

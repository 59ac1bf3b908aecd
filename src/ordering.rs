use crate::audience::AudienceType;
use crate::enrichment::BrandEnrichment;

/// Content field holding per-brand enrichment scores on a deal.
pub const BRANDS_ENTRY_FIELD: &str = "programmaticPersonalizationEnrichmentScore";

const CLAUSE_SEPARATOR: &str = "|";
const DESCENDING_MARKER: &str = "_DSC";

/// Builds the `orderBy` expression for the entries query.
///
/// Brand boosts are spliced in before the single trailing `_DSC` marker, in
/// the order they were given. Scores are passed through unvalidated.
pub fn build_order_by_clause(audience: AudienceType, enrichments: &[BrandEnrichment]) -> String {
    let audience_boost = audience.base_boost_clause();

    let brand_clauses = enrichments
        .iter()
        .filter(|e| e.is_brand())
        .map(|e| {
            format!(
                "fields.{BRANDS_ENTRY_FIELD}:{}:{}",
                e.enrichment_value,
                format_score(e.enrichment_score)
            )
        })
        .collect::<Vec<_>>();

    if brand_clauses.is_empty() {
        return audience_boost.to_string();
    }

    let base = audience_boost.replacen(DESCENDING_MARKER, "", 1);
    format!(
        "{base}{CLAUSE_SEPARATOR}{}{DESCENDING_MARKER}",
        brand_clauses.join(CLAUSE_SEPARATOR)
    )
}

/// Renders a score the way the content API's JavaScript callers print
/// numbers: shortest round-trip digits, positional between 1e-7 and 1e21,
/// `d.ddde±x` outside that range, and `0` for negative zero.
pub fn format_score(score: f64) -> String {
    if score.is_nan() {
        return "NaN".to_string();
    }
    if score.is_infinite() {
        return if score > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if score == 0.0 {
        return "0".to_string();
    }
    if score < 0.0 {
        return format!("-{}", format_score(-score));
    }

    // `{:e}` yields the shortest round-trip digits as `d.ddde<exp>`.
    let sci = format!("{score:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits = mantissa.replace('.', "");
    let k = digits.len() as i32;
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;

    if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{int_part}.{frac_part}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{lead}e{sign}{}", (n - 1).abs())
        } else {
            format!("{lead}.{rest}e{sign}{}", (n - 1).abs())
        }
    }
}

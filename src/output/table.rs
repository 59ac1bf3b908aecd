use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::audience::{AudienceType, VisitorSignals};
use crate::deals::RecommendationsPage;

fn audience_color(audience: AudienceType) -> Color {
    match audience {
        AudienceType::Spanish => Color::Rgb {
            r: 0x37,
            g: 0x30,
            b: 0xA3,
        },
        AudienceType::American => Color::Rgb {
            r: 0x16,
            g: 0x64,
            b: 0x34,
        },
        AudienceType::Everyone => Color::Rgb {
            r: 0x99,
            g: 0x1B,
            b: 0x1B,
        },
    }
}

pub fn render_page_table(page: &RecommendationsPage) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "Deal", "Audience", "Brands", "URL"]);

    for deal in &page.deals {
        table.add_row(Row::from(vec![
            Cell::new(deal.audience_type.icon()),
            Cell::new(&deal.name),
            Cell::new(deal.audience.as_deref().unwrap_or("-"))
                .fg(audience_color(deal.audience_type)),
            Cell::new(if deal.brands.is_empty() {
                "-".to_string()
            } else {
                deal.brand_names()
            }),
            Cell::new(&deal.url),
        ]));
    }

    let mut out = table.to_string();
    out.push('\n');
    out.push_str(&render_pager(page));
    out
}

/// Page strip such as `1 [2] 3`; omitted for single-page results.
pub fn render_pager(page: &RecommendationsPage) -> String {
    let pagination = &page.pagination;
    if pagination.total_count == 0 {
        return "No deals to show".to_string();
    }
    let summary = format!(
        "{} deals for {} {} (accent {})",
        pagination.total_count,
        page.audience.icon(),
        page.audience.label(),
        page.accent_color
    );
    if pagination.total_pages <= 1 {
        return summary;
    }
    let pages = (1..=pagination.total_pages)
        .map(|n| {
            if n == pagination.current_page {
                format!("[{n}]")
            } else {
                n.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{summary}\npage {pages}")
}

pub fn render_signals_table(signals: &VisitorSignals) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Signal", "Value", "Score"]);

    table.add_row(Row::from(vec![
        Cell::new("audience"),
        Cell::new(format!("{} {}", signals.audience.icon(), signals.audience))
            .fg(audience_color(signals.audience)),
        Cell::new("-"),
    ]));
    for enrichment in &signals.enrichments {
        table.add_row(Row::from(vec![
            Cell::new(&enrichment.enrichment_category),
            Cell::new(&enrichment.enrichment_value),
            Cell::new(enrichment.enrichment_score.to_string()),
        ]));
    }
    table.to_string()
}

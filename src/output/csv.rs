use anyhow::Result;

use crate::deals::RecommendationsPage;

pub fn page_to_csv(page: &RecommendationsPage) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["name", "audience_type", "audience", "brands", "url", "logo"])?;
    for deal in &page.deals {
        writer.write_record([
            deal.name.clone(),
            deal.audience_type.to_string(),
            deal.audience.clone().unwrap_or_default(),
            deal.brand_names(),
            deal.url.clone(),
            deal.logo.clone(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use crate::audience::AudienceType;
    use crate::deals::{Brand, Deal, PaginationData, RecommendationsPage};
    use crate::output::csv::page_to_csv;

    #[test]
    fn writes_one_row_per_deal() {
        let page = RecommendationsPage {
            audience: AudienceType::Everyone,
            deals: vec![Deal {
                name: "Sale, part 2".to_string(),
                brands: vec![
                    Brand {
                        name: "Acme".to_string(),
                        logo: "#".to_string(),
                    },
                    Brand {
                        name: "Globex".to_string(),
                        logo: "#".to_string(),
                    },
                ],
                audience: None,
                audience_type: AudienceType::Spanish,
                url: "/sale".to_string(),
                logo: "#".to_string(),
            }],
            pagination: PaginationData {
                current_page: 1,
                total_pages: 1,
                total_count: 1,
            },
            accent_color: AudienceType::Spanish.accent_color().to_string(),
        };
        let out = page_to_csv(&page).expect("csv");
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("name,audience_type,audience,brands,url,logo"));
        assert_eq!(
            lines.next(),
            Some("\"Sale, part 2\",spanishsignal,,\"Acme, Globex\",/sale,#")
        );
    }
}

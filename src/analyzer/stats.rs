use crate::types::{CompetitiveRow, ListingRecord, PriceStatistics, Source};

/// Aggregate one set of prices into a statistics row. An empty set still
/// produces the row, with None in every aggregate.
pub fn stats_row(label: &str, prices: &[f64]) -> PriceStatistics {
    if prices.is_empty() {
        return PriceStatistics {
            label: label.to_string(),
            count: 0,
            min: None,
            max: None,
            mean: None,
            median: None,
            std_dev: None,
        };
    }

    let mut sorted = prices.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    let sum: f64 = sorted.iter().sum();
    let mean = sum / count as f64;
    let median = if count % 2 == 1 {
        sorted[count / 2]
    } else {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    };
    // Population std dev, so a single listing reports 0 rather than null.
    let variance = sorted.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / count as f64;

    PriceStatistics {
        label: label.to_string(),
        count,
        min: Some(sorted[0]),
        max: Some(sorted[count - 1]),
        mean: Some(mean),
        median: Some(median),
        std_dev: Some(variance.sqrt()),
    }
}

/// Competitive rows for every source with at least one cleaned listing,
/// ranked by average price ascending. Equal averages keep declaration order
/// (Amazon before eBay).
pub fn competitive_rows(records: &[ListingRecord]) -> Vec<CompetitiveRow> {
    let mut rows: Vec<CompetitiveRow> = Source::ALL
        .iter()
        .filter_map(|&source| {
            let prices: Vec<f64> = records
                .iter()
                .filter(|r| r.source == source)
                .map(|r| r.price)
                .collect();
            if prices.is_empty() {
                return None;
            }
            let ratings: Vec<f64> = records
                .iter()
                .filter(|r| r.source == source)
                .filter_map(|r| r.rating)
                .collect();
            Some(CompetitiveRow {
                source,
                avg_price: prices.iter().sum::<f64>() / prices.len() as f64,
                price_rank: 0, // assigned after sorting
                avg_rating: if ratings.is_empty() {
                    None
                } else {
                    Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
                },
                listing_count: prices.len(),
            })
        })
        .collect();

    // Stable sort: rows start in Source declaration order, so ties keep it.
    rows.sort_by(|a, b| a.avg_price.total_cmp(&b.avg_price));
    for (i, row) in rows.iter_mut().enumerate() {
        row.price_rank = (i + 1) as u32;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(source: Source, price: f64, rating: Option<f64>) -> ListingRecord {
        ListingRecord {
            source,
            title: "item".to_string(),
            price,
            currency: "USD",
            rating,
            review_count: None,
            seller: None,
            url: None,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn empty_prices_yield_null_aggregates() {
        let row = stats_row("amazon", &[]);
        assert_eq!(row.count, 0);
        assert!(row.min.is_none());
        assert!(row.max.is_none());
        assert!(row.mean.is_none());
        assert!(row.median.is_none());
        assert!(row.std_dev.is_none());
    }

    #[test]
    fn aggregates_are_exact_for_known_input() {
        let row = stats_row("combined", &[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(row.count, 4);
        assert_eq!(row.min, Some(10.0));
        assert_eq!(row.max, Some(40.0));
        assert_eq!(row.mean, Some(25.0));
        assert_eq!(row.median, Some(25.0));
        let std_dev = row.std_dev.unwrap();
        assert!((std_dev - 125.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn single_price_has_zero_spread() {
        let row = stats_row("ebay", &[15.0]);
        assert_eq!(row.count, 1);
        assert_eq!(row.median, Some(15.0));
        assert_eq!(row.std_dev, Some(0.0));
    }

    #[test]
    fn cheapest_source_ranks_first() {
        let records = vec![
            record(Source::Amazon, 30.0, Some(4.0)),
            record(Source::Amazon, 50.0, None),
            record(Source::Ebay, 20.0, Some(3.5)),
        ];
        let rows = competitive_rows(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source, Source::Ebay);
        assert_eq!(rows[0].price_rank, 1);
        assert_eq!(rows[0].listing_count, 1);
        assert_eq!(rows[1].source, Source::Amazon);
        assert_eq!(rows[1].price_rank, 2);
        assert_eq!(rows[1].avg_price, 40.0);
        assert_eq!(rows[1].avg_rating, Some(4.0));
    }

    #[test]
    fn equal_averages_keep_declaration_order() {
        let records = vec![
            record(Source::Ebay, 25.0, None),
            record(Source::Amazon, 25.0, None),
        ];
        let rows = competitive_rows(&records);
        assert_eq!(rows[0].source, Source::Amazon);
        assert_eq!(rows[0].price_rank, 1);
        assert_eq!(rows[1].source, Source::Ebay);
        assert_eq!(rows[1].price_rank, 2);
    }

    #[test]
    fn sources_without_listings_are_omitted() {
        let records = vec![record(Source::Amazon, 10.0, None)];
        let rows = competitive_rows(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, Source::Amazon);
    }
}

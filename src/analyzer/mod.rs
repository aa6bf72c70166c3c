mod cleaner;
mod forecast;
mod stats;

pub use cleaner::DataCleaner;

use tracing::info;

use crate::types::{
    CompetitiveRow, ListingRecord, PriceForecast, PriceStatistics, ScrapeBatch, Source,
    VisualizationData,
};

/// Pure derivations over the cleaned union of the two source batches.
/// Cleaning happens once at construction; every method is a pure function of
/// the cleaned records, so repeated calls return identical results. Owns no
/// external resource.
pub struct DataAnalyzer {
    query: String,
    records: Vec<ListingRecord>,
}

impl DataAnalyzer {
    pub fn new(amazon: ScrapeBatch, ebay: ScrapeBatch) -> Self {
        Self::with_cleaner(&DataCleaner::default(), amazon, ebay)
    }

    pub fn with_cleaner(cleaner: &DataCleaner, amazon: ScrapeBatch, ebay: ScrapeBatch) -> Self {
        let query = amazon.query.clone();
        let raw_total = amazon.listings.len() + ebay.listings.len();

        // Union keeps scrape order: Amazon's pages, then eBay's. That order
        // is the forecast's proxy time axis.
        let mut records = cleaner.clean(&amazon);
        records.extend(cleaner.clean(&ebay));

        info!(
            raw = raw_total,
            cleaned = records.len(),
            query = %query,
            "analyzer constructed"
        );
        Self { query, records }
    }

    /// Per-source and combined price aggregates. Sources with no valid
    /// listings still get a row (count 0, null aggregates).
    pub fn price_statistics(&self) -> Vec<PriceStatistics> {
        let mut rows: Vec<PriceStatistics> = Source::ALL
            .iter()
            .map(|&source| stats::stats_row(&source.to_string(), &self.prices_for(Some(source))))
            .collect();
        rows.push(stats::stats_row("combined", &self.prices_for(None)));
        rows
    }

    /// Sources ranked by average price, cheapest first; ties keep source
    /// declaration order.
    pub fn competitive_analysis(&self) -> Vec<CompetitiveRow> {
        stats::competitive_rows(&self.records)
    }

    /// Linear-trend forecast over the combined cleaned prices, or None when
    /// fewer than the minimum number of valid price points exist.
    pub fn predict_future_prices(&self) -> Option<PriceForecast> {
        forecast::predict(&self.prices_for(None))
    }

    /// Plain numeric summary for the external visualizer.
    pub fn visualization_data(&self) -> VisualizationData {
        VisualizationData {
            query: self.query.clone(),
            sources: Source::ALL.iter().map(|s| s.to_string()).collect(),
            prices_by_source: Source::ALL
                .iter()
                .map(|&s| self.prices_for(Some(s)))
                .collect(),
            combined_prices: self.prices_for(None),
        }
    }

    fn prices_for(&self, source: Option<Source>) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| source.map_or(true, |s| r.source == s))
            .map(|r| r.price)
            .collect()
    }
}

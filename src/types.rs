use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Declaration order is the tie-break order for competitive ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Amazon,
    Ebay,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Amazon, Source::Ebay];
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Source::Amazon => "amazon",
            Source::Ebay => "ebay",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Scraped listings
// ---------------------------------------------------------------------------

/// One listing as extracted from a result page. Title and price text are the
/// only fields a page must yield; everything else is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,
    /// Unparsed price text as shown on the page, e.g. "$39.99" or "EUR 24,99".
    pub price_text: String,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub seller: Option<String>,
    pub url: Option<String>,
}

/// All listings gathered for one (source, query) pair in one scrape run.
/// Ordered by scrape order; consumed once by the analyzer.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeBatch {
    pub source: Source,
    pub query: String,
    pub listings: Vec<RawListing>,
    pub pages_fetched: u32,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapeBatch {
    pub fn empty(source: Source, query: &str) -> Self {
        Self {
            source,
            query: query.to_string(),
            listings: Vec::new(),
            pages_fetched: 0,
            scraped_at: Utc::now(),
        }
    }
}

/// A cleaned listing. Only the `DataCleaner` constructs these; every record
/// carries a positive price in the reporting currency, so downstream stages
/// never re-validate.
#[derive(Debug, Clone, Serialize)]
pub struct ListingRecord {
    pub source: Source,
    pub title: String,
    pub price: f64,
    pub currency: &'static str,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub seller: Option<String>,
    pub url: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Analyzer outputs — plain structured data for the presentation layer
// ---------------------------------------------------------------------------

/// Per-source (or combined) price aggregates. A source with no valid
/// listings still produces a row, with count 0 and None aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStatistics {
    pub label: String,
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Per-source competitive position. `price_rank` is a total order over the
/// sources present in the batch, 1 = cheapest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitiveRow {
    pub source: Source,
    pub avg_price: f64,
    pub price_rank: u32,
    pub avg_rating: Option<f64>,
    pub listing_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub time_index: usize,
    pub predicted_price: f64,
}

/// Fitted linear trend: price = slope * index + intercept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendModel {
    pub slope: f64,
    pub intercept: f64,
}

/// Present only when enough valid price points exist; absence means
/// "insufficient data", never zero-filled predictions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceForecast {
    pub points: Vec<ForecastPoint>,
    pub model: TrendModel,
}

/// Bridge to the external visualizer: numeric/categorical data only, no
/// plotting-library types.
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationData {
    pub query: String,
    pub sources: Vec<String>,
    /// Cleaned prices per source, aligned with `sources`.
    pub prices_by_source: Vec<Vec<f64>>,
    /// Union of all cleaned prices in scrape order.
    pub combined_prices: Vec<f64>,
}

mod analyzer;
mod config;
mod error;
mod fetch;
mod parser;
mod scrape;
mod types;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::analyzer::DataAnalyzer;
use crate::config::Config;
use crate::error::Result;
use crate::scrape::ProductScraper;
use crate::types::{CompetitiveRow, PriceForecast, PriceStatistics, VisualizationData};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

/// One user-triggered pipeline run: scrape both sources concurrently,
/// analyze the union, render the tables. Each run constructs its own
/// scraper and analyzer; nothing is shared between runs.
async fn run(cfg: Config) -> Result<()> {
    info!(
        product = %cfg.product_name,
        max_pages = cfg.max_pages,
        max_retries = cfg.max_retries,
        delay_s = cfg.delay_between_requests.as_secs_f64(),
        "starting pipeline run"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing with partial results");
                cancel.cancel();
            }
        });
    }

    let mut scraper =
        ProductScraper::new(cfg.max_retries, cfg.delay_between_requests)?.with_cancellation(cancel);

    // Independent rate-limit clocks per source, so the scrapes run in
    // parallel without one source's backoff throttling the other.
    let (amazon, ebay) = tokio::join!(
        scraper.scrape_amazon(&cfg.product_name, cfg.max_pages),
        scraper.scrape_ebay(&cfg.product_name, cfg.max_pages),
    );
    let (amazon, ebay) = (amazon?, ebay?);
    scraper.close();

    if amazon.listings.is_empty() && ebay.listings.is_empty() {
        warn!("no listings from either source; tables will be empty");
    }

    let analyzer = DataAnalyzer::new(amazon, ebay);

    render_price_statistics(&analyzer.price_statistics());
    render_competitive_analysis(&analyzer.competitive_analysis());
    render_forecast(analyzer.predict_future_prices().as_ref());
    render_visualization_summary(&analyzer.visualization_data());

    Ok(())
}

fn render_price_statistics(rows: &[PriceStatistics]) {
    println!("\nPrice statistics (USD)");
    println!(
        "{:<10} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "source", "count", "min", "max", "mean", "median", "std_dev"
    );
    for row in rows {
        println!(
            "{:<10} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
            row.label,
            row.count,
            fmt_opt(row.min),
            fmt_opt(row.max),
            fmt_opt(row.mean),
            fmt_opt(row.median),
            fmt_opt(row.std_dev),
        );
    }
}

fn render_competitive_analysis(rows: &[CompetitiveRow]) {
    println!("\nCompetitive analysis");
    if rows.is_empty() {
        println!("  (no source produced valid listings)");
        return;
    }
    println!(
        "{:<10} {:>6} {:>10} {:>10} {:>9}",
        "source", "rank", "avg_price", "avg_rating", "listings"
    );
    for row in rows {
        println!(
            "{:<10} {:>6} {:>10.2} {:>10} {:>9}",
            row.source.to_string(),
            row.price_rank,
            row.avg_price,
            fmt_opt(row.avg_rating),
            row.listing_count,
        );
    }
}

fn render_forecast(forecast: Option<&PriceForecast>) {
    println!("\nPrice forecast");
    let Some(forecast) = forecast else {
        println!("  insufficient data to forecast");
        return;
    };
    println!(
        "  trend: slope {:+.4}/period, intercept {:.2}",
        forecast.model.slope, forecast.model.intercept
    );
    for point in &forecast.points {
        println!("  t+{:<3} {:>10.2}", point.time_index, point.predicted_price);
    }
}

/// The machine-facing bridge to the external visualizer: plain numeric data,
/// emitted as JSON so the presentation layer can be swapped freely.
fn render_visualization_summary(vis: &VisualizationData) {
    println!("\nVisualization data for \"{}\"", vis.query);
    for (source, prices) in vis.sources.iter().zip(&vis.prices_by_source) {
        println!("  {source}: {} price points", prices.len());
    }
    match serde_json::to_string(vis) {
        Ok(payload) => println!("  payload: {payload}"),
        Err(e) => warn!(error = %e, "could not serialize visualization data"),
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    }
}

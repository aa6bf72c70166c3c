use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::config::{AMAZON_SEARCH_URL, EBAY_SEARCH_URL};
use crate::error::{AppError, Result};
use crate::fetch::{HttpFetchEngine, HttpTransport, Transport};
use crate::parser;
use crate::types::{ScrapeBatch, Source};

/// Orchestrates per-source pagination over the fetch engine and parser.
///
/// Each source gets its own engine so the rate-limit clocks are independent:
/// the two scrapes have no shared mutable state and can run concurrently.
pub struct ProductScraper<T: Transport = HttpTransport> {
    amazon_engine: HttpFetchEngine<T>,
    ebay_engine: HttpFetchEngine<T>,
    cancel: CancellationToken,
}

impl ProductScraper<HttpTransport> {
    pub fn new(max_retries: u32, delay_between_requests: Duration) -> Result<Self> {
        Ok(Self::with_engines(
            HttpFetchEngine::new(max_retries, delay_between_requests).map_err(AppError::Fetch)?,
            HttpFetchEngine::new(max_retries, delay_between_requests).map_err(AppError::Fetch)?,
        ))
    }
}

impl<T: Transport> ProductScraper<T> {
    pub fn with_engines(amazon_engine: HttpFetchEngine<T>, ebay_engine: HttpFetchEngine<T>) -> Self {
        Self {
            amazon_engine,
            ebay_engine,
            cancel: CancellationToken::new(),
        }
    }

    /// Caller-supplied cancellation signal, checked between pages and, inside
    /// the engines, between retry attempts.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.amazon_engine.set_cancellation(cancel.clone());
        self.ebay_engine.set_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    pub async fn scrape_amazon(&self, product_name: &str, max_pages: u32) -> Result<ScrapeBatch> {
        self.scrape_source(Source::Amazon, &self.amazon_engine, product_name, max_pages)
            .await
    }

    pub async fn scrape_ebay(&self, product_name: &str, max_pages: u32) -> Result<ScrapeBatch> {
        self.scrape_source(Source::Ebay, &self.ebay_engine, product_name, max_pages)
            .await
    }

    /// Releases both HTTP sessions. Safe to call exactly once; a second call
    /// is a no-op.
    pub fn close(&mut self) {
        self.amazon_engine.close();
        self.ebay_engine.close();
    }

    /// Page loop for one source: fetch → parse → next page, stopping early on
    /// an empty page (source exhausted), a fetch failure (partial batch still
    /// returned), or cancellation. "No results" is never an error; only an
    /// invalid page budget is.
    async fn scrape_source(
        &self,
        source: Source,
        engine: &HttpFetchEngine<T>,
        product_name: &str,
        max_pages: u32,
    ) -> Result<ScrapeBatch> {
        if max_pages == 0 {
            return Err(AppError::Config("max_pages must be >= 1".to_string()));
        }

        let mut batch = ScrapeBatch::empty(source, product_name);
        for page in 1..=max_pages {
            if self.cancel.is_cancelled() {
                warn!(%source, page, "scrape cancelled");
                break;
            }

            let url = build_search_url(source, product_name, page);
            let body = match engine.fetch(&url).await {
                Ok((_status, body)) => body,
                Err(e) => {
                    warn!(%source, page, error = %e, "page unavailable; keeping partial results");
                    break;
                }
            };
            batch.pages_fetched = page;

            let mut listings = parser::parse(source, &body);
            if listings.is_empty() {
                info!(%source, page, "empty result page; source exhausted");
                break;
            }
            for listing in &mut listings {
                listing.url = listing.url.take().map(|href| resolve_href(source, &href));
            }
            batch.listings.append(&mut listings);
        }

        batch.scraped_at = Utc::now();
        info!(
            %source,
            query = %product_name,
            listings = batch.listings.len(),
            pages = batch.pages_fetched,
            "scrape complete"
        );
        Ok(batch)
    }
}

fn build_search_url(source: Source, product_name: &str, page: u32) -> String {
    let query = urlencoding::encode(product_name);
    match source {
        Source::Amazon => format!("{AMAZON_SEARCH_URL}?k={query}&page={page}"),
        Source::Ebay => format!("{EBAY_SEARCH_URL}?_nkw={query}&_pgn={page}"),
    }
}

/// Search pages link listings with relative hrefs; resolve against the
/// source origin. Absolute hrefs pass through unchanged.
fn resolve_href(source: Source, href: &str) -> String {
    let base = match source {
        Source::Amazon => "https://www.amazon.com",
        Source::Ebay => "https://www.ebay.com",
    };
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::error::FetchError;

    type PageResult = std::result::Result<(u16, String), FetchError>;

    const PAGE_ONE: &str = r#"
        <html><body>
        <div data-component-type="s-search-result">
            <h2><a href="/dp/B001"><span>Wireless Headphones Pro</span></a></h2>
            <span class="a-price"><span class="a-offscreen">$59.99</span></span>
        </div>
        <div data-component-type="s-search-result">
            <h2><a href="/dp/B002"><span>Budget Earbuds</span></a></h2>
            <span class="a-price"><span class="a-offscreen">$19.99</span></span>
        </div>
        </body></html>
    "#;

    const EMPTY_PAGE: &str = "<html><body><p>No more results</p></body></html>";

    /// Serves canned bodies page by page, then repeats the last entry.
    struct PagedTransport {
        pages: Vec<PageResult>,
        calls: AtomicU32,
    }

    impl PagedTransport {
        fn new(pages: Vec<PageResult>) -> Self {
            Self {
                pages,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl Transport for PagedTransport {
        async fn send(&self, _url: &str) -> PageResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.pages
                .get(n.min(self.pages.len() - 1))
                .cloned()
                .unwrap()
        }
    }

    fn scraper_with_pages(pages: Vec<PageResult>) -> ProductScraper<PagedTransport> {
        let amazon = HttpFetchEngine::with_transport(
            PagedTransport::new(pages.clone()),
            1,
            Duration::ZERO,
        );
        let ebay =
            HttpFetchEngine::with_transport(PagedTransport::new(pages), 1, Duration::ZERO);
        ProductScraper::with_engines(amazon, ebay)
    }

    fn amazon_call_count(scraper: &ProductScraper<PagedTransport>) -> u32 {
        // Engine retains its transport until close(); reach through for the counter.
        scraper
            .amazon_engine
            .transport()
            .expect("engine open")
            .calls
            .load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn pagination_stops_after_first_empty_page() {
        let scraper = scraper_with_pages(vec![
            Ok((200, PAGE_ONE.to_string())),
            Ok((200, EMPTY_PAGE.to_string())),
        ]);

        let batch = scraper.scrape_amazon("wireless headphones", 5).await.unwrap();
        assert_eq!(batch.listings.len(), 2, "only page-1 listings expected");
        assert_eq!(amazon_call_count(&scraper), 2, "no fetches past the empty page");
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_returns_partial_batch() {
        let scraper = scraper_with_pages(vec![
            Ok((200, PAGE_ONE.to_string())),
            Ok((404, String::new())),
        ]);

        let batch = scraper.scrape_amazon("wireless headphones", 5).await.unwrap();
        assert_eq!(batch.listings.len(), 2, "page-1 results kept despite page-2 failure");
        assert_eq!(batch.pages_fetched, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn total_fetch_failure_yields_empty_batch_not_error() {
        let scraper = scraper_with_pages(vec![Ok((403, String::new()))]);
        let batch = scraper.scrape_ebay("anything", 3).await.unwrap();
        assert!(batch.listings.is_empty());
        assert_eq!(batch.pages_fetched, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_pages_is_a_configuration_error() {
        let scraper = scraper_with_pages(vec![Ok((200, EMPTY_PAGE.to_string()))]);
        let err = scraper.scrape_amazon("x", 0).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn relative_listing_urls_are_resolved_against_source_origin() {
        let scraper = scraper_with_pages(vec![
            Ok((200, PAGE_ONE.to_string())),
            Ok((200, EMPTY_PAGE.to_string())),
        ]);
        let batch = scraper.scrape_amazon("x", 1).await.unwrap();
        assert_eq!(
            batch.listings[0].url.as_deref(),
            Some("https://www.amazon.com/dp/B001")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_before_first_page() {
        let cancel = CancellationToken::new();
        let scraper = scraper_with_pages(vec![Ok((200, PAGE_ONE.to_string()))])
            .with_cancellation(cancel.clone());
        cancel.cancel();

        let batch = scraper.scrape_amazon("x", 5).await.unwrap();
        assert!(batch.listings.is_empty());
        assert_eq!(amazon_call_count(&scraper), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_idempotent() {
        let mut scraper = scraper_with_pages(vec![Ok((200, PAGE_ONE.to_string()))]);
        scraper.close();
        scraper.close();

        // A scrape after close degrades to an empty partial batch.
        let batch = scraper.scrape_amazon("x", 2).await.unwrap();
        assert!(batch.listings.is_empty());
    }

    #[test]
    fn search_urls_encode_the_query() {
        let url = build_search_url(Source::Amazon, "wireless headphones", 2);
        assert_eq!(url, "https://www.amazon.com/s?k=wireless%20headphones&page=2");
        let url = build_search_url(Source::Ebay, "usb-c hub", 1);
        assert_eq!(url, "https://www.ebay.com/sch/i.html?_nkw=usb-c%20hub&_pgn=1");
    }
}

use std::collections::HashMap;

use tracing::debug;

use crate::types::{ListingRecord, RawListing, ScrapeBatch};

/// Reporting currency for all cleaned prices.
pub const REPORTING_CURRENCY: &str = "USD";

/// The sole gate between raw scraped listings and the analyzer: parses and
/// normalizes prices, drops unusable rows, deduplicates. Every record it
/// emits carries a positive USD price, so downstream never re-validates.
pub struct DataCleaner {
    /// currency code → multiplier into the reporting currency.
    rates: HashMap<&'static str, f64>,
}

impl Default for DataCleaner {
    fn default() -> Self {
        // Fixed snapshot; precision is not a goal, comparability is.
        Self::with_rates(HashMap::from([
            ("USD", 1.0),
            ("EUR", 1.08),
            ("GBP", 1.27),
            ("CAD", 0.74),
            ("AUD", 0.66),
            ("JPY", 0.0067),
            ("INR", 0.012),
        ]))
    }
}

impl DataCleaner {
    pub fn with_rates(rates: HashMap<&'static str, f64>) -> Self {
        Self { rates }
    }

    /// Cleans one batch. A bad record is dropped, never the batch.
    pub fn clean(&self, batch: &ScrapeBatch) -> Vec<ListingRecord> {
        let mut records: Vec<ListingRecord> = Vec::with_capacity(batch.listings.len());
        // url → index of the record kept so far. A batch covers one source,
        // so the (source, url) dedup key reduces to the url; batch order is
        // scrape order, so a later duplicate is the more recent scrape.
        let mut seen_urls: HashMap<String, usize> = HashMap::new();
        let mut dropped = 0usize;

        for raw in &batch.listings {
            let Some(record) = self.clean_one(batch, raw) else {
                dropped += 1;
                continue;
            };
            match record.url.clone() {
                Some(url) => {
                    if let Some(&idx) = seen_urls.get(&url) {
                        records[idx] = record;
                    } else {
                        seen_urls.insert(url, records.len());
                        records.push(record);
                    }
                }
                None => records.push(record),
            }
        }

        debug!(
            source = %batch.source,
            kept = records.len(),
            dropped,
            "cleaned batch"
        );
        records
    }

    fn clean_one(&self, batch: &ScrapeBatch, raw: &RawListing) -> Option<ListingRecord> {
        let (amount, currency) = parse_price_text(&raw.price_text)?;
        if amount <= 0.0 {
            return None;
        }
        let Some(rate) = self.rates.get(currency) else {
            debug!(currency, title = %raw.title, "no exchange rate; dropping record");
            return None;
        };

        Some(ListingRecord {
            source: batch.source,
            title: raw.title.clone(),
            price: amount * rate,
            currency: REPORTING_CURRENCY,
            rating: raw.rating,
            review_count: raw.review_count,
            seller: raw.seller.clone(),
            url: raw.url.clone(),
            scraped_at: batch.scraped_at,
        })
    }
}

/// Currency symbol detection plus numeric extraction. Returns the amount in
/// its native currency. Ranges ("$20.00 to $35.00") yield the lower bound.
pub fn parse_price_text(text: &str) -> Option<(f64, &'static str)> {
    let mut s = text.trim().to_string();
    if s.is_empty() {
        return None;
    }

    let currency = if s.contains("A$") {
        s = s.replace("A$", "");
        "AUD"
    } else if s.contains("C$") {
        s = s.replace("C$", "");
        "CAD"
    } else if s.contains('$') {
        s = s.replace('$', "");
        "USD"
    } else if s.contains('€') {
        s = s.replace('€', "");
        "EUR"
    } else if s.contains('£') {
        s = s.replace('£', "");
        "GBP"
    } else if s.contains('¥') {
        s = s.replace('¥', "");
        "JPY"
    } else if s.contains('₹') {
        s = s.replace('₹', "");
        "INR"
    } else if let Some(rest) = strip_currency_code(&s) {
        let (code, remainder) = rest;
        s = remainder;
        code
    } else {
        "USD"
    };

    // First numeric token wins: handles "20.00 to 35.00" and trailing noise.
    let s = s.replace(',', "");
    let trimmed = s.trim();
    let negative = trimmed.starts_with('-');
    let token: String = trimmed
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let amount: f64 = token.parse().ok()?;
    Some((if negative { -amount } else { amount }, currency))
}

fn strip_currency_code(s: &str) -> Option<(&'static str, String)> {
    for code in ["USD", "EUR", "GBP", "CAD", "AUD", "JPY", "INR"] {
        if let Some(rest) = s.strip_prefix(code) {
            return Some((code, rest.to_string()));
        }
    }
    None
}

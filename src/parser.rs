use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::types::{RawListing, Source};

/// Per-source field mapping. Adding a source means adding a table, not new
/// control flow.
struct SelectorSet {
    container: Selector,
    title: Selector,
    price: Selector,
    rating: Selector,
    review_count: Selector,
    seller: Option<Selector>,
    link: Selector,
}

fn sel(css: &str) -> Selector {
    // Selectors are compile-time constants below; a typo is a programming
    // error, not a runtime condition.
    Selector::parse(css).unwrap_or_else(|e| panic!("bad selector {css:?}: {e}"))
}

static AMAZON_SELECTORS: Lazy<SelectorSet> = Lazy::new(|| SelectorSet {
    container: sel("div[data-component-type='s-search-result']"),
    title: sel("h2 span"),
    price: sel("span.a-price span.a-offscreen"),
    rating: sel("span.a-icon-alt"),
    review_count: sel("span.a-size-base.s-underline-text"),
    seller: None,
    link: sel("h2 a"),
});

static EBAY_SELECTORS: Lazy<SelectorSet> = Lazy::new(|| SelectorSet {
    container: sel("li.s-item"),
    title: sel(".s-item__title"),
    price: sel(".s-item__price"),
    rating: sel(".x-star-rating .clipped"),
    review_count: sel(".s-item__reviews-count span"),
    seller: Some(sel(".s-item__seller-info-text")),
    link: sel("a.s-item__link"),
});

/// eBay pads result pages with a template card carrying this title.
const EBAY_PLACEHOLDER_TITLE: &str = "Shop on eBay";

fn selectors(source: Source) -> &'static SelectorSet {
    match source {
        Source::Amazon => &AMAZON_SELECTORS,
        Source::Ebay => &EBAY_SELECTORS,
    }
}

/// Extract listings from one result page. Pure; never errors — unmatched
/// fields are absent and a page with no parseable listings returns an empty
/// vec, which the pagination loop reads as "end of results".
pub fn parse(source: Source, raw_body: &str) -> Vec<RawListing> {
    let document = Html::parse_document(raw_body);
    let set = selectors(source);

    let mut listings = Vec::new();
    for container in document.select(&set.container) {
        let Some(title) = text_of(container, &set.title) else {
            continue;
        };
        if title == EBAY_PLACEHOLDER_TITLE {
            continue;
        }
        let Some(price_text) = text_of(container, &set.price) else {
            continue;
        };

        listings.push(RawListing {
            title,
            price_text,
            rating: text_of(container, &set.rating).and_then(|t| parse_rating(&t)),
            review_count: text_of(container, &set.review_count)
                .and_then(|t| parse_review_count(&t)),
            seller: set
                .seller
                .as_ref()
                .and_then(|s| text_of(container, s)),
            url: container
                .select(&set.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|h| h.to_string()),
        });
    }

    debug!(%source, count = listings.len(), "parsed result page");
    listings
}

/// First non-empty text match under `el`, whitespace-collapsed.
fn text_of(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector).find_map(|m| {
        let text = m
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() { None } else { Some(text) }
    })
}

/// "4.3 out of 5 stars" → 4.3. Lenient: takes the leading numeric token.
fn parse_rating(text: &str) -> Option<f64> {
    let token = text.split_whitespace().next()?;
    let rating: f64 = token.parse().ok()?;
    (0.0..=5.0).contains(&rating).then_some(rating)
}

/// "1,234" / "(1,234)" / "1234 product ratings" → 1234.
fn parse_review_count(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '(')
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        // Count may not lead the string ("4 product ratings" does, but
        // "(1,234)" starts with a paren handled above); fall back to the
        // first digit run anywhere.
        let run: String = text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == ',')
            .filter(|c| c.is_ascii_digit())
            .collect();
        return run.parse().ok();
    }
    digits.parse().ok()
}

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fields::{self, Rating};
use crate::formats::{BookRecord, ListingEntry};

/// Everything a single listing page yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedListing {
    pub entries: Vec<ListingEntry>,
    pub next_page: Option<Url>,
}

/// Selector set for the catalogue markup, compiled once and shared between pages.
#[derive(Debug)]
pub struct Extractor {
    entry: Selector,
    link: Selector,
    price: Selector,
    rating: Selector,
    availability: Selector,
    next_link: Selector,
    table_row: Selector,
    header_cell: Selector,
    value_cell: Selector,
}

const REVIEW_COUNT_LABEL: &str = "number of reviews";
const RATING_MARKER_CLASS: &str = "star-rating";

impl Extractor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            entry: selector("article.product_pod")?,
            link: selector("h3 a")?,
            price: selector("p.price_color")?,
            rating: selector("p.star-rating")?,
            availability: selector("p.availability")?,
            next_link: selector("li.next a")?,
            table_row: selector("tr")?,
            header_cell: selector("th")?,
            value_cell: selector("td")?,
        })
    }

    /// Parses a listing page fetched from `page_url`.
    pub fn parse_listing(&self, html: &str, page_url: &Url) -> ParsedListing {
        let document = Html::parse_document(html);
        ParsedListing {
            entries: self.extract_entries(&document, page_url),
            next_page: self.next_page_url(&document, page_url),
        }
    }

    /// Entries in page order. Relative links resolve against `page_url`, not the site root.
    pub fn extract_entries(&self, document: &Html, page_url: &Url) -> Vec<ListingEntry> {
        document
            .select(&self.entry)
            .filter_map(|entry| self.extract_entry(entry, page_url))
            .collect()
    }

    pub fn extract_records(&self, document: &Html, page_url: &Url) -> Vec<BookRecord> {
        self.extract_entries(document, page_url)
            .iter()
            .map(normalize_entry)
            .collect()
    }

    fn extract_entry(&self, entry: ElementRef<'_>, page_url: &Url) -> Option<ListingEntry> {
        let Some(link) = entry.select(&self.link).next() else {
            tracing::warn!(page = %page_url, "listing entry without a link; skipping");
            return None;
        };

        let Some(href) = link.value().attr("href") else {
            tracing::warn!(page = %page_url, "listing entry link without href; skipping");
            return None;
        };
        let detail_url = match page_url.join(href) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(page = %page_url, href, %err, "unresolvable entry link; skipping");
                return None;
            }
        };

        let title = link
            .value()
            .attr("title")
            .and_then(fields::non_empty)
            .or_else(|| fields::non_empty(&element_text(link)));

        let price_text = entry
            .select(&self.price)
            .next()
            .and_then(|el| fields::non_empty(&element_text(el)));

        let rating_label = entry
            .select(&self.rating)
            .next()
            .and_then(|el| el.value().attr("class"))
            .and_then(rating_token);

        let availability = entry
            .select(&self.availability)
            .next()
            .and_then(|el| fields::non_empty(&element_text(el)));

        tracing::debug!(url = %detail_url, ?title, ?price_text, ?rating_label, "extracted entry");

        Some(ListingEntry {
            title,
            detail_url,
            price_text,
            rating_label,
            availability,
        })
    }

    /// Target of the "next" pagination control, if the page has one.
    pub fn next_page_url(&self, document: &Html, page_url: &Url) -> Option<Url> {
        let href = document
            .select(&self.next_link)
            .next()
            .and_then(|el| el.value().attr("href"))?;
        page_url.join(href).ok()
    }

    /// Reads the "Number of reviews" row of a product detail page.
    pub fn review_count(&self, html: &str) -> Option<u32> {
        let document = Html::parse_document(html);
        document.select(&self.table_row).find_map(|row| {
            let label = element_text(row.select(&self.header_cell).next()?);
            if !label.eq_ignore_ascii_case(REVIEW_COUNT_LABEL) {
                return None;
            }
            let value = element_text(row.select(&self.value_cell).next()?);
            fields::parse_review_count(&value)
        })
    }
}

/// Applies the typed field rules to a raw listing entry.
pub fn normalize_entry(entry: &ListingEntry) -> BookRecord {
    BookRecord {
        title: entry.title.clone(),
        detail_url: entry.detail_url.clone(),
        price: entry.price_text.as_deref().and_then(fields::parse_price),
        rating: entry.rating_label.as_deref().and_then(fields::rating_from_label),
        review_count: None,
        availability: entry.availability.clone(),
    }
}

/// The token of the rating element's class list worth keeping: the recognized
/// numeral when there is one, otherwise whatever accompanies the marker class.
fn rating_token(class: &str) -> Option<String> {
    let tokens: Vec<&str> = class
        .split_whitespace()
        .filter(|token| *token != RATING_MARKER_CLASS)
        .collect();
    tokens
        .iter()
        .find(|token| Rating::from_word(token).is_some())
        .or_else(|| tokens.first())
        .map(|token| (*token).to_owned())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("parse selector {css:?}: {err}"))
}

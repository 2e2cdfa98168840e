use serde::{Deserialize, Serialize};
use url::Url;

use crate::fields::{Price, Rating};

/// One product summary exactly as the listing page presents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: Option<String>,
    pub detail_url: Url,
    pub price_text: Option<String>,
    pub rating_label: Option<String>,
    pub availability: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub title: Option<String>,
    pub detail_url: Url,
    pub price: Option<Price>,
    pub rating: Option<Rating>,
    pub review_count: Option<u32>,
    pub availability: Option<String>,
}

/// Row shape of the tabular output. Every cell is text; `None` is an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRow {
    pub title: Option<String>,
    pub detail_url: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<String>,
    pub availability: Option<String>,
}

impl From<&BookRecord> for BookRow {
    fn from(record: &BookRecord) -> Self {
        Self {
            title: record.title.clone(),
            detail_url: Some(record.detail_url.to_string()),
            price: record.price.map(|price| price.to_string()),
            rating: record.rating.map(|rating| rating.to_string()),
            review_count: record.review_count.map(|count| count.to_string()),
            availability: record.availability.clone(),
        }
    }
}

impl From<&ListingEntry> for BookRow {
    fn from(entry: &ListingEntry) -> Self {
        Self {
            title: entry.title.clone(),
            detail_url: Some(entry.detail_url.to_string()),
            price: entry.price_text.clone(),
            rating: entry.rating_label.clone(),
            review_count: None,
            availability: entry.availability.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingMean {
    pub rating: Rating,
    pub mean_price: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub generated_at: String,
    pub rows: usize,
    pub priced: usize,
    pub rated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_price: Option<f64>,
    pub mean_price_by_rating: Vec<RatingMean>,
    pub histogram: Vec<HistogramBin>,
}

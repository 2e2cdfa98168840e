use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Non-negative amount with two fractional digits, stored as hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(self) -> u64 {
        self.cents
    }

    pub fn as_f64(self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_price(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("not a price: {raw:?}")))
    }
}

/// Parses a price out of arbitrary listing text.
///
/// Everything except ASCII digits and the first decimal point is discarded, so any
/// currency marker (including mis-decoded ones like `Â£`) is ignored. Fractions with
/// more than two digits are rounded half-up. Returns `None` when no digit survives.
pub fn parse_price(text: &str) -> Option<Price> {
    let mut integer = String::new();
    let mut fraction = String::new();
    let mut seen_point = false;

    for ch in text.chars() {
        match ch {
            '0'..='9' if seen_point => fraction.push(ch),
            '0'..='9' => integer.push(ch),
            '.' if !seen_point => seen_point = true,
            _ => {}
        }
    }

    if integer.is_empty() && fraction.is_empty() {
        return None;
    }

    let whole: u64 = if integer.is_empty() {
        0
    } else {
        integer.parse().ok()?
    };

    let digits = fraction.as_bytes();
    let digit = |idx: usize| digits.get(idx).map(|b| u64::from(b - b'0')).unwrap_or(0);
    let mut hundredths = digit(0) * 10 + digit(1);
    if digit(2) >= 5 {
        hundredths += 1;
    }

    let cents = whole.checked_mul(100)?.checked_add(hundredths)?;
    Some(Price::from_cents(cents))
}

/// Star rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

const RATING_WORDS: [(&str, u8); 5] = [
    ("One", 1),
    ("Two", 2),
    ("Three", 3),
    ("Four", 4),
    ("Five", 5),
];

impl Rating {
    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    /// Maps a word-form numeral token as authored on the listing (`"Three"`).
    /// Matching is case-sensitive.
    pub fn from_word(token: &str) -> Option<Self> {
        RATING_WORDS
            .iter()
            .find(|(word, _)| *word == token)
            .map(|(_, value)| Self(*value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Rating::new(value)
            .ok_or_else(|| serde::de::Error::custom(format!("rating out of range: {value}")))
    }
}

/// Returns the first token of a multi-token class label that names a rating.
pub fn rating_from_label(label: &str) -> Option<Rating> {
    label.split_whitespace().find_map(Rating::from_word)
}

/// Accepts either a word-form label (`"star-rating Three"`, `"Three"`) or a plain
/// integer (`"3"`), which is what a previously cleaned table holds.
pub fn parse_rating_text(text: &str) -> Option<Rating> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<u8>() {
        return Rating::new(value);
    }
    rating_from_label(trimmed)
}

pub fn parse_review_count(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

/// Trimmed text, or `None` when nothing is left.
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

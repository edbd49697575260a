use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A fully rendered listing page handed over by the retrieval step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    /// URL the markup was rendered from, used for relative-URL resolution
    pub source_url: String,

    /// Rendered HTML of the listing page
    pub markup: String,
}

impl RawDocument {
    pub fn new(source_url: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            markup: markup.into(),
        }
    }

    /// Scheme + host portion of the source URL, e.g. "https://example.com"
    pub fn origin(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.source_url).ok()?;
        let host = parsed.host_str()?;
        Some(format!("{}://{}", parsed.scheme(), host))
    }
}

/// Structured record produced by a successful extraction run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedListing {
    /// Listing title, e.g. "2022 Jeep Compass"
    pub car_name: String,

    /// Asking price in the smallest currency unit, always > 0
    pub price: u64,

    /// Accepted gallery image URLs, deduplicated, capped at 20
    pub images: Vec<String>,

    /// Year the car was purchased (defaults to the current year)
    #[serde(default = "current_year")]
    pub year_of_purchase: i32,

    /// Number of previous owners (defaults to 1)
    #[serde(default = "default_owner_count")]
    pub number_of_owners: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub km_driven: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_year: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rto: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_displacement: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seating_capacity: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,

    /// Harvested feature strings, first-occurrence order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub features: Vec<String>,

    /// Harvested key/value specifications
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub specifications: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub emi_starts_at: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_car_price: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl ExtractedListing {
    /// Create a listing with the required fields and documented defaults
    pub fn new(car_name: String, price: u64, images: Vec<String>) -> Self {
        Self {
            car_name,
            price,
            images,
            year_of_purchase: current_year(),
            number_of_owners: default_owner_count(),
            km_driven: None,
            city: None,
            owner_name: None,
            fuel_type: None,
            transmission: None,
            variant: None,
            color: None,
            registration_year: None,
            insurance: None,
            rto: None,
            engine_displacement: None,
            mileage: None,
            seating_capacity: None,
            body_type: None,
            features: Vec::new(),
            specifications: BTreeMap::new(),
            emi_starts_at: None,
            new_car_price: None,
            description: None,
            source_url: None,
        }
    }

    /// Brand derived from the listing title: the first token after an
    /// optional leading 4-digit year (e.g. "2022 Jeep Compass" -> "Jeep")
    pub fn brand(&self) -> &str {
        let mut tokens = self.car_name.split_whitespace();
        match tokens.next() {
            Some(first) if is_year_token(first) => tokens.next().unwrap_or(""),
            Some(first) => first,
            None => "",
        }
    }

    /// Model derived from the listing title: everything after the brand
    pub fn model(&self) -> String {
        let mut tokens = self.car_name.split_whitespace().peekable();
        if let Some(first) = tokens.peek() {
            if is_year_token(first) {
                tokens.next();
            }
        }
        // Skip the brand token
        tokens.next();
        tokens.collect::<Vec<_>>().join(" ")
    }
}

fn is_year_token(token: &str) -> bool {
    token.len() == 4 && token.chars().all(|c| c.is_ascii_digit())
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

fn default_owner_count() -> u32 {
    1
}

/// Outcome of one extraction run over one document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractedListing>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExtractionError>,
}

impl ExtractionResult {
    pub fn ok(data: ExtractedListing) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: ExtractionError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Failure reasons surfaced to the caller; strategy-level misses never
/// reach this level, they recover locally as field absence
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    #[error("required field '{field}' not found in document")]
    MissingRequiredField { field: String },

    #[error("amount text present but not parseable into a positive value")]
    MalformedAmount,

    #[error("all image candidates were rejected or none were found")]
    NoValidImages,

    #[error("no valid document supplied by the retrieval step")]
    PreconditionFailed,
}

impl ExtractionError {
    pub fn missing_field(field: &str) -> Self {
        Self::MissingRequiredField {
            field: field.to_string(),
        }
    }

    /// Stable machine-readable name for this error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingRequiredField { .. } => "missing_required_field",
            Self::MalformedAmount => "malformed_amount",
            Self::NoValidImages => "no_valid_images",
            Self::PreconditionFailed => "precondition_failed",
        }
    }

    /// Fold amount/image failures into their required-field form, the
    /// shape callers are expected to branch on
    pub fn into_required_field(self) -> Self {
        match self {
            Self::MalformedAmount => Self::missing_field("price"),
            Self::NoValidImages => Self::missing_field("images"),
            other => other,
        }
    }
}

/// Search criteria over extracted listings; every predicate is optional
/// and an absent one always passes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub brands: Vec<String>,

    #[serde(default)]
    pub cities: Vec<String>,

    #[serde(default)]
    pub fuel_types: Vec<String>,

    #[serde(default)]
    pub transmissions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_year: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_year: Option<i32>,

    /// Free-text query matched against brand, model and city
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl FilterCriteria {
    /// True when no criterion is set, i.e. the filter is the identity
    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
            && self.cities.is_empty()
            && self.fuel_types.is_empty()
            && self.transmissions.is_empty()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.min_year.is_none()
            && self.max_year.is_none()
            && self.query.as_deref().map_or(true, |q| q.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_extraction() {
        let doc = RawDocument::new("https://example.com/buy-used-cars/delhi/1234", "<html></html>");
        assert_eq!(doc.origin(), Some("https://example.com".to_string()));

        let bad = RawDocument::new("not a url", "");
        assert_eq!(bad.origin(), None);
    }

    #[test]
    fn test_brand_and_model_derivation() {
        let listing = ExtractedListing::new("2022 Jeep Compass Limited".to_string(), 1, vec![]);
        assert_eq!(listing.brand(), "Jeep");
        assert_eq!(listing.model(), "Compass Limited");

        let no_year = ExtractedListing::new("Maruti Swift VXI".to_string(), 1, vec![]);
        assert_eq!(no_year.brand(), "Maruti");
        assert_eq!(no_year.model(), "Swift VXI");
    }

    #[test]
    fn test_error_folding() {
        assert_eq!(
            ExtractionError::MalformedAmount.into_required_field(),
            ExtractionError::missing_field("price")
        );
        assert_eq!(
            ExtractionError::NoValidImages.into_required_field(),
            ExtractionError::missing_field("images")
        );
        assert_eq!(
            ExtractionError::PreconditionFailed.into_required_field(),
            ExtractionError::PreconditionFailed
        );
    }

    #[test]
    fn test_result_serialization_omits_absent_fields() {
        let result = ExtractionResult::fail(ExtractionError::missing_field("price"));
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"success\":false"));
        assert!(!json.contains("\"data\""));
        assert!(json.contains("missing_required_field"));
    }
}

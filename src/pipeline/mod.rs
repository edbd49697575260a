pub mod fields;
pub mod harvest;
pub mod images;
pub mod money;

// Re-export common types
pub use fields::{extract_all, extract_field, field_specs, FieldSpec, ParsedDocument, Strategy};
pub use harvest::{harvest, Harvest};
pub use images::{extract_images, ImageCandidate, ImageFilter};
pub use money::{format_inr, parse_amount};

use tracing::{debug, info};

use crate::model::{ExtractedListing, ExtractionError, ExtractionResult, RawDocument};

/// Run the full pipeline over one document with the default image tables
pub fn assemble(doc: &RawDocument) -> ExtractionResult {
    assemble_with_filter(doc, &ImageFilter::default())
}

/// Run the full pipeline: field chain, monetary parse, image screening
/// and harvesting all execute unconditionally, then required fields are
/// checked in fixed order so a retry after a partial fix sees a stable,
/// complete attempt.
pub fn assemble_with_filter(doc: &RawDocument, image_filter: &ImageFilter) -> ExtractionResult {
    if doc.markup.trim().is_empty() {
        return ExtractionResult::fail(ExtractionError::PreconditionFailed);
    }

    let parsed = ParsedDocument::parse(doc);
    let found = extract_all(&parsed);
    let price = found
        .get(fields::PRICE_TEXT)
        .map(|text| parse_amount(text))
        .unwrap_or(0);
    let images = extract_images(doc, image_filter);
    let harvested = harvest(&parsed);

    debug!(
        "Extraction attempt for {}: {} fields, price {}, {} images, {} features, {} specs",
        doc.source_url,
        found.len(),
        price,
        images.len(),
        harvested.features.len(),
        harvested.specifications.len()
    );

    // Required-field checks, fixed order, fail fast on the first violation
    let car_name = match found.get(fields::CAR_NAME) {
        Some(name) => name.clone(),
        None => {
            return ExtractionResult::fail(ExtractionError::missing_field(fields::CAR_NAME));
        }
    };

    if price == 0 {
        return ExtractionResult::fail(ExtractionError::MalformedAmount.into_required_field());
    }

    if images.is_empty() {
        return ExtractionResult::fail(ExtractionError::NoValidImages.into_required_field());
    }

    let mut listing = ExtractedListing::new(car_name, price, images);

    if let Some(year) = found.get(fields::YEAR_OF_PURCHASE).and_then(|v| v.parse().ok()) {
        listing.year_of_purchase = year;
    }
    if let Some(owners) = found.get(fields::NUMBER_OF_OWNERS).and_then(|v| owners_from_text(v)) {
        listing.number_of_owners = owners;
    }

    listing.km_driven = found.get(fields::KM_DRIVEN).cloned();
    listing.city = found.get(fields::CITY).cloned();
    listing.owner_name = found.get(fields::OWNER_NAME).cloned();
    listing.fuel_type = found.get(fields::FUEL_TYPE).cloned();
    listing.transmission = found.get(fields::TRANSMISSION).cloned();
    listing.variant = found.get(fields::VARIANT).cloned();
    listing.color = found.get(fields::COLOR).cloned();
    listing.registration_year = found.get(fields::REGISTRATION_YEAR).and_then(|v| v.parse().ok());
    listing.insurance = found.get(fields::INSURANCE).cloned();
    listing.rto = found.get(fields::RTO).cloned();
    listing.engine_displacement = found.get(fields::ENGINE_DISPLACEMENT).cloned();
    listing.mileage = found.get(fields::MILEAGE).cloned();
    listing.seating_capacity = found.get(fields::SEATING_CAPACITY).and_then(|v| v.parse().ok());
    listing.body_type = found.get(fields::BODY_TYPE).cloned();
    listing.features = harvested.features;
    listing.specifications = harvested.specifications;
    listing.emi_starts_at = found
        .get(fields::EMI_STARTS_AT)
        .map(|text| parse_amount(text))
        .filter(|amount| *amount > 0);
    listing.new_car_price = found
        .get(fields::NEW_CAR_PRICE)
        .map(|text| parse_amount(text))
        .filter(|amount| *amount > 0);
    listing.description = found.get(fields::DESCRIPTION).cloned();
    listing.source_url = Some(doc.source_url.clone());

    info!("Extracted listing '{}' from {}", listing.car_name, doc.source_url);
    ExtractionResult::ok(listing)
}

/// Map an owner ordinal ("First", "2nd", "3") to a count
fn owners_from_text(value: &str) -> Option<u32> {
    match value.trim().to_lowercase().as_str() {
        "first" | "1st" => Some(1),
        "second" | "2nd" => Some(2),
        "third" | "3rd" => Some(3),
        "fourth" | "4th" => Some(4),
        other => other.parse::<u32>().ok().filter(|n| (1..=9).contains(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExtractionError;

    const LISTING_PAGE: &str = r#"<html>
        <head><title>2022 Jeep Compass - Used Cars</title></head>
        <body>
            <h1>2022 Jeep Compass</h1>
            <div class="price">₹15.75 Lakh</div>
            <p>45,000 km | Diesel | Automatic | First Owner</p>
            <p>Location: Mumbai</p>
            <p>RTO: MH-01 | Insurance: Comprehensive, valid till 2026</p>
            <ul class="feature-list">
                <li>Sunroof</li>
                <li>Cruise Control</li>
            </ul>
            <table><tr><th>Engine</th><td>1956 cc</td></tr></table>
            <img src="https://cdn.example.com/used-cars/compass-front.jpg" alt="Front">
            <img src="https://cdn.example.com/used-cars/compass-rear.jpg" alt="Rear">
            <img src="/gallery/compass-side.jpg" alt="Side">
            <img src="//cdn.example.com/used-cars/compass-interior.jpg" alt="Interior">
            <img src="https://cdn.example.com/assets/site-logo.png" alt="logo">
        </body>
    </html>"#;

    #[test]
    fn test_end_to_end_success() {
        let doc = RawDocument::new("https://example.com/buy/compass-1234", LISTING_PAGE);
        let result = assemble(&doc);

        assert!(result.success, "expected success, got {:?}", result.error);
        let listing = result.data.expect("listing data");

        assert_eq!(listing.car_name, "2022 Jeep Compass");
        assert_eq!(listing.price, 1_575_000);
        assert_eq!(listing.images.len(), 4);
        assert!(listing.images.contains(&"https://example.com/gallery/compass-side.jpg".to_string()));
        assert_eq!(listing.year_of_purchase, 2022);
        assert_eq!(listing.number_of_owners, 1);
        assert_eq!(listing.city.as_deref(), Some("Mumbai"));
        assert_eq!(listing.fuel_type.as_deref(), Some("Diesel"));
        assert_eq!(listing.transmission.as_deref(), Some("Automatic"));
        assert_eq!(listing.rto.as_deref(), Some("MH-01"));
        assert!(listing.features.contains(&"Sunroof".to_string()));
        assert_eq!(listing.specifications.get("Engine").map(String::as_str), Some("1956 cc"));
        assert_eq!(listing.source_url.as_deref(), Some("https://example.com/buy/compass-1234"));
    }

    #[test]
    fn test_missing_price_fails_with_price_field() {
        let markup = r#"<html><body>
            <h1>2022 Jeep Compass</h1>
            <img src="https://cdn.example.com/used-cars/compass-front.jpg">
        </body></html>"#;

        let doc = RawDocument::new("https://example.com/buy/1", markup);
        let result = assemble(&doc);

        assert!(!result.success);
        assert_eq!(result.error, Some(ExtractionError::missing_field("price")));
        assert!(result.data.is_none());
    }

    #[test]
    fn test_missing_name_fails_first() {
        // Neither name nor price present: the gate reports the first
        // violation in its fixed order
        let doc = RawDocument::new("https://example.com/buy/1", "<html><body><p>nothing here</p></body></html>");
        let result = assemble(&doc);

        assert!(!result.success);
        assert_eq!(result.error, Some(ExtractionError::missing_field("car_name")));
    }

    #[test]
    fn test_no_accepted_images_fails_with_images_field() {
        let markup = r#"<html><body>
            <h1>2022 Jeep Compass</h1>
            <div class="price">₹15.75 Lakh</div>
            <img src="https://cdn.example.com/assets/site-logo.png">
        </body></html>"#;

        let doc = RawDocument::new("https://example.com/buy/1", markup);
        let result = assemble(&doc);

        assert!(!result.success);
        assert_eq!(result.error, Some(ExtractionError::missing_field("images")));
    }

    #[test]
    fn test_empty_markup_is_precondition_failure() {
        let doc = RawDocument::new("https://example.com/buy/1", "   ");
        let result = assemble(&doc);

        assert!(!result.success);
        assert_eq!(result.error, Some(ExtractionError::PreconditionFailed));
    }

    #[test]
    fn test_owner_ordinal_mapping() {
        assert_eq!(owners_from_text("First"), Some(1));
        assert_eq!(owners_from_text("2nd"), Some(2));
        assert_eq!(owners_from_text("3"), Some(3));
        assert_eq!(owners_from_text("0"), None);
        assert_eq!(owners_from_text("many"), None);
    }
}

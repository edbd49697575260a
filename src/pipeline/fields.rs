use chrono::Datelike;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::model::RawDocument;

// Field names shared between the field table and the completeness gate
pub const CAR_NAME: &str = "car_name";
pub const PRICE_TEXT: &str = "price_text";
pub const YEAR_OF_PURCHASE: &str = "year_of_purchase";
pub const KM_DRIVEN: &str = "km_driven";
pub const NUMBER_OF_OWNERS: &str = "number_of_owners";
pub const CITY: &str = "city";
pub const OWNER_NAME: &str = "owner_name";
pub const FUEL_TYPE: &str = "fuel_type";
pub const TRANSMISSION: &str = "transmission";
pub const VARIANT: &str = "variant";
pub const COLOR: &str = "color";
pub const REGISTRATION_YEAR: &str = "registration_year";
pub const INSURANCE: &str = "insurance";
pub const RTO: &str = "rto";
pub const ENGINE_DISPLACEMENT: &str = "engine_displacement";
pub const MILEAGE: &str = "mileage";
pub const SEATING_CAPACITY: &str = "seating_capacity";
pub const BODY_TYPE: &str = "body_type";
pub const EMI_STARTS_AT: &str = "emi_starts_at";
pub const NEW_CAR_PRICE: &str = "new_car_price";
pub const DESCRIPTION: &str = "description";

/// Whether a field failing extraction fails the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requiredness {
    Required,
    Optional,
}

/// One way of pulling a field value out of a document. Strategies are
/// pure functions of the parsed document and the fields extracted so far.
#[derive(Clone)]
pub enum Strategy {
    /// Structural lookup: first matching element with non-empty text wins
    Selector(&'static [&'static str]),

    /// Pattern over the document text; capture group 1 (or the whole
    /// match) is the value. Value classes exclude newlines so a match
    /// can never consume the next field's label.
    Pattern(Regex),

    /// Derive from an already-extracted field
    Derived {
        source: &'static str,
        derive: fn(&str) -> Option<String>,
    },
}

/// Static description of one logical field: its name, whether the gate
/// enforces it, the ordered strategies to try, and the value validator
pub struct FieldSpec {
    pub name: &'static str,
    pub requiredness: Requiredness,
    pub strategies: Vec<Strategy>,
    pub validator: fn(&str) -> bool,
}

/// Document parsed once per extraction run; strategies share it
pub struct ParsedDocument {
    html: Html,
    /// Text nodes joined with newlines so pattern strategies get explicit
    /// field-delimiter boundaries to respect
    pub text: String,
}

impl ParsedDocument {
    pub fn parse(doc: &RawDocument) -> Self {
        let html = Html::parse_document(&doc.markup);
        let text = html
            .root_element()
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Self { html, text }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// First element matched by any of the selectors that has non-empty
    /// text content
    pub fn select_first(&self, selectors: &[&str]) -> Option<String> {
        for selector_str in selectors {
            let selector = match Selector::parse(selector_str) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Invalid selector '{}': {:?}", selector_str, e);
                    continue;
                }
            };

            for element in self.html.select(&selector) {
                let text = element
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }

        None
    }
}

/// Run one field's strategy chain: first value that passes the validator
/// wins and later strategies are not attempted
pub fn extract_field(
    parsed: &ParsedDocument,
    spec: &FieldSpec,
    found: &HashMap<&'static str, String>,
) -> Option<String> {
    for (index, strategy) in spec.strategies.iter().enumerate() {
        let value = match strategy {
            Strategy::Selector(selectors) => parsed.select_first(selectors),
            Strategy::Pattern(regex) => match_pattern(&parsed.text, regex),
            Strategy::Derived { source, derive } => found.get(source).and_then(|v| derive(v)),
        };

        if let Some(raw) = value {
            let trimmed = raw.trim();
            if !trimmed.is_empty() && (spec.validator)(trimmed) {
                debug!("Extracted {} using strategy {}", spec.name, index);
                return Some(trimmed.to_string());
            }
        }
    }

    None
}

/// Run the whole field table in order, feeding earlier results to
/// derived strategies
pub fn extract_all(parsed: &ParsedDocument) -> HashMap<&'static str, String> {
    let mut found = HashMap::new();

    for spec in field_specs() {
        if let Some(value) = extract_field(parsed, spec, &found) {
            found.insert(spec.name, value);
        } else if spec.requiredness == Requiredness::Optional {
            debug!("Optional field {} absent", spec.name);
        }
    }

    found
}

fn match_pattern(text: &str, regex: &Regex) -> Option<String> {
    let captures = regex.captures(text)?;
    let matched = captures.get(1).or_else(|| captures.get(0))?;
    Some(matched.as_str().to_string())
}

fn pattern(source: &str) -> Strategy {
    Strategy::Pattern(Regex::new(source).expect("valid field pattern"))
}

/// The declarative field table: name, requiredness, ordered strategies,
/// validator. Built once per process; new document formats extend this
/// table instead of touching the chain control flow.
pub fn field_specs() -> &'static [FieldSpec] {
    static SPECS: OnceLock<Vec<FieldSpec>> = OnceLock::new();
    SPECS.get_or_init(build_field_specs)
}

fn build_field_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec {
            name: CAR_NAME,
            requiredness: Requiredness::Required,
            strategies: vec![
                Strategy::Selector(&[
                    "[data-testid='listing-title']",
                    ".car-title",
                    ".listing-title",
                    "h1",
                ]),
                pattern(r"(?im)^((?:19|20)\d{2}[ \t]+[A-Za-z][A-Za-z0-9 .\-]{2,80})$"),
                Strategy::Selector(&["title"]),
            ],
            validator: validate_title,
        },
        FieldSpec {
            name: PRICE_TEXT,
            requiredness: Requiredness::Required,
            strategies: vec![
                Strategy::Selector(&[
                    "[data-testid='price']",
                    ".listing-price",
                    ".price",
                    ".amount",
                ]),
                pattern(r"(?i)(₹[ \t]*[\d,.]+(?:[ \t]*(?:lakh|crore)s?)?)"),
                pattern(r"(?i)price[ \t:]*([\d,.]+[ \t]*(?:lakh|crore)s?)"),
            ],
            validator: validate_amount_text,
        },
        FieldSpec {
            name: YEAR_OF_PURCHASE,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)(?:purchase|make|mfg\.?|manufactur\w*)[ \t]*year[ \t:\-]*((?:19|20)\d{2})"),
                Strategy::Derived {
                    source: CAR_NAME,
                    derive: derive_leading_year,
                },
            ],
            validator: validate_year,
        },
        FieldSpec {
            name: KM_DRIVEN,
            requiredness: Requiredness::Optional,
            strategies: vec![
                Strategy::Selector(&["[data-testid='km-driven']", ".km-driven"]),
                pattern(r"(?i)([\d,]+)[ \t]*(?:km|kms|kilometers)\b"),
            ],
            validator: validate_km,
        },
        FieldSpec {
            name: NUMBER_OF_OWNERS,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)\b(first|second|third|fourth|1st|2nd|3rd|4th)[ \t]+owner\b"),
                pattern(r"(?i)owners?[ \t:\-]*([1-9])\b"),
            ],
            validator: validate_nonempty_short,
        },
        FieldSpec {
            name: CITY,
            requiredness: Requiredness::Optional,
            strategies: vec![
                Strategy::Selector(&["[data-testid='city']", ".listing-city", ".city"]),
                pattern(r"(?i)(?:located in|location|city)[ \t:\-]+([A-Za-z][A-Za-z ]{1,30})\b"),
            ],
            validator: validate_city,
        },
        FieldSpec {
            name: OWNER_NAME,
            requiredness: Requiredness::Optional,
            strategies: vec![
                Strategy::Selector(&[".owner-name", ".seller-name"]),
                pattern(r"(?i)(?:seller|listed by)[ \t:\-]+([A-Z][A-Za-z .]{1,40})"),
            ],
            validator: validate_person_name,
        },
        FieldSpec {
            name: FUEL_TYPE,
            requiredness: Requiredness::Optional,
            strategies: vec![
                Strategy::Selector(&["[data-testid='fuel-type']", ".fuel-type"]),
                pattern(r"(?i)\b(petrol|diesel|cng|electric|hybrid|lpg)\b"),
            ],
            validator: validate_nonempty_short,
        },
        FieldSpec {
            name: TRANSMISSION,
            requiredness: Requiredness::Optional,
            strategies: vec![
                Strategy::Selector(&["[data-testid='transmission']", ".transmission"]),
                pattern(r"(?i)\b(manual|automatic|amt|cvt|dct)\b"),
            ],
            validator: validate_nonempty_short,
        },
        FieldSpec {
            name: VARIANT,
            requiredness: Requiredness::Optional,
            strategies: vec![
                Strategy::Selector(&[".variant"]),
                pattern(r"(?i)variant[ \t:\-]+([A-Za-z0-9][A-Za-z0-9 .\-]{1,40})"),
            ],
            validator: validate_nonempty_short,
        },
        FieldSpec {
            name: COLOR,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)colou?r[ \t:\-]+([A-Za-z][A-Za-z ]{2,20})\b"),
            ],
            validator: validate_nonempty_short,
        },
        FieldSpec {
            name: REGISTRATION_YEAR,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)reg(?:istration)?\.?[ \t]*year[ \t:\-]*((?:19|20)\d{2})"),
            ],
            validator: validate_year,
        },
        FieldSpec {
            name: INSURANCE,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)insurance[ \t:\-]+([A-Za-z0-9][A-Za-z0-9 ,./\-]{2,60})"),
            ],
            validator: validate_nonempty_short,
        },
        FieldSpec {
            name: RTO,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)\bRTO[ \t:\-]*([A-Z]{2}[- ]?\d{1,2})\b"),
            ],
            validator: validate_rto,
        },
        FieldSpec {
            name: ENGINE_DISPLACEMENT,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)\b(\d{3,4})[ \t]*cc\b"),
            ],
            validator: validate_nonempty_short,
        },
        FieldSpec {
            name: MILEAGE,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)([\d.]+)[ \t]*(?:kmpl|km/l)\b"),
            ],
            validator: validate_nonempty_short,
        },
        FieldSpec {
            name: SEATING_CAPACITY,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)\b([2-9])[ \t]*seater\b"),
                pattern(r"(?i)seating[ \t]*capacity[ \t:\-]*(\d{1,2})\b"),
            ],
            validator: validate_seats,
        },
        FieldSpec {
            name: BODY_TYPE,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)\b(hatchback|sedan|suv|muv|coupe|convertible|pickup|van|wagon)\b"),
            ],
            validator: validate_nonempty_short,
        },
        FieldSpec {
            name: EMI_STARTS_AT,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)EMI[ \t]*(?:starts?[ \t]*(?:at|from))?[ \t:\-]*(₹?[ \t]*[\d,]+)"),
            ],
            validator: validate_amount_text,
        },
        FieldSpec {
            name: NEW_CAR_PRICE,
            requiredness: Requiredness::Optional,
            strategies: vec![
                pattern(r"(?i)new[ \t]*car[ \t]*price[ \t:\-]*(₹?[ \t]*[\d,.]+[ \t]*(?:lakh|crore)?s?)"),
            ],
            validator: validate_amount_text,
        },
        FieldSpec {
            name: DESCRIPTION,
            requiredness: Requiredness::Optional,
            strategies: vec![
                Strategy::Selector(&[
                    "[data-testid='description']",
                    "#description",
                    ".description",
                    ".about-car",
                ]),
            ],
            validator: validate_description,
        },
    ]
}

fn derive_leading_year(car_name: &str) -> Option<String> {
    let first = car_name.split_whitespace().next()?;
    if first.len() == 4
        && first.chars().all(|c| c.is_ascii_digit())
        && (first.starts_with("19") || first.starts_with("20"))
    {
        Some(first.to_string())
    } else {
        None
    }
}

// Validators: trimmed non-empty input is guaranteed by the chain

fn validate_title(value: &str) -> bool {
    value.len() >= 3 && value.len() <= 120
}

fn validate_amount_text(value: &str) -> bool {
    value.len() <= 60 && value.chars().any(|c| c.is_ascii_digit())
}

fn validate_year(value: &str) -> bool {
    match value.parse::<i32>() {
        Ok(year) => {
            let current = chrono::Utc::now().year();
            (1990..=current + 1).contains(&year)
        }
        Err(_) => false,
    }
}

fn validate_km(value: &str) -> bool {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.parse::<u64>() {
        Ok(km) => km > 0 && km <= 2_000_000,
        Err(_) => false,
    }
}

fn validate_nonempty_short(value: &str) -> bool {
    value.len() <= 60
}

fn validate_city(value: &str) -> bool {
    value.len() >= 2 && value.len() <= 40 && value.chars().all(|c| c.is_alphabetic() || c == ' ')
}

fn validate_person_name(value: &str) -> bool {
    value.len() >= 2
        && value.len() <= 60
        && value.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '.')
}

fn validate_rto(value: &str) -> bool {
    value.len() >= 3 && value.len() <= 6
}

fn validate_seats(value: &str) -> bool {
    matches!(value.parse::<u32>(), Ok(seats) if (2..=12).contains(&seats))
}

fn validate_description(value: &str) -> bool {
    value.len() >= 20 && value.len() <= 2000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(markup: &str) -> ParsedDocument {
        let doc = RawDocument::new("https://example.com/listing/1", markup);
        ParsedDocument::parse(&doc)
    }

    fn spec_for(name: &str) -> &'static FieldSpec {
        field_specs()
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("no spec for {}", name))
    }

    #[test]
    fn test_selector_strategy_wins_over_pattern() {
        let parsed = parse(
            r#"<html><body>
                <h1 class="car-title">2022 Jeep Compass</h1>
                <p>2019 Honda City listed nearby</p>
            </body></html>"#,
        );

        let value = extract_field(&parsed, spec_for(CAR_NAME), &HashMap::new());
        assert_eq!(value.as_deref(), Some("2022 Jeep Compass"));
    }

    #[test]
    fn test_pattern_fallback_when_selectors_miss() {
        let parsed = parse("<html><body><div>2020 Hyundai Creta SX</div></body></html>");
        // No h1/title markup, the standalone-line pattern picks it up
        let value = extract_field(&parsed, spec_for(CAR_NAME), &HashMap::new());
        assert_eq!(value.as_deref(), Some("2020 Hyundai Creta SX"));
    }

    #[test]
    fn test_derived_year_from_car_name() {
        let parsed = parse("<html><body><p>no year label anywhere</p></body></html>");
        let mut found = HashMap::new();
        found.insert(CAR_NAME, "2022 Jeep Compass".to_string());

        let value = extract_field(&parsed, spec_for(YEAR_OF_PURCHASE), &found);
        assert_eq!(value.as_deref(), Some("2022"));
    }

    #[test]
    fn test_labeled_year_beats_derived_year() {
        let parsed = parse("<html><body><p>Purchase Year: 2021</p></body></html>");
        let mut found = HashMap::new();
        found.insert(CAR_NAME, "2022 Jeep Compass".to_string());

        let value = extract_field(&parsed, spec_for(YEAR_OF_PURCHASE), &found);
        assert_eq!(value.as_deref(), Some("2021"));
    }

    #[test]
    fn test_pattern_does_not_cross_field_boundaries() {
        // Label and next field sit in separate elements; the city value
        // class must not swallow the following label
        let parsed = parse(
            r#"<html><body>
                <span>Location: Pune</span>
                <span>Fuel Petrol</span>
            </body></html>"#,
        );

        let value = extract_field(&parsed, spec_for(CITY), &HashMap::new());
        assert_eq!(value.as_deref(), Some("Pune"));
    }

    #[test]
    fn test_invalid_values_fall_through_to_absence() {
        let parsed = parse("<html><body><p>Purchase Year: 1200</p></body></html>");
        let value = extract_field(&parsed, spec_for(YEAR_OF_PURCHASE), &HashMap::new());
        assert_eq!(value, None);
    }

    #[test]
    fn test_km_driven_pattern() {
        let parsed = parse("<html><body><p>Driven 45,000 km since new</p></body></html>");
        let value = extract_field(&parsed, spec_for(KM_DRIVEN), &HashMap::new());
        assert_eq!(value.as_deref(), Some("45,000"));
    }

    #[test]
    fn test_owner_ordinal_pattern() {
        let parsed = parse("<html><body><p>First Owner, well maintained</p></body></html>");
        let value = extract_field(&parsed, spec_for(NUMBER_OF_OWNERS), &HashMap::new());
        assert_eq!(value.as_deref(), Some("First"));
    }

    #[test]
    fn test_rto_shape() {
        let parsed = parse("<html><body><p>RTO: MH-12</p></body></html>");
        let value = extract_field(&parsed, spec_for(RTO), &HashMap::new());
        assert_eq!(value.as_deref(), Some("MH-12"));
    }

    #[test]
    fn test_extract_all_collects_table_in_order() {
        let parsed = parse(
            r#"<html><body>
                <h1>2022 Jeep Compass</h1>
                <div class="price">₹15.75 Lakh</div>
                <p>45,000 km | Diesel | Automatic | First Owner</p>
                <p>Location: Mumbai</p>
            </body></html>"#,
        );

        let found = extract_all(&parsed);
        assert_eq!(found.get(CAR_NAME).map(String::as_str), Some("2022 Jeep Compass"));
        assert_eq!(found.get(PRICE_TEXT).map(String::as_str), Some("₹15.75 Lakh"));
        assert_eq!(found.get(KM_DRIVEN).map(String::as_str), Some("45,000"));
        assert_eq!(found.get(FUEL_TYPE).map(String::as_str), Some("Diesel"));
        assert_eq!(found.get(TRANSMISSION).map(String::as_str), Some("Automatic"));
        assert_eq!(found.get(CITY).map(String::as_str), Some("Mumbai"));
        // Derived from the car name
        assert_eq!(found.get(YEAR_OF_PURCHASE).map(String::as_str), Some("2022"));
    }
}

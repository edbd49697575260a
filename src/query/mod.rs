use tracing::debug;

use crate::model::{ExtractedListing, FilterCriteria};

/// Apply search criteria to a collection of listings.
///
/// Every criterion compiles to an independent predicate; an unset or
/// empty criterion always passes. The overall predicate is the AND of
/// all of them. One linear pass, input order preserved, no state.
pub fn filter_listings<'a>(
    records: &'a [ExtractedListing],
    criteria: &FilterCriteria,
) -> Vec<&'a ExtractedListing> {
    let matched: Vec<&ExtractedListing> = records
        .iter()
        .filter(|record| matches(record, criteria))
        .collect();

    debug!("Filter matched {}/{} listings", matched.len(), records.len());
    matched
}

fn matches(record: &ExtractedListing, criteria: &FilterCriteria) -> bool {
    if !set_matches(&criteria.brands, Some(record.brand())) {
        return false;
    }
    if !set_matches(&criteria.cities, record.city.as_deref()) {
        return false;
    }
    if !set_matches(&criteria.fuel_types, record.fuel_type.as_deref()) {
        return false;
    }
    if !set_matches(&criteria.transmissions, record.transmission.as_deref()) {
        return false;
    }

    if let Some(min) = criteria.min_price {
        if record.price < min {
            return false;
        }
    }
    if let Some(max) = criteria.max_price {
        if record.price > max {
            return false;
        }
    }

    if let Some(min) = criteria.min_year {
        if record.year_of_purchase < min {
            return false;
        }
    }
    if let Some(max) = criteria.max_year {
        if record.year_of_purchase > max {
            return false;
        }
    }

    if let Some(query) = criteria.query.as_deref() {
        let query = query.trim().to_lowercase();
        if !query.is_empty() {
            let haystack = format!(
                "{} {} {}",
                record.brand(),
                record.model(),
                record.city.as_deref().unwrap_or("")
            )
            .to_lowercase();

            if !haystack.contains(&query) {
                return false;
            }
        }
    }

    true
}

/// Case-insensitive set membership; an empty set always passes, an
/// absent record value never matches a non-empty set
fn set_matches(wanted: &[String], value: Option<&str>) -> bool {
    if wanted.is_empty() {
        return true;
    }

    match value {
        Some(value) => {
            let value = value.to_lowercase();
            wanted.iter().any(|w| w.to_lowercase() == value)
        }
        None => false,
    }
}

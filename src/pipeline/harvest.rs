use scraper::Selector;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::fields::ParsedDocument;

/// Bounds on harvested content, after trimming
const FEATURE_MIN_LEN: usize = 3;
const FEATURE_MAX_LEN: usize = 100;
const SPEC_KEY_MAX_LEN: usize = 50;
const SPEC_VALUE_MAX_LEN: usize = 100;

/// Container class/id fragments that mark a list as feature content
const FEATURE_REGION_HINTS: &[&str] = &["feature", "amenit", "highlight", "equipment", "spec"];

/// Placeholder cell values that carry no information
const EMPTY_VALUES: &[&str] = &["-", "--", "N/A", "NA", "TBD"];

/// Common vehicle features scanned for verbatim (case-insensitive) when
/// no structural region yields anything
pub const FEATURE_VOCABULARY: &[&str] = &[
    "Power Steering",
    "Power Windows",
    "Air Conditioning",
    "ABS",
    "Airbags",
    "Alloy Wheels",
    "Bluetooth",
    "Touchscreen",
    "Rear Camera",
    "Parking Sensors",
    "Keyless Entry",
    "Cruise Control",
    "Sunroof",
    "Fog Lamps",
    "Central Locking",
    "Music System",
    "Leather Seats",
    "Push Button Start",
];

/// Loosely-structured content harvested from one document. Both
/// collections may legitimately be empty; harvesting never fails.
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    /// Feature strings, first-occurrence order, exact-text deduplicated
    pub features: Vec<String>,

    /// Key/value specification pairs
    pub specifications: BTreeMap<String, String>,
}

/// Scan list-like and table-like regions for features and specifications
pub fn harvest(parsed: &ParsedDocument) -> Harvest {
    let mut features = harvest_features(parsed);
    let specifications = harvest_specifications(parsed);

    if features.is_empty() {
        features = vocabulary_fallback(&parsed.text);
        if !features.is_empty() {
            debug!("Feature regions empty, vocabulary fallback found {}", features.len());
        }
    }

    Harvest {
        features,
        specifications,
    }
}

fn harvest_features(parsed: &ParsedDocument) -> Vec<String> {
    let list_selector = Selector::parse("ul, ol").expect("valid list selector");
    let item_selector = Selector::parse("li").expect("valid item selector");

    let mut seen: HashSet<String> = HashSet::new();
    let mut features = Vec::new();

    for list in parsed.html().select(&list_selector) {
        let hints = format!(
            "{} {}",
            list.value().attr("class").unwrap_or(""),
            list.value().attr("id").unwrap_or("")
        )
        .to_lowercase();

        if !FEATURE_REGION_HINTS.iter().any(|hint| hints.contains(hint)) {
            continue;
        }

        for item in list.select(&item_selector) {
            let text = item
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            let trimmed = text.trim();

            if trimmed.len() < FEATURE_MIN_LEN || trimmed.len() > FEATURE_MAX_LEN {
                continue;
            }

            if seen.insert(trimmed.to_string()) {
                features.push(trimmed.to_string());
            }
        }
    }

    features
}

fn harvest_specifications(parsed: &ParsedDocument) -> BTreeMap<String, String> {
    let mut specs = BTreeMap::new();

    // Table rows with a label cell and a value cell
    let row_selector = Selector::parse("table tr").expect("valid row selector");
    let cell_selector = Selector::parse("td, th").expect("valid cell selector");

    for row in parsed.html().select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| {
                cell.text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        if cells.len() >= 2 {
            insert_spec(&mut specs, &cells[0], &cells[1]);
        }
    }

    // Definition lists pair dt terms with dd values
    let dl_selector = Selector::parse("dl").expect("valid dl selector");
    let dt_selector = Selector::parse("dt").expect("valid dt selector");
    let dd_selector = Selector::parse("dd").expect("valid dd selector");

    for dl in parsed.html().select(&dl_selector) {
        let terms: Vec<_> = dl.select(&dt_selector).collect();
        let values: Vec<_> = dl.select(&dd_selector).collect();

        for (term, value) in terms.iter().zip(values.iter()) {
            let key = term.text().collect::<String>();
            let val = value.text().collect::<String>();
            insert_spec(&mut specs, key.trim(), val.trim());
        }
    }

    specs
}

fn insert_spec(specs: &mut BTreeMap<String, String>, key: &str, value: &str) {
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() || value.is_empty() {
        return;
    }
    if key.len() >= SPEC_KEY_MAX_LEN || value.len() >= SPEC_VALUE_MAX_LEN {
        return;
    }
    if EMPTY_VALUES.contains(&value) {
        return;
    }

    specs.entry(key.to_string()).or_insert_with(|| value.to_string());
}

fn vocabulary_fallback(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    FEATURE_VOCABULARY
        .iter()
        .filter(|term| lowered.contains(&term.to_lowercase()))
        .map(|term| term.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawDocument;

    fn parse(markup: &str) -> ParsedDocument {
        let doc = RawDocument::new("https://example.com/listing/1", markup);
        ParsedDocument::parse(&doc)
    }

    #[test]
    fn test_features_from_hinted_list() {
        let parsed = parse(
            r#"<html><body>
                <ul class="nav-menu"><li>Home</li><li>Sell Car</li></ul>
                <ul class="feature-list">
                    <li>Sunroof</li>
                    <li>Alloy Wheels</li>
                    <li>Sunroof</li>
                    <li>ab</li>
                </ul>
            </body></html>"#,
        );

        let result = harvest(&parsed);
        // Nav list skipped, duplicate and too-short items dropped
        assert_eq!(result.features, vec!["Sunroof", "Alloy Wheels"]);
    }

    #[test]
    fn test_specifications_from_table_and_dl() {
        let parsed = parse(
            r#"<html><body>
                <table class="spec-table">
                    <tr><th>Engine</th><td>1956 cc</td></tr>
                    <tr><th>Max Power</th><td>170 bhp</td></tr>
                    <tr><th>Empty</th><td>N/A</td></tr>
                </table>
                <dl>
                    <dt>Boot Space</dt><dd>438 litres</dd>
                </dl>
            </body></html>"#,
        );

        let result = harvest(&parsed);
        assert_eq!(result.specifications.get("Engine").map(String::as_str), Some("1956 cc"));
        assert_eq!(result.specifications.get("Max Power").map(String::as_str), Some("170 bhp"));
        assert_eq!(result.specifications.get("Boot Space").map(String::as_str), Some("438 litres"));
        assert!(!result.specifications.contains_key("Empty"));
    }

    #[test]
    fn test_vocabulary_fallback_when_no_regions() {
        let parsed = parse(
            "<html><body><p>Comes with power steering, ABS and a touchscreen unit.</p></body></html>",
        );

        let result = harvest(&parsed);
        assert!(result.features.contains(&"Power Steering".to_string()));
        assert!(result.features.contains(&"ABS".to_string()));
        assert!(result.features.contains(&"Touchscreen".to_string()));
        assert!(!result.features.contains(&"Sunroof".to_string()));
    }

    #[test]
    fn test_harvest_never_fails_on_empty_document() {
        let parsed = parse("<html><body></body></html>");
        let result = harvest(&parsed);
        assert!(result.features.is_empty());
        assert!(result.specifications.is_empty());
    }

    #[test]
    fn test_overlong_spec_values_dropped() {
        let long_value = "x".repeat(120);
        let markup = format!(
            "<html><body><table><tr><td>Notes</td><td>{}</td></tr></table></body></html>",
            long_value
        );
        let parsed = parse(&markup);
        let result = harvest(&parsed);
        assert!(result.specifications.is_empty());
    }
}

use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;

use crate::model::RawDocument;

/// Maximum number of accepted images per listing
pub const MAX_IMAGES: usize = 20;

/// Minimum plausible length for an image URL
const MIN_URL_LENGTH: usize = 10;

/// Substrings that mark a candidate as page chrome rather than vehicle
/// imagery; matched case-insensitively against URL, alt text and class
/// hints. The deny list always wins over the allow list.
pub const DEFAULT_DENY_SUBSTRINGS: &[&str] = &[
    "logo",
    "icon",
    "sprite",
    "placeholder",
    "avatar",
    "banner",
    "advert",
    "/ad/",
    "/ads/",
    "button",
    "arrow",
    "play",
    "video",
    "youtube",
    "social",
    "header",
    "footer",
    "menu",
    "nav",
    "badge",
    "tag",
    "1x1",
    "pixel",
    "tracking",
    "blank",
];

/// Keywords at least one of which must appear in the URL for a candidate
/// to be accepted as vehicle imagery
pub const DEFAULT_ALLOW_KEYWORDS: &[&str] = &[
    "car",
    "vehicle",
    "auto",
    "gallery",
    "carousel",
    "listing",
    "exterior",
    "interior",
    "image",
    "img",
    "photo",
    "media",
    "cdn",
    "upload",
];

/// An unvalidated image reference collected from the document
#[derive(Debug, Clone, Default)]
pub struct ImageCandidate {
    /// Reference exactly as it appears in the markup
    pub raw_ref: String,

    /// Alt text of the element, if any
    pub alt_text: String,

    /// Concatenated class attribute values of the element
    pub class_hints: String,
}

/// Resolve a raw image reference against the document origin.
///
/// Protocol-relative references get an https prefix, root-relative ones
/// get the origin; absolute http(s) URLs pass through unchanged. Anything
/// else is rejected.
pub fn resolve(raw_ref: &str, origin: Option<&str>) -> Option<String> {
    let trimmed = raw_ref.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with("//") {
        return Some(format!("https:{}", trimmed));
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Some(trimmed.to_string());
    }

    if trimmed.starts_with('/') {
        return origin.map(|base| format!("{}{}", base, trimmed));
    }

    None
}

/// Screening tables for image candidates, kept as data so new platforms
/// can extend them through configuration
#[derive(Debug, Clone)]
pub struct ImageFilter {
    deny_substrings: Vec<String>,
    allow_keywords: Vec<String>,
    max_images: usize,
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self {
            deny_substrings: DEFAULT_DENY_SUBSTRINGS.iter().map(|s| s.to_string()).collect(),
            allow_keywords: DEFAULT_ALLOW_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            max_images: MAX_IMAGES,
        }
    }
}

impl ImageFilter {
    pub fn new(deny_substrings: Vec<String>, allow_keywords: Vec<String>, max_images: usize) -> Self {
        Self {
            deny_substrings: deny_substrings.iter().map(|s| s.to_lowercase()).collect(),
            allow_keywords: allow_keywords.iter().map(|s| s.to_lowercase()).collect(),
            max_images,
        }
    }

    /// Decide whether a resolved candidate is plausible vehicle imagery
    pub fn accept(&self, resolved_url: &str, candidate: &ImageCandidate) -> bool {
        if resolved_url.len() < MIN_URL_LENGTH {
            return false;
        }

        let url = resolved_url.to_lowercase();
        let alt = candidate.alt_text.to_lowercase();
        let hints = candidate.class_hints.to_lowercase();

        for denied in &self.deny_substrings {
            if url.contains(denied.as_str())
                || alt.contains(denied.as_str())
                || hints.contains(denied.as_str())
            {
                debug!("Rejecting image candidate '{}' (deny substring '{}')", resolved_url, denied);
                return false;
            }
        }

        self.allow_keywords.iter().any(|keyword| url.contains(keyword.as_str()))
    }

    /// Resolve, screen, deduplicate and cap a batch of candidates.
    ///
    /// The dedup set is local to the call; order of first acceptance is
    /// preserved. An empty result is a valid outcome, surfaced later by
    /// the completeness gate.
    pub fn screen(&self, candidates: &[ImageCandidate], origin: Option<&str>) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut accepted = Vec::new();

        for candidate in candidates {
            if accepted.len() >= self.max_images {
                break;
            }

            let resolved = match resolve(&candidate.raw_ref, origin) {
                Some(url) => url,
                None => continue,
            };

            if !seen.insert(resolved.clone()) {
                continue;
            }

            if self.accept(&resolved, candidate) {
                accepted.push(resolved);
            }
        }

        accepted
    }
}

/// Collect raw image candidates from every img element in the document,
/// honouring lazy-load attributes the big listing platforms use
pub fn collect_candidates(doc: &RawDocument) -> Vec<ImageCandidate> {
    let html = Html::parse_document(&doc.markup);
    let selector = Selector::parse("img").expect("valid img selector");

    let mut candidates = Vec::new();
    for element in html.select(&selector) {
        let raw_ref = element
            .value()
            .attr("src")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| element.value().attr("data-src"))
            .or_else(|| element.value().attr("data-lazy-src"))
            .or_else(|| element.value().attr("data-original"))
            .unwrap_or("")
            .to_string();

        if raw_ref.trim().is_empty() {
            continue;
        }

        candidates.push(ImageCandidate {
            raw_ref,
            alt_text: element.value().attr("alt").unwrap_or("").to_string(),
            class_hints: element.value().attr("class").unwrap_or("").to_string(),
        });
    }

    candidates
}

/// Full image pipeline for one document: collect, resolve, screen
pub fn extract_images(doc: &RawDocument, filter: &ImageFilter) -> Vec<String> {
    let origin = doc.origin();
    let candidates = collect_candidates(doc);
    debug!("Collected {} image candidates from {}", candidates.len(), doc.source_url);
    filter.screen(&candidates, origin.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(raw_ref: &str) -> ImageCandidate {
        ImageCandidate {
            raw_ref: raw_ref.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_protocol_relative() {
        assert_eq!(
            resolve("//cdn.example.com/cars/1.jpg", Some("https://example.com")),
            Some("https://cdn.example.com/cars/1.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_root_relative() {
        assert_eq!(
            resolve("/media/cars/1.jpg", Some("https://example.com")),
            Some("https://example.com/media/cars/1.jpg".to_string())
        );
        // No origin available means a root-relative ref cannot resolve
        assert_eq!(resolve("/media/cars/1.jpg", None), None);
    }

    #[test]
    fn test_resolve_absolute_passthrough_and_rejects() {
        assert_eq!(
            resolve("https://cdn.example.com/cars/1.jpg", None),
            Some("https://cdn.example.com/cars/1.jpg".to_string())
        );
        assert_eq!(resolve("data:image/png;base64,AAAA", Some("https://x.com")), None);
        assert_eq!(resolve("cars/relative.jpg", Some("https://x.com")), None);
        assert_eq!(resolve("  ", Some("https://x.com")), None);
    }

    #[test]
    fn test_deny_list_wins_over_allow_list() {
        let filter = ImageFilter::default();
        // Contains both "car" (allowed) and "logo" (denied)
        assert!(!filter.accept("https://cdn.example.com/car-logo.png", &candidate("x")));
    }

    #[test]
    fn test_accept_requires_allow_keyword() {
        let filter = ImageFilter::default();
        assert!(filter.accept("https://cdn.example.com/gallery/swift-front.jpg", &candidate("x")));
        assert!(!filter.accept("https://cdn.example.com/x/y.jpg", &candidate("x")));
    }

    #[test]
    fn test_deny_matches_alt_and_class_hints() {
        let filter = ImageFilter::default();
        let mut c = candidate("x");
        c.alt_text = "Site Logo".to_string();
        assert!(!filter.accept("https://cdn.example.com/cars/1.jpg", &c));

        let mut c = candidate("x");
        c.class_hints = "thumb placeholder".to_string();
        assert!(!filter.accept("https://cdn.example.com/cars/1.jpg", &c));
    }

    #[test]
    fn test_short_urls_rejected() {
        let filter = ImageFilter::default();
        assert!(!filter.accept("car.jpg", &candidate("x")));
    }

    #[test]
    fn test_screen_dedups_and_caps() {
        let filter = ImageFilter::new(vec![], vec!["car".to_string()], 3);
        let candidates: Vec<ImageCandidate> = (0..10)
            .map(|i| candidate(&format!("https://cdn.example.com/cars/{}.jpg", i % 4)))
            .collect();

        let screened = filter.screen(&candidates, None);
        assert_eq!(screened.len(), 3);
        assert_eq!(screened[0], "https://cdn.example.com/cars/0.jpg");
        assert_eq!(screened[1], "https://cdn.example.com/cars/1.jpg");
        assert_eq!(screened[2], "https://cdn.example.com/cars/2.jpg");
    }

    #[test]
    fn test_screen_empty_when_nothing_accepted() {
        let filter = ImageFilter::default();
        let screened = filter.screen(&[candidate("https://cdn.example.com/logo.png")], None);
        assert!(screened.is_empty());
    }

    #[test]
    fn test_collect_candidates_reads_lazy_attributes() {
        let doc = RawDocument::new(
            "https://example.com/listing/1",
            r#"<html><body>
                <img src="/media/cars/front.jpg" alt="Front view" class="gallery-img">
                <img data-src="//cdn.example.com/cars/rear.jpg" alt="">
                <img src="">
            </body></html>"#,
        );

        let candidates = collect_candidates(&doc);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].raw_ref, "/media/cars/front.jpg");
        assert_eq!(candidates[0].alt_text, "Front view");
        assert_eq!(candidates[1].raw_ref, "//cdn.example.com/cars/rear.jpg");
    }
}

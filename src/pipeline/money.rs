use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Rupee multiplier for the "lakh" denomination word
const LAKH: f64 = 100_000.0;

/// Rupee multiplier for the "crore" denomination word
const CRORE: f64 = 10_000_000.0;

fn numeral_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid numeral pattern"))
}

fn denomination_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Anchored at the start of the text right after the numeral; only
    // spaces/tabs may separate the word from the numeral it scales
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[ \t]*(lakh|lac|crore)s?\b").expect("valid denomination pattern")
    })
}

/// Parse a free-text amount expression into the smallest currency unit.
///
/// Recognizes a denomination word immediately following the numeral
/// ("15.75 Lakh", "1.2 Crore"), or plain digits with comma grouping
/// ("15,75,000"). A denomination word elsewhere in the text does not
/// attach to the numeral. Returns 0 when no numeral is present; callers
/// treat 0 as "not found" since the domain never produces a zero-priced
/// listing. A numeral that carries both comma grouping and an attached
/// denomination word is ambiguous and is also treated as not found
/// rather than multiplied twice.
pub fn parse_amount(text: &str) -> u64 {
    let matched = match numeral_re().find(text) {
        Some(m) => m,
        None => return 0,
    };
    let numeral = matched.as_str();

    let after_numeral = &text[matched.end()..];
    let multiplier = match denomination_re().captures(after_numeral) {
        Some(caps) => match caps.get(1) {
            Some(word) if word.as_str().eq_ignore_ascii_case("crore") => CRORE,
            _ => LAKH,
        },
        None => 1.0,
    };

    // Comma grouping together with a denomination word is ambiguous
    if multiplier != 1.0 && numeral.contains(',') {
        debug!("Ambiguous amount '{}': comma grouping with denomination word", text.trim());
        return 0;
    }

    if multiplier == 1.0 {
        // Plain digits: commas are grouping separators, decimals truncate
        let digits: String = numeral.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
        let whole = digits.split('.').next().unwrap_or("");
        return whole.parse::<u64>().unwrap_or(0);
    }

    match numeral.parse::<f64>() {
        Ok(value) if value >= 0.0 => (value * multiplier).round() as u64,
        _ => 0,
    }
}

/// Format an amount using Indian digit grouping with a rupee prefix.
///
/// The rightmost three digits form the final group; any remaining digits
/// are grouped in pairs from the right: 1575000 -> "₹15,75,000".
pub fn format_inr(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{}", digits);
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<String> = Vec::new();
    let head_chars: Vec<char> = head.chars().collect();
    let mut idx = head_chars.len();
    while idx > 0 {
        let start = idx.saturating_sub(2);
        groups.push(head_chars[start..idx].iter().collect());
        idx = start;
    }
    groups.reverse();
    groups.push(tail.to_string());

    format!("₹{}", groups.join(","))
}

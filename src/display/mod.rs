//! Presentation-oriented derivations consumed by the front end. Pure
//! functions only; never used for identity comparison.

pub use crate::pipeline::money::format_inr;

/// Mask an owner name for display: "John Doe" -> "John D.".
///
/// A single token is returned unchanged, an empty input stays empty.
pub fn mask_owner_name(full_name: &str) -> String {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, .., last] => {
            let initial = last.chars().next().map(String::from).unwrap_or_default();
            format!("{} {}.", first, initial)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_two_tokens() {
        assert_eq!(mask_owner_name("John Doe"), "John D.");
    }

    #[test]
    fn test_mask_many_tokens_uses_last() {
        assert_eq!(mask_owner_name("Anil Kumar Sharma"), "Anil S.");
    }

    #[test]
    fn test_mask_single_token_unchanged() {
        assert_eq!(mask_owner_name("Madonna"), "Madonna");
    }

    #[test]
    fn test_mask_empty_and_whitespace() {
        assert_eq!(mask_owner_name(""), "");
        assert_eq!(mask_owner_name("   "), "");
    }

    #[test]
    fn test_mask_collapses_whitespace_runs() {
        assert_eq!(mask_owner_name("  Priya   Nair  "), "Priya N.");
    }
}

//! Search: turning user input into FTS5 queries and marking matches.

pub mod highlight;

pub use highlight::highlight;

use crate::error::{MboxError, Result};

/// Quote a search term so FTS5 treats it as one literal phrase.
///
/// Embedded double quotes are doubled, so operators (`AND`, `OR`, `NOT`,
/// `NEAR`), prefix stars, column filters and parentheses inside the term
/// are matched as text instead of being interpreted.
pub fn sanitize_query(term: &str) -> Result<String> {
    if term.trim().is_empty() {
        return Err(MboxError::InvalidQuery("search term is empty".into()));
    }
    Ok(format!("\"{}\"", term.replace('"', "\"\"")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_term_is_quoted() {
        assert_eq!(sanitize_query("invoice").unwrap(), "\"invoice\"");
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        assert_eq!(
            sanitize_query("say \"hi\" now").unwrap(),
            "\"say \"\"hi\"\" now\""
        );
    }

    #[test]
    fn test_operators_stay_inside_phrase() {
        assert_eq!(sanitize_query("a OR b*").unwrap(), "\"a OR b*\"");
    }

    #[test]
    fn test_empty_term_is_rejected() {
        assert!(matches!(
            sanitize_query("   "),
            Err(MboxError::InvalidQuery(_))
        ));
    }
}

// Wireline Resource Name parsing (spec GLOSSARY, §4.4).
//
// `wrn://<authority>[.<parent>…][/<path>]` — the authority is everything
// between `wrn://` and the first `/` (it may itself contain dots, naming a
// sub-authority chain); the path is whatever follows, including the
// leading slash. Parsing is hand-rolled (rather than pulled from a
// general-purpose URL crate) because WRN authorities intentionally permit
// characters a strict URL host grammar would reject, matching the
// original's direct use of `net/url.Parse` plus a round-trip check against
// the literal input.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WrnError {
    #[error("invalid WRN: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedWrn {
    /// Full authority name, e.g. `team.alice` for a sub-authority.
    pub authority: String,
    /// Path suffix including the leading slash, empty string if none.
    pub path: String,
}

const SCHEME_PREFIX: &str = "wrn://";

pub fn parse_wrn(wrn: &str) -> Result<ParsedWrn, WrnError> {
    let rest = wrn
        .strip_prefix(SCHEME_PREFIX)
        .ok_or_else(|| WrnError::Invalid(wrn.to_string()))?;

    if rest.is_empty() {
        return Err(WrnError::Invalid(wrn.to_string()));
    }

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    if authority.is_empty() {
        return Err(WrnError::Invalid(wrn.to_string()));
    }

    let parsed = ParsedWrn {
        authority: authority.to_string(),
        path: path.to_string(),
    };

    // Round-trip check, matching the original's
    // `fmt.Sprintf("wrn://%s%s", name, parsedWRN.RequestURI()) != wrn` guard.
    if parsed.to_string() != wrn {
        return Err(WrnError::Invalid(wrn.to_string()));
    }

    Ok(parsed)
}

impl std::fmt::Display for ParsedWrn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", SCHEME_PREFIX, self.authority, self.path)
    }
}

/// Parses a bare root-authority reservation name (`ReserveAuthority` takes
/// a name, not a full WRN) into `wrn://<name>` form and validates it.
pub fn parse_authority_name(name: &str) -> Result<ParsedWrn, WrnError> {
    let wrn = format!("{}{}", SCHEME_PREFIX, name);
    parse_wrn(&wrn)
}

/// Splits a (possibly multi-label) authority name into its root label and
/// the immediate parent authority name, if any.
pub fn split_parent(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((_root, parent)) => (Some(parent), name),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_wrn() {
        let parsed = parse_wrn("wrn://alice/path/to/thing").unwrap();
        assert_eq!(parsed.authority, "alice");
        assert_eq!(parsed.path, "/path/to/thing");
    }

    #[test]
    fn parses_wrn_with_no_path() {
        let parsed = parse_wrn("wrn://alice").unwrap();
        assert_eq!(parsed.authority, "alice");
        assert_eq!(parsed.path, "");
    }

    #[test]
    fn parses_sub_authority_wrn() {
        let parsed = parse_wrn("wrn://team.alice/bar").unwrap();
        assert_eq!(parsed.authority, "team.alice");
        assert_eq!(parsed.path, "/bar");
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(parse_wrn("alice/bar").is_err());
    }

    #[test]
    fn split_parent_for_root_is_none() {
        assert_eq!(split_parent("alice"), (None, "alice"));
    }

    #[test]
    fn split_parent_for_sub_authority() {
        assert_eq!(split_parent("team.alice"), (Some("alice"), "team.alice"));
    }
}

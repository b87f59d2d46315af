//! Which session(s) a proxy call targets: the current one, a literal id, or a glob.

use globset::{Glob, GlobMatcher};

use crate::error::SessionError;

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// Target of `notify` / `limit_queue`.
#[derive(Debug, Clone)]
pub enum SessionSelector {
    /// Session of the in-flight transaction.
    Current,
    /// One literal session id; created on first use.
    Exact(String),
    /// Every known session id matching the glob; never creates sessions.
    Pattern(GlobMatcher),
}

impl SessionSelector {
    /// `None` selects the current session; text with glob metacharacters is a pattern.
    pub fn parse(raw: Option<&str>) -> Result<Self, SessionError> {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(Self::Current);
        };
        if !raw.contains(GLOB_META) {
            return Ok(Self::Exact(raw.to_string()));
        }
        let glob = Glob::new(raw).map_err(|source| SessionError::InvalidSessionPattern {
            pattern: raw.to_string(),
            source,
        })?;
        Ok(Self::Pattern(glob.compile_matcher()))
    }

    /// Like [`parse`](Self::parse), but a selector naming a known session is always
    /// that session, even when the id contains glob metacharacters.
    pub fn parse_among(raw: Option<&str>, known: &[String]) -> Result<Self, SessionError> {
        if let Some(id) = raw
            .map(str::trim)
            .filter(|raw| known.iter().any(|id| id.as_str() == *raw))
        {
            return Ok(Self::Exact(id.to_string()));
        }
        Self::parse(raw)
    }

    /// Expand to concrete ids, given the current session and every known id.
    pub fn resolve<'a>(
        &self,
        current: &str,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        match self {
            Self::Current => vec![current.to_string()],
            Self::Exact(id) => vec![id.clone()],
            Self::Pattern(matcher) => known
                .into_iter()
                .filter(|id| matcher.is_match(id))
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_selects_current() {
        for raw in [None, Some(""), Some("   ")] {
            let selector = SessionSelector::parse(raw).expect("parse");
            assert_eq!(selector.resolve("foo", ["bar"]), vec!["foo".to_string()]);
        }
    }

    #[test]
    fn literal_id_does_not_need_to_exist() {
        let selector = SessionSelector::parse(Some("client1")).expect("parse");
        assert_eq!(
            selector.resolve("foo", Vec::<&str>::new()),
            vec!["client1".to_string()]
        );
    }

    #[test]
    fn glob_fans_out_over_known_ids_in_order() {
        let selector = SessionSelector::parse(Some("client*")).expect("parse");
        let known = ["client2", "admin", "client1"];
        assert_eq!(
            selector.resolve("admin", known),
            vec!["client2".to_string(), "client1".to_string()]
        );
    }

    #[test]
    fn known_id_with_metacharacters_is_literal() {
        let known = vec!["user{1}".to_string(), "room[".to_string(), "user1".to_string()];
        for id in ["user{1}", "room["] {
            let selector = SessionSelector::parse_among(Some(id), &known).expect("parse");
            assert_eq!(
                selector.resolve("admin", known.iter().map(String::as_str)),
                vec![id.to_string()]
            );
        }
        let selector = SessionSelector::parse_among(Some("user*"), &known).expect("parse");
        assert_eq!(
            selector.resolve("admin", known.iter().map(String::as_str)),
            vec!["user{1}".to_string(), "user1".to_string()]
        );
    }

    #[test]
    fn malformed_glob_is_rejected() {
        let err = SessionSelector::parse(Some("client[")).expect_err("bad glob");
        assert!(matches!(err, SessionError::InvalidSessionPattern { .. }));
    }
}

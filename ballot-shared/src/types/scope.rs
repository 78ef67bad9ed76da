use serde::{Deserialize, Serialize};
use std::fmt;

/// The named partition a vote belongs to.
///
/// The unscoped partition is represented by `None`. A blank name is treated as
/// unscoped so that the empty string can serve as the unscoped key in a
/// serialized [`VoteSummary`](crate::types::VoteSummary).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub struct Scope(Option<String>);

impl Scope {
    pub fn unscoped() -> Self {
        Self(None)
    }

    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Self(None)
        } else {
            Self(Some(name))
        }
    }

    pub fn is_unscoped(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Key under which this scope is stored in a serialized summary.
    pub fn summary_key(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }
}

impl From<Option<String>> for Scope {
    fn from(value: Option<String>) -> Self {
        value.map(Self::named).unwrap_or_default()
    }
}

impl From<Option<&str>> for Scope {
    fn from(value: Option<&str>) -> Self {
        value.map(Self::named).unwrap_or_default()
    }
}

impl From<&str> for Scope {
    fn from(value: &str) -> Self {
        Self::named(value)
    }
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        Self::named(value)
    }
}

impl From<Scope> for Option<String> {
    fn from(value: Scope) -> Self {
        value.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(name) => f.write_str(name),
            None => f.write_str("<unscoped>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_scope_is_unscoped() {
        assert_eq!(Scope::named(""), Scope::unscoped());
        assert!(Scope::from(Some("")).is_unscoped());
        assert_eq!(Scope::unscoped().summary_key(), "");
    }

    #[test]
    fn test_scope_deserializes_from_null_and_string() {
        let unscoped: Scope = serde_json::from_str("null").unwrap();
        let blank: Scope = serde_json::from_str("\"\"").unwrap();
        let rank: Scope = serde_json::from_str("\"rank\"").unwrap();

        assert!(unscoped.is_unscoped());
        assert!(blank.is_unscoped());
        assert_eq!(rank.as_deref(), Some("rank"));
    }
}

//! Interpretation of loosely-typed vote words as an up or down flag.
use std::collections::HashSet;
use std::fmt;

/// Tokens that mean "down" unless a deployment substitutes its own set.
pub const DEFAULT_DOWN_WORDS: [&str; 10] = [
    "down", "downvote", "dislike", "disliked", "negative", "no", "bad", "false", "0", "-1",
];

/// A vote word as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteWord {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for VoteWord {
    /// Renders the word the way it is matched against the token set.
    /// Floats keep a fractional digit, so `0.0` renders as `0.0`, not `0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for VoteWord {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for VoteWord {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for VoteWord {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for VoteWord {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for VoteWord {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for VoteWord {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The case-insensitive set of down tokens.
///
/// Anything not in the set is up, including unrecognised text and the empty
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteWords {
    down: HashSet<String>,
}

impl Default for VoteWords {
    fn default() -> Self {
        Self::new(DEFAULT_DOWN_WORDS)
    }
}

impl VoteWords {
    /// Creates an interpreter whose down set is exactly `down_words`.
    pub fn new<I, S>(down_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            down: down_words
                .into_iter()
                .map(|word| word.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn is_down(&self, word: &VoteWord) -> bool {
        self.down.contains(&word.to_string().to_lowercase())
    }

    pub fn is_up(&self, word: &VoteWord) -> bool {
        !self.is_down(word)
    }
}

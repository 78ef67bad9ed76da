use serde::{Deserialize, Serialize};

/// The multiplier a vote contributes to weighted aggregates. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Weight(i64);

impl Weight {
    pub const DEFAULT: Weight = Weight(1);

    /// Returns `None` unless `value` is a positive integer.
    pub fn new(value: i64) -> Option<Self> {
        (value >= 1).then_some(Self(value))
    }

    /// Coerces an optional caller-supplied weight, falling back to the default
    /// for absent or non-positive values.
    pub fn coerce(value: Option<i64>) -> Self {
        value.and_then(Self::new).unwrap_or(Self::DEFAULT)
    }

    /// Best-effort parse of a textual weight.
    ///
    /// Reads an optional sign and the leading run of digits, ignoring anything
    /// after it, so `"4"` and `"4 points"` are both 4. Input without a leading
    /// integer, or one that is not positive, yields the default weight.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim_start();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());

        match digits[..end].parse::<i64>() {
            Ok(value) if !negative => Self::coerce(Some(value)),
            _ => Self::DEFAULT,
        }
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Weight {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("weight must be a positive integer, got {value}"))
    }
}

impl From<Weight> for i64 {
    fn from(value: Weight) -> Self {
        value.0
    }
}

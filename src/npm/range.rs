use std::fmt;

/// Leading operator of a version range such as `^1.2.3` or `>=2.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RangeOperator {
    /// Bare version, no prefix
    #[default]
    None,
    Exact,
    Tilde,
    Caret,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl RangeOperator {
    /// Detect the operator that prefixes `range`.
    ///
    /// Only the first two characters are inspected. Anything that does not
    /// start with a known operator (including an empty string) is a bare
    /// version.
    pub fn detect(range: &str) -> Self {
        let mut chars = range.chars();
        match (chars.next(), chars.next()) {
            (Some('<'), Some('=')) => RangeOperator::LessOrEqual,
            (Some('>'), Some('=')) => RangeOperator::GreaterOrEqual,
            (Some('<'), _) => RangeOperator::Less,
            (Some('>'), _) => RangeOperator::Greater,
            (Some('='), _) => RangeOperator::Exact,
            (Some('~'), _) => RangeOperator::Tilde,
            (Some('^'), _) => RangeOperator::Caret,
            _ => RangeOperator::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOperator::None => "",
            RangeOperator::Exact => "=",
            RangeOperator::Tilde => "~",
            RangeOperator::Caret => "^",
            RangeOperator::Less => "<",
            RangeOperator::Greater => ">",
            RangeOperator::LessOrEqual => "<=",
            RangeOperator::GreaterOrEqual => ">=",
        }
    }

    /// Build a range string for `version` using this operator
    pub fn apply(&self, version: &str) -> String {
        format!("{}{}", self.as_str(), version)
    }
}

impl fmt::Display for RangeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part of `range` that follows its operator.
pub fn bare_version(range: &str) -> &str {
    &range[RangeOperator::detect(range).as_str().len()..]
}

/// Ranges that float on their own and are never rewritten: anything
/// mentioning `latest` or a `*` wildcard (`workspace:*`, `1.2.*`, ...).
pub fn is_sentinel(range: &str) -> bool {
    range.contains('*') || range.contains("latest")
}

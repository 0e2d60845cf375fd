//! Sort rules and the `field[:asc|desc]` query-string format.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

use super::filter::FieldRef;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

impl SortDirection {
    /// Applies the direction to an ascending comparison result.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    /// Short form used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

/// A field plus a direction. A list of rules defines a multi-key ordering.
#[derive(Debug, Clone)]
pub struct SortRule {
    /// The field to sort by.
    pub field: FieldRef,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortRule {
    /// Creates a sort rule.
    pub fn new(field: impl Into<FieldRef>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Ascending rule on `field`.
    pub fn asc(field: impl Into<FieldRef>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    /// Descending rule on `field`.
    pub fn desc(field: impl Into<FieldRef>) -> Self {
        Self::new(field, SortDirection::Descending)
    }

    /// Parses one `field[:asc|desc]` token.
    ///
    /// `default_direction` applies when the token has no direction suffix.
    pub fn parse(token: &str, default_direction: SortDirection) -> Result<Self, FilterError> {
        let invalid = |message: String| FilterError::InvalidSortToken {
            token: token.to_string(),
            message,
        };

        let (field, direction) = match token.split_once(':') {
            Some((field, direction)) => (
                field.trim(),
                direction.parse::<SortDirection>().map_err(invalid)?,
            ),
            None => (token.trim(), default_direction),
        };

        if field.is_empty() {
            return Err(invalid("missing field name".to_string()));
        }

        Ok(Self::new(field, direction))
    }

    /// Parses a comma-separated list of `field[:asc|desc]` tokens.
    ///
    /// Blank tokens are skipped, so an empty string yields no rules.
    ///
    /// # Examples
    ///
    /// ```
    /// use helios_repository::types::{SortDirection, SortRule};
    ///
    /// let rules = SortRule::parse_list("name, age:desc", SortDirection::Ascending).unwrap();
    /// assert_eq!(rules.len(), 2);
    /// assert_eq!(rules[0].direction, SortDirection::Ascending);
    /// assert_eq!(rules[1].direction, SortDirection::Descending);
    /// ```
    pub fn parse_list(
        input: &str,
        default_direction: SortDirection,
    ) -> Result<Vec<Self>, FilterError> {
        input
            .split(',')
            .filter(|token| !token.trim().is_empty())
            .map(|token| Self::parse(token, default_direction))
            .collect()
    }

    /// Renders rules back into the query-string format.
    pub fn to_query_string(rules: &[SortRule]) -> String {
        rules
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for SortRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.direction)
    }
}

//! Backend-neutral filter AST.
//!
//! A [`Filter`] is built once without reference to any storage engine and is
//! translated per engine through a [`FilterVisitor`]. Field references are
//! checked during translation, not during construction.

use std::fmt;

use crate::schema::{FieldAccessor, FieldValue};

/// A reference to an entity field, by name or by typed accessor.
#[derive(Debug, Clone)]
pub enum FieldRef {
    /// Field name; requires a registered mapping on the target entity type.
    Named(String),
    /// Typed accessor; usable directly against its own entity type.
    Accessor(FieldAccessor),
}

impl FieldRef {
    /// Returns the referenced field's name.
    pub fn name(&self) -> &str {
        match self {
            FieldRef::Named(name) => name,
            FieldRef::Accessor(accessor) => accessor.name(),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::Named(name.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        FieldRef::Named(name)
    }
}

impl From<FieldAccessor> for FieldRef {
    fn from(accessor: FieldAccessor) -> Self {
        FieldRef::Accessor(accessor)
    }
}

impl From<&FieldAccessor> for FieldRef {
    fn from(accessor: &FieldAccessor) -> Self {
        FieldRef::Accessor(accessor.clone())
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A test applied to a single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Equal to.
    Eq(FieldValue),
    /// Not equal to.
    Ne(FieldValue),
    /// Less than.
    Lt(FieldValue),
    /// Less than or equal to.
    Le(FieldValue),
    /// Greater than.
    Gt(FieldValue),
    /// Greater than or equal to.
    Ge(FieldValue),
    /// Equal to any of the values.
    In(Vec<FieldValue>),
    /// Substring match on text values.
    Contains(String),
    /// Prefix match on text values.
    StartsWith(String),
    /// Value is null.
    IsNull,
    /// Value is not null.
    IsNotNull,
}

impl Predicate {
    /// Evaluates the predicate against a field value.
    ///
    /// Comparisons between incomparable kinds are false, except `Ne`.
    pub fn matches(&self, value: &FieldValue) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};

        match self {
            Predicate::Eq(expected) => value.compare(expected) == Some(Equal),
            Predicate::Ne(expected) => value.compare(expected) != Some(Equal),
            Predicate::Lt(bound) => value.compare(bound) == Some(Less),
            Predicate::Le(bound) => matches!(value.compare(bound), Some(Less | Equal)),
            Predicate::Gt(bound) => value.compare(bound) == Some(Greater),
            Predicate::Ge(bound) => matches!(value.compare(bound), Some(Greater | Equal)),
            Predicate::In(candidates) => candidates
                .iter()
                .any(|candidate| value.compare(candidate) == Some(Equal)),
            Predicate::Contains(needle) => value
                .as_text()
                .is_some_and(|text| text.contains(needle.as_str())),
            Predicate::StartsWith(prefix) => value
                .as_text()
                .is_some_and(|text| text.starts_with(prefix.as_str())),
            Predicate::IsNull => value.is_null(),
            Predicate::IsNotNull => !value.is_null(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq(v) => write!(f, "= {}", v),
            Predicate::Ne(v) => write!(f, "!= {}", v),
            Predicate::Lt(v) => write!(f, "< {}", v),
            Predicate::Le(v) => write!(f, "<= {}", v),
            Predicate::Gt(v) => write!(f, "> {}", v),
            Predicate::Ge(v) => write!(f, ">= {}", v),
            Predicate::In(values) => {
                write!(f, "in (")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Predicate::Contains(s) => write!(f, "contains {:?}", s),
            Predicate::StartsWith(s) => write!(f, "starts with {:?}", s),
            Predicate::IsNull => write!(f, "is null"),
            Predicate::IsNotNull => write!(f, "is not null"),
        }
    }
}

/// A composable predicate over entity fields.
///
/// `Filter::Empty` means "no constraint" and is the identity of both
/// [`Filter::and`] and [`Filter::or`].
///
/// # Examples
///
/// ```
/// use helios_repository::types::Filter;
///
/// let adults = Filter::ge("age", 18);
/// assert_eq!(Filter::empty().and(adults.clone()).to_string(), adults.to_string());
///
/// let filter = adults.and(Filter::eq("tier", "gold"));
/// assert_eq!(filter.to_string(), "(age >= 18 AND tier = \"gold\")");
/// ```
#[derive(Debug, Clone, Default)]
pub enum Filter {
    /// Matches everything.
    #[default]
    Empty,
    /// A single field predicate.
    Where {
        /// The tested field.
        field: FieldRef,
        /// The test.
        predicate: Predicate,
    },
    /// All children must match.
    And(Vec<Filter>),
    /// At least one child must match.
    Or(Vec<Filter>),
    /// The child must not match.
    Not(Box<Filter>),
}

impl Filter {
    /// The empty filter.
    pub fn empty() -> Self {
        Filter::Empty
    }

    /// A predicate on one field.
    pub fn on(field: impl Into<FieldRef>, predicate: Predicate) -> Self {
        Filter::Where {
            field: field.into(),
            predicate,
        }
    }

    /// `field == value`.
    pub fn eq(field: impl Into<FieldRef>, value: impl Into<FieldValue>) -> Self {
        Self::on(field, Predicate::Eq(value.into()))
    }

    /// `field != value`.
    pub fn ne(field: impl Into<FieldRef>, value: impl Into<FieldValue>) -> Self {
        Self::on(field, Predicate::Ne(value.into()))
    }

    /// `field < value`.
    pub fn lt(field: impl Into<FieldRef>, value: impl Into<FieldValue>) -> Self {
        Self::on(field, Predicate::Lt(value.into()))
    }

    /// `field <= value`.
    pub fn le(field: impl Into<FieldRef>, value: impl Into<FieldValue>) -> Self {
        Self::on(field, Predicate::Le(value.into()))
    }

    /// `field > value`.
    pub fn gt(field: impl Into<FieldRef>, value: impl Into<FieldValue>) -> Self {
        Self::on(field, Predicate::Gt(value.into()))
    }

    /// `field >= value`.
    pub fn ge(field: impl Into<FieldRef>, value: impl Into<FieldValue>) -> Self {
        Self::on(field, Predicate::Ge(value.into()))
    }

    /// `field` equals any of `values`.
    pub fn is_in<V: Into<FieldValue>>(
        field: impl Into<FieldRef>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::on(
            field,
            Predicate::In(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Text `field` contains `needle`.
    pub fn contains(field: impl Into<FieldRef>, needle: impl Into<String>) -> Self {
        Self::on(field, Predicate::Contains(needle.into()))
    }

    /// Text `field` starts with `prefix`.
    pub fn starts_with(field: impl Into<FieldRef>, prefix: impl Into<String>) -> Self {
        Self::on(field, Predicate::StartsWith(prefix.into()))
    }

    /// `field` is null.
    pub fn is_null(field: impl Into<FieldRef>) -> Self {
        Self::on(field, Predicate::IsNull)
    }

    /// `field` is not null.
    pub fn is_not_null(field: impl Into<FieldRef>) -> Self {
        Self::on(field, Predicate::IsNotNull)
    }

    /// Conjunction. Empty operands are dropped and nested `And`s flattened.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Empty, f) | (f, Filter::Empty) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    /// Disjunction. Empty operands are dropped and nested `Or`s flattened.
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Empty, f) | (f, Filter::Empty) => f,
            (Filter::Or(mut left), Filter::Or(right)) => {
                left.extend(right);
                Filter::Or(left)
            }
            (Filter::Or(mut left), f) => {
                left.push(f);
                Filter::Or(left)
            }
            (f, Filter::Or(mut right)) => {
                right.insert(0, f);
                Filter::Or(right)
            }
            (a, b) => Filter::Or(vec![a, b]),
        }
    }

    /// Negation. The empty filter stays empty.
    pub fn negate(self) -> Self {
        match self {
            Filter::Empty => Filter::Empty,
            Filter::Not(inner) => *inner,
            f => Filter::Not(Box::new(f)),
        }
    }

    /// Conjunction of all `filters`.
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        filters.into_iter().fold(Filter::Empty, Filter::and)
    }

    /// Disjunction of all `filters`.
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        filters.into_iter().fold(Filter::Empty, Filter::or)
    }

    /// Returns true for the empty filter.
    pub fn is_empty(&self) -> bool {
        matches!(self, Filter::Empty)
    }

    /// Walks the filter with a translation visitor.
    pub fn accept<V: FilterVisitor>(&self, visitor: &V) -> Result<V::Output, V::Error> {
        match self {
            Filter::Empty => visitor.visit_empty(),
            Filter::Where { field, predicate } => visitor.visit_where(field, predicate),
            Filter::And(children) => {
                let children = children
                    .iter()
                    .map(|child| child.accept(visitor))
                    .collect::<Result<Vec<_>, _>>()?;
                visitor.visit_and(children)
            }
            Filter::Or(children) => {
                let children = children
                    .iter()
                    .map(|child| child.accept(visitor))
                    .collect::<Result<Vec<_>, _>>()?;
                visitor.visit_or(children)
            }
            Filter::Not(inner) => {
                let inner = inner.accept(visitor)?;
                visitor.visit_not(inner)
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Filter], op: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "{}", child)?;
    }
    write!(f, ")")
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Empty => write!(f, "*"),
            Filter::Where { field, predicate } => write!(f, "{} {}", field, predicate),
            Filter::And(children) => write_joined(f, children, "AND"),
            Filter::Or(children) => write_joined(f, children, "OR"),
            Filter::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

/// Translates a [`Filter`] into an engine's native predicate form.
pub trait FilterVisitor {
    /// The native predicate.
    type Output;
    /// Translation error.
    type Error;

    /// Translates the empty filter.
    fn visit_empty(&self) -> Result<Self::Output, Self::Error>;

    /// Translates a single field predicate.
    fn visit_where(
        &self,
        field: &FieldRef,
        predicate: &Predicate,
    ) -> Result<Self::Output, Self::Error>;

    /// Combines translated children with AND.
    fn visit_and(&self, children: Vec<Self::Output>) -> Result<Self::Output, Self::Error>;

    /// Combines translated children with OR.
    fn visit_or(&self, children: Vec<Self::Output>) -> Result<Self::Output, Self::Error>;

    /// Negates a translated child.
    fn visit_not(&self, inner: Self::Output) -> Result<Self::Output, Self::Error>;
}

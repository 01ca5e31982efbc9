//! Filter compiler: raw client clauses to validated property filters.
//!
//! # Responsibility
//! - Map public field/operator names through one closed whitelist each.
//! - Coerce values of numeric properties to integers.
//! - Enforce the single-inequality-property rule before any query is built.
//!
//! # Invariants
//! - Output clauses keep input order.
//! - At most one distinct property carries inequality operators.

use std::fmt::{Display, Formatter};

/// Indexed conference properties the store can filter and sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConferenceProperty {
    Name,
    City,
    Topics,
    Month,
    MaxAttendees,
    SeatsAvailable,
}

impl ConferenceProperty {
    /// Property name as exposed in records and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::City => "city",
            Self::Topics => "topics",
            Self::Month => "month",
            Self::MaxAttendees => "maxAttendees",
            Self::SeatsAvailable => "seatsAvailable",
        }
    }

    /// Whether values of this property are integers.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Month | Self::MaxAttendees | Self::SeatsAvailable)
    }
}

impl Display for ConferenceProperty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public filter fields accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    City,
    Topic,
    Month,
    MaxAttendees,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [Self::City, Self::Topic, Self::Month, Self::MaxAttendees];

    /// Name clients send in `ConferenceQueryForm::field`.
    pub fn public_name(self) -> &'static str {
        match self {
            Self::City => "CITY",
            Self::Topic => "TOPIC",
            Self::Month => "MONTH",
            Self::MaxAttendees => "MAX_ATTENDEES",
        }
    }

    /// Store property this field filters on.
    pub fn property(self) -> ConferenceProperty {
        match self {
            Self::City => ConferenceProperty::City,
            Self::Topic => ConferenceProperty::Topics,
            Self::Month => ConferenceProperty::Month,
            Self::MaxAttendees => ConferenceProperty::MaxAttendees,
        }
    }

    pub fn from_public_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.public_name() == name)
    }
}

/// Comparison operators accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    Ne,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 6] = [
        Self::Eq,
        Self::Gt,
        Self::GtEq,
        Self::Lt,
        Self::LtEq,
        Self::Ne,
    ];

    pub fn public_name(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Gt => "GT",
            Self::GtEq => "GTEQ",
            Self::Lt => "LT",
            Self::LtEq => "LTEQ",
            Self::Ne => "NE",
        }
    }

    /// Comparison symbol understood by the store.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Ne => "!=",
        }
    }

    /// Every operator except `=` is an inequality.
    pub fn is_inequality(self) -> bool {
        self != Self::Eq
    }

    pub fn from_public_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.public_name() == name)
    }
}

/// Typed comparison value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

/// One clause exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFilter {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl RawFilter {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Validated clause against one store property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFilter {
    pub property: ConferenceProperty,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl PropertyFilter {
    pub fn new(property: ConferenceProperty, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            property,
            operator,
            value,
        }
    }
}

/// Output of [`compile_filters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilters {
    /// Property carrying every inequality clause, if any.
    pub inequality_property: Option<ConferenceProperty>,
    /// Validated clauses in input order.
    pub filters: Vec<PropertyFilter>,
}

/// Filter validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("filter contains invalid field: `{0}`")]
    InvalidFilterField(String),
    #[error("filter contains invalid operator: `{0}`")]
    InvalidFilterOperator(String),
    #[error("filter value `{value}` is not an integer for field `{field}`")]
    InvalidFilterValue {
        field: ConferenceProperty,
        value: String,
    },
    #[error("inequality filter is allowed on only one field; got `{first}` and `{second}`")]
    MultipleInequalityFields {
        first: ConferenceProperty,
        second: ConferenceProperty,
    },
}

/// Validates and normalizes raw clauses.
///
/// Clauses are checked in order; the first failing clause decides the error.
/// The first inequality clause fixes the inequality property, and a later
/// inequality clause on another property fails. Equality clauses are never
/// restricted.
///
/// # Errors
/// - `InvalidFilterField` / `InvalidFilterOperator` for names outside the whitelist.
/// - `InvalidFilterValue` when a numeric property's value is not an integer.
/// - `MultipleInequalityFields` when inequalities span two properties.
pub fn compile_filters(raw_filters: &[RawFilter]) -> Result<CompiledFilters, FilterError> {
    let mut compiled = CompiledFilters::default();

    for raw in raw_filters {
        let field = FilterField::from_public_name(raw.field.as_str())
            .ok_or_else(|| FilterError::InvalidFilterField(raw.field.clone()))?;
        let operator = FilterOperator::from_public_name(raw.operator.as_str())
            .ok_or_else(|| FilterError::InvalidFilterOperator(raw.operator.clone()))?;
        let property = field.property();

        if operator.is_inequality() {
            match compiled.inequality_property {
                Some(first) if first != property => {
                    return Err(FilterError::MultipleInequalityFields {
                        first,
                        second: property,
                    });
                }
                _ => compiled.inequality_property = Some(property),
            }
        }

        let value = coerce_value(property, raw.value.as_str())?;
        compiled
            .filters
            .push(PropertyFilter::new(property, operator, value));
    }

    Ok(compiled)
}

fn coerce_value(property: ConferenceProperty, value: &str) -> Result<FilterValue, FilterError> {
    if !property.is_numeric() {
        return Ok(FilterValue::Text(value.to_string()));
    }
    value
        .trim()
        .parse::<i64>()
        .map(FilterValue::Integer)
        .map_err(|_| FilterError::InvalidFilterValue {
            field: property,
            value: value.to_string(),
        })
}

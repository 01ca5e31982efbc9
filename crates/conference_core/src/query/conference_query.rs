//! Conference query plans.
//!
//! # Responsibility
//! - Turn compiled filters into an ordered, conjunctive query plan.
//! - Provide the fixed plans used by ancestor listing and announcements.
//!
//! # Invariants
//! - With an inequality property, it is the primary sort key and `name` the
//!   secondary; otherwise the plan sorts by `name` alone.
//! - Plans are plain values; executing one has no side effects.

use crate::model::key::UserId;
use crate::query::filter::{
    compile_filters, CompiledFilters, ConferenceProperty, FilterError, FilterOperator, FilterValue,
    PropertyFilter, RawFilter,
};

/// Store-executable conference query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceQuery {
    /// Restricts results to conferences parented under this profile.
    pub ancestor: Option<UserId>,
    /// Conjunctive property filters, in application order.
    pub filters: Vec<PropertyFilter>,
    /// Ascending sort keys. Empty means key order.
    pub order: Vec<ConferenceProperty>,
}

impl ConferenceQuery {
    /// Every conference, sorted by name.
    pub fn all() -> Self {
        Self {
            ancestor: None,
            filters: Vec::new(),
            order: vec![ConferenceProperty::Name],
        }
    }

    /// Conferences organized by `user_id`, in key (creation) order.
    pub fn children_of(user_id: impl Into<UserId>) -> Self {
        Self {
            ancestor: Some(user_id.into()),
            filters: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Builds the plan for already-compiled filters.
    pub fn from_compiled(compiled: CompiledFilters) -> Self {
        let order = match compiled.inequality_property {
            Some(ConferenceProperty::Name) => vec![ConferenceProperty::Name],
            Some(property) => vec![property, ConferenceProperty::Name],
            None => vec![ConferenceProperty::Name],
        };
        Self {
            ancestor: None,
            filters: compiled.filters,
            order,
        }
    }

    /// Compiles raw client clauses and builds the plan.
    ///
    /// # Errors
    /// - Propagates [`FilterError`] from the filter compiler unchanged.
    pub fn compile(raw_filters: &[RawFilter]) -> Result<Self, FilterError> {
        compile_filters(raw_filters).map(Self::from_compiled)
    }

    /// Conferences with `0 < seatsAvailable <= threshold`.
    pub fn nearly_sold_out(threshold: u32) -> Self {
        Self::from_compiled(CompiledFilters {
            inequality_property: Some(ConferenceProperty::SeatsAvailable),
            filters: vec![
                PropertyFilter::new(
                    ConferenceProperty::SeatsAvailable,
                    FilterOperator::LtEq,
                    FilterValue::Integer(i64::from(threshold)),
                ),
                PropertyFilter::new(
                    ConferenceProperty::SeatsAvailable,
                    FilterOperator::Gt,
                    FilterValue::Integer(0),
                ),
            ],
        })
    }
}

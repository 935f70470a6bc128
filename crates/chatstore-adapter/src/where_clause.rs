//! Where-clause translation
//!
//! Rewrites logical predicates into backend-facing ones. Operators are never
//! interpreted here; only the field name and, when the backend assigns
//! integer ids, the value change.

use chatstore_common::types::{CleanedWhere, SortBy, Where};

use crate::coerce;
use crate::fields::ModelView;

pub(crate) fn translate(
    view: &ModelView<'_>,
    numeric_keys: bool,
    where_clause: &[Where],
) -> Vec<CleanedWhere> {
    where_clause
        .iter()
        .map(|predicate| {
            let value = if numeric_keys && view.is_numeric_key(&predicate.field) {
                coerce::to_numeric_id(predicate.value.clone())
            } else {
                predicate.value.clone()
            };

            CleanedWhere {
                field: view.physical_field(&predicate.field),
                value,
                operator: predicate.operator,
                connector: predicate.connector,
            }
        })
        .collect()
}

pub(crate) fn translate_sort(view: &ModelView<'_>, sort_by: &SortBy) -> SortBy {
    SortBy {
        field: view.physical_field(&sort_by.field),
        direction: sort_by.direction,
    }
}

pub(crate) fn translate_select(view: &ModelView<'_>, select: &[String]) -> Vec<String> {
    select.iter().map(|field| view.physical_field(field)).collect()
}

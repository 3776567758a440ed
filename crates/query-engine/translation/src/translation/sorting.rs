//! Apply sort instructions to a SELECT, and reproduce the same order in memory for cursor
//! pagination.

use std::cmp::Ordering;

use query_engine_metadata::metadata::{
    Row, SortDefinition, SortDefinitions, SortDirection, SortItem, SortValue,
};
use query_engine_sql::sql::ast::{Join, Select, SelectList};
use query_engine_sql::sql::helpers;

use super::error::Error;
use super::filtering::Filter;

fn resolve<'a>(
    sort: &'a [SortItem],
    definitions: &'a SortDefinitions,
) -> Result<Vec<(&'a SortItem, &'a SortDefinition)>, Error> {
    if sort.is_empty() {
        return Err(Error::EmptySort);
    }
    sort.iter()
        .map(|item| {
            definitions
                .get(&item.key)
                .map(|definition| (item, definition))
                .ok_or_else(|| Error::UnknownSortKey(item.key.clone()))
        })
        .collect()
}

/// Order `select` by the sort list, adding the joins and columns the sort keys need.
///
/// The whole list is validated before the select is touched. Two different joins on the
/// same table name or alias are a conflict, including joins added by the WHERE clause.
pub fn apply_sorter(
    select: Select,
    sort: &[SortItem],
    definitions: &SortDefinitions,
) -> Result<Select, Error> {
    let resolved = resolve(sort, definitions)?;

    let mut joins: Vec<Join> = select.all_joins();
    let mut new_joins = vec![];
    for (item, definition) in &resolved {
        let Some(join) = &definition.join else {
            continue;
        };
        match joins
            .iter()
            .find(|existing| existing.table.namespace() == join.table.namespace())
        {
            Some(existing) if existing == join => {}
            Some(_) => return Err(Error::SorterJoinConflict(item.key.clone())),
            None => {
                joins.push(join.clone());
                new_joins.push(join.clone());
            }
        }
    }

    let mut select = select;
    for join in new_joins {
        select = select.join(join);
    }
    for (item, definition) in resolved {
        if !definition.select.is_empty() && matches!(select.select_list, SelectList::SelectStar) {
            select = select.column(helpers::wildcard());
        }
        for expression in &definition.select {
            select = select.column(expression.clone());
        }
        select = select.order_by(definition.to_order_by(item.order));
    }
    Ok(select)
}

/// Append the `required` keys missing from `sort`, so the order is total.
pub fn assert_sort(sort: &[SortItem], required: &[SortItem]) -> Vec<SortItem> {
    let mut sort = sort.to_vec();
    for item in required {
        if !sort.iter().any(|existing| existing.key == item.key) {
            sort.push(item.clone());
        }
    }
    sort
}

/// Order two rows the way the sorted query orders them.
pub fn compare_rows(
    a: &Row,
    b: &Row,
    sort: &[SortItem],
    definitions: &SortDefinitions,
) -> Result<Ordering, Error> {
    for (item, definition) in resolve(sort, definitions)? {
        let ordering = definition.value_of(a).cmp(&definition.value_of(b));
        let ordering = match item.order {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
    }
    Ok(Ordering::Equal)
}

/// The filter selecting the rows after `last` in the sorted order.
///
/// For keys `a, b` this is `a > last.a OR (a = last.a AND b > last.b)`, with `$lt` for
/// descending keys. Sort keys must also be filter keys of the entity.
pub fn page_filter(
    last: &Row,
    sort: &[SortItem],
    definitions: &SortDefinitions,
) -> Result<Filter, Error> {
    let resolved = resolve(sort, definitions)?;
    let values: Vec<Filter> = resolved
        .iter()
        .map(|(_, definition)| sort_value_to_filter(&definition.value_of(last)))
        .collect();

    let mut branches = vec![];
    for (index, (item, _)) in resolved.iter().enumerate() {
        let mut clause = serde_json::Map::new();
        for ((previous, _), value) in resolved[..index].iter().zip(&values) {
            clause.insert(previous.key.clone(), value.clone());
        }
        let operator = match item.order {
            SortDirection::Asc => "$gt",
            SortDirection::Desc => "$lt",
        };
        let mut comparison = serde_json::Map::new();
        comparison.insert(operator.to_string(), values[index].clone());
        clause.insert(item.key.clone(), serde_json::Value::Object(comparison));
        branches.push(serde_json::Value::Object(clause));
    }

    let mut filter = serde_json::Map::new();
    filter.insert("$or".to_string(), serde_json::Value::Array(branches));
    Ok(serde_json::Value::Object(filter))
}

/// A sort value in the filter grammar.
#[allow(clippy::cast_possible_truncation)]
fn sort_value_to_filter(value: &SortValue) -> Filter {
    match value {
        SortValue::Null => serde_json::Value::Null,
        SortValue::Boolean(b) => serde_json::Value::Bool(*b),
        SortValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
            serde_json::Value::from(*n as i64)
        }
        SortValue::Number(n) => serde_json::Number::from_f64(*n)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        SortValue::String(s) => serde_json::Value::String(s.clone()),
        SortValue::DateTime(timestamp) => {
            let mut date = serde_json::Map::new();
            date.insert("$".to_string(), serde_json::Value::from("$date"));
            date.insert(
                "value".to_string(),
                serde_json::Value::from(timestamp.timestamp_millis()),
            );
            serde_json::Value::Object(date)
        }
    }
}

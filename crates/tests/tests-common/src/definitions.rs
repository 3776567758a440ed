//! Filter and sort definitions of a sample `users` table.

use query_engine_metadata::metadata::{
    ColumnDescriptor, FilterDefinition, FilterDefinitions, SortDefinition, SortDefinitions,
    SortValue, ValueType,
};
use query_engine_sql::sql::ast::{Join, JsonPath, Where};
use query_engine_sql::sql::helpers::{
    aliased, column, inner_join, json_extract, json_value, left_join, parent_column, select,
    table, table_column,
};
use query_engine_sql::sql::WhereHelpers;

pub const USERS: &str = "users";

fn filter_column(expression: &str, value_type: ValueType) -> FilterDefinition {
    FilterDefinition::column(ColumnDescriptor::new(column(expression), value_type))
}

fn nullable_filter_column(expression: &str, value_type: ValueType) -> FilterDefinition {
    FilterDefinition::column(ColumnDescriptor::new(column(expression), value_type).nullable())
}

fn settings_value(path: &[&str], value_type: ValueType) -> FilterDefinition {
    FilterDefinition::column(
        ColumnDescriptor::new(
            json_value(column("settings"), JsonPath::keys(path.iter().copied()), None),
            value_type,
        )
        .nullable(),
    )
}

/// `LEFT JOIN organizations ON organizations.id = users.organizationId`
pub fn organization_join() -> Join {
    left_join(
        table("organizations"),
        Where::eq(table_column("organizations", "id"), column("organizationId")),
    )
}

/// The same table as `organization_join`, joined differently.
pub fn organization_inner_join() -> Join {
    inner_join(
        table("organizations"),
        Where::eq(table_column("organizations", "id"), column("organizationId")),
    )
}

pub fn organization_filters() -> FilterDefinitions {
    FilterDefinitions::new()
        .with(
            "id",
            FilterDefinition::column(ColumnDescriptor::new(
                table_column("organizations", "id"),
                ValueType::String,
            )),
        )
        .with(
            "name",
            FilterDefinition::column(ColumnDescriptor::new(
                table_column("organizations", "name"),
                ValueType::String,
            )),
        )
}

/// Filters of the `users` table.
pub fn user_filters() -> FilterDefinitions {
    FilterDefinitions::new()
        .with("id", filter_column("id", ValueType::String))
        .with("name", nullable_filter_column("name", ValueType::String))
        .with("status", filter_column("status", ValueType::String))
        .with("price", filter_column("price", ValueType::Number))
        .with("age", nullable_filter_column("age", ValueType::Number))
        .with("createdAt", filter_column("createdAt", ValueType::Datetime))
        .with("isAdmin", filter_column("isAdmin", ValueType::Boolean))
        .with("tags", nullable_filter_column("tags", ValueType::JsonArray))
        .with("meta", nullable_filter_column("meta", ValueType::JsonObject))
        .with(
            "settings",
            FilterDefinition::nested(
                FilterDefinitions::new()
                    .with("name", settings_value(&["name"], ValueType::JsonString))
                    .with("age", settings_value(&["age"], ValueType::JsonNumber))
                    .with(
                        "dog",
                        FilterDefinition::nested(
                            FilterDefinitions::new()
                                .with("name", settings_value(&["dog", "name"], ValueType::JsonString))
                                .with("age", settings_value(&["dog", "age"], ValueType::JsonNumber)),
                        ),
                    ),
            ),
        )
        .with(
            "properties",
            FilterDefinition::wildcard(|key| {
                ColumnDescriptor::new(
                    json_extract(column("properties"), JsonPath::root().quoted_key(key)),
                    ValueType::JsonString,
                )
                .nullable()
            }),
        )
        .with(
            "organization",
            FilterDefinition::joined_relation(organization_join(), organization_filters()),
        )
        .with(
            "registrations",
            FilterDefinition::exists(
                select(table("registrations"))
                    .where_(Where::eq(column("userId"), parent_column("id"))),
                FilterDefinitions::new()
                    .with("period", filter_column("periodId", ValueType::String)),
            ),
        )
}

/// Sort keys of the `users` table.
pub fn user_sorters() -> SortDefinitions {
    SortDefinitions::new()
        .with("id", SortDefinition::column("id"))
        .with("name", SortDefinition::column("name"))
        .with("createdAt", SortDefinition::column("createdAt"))
        .with("price", SortDefinition::column("price"))
        .with(
            "organizationName",
            SortDefinition::new(table_column("organizations", "name"), |row| {
                row.get("organizationName")
                    .map_or(SortValue::Null, SortValue::from_json)
            })
            .with_join(organization_join())
            .with_select(aliased(
                table_column("organizations", "name"),
                "organizationName",
            )),
        )
        .with(
            "organizationCreatedAt",
            SortDefinition::new(table_column("organizations", "createdAt"), |row| {
                row.get("organizationCreatedAt")
                    .map_or(SortValue::Null, SortValue::from_json)
            })
            .with_join(organization_inner_join()),
        )
}

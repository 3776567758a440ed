mod common;

use chrono::{TimeZone, Utc};
use query_engine_metadata::metadata::{ColumnDescriptor, FilterDefinition, FilterDefinitions, ValueType};
use query_engine_sql::sql::{self, ast::Alwaysness, helpers, string::Param, WhereHelpers};
use query_engine_translation::translation::{self, FilterOptions};
use serde_json::json;
use similar_asserts::assert_eq;
use tests_common::definitions::{organization_filters, organization_inner_join, user_filters};

use common::{compile, compile_error, compile_sql, snapshot};

#[test]
fn keys_of_an_object_are_conjoined() {
    let query = compile_sql(&json!({"status": "Created", "price": {"$gt": 100}}));
    insta::assert_snapshot!(snapshot(&query), @r###"
    `default`.`status` = ? AND `default`.`price` > ?

    [(1, String("Created")), (2, Integer(100))]
    "###);
}

#[test]
fn arrays_are_conjoined_like_objects() {
    assert_eq!(
        compile_sql(&json!([{"status": "Created"}, {"price": {"$gt": 100}}])),
        compile_sql(&json!({"status": "Created", "price": {"$gt": 100}}))
    );
}

#[test]
fn not_equal_null_and_negated_null_agree() {
    let not_equal = compile_sql(&json!({"name": {"$neq": null}}));
    let negated = compile_sql(&json!({"$not": {"name": null}}));
    assert_eq!(not_equal.sql, "`default`.`name` IS NOT NULL");
    assert!(not_equal.params.is_empty());
    assert_eq!(negated, not_equal);
}

#[test]
fn equality_is_null_safe_on_nullable_columns() {
    let nullable = compile_sql(&json!({"name": "Ann"}));
    assert_eq!(nullable.sql, "`default`.`name` <=> ?");
    assert_eq!(nullable.params, vec![Param::String("Ann".to_string())]);

    let required = compile_sql(&json!({"status": {"$eq": "Ann"}}));
    assert_eq!(required.sql, "`default`.`status` = ?");
}

#[test]
fn not_equal_on_a_nullable_column_is_wrapped() {
    assert_eq!(
        compile_sql(&json!({"name": {"$neq": "Ann"}})).sql,
        "NOT (`default`.`name` <=> ?)"
    );
    assert_eq!(
        compile_sql(&json!({"status": {"$neq": "Ann"}})).sql,
        "`default`.`status` != ?"
    );
}

#[test]
fn null_is_the_smallest_value() {
    assert_eq!(
        compile_sql(&json!({"age": {"$gt": 18}})).sql,
        "`default`.`age` IS NOT NULL AND `default`.`age` > ?"
    );
    assert_eq!(
        compile_sql(&json!({"age": {"$lt": 18}})).sql,
        "`default`.`age` IS NULL OR `default`.`age` < ?"
    );
    assert_eq!(
        compile_sql(&json!({"age": {"$gt": null}})).sql,
        "`default`.`age` IS NOT NULL"
    );
    assert_eq!(
        compile(&json!({"age": {"$lt": null}})).alwaysness(),
        Alwaysness::Never
    );
    assert_eq!(
        compile(&json!({"price": {"$gt": null}})).alwaysness(),
        Alwaysness::Always
    );
    assert_eq!(
        compile(&json!({"price": {"$gte": null}})).alwaysness(),
        Alwaysness::Always
    );
}

#[test]
fn negated_operators_use_the_inverse_comparison() {
    assert_eq!(
        compile_sql(&json!({"price": {"$gte": 10}})).sql,
        "`default`.`price` >= ?"
    );
    assert_eq!(
        compile_sql(&json!({"price": {"$lte": 10}})).sql,
        "`default`.`price` <= ?"
    );
}

#[test]
fn in_lists() {
    let many = compile_sql(&json!({"status": {"$in": ["a", "b"]}}));
    assert_eq!(many.sql, "`default`.`status` IN (?, ?)");
    assert_eq!(
        many.params,
        vec![Param::String("a".to_string()), Param::String("b".to_string())]
    );

    assert_eq!(
        compile_sql(&json!({"status": {"$in": ["a"]}})).sql,
        "`default`.`status` = ?"
    );
    assert_eq!(
        compile(&json!({"status": {"$in": []}})).alwaysness(),
        Alwaysness::Never
    );
    assert_eq!(compile_sql(&json!({"status": {"$in": []}})).sql, "FALSE");

    let with_null = compile_sql(&json!({"age": {"$in": [null, 1, 2]}}));
    assert_eq!(
        with_null.sql,
        "`default`.`age` IS NULL OR `default`.`age` IN (?, ?)"
    );
    assert_eq!(with_null.params, vec![Param::Integer(1), Param::Integer(2)]);
}

#[test]
fn in_lists_are_bounded() {
    let options = FilterOptions {
        max_in_values: 2,
        now: None,
    };
    let error = translation::compile_filter_with(
        &json!({"status": {"$in": ["a", "b", "c"]}}),
        &user_filters(),
        &options,
    )
    .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Too many values in $in filter, maximum is 2"
    );
    assert_eq!(error.code(), "invalid_filter");

    assert_eq!(
        compile_error(&json!({"status": {"$in": "a"}})).to_string(),
        "Expected array at $in filter"
    );
}

#[test]
fn contains_escapes_like_wildcards() {
    let query = compile_sql(&json!({"name": {"$contains": "50%_Off"}}));
    assert_eq!(query.sql, "`default`.`name` LIKE ?");
    assert_eq!(query.params, vec![Param::String(r"%50\%\_off%".to_string())]);

    assert_eq!(
        compile_error(&json!({"price": {"$contains": "1"}})).to_string(),
        "Cannot compare a string with a non-string column"
    );
}

#[test]
fn booleans_are_stored_as_integers() {
    let query = compile_sql(&json!({"isAdmin": true}));
    assert_eq!(query.sql, "`default`.`isAdmin` = ?");
    assert_eq!(query.params, vec![Param::Integer(1)]);

    assert_eq!(
        compile_error(&json!({"isAdmin": 2})).to_string(),
        "Cannot compare a number with a boolean column"
    );
}

#[test]
fn dates() {
    let query = compile_sql(&json!({"createdAt": {"$gt": {"$": "$date", "value": 0}}}));
    assert_eq!(query.sql, "`default`.`createdAt` > ?");
    assert_eq!(
        query.params,
        vec![Param::DateTime(Utc.timestamp_millis_opt(0).unwrap())]
    );

    let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    let options = FilterOptions {
        now: Some(now),
        ..FilterOptions::default()
    };
    let predicate = translation::compile_filter_with(
        &json!({"createdAt": {"$lt": {"$": "$now"}}}),
        &user_filters(),
        &options,
    )
    .unwrap();
    assert_eq!(common::render(&predicate).params, vec![Param::DateTime(now)]);

    assert_eq!(
        compile_error(&json!({"status": {"$": "$now"}})).to_string(),
        "Cannot compare a date with a non-datetime column"
    );
}

#[test]
fn json_arrays() {
    let search = compile_sql(&json!({"tags": "VIP"}));
    assert_eq!(
        search.sql,
        "JSON_SEARCH(LOWER(`default`.`tags`), 'one', ?) IS NOT NULL"
    );
    assert_eq!(search.params, vec![Param::String("vip".to_string())]);

    let contains = compile_sql(&json!({"tags": 5}));
    assert_eq!(contains.sql, "JSON_CONTAINS(`default`.`tags`, ?)");
    assert_eq!(contains.params, vec![Param::Json(json!(5))]);

    assert_eq!(
        compile_error(&json!({"tags": {"$gt": 1}})).to_string(),
        "Cannot use $gt on a JSON array"
    );
}

#[test]
fn json_objects_only_compare_with_null() {
    assert_eq!(
        compile_sql(&json!({"meta": null})).sql,
        "`default`.`meta` IS NULL OR `default`.`meta` = CAST('null' AS JSON)"
    );
    assert_eq!(
        compile_error(&json!({"meta": "x"})).to_string(),
        "Cannot compare with a JSON object"
    );
}

#[test]
fn dot_syntax_and_nesting_are_equivalent() {
    let dotted = compile_sql(&json!({"settings.dog.name": "Rex"}));
    assert_eq!(
        dotted.sql,
        "JSON_VALUE(`default`.`settings`,'$.dog.name' RETURNING CHAR CHARACTER SET utf8mb4 ERROR ON ERROR) <=> ?"
    );
    assert_eq!(dotted.params, vec![Param::String("Rex".to_string())]);

    assert_eq!(
        compile_sql(&json!({"settings": {"dog": {"name": "Rex"}}})),
        dotted
    );
    assert_eq!(
        compile_sql(&json!({"settings": {"dog.name": {"$eq": "Rex"}}})),
        dotted
    );
}

#[test]
fn json_numbers_are_read_as_doubles() {
    assert_eq!(
        compile_sql(&json!({"settings.age": {"$lt": 3}})).sql,
        "JSON_VALUE(`default`.`settings`,'$.age' RETURNING DOUBLE ERROR ON ERROR) IS NULL \
         OR JSON_VALUE(`default`.`settings`,'$.age' RETURNING DOUBLE ERROR ON ERROR) < ?"
    );
}

#[test]
fn wildcard_keys_are_escaped() {
    let query = compile_sql(&json!({"properties": {"a\"b.c": "x"}}));
    assert_eq!(
        query.sql,
        "JSON_VALUE(JSON_EXTRACT(`default`.`properties`, ?),'$' RETURNING CHAR CHARACTER SET utf8mb4 ERROR ON ERROR) <=> ?"
    );
    assert_eq!(
        query.params,
        vec![
            Param::String(r#"$."a\"b.c""#.to_string()),
            Param::String("x".to_string())
        ]
    );

    let injection = compile_sql(&json!({"properties": {"x') OR 1=1 -- ": "x"}}));
    assert_eq!(
        injection.sql,
        r#"JSON_VALUE(`default`.`properties`,'$."x'') OR 1=1 -- "' RETURNING CHAR CHARACTER SET utf8mb4 ERROR ON ERROR) <=> ?"#
    );
    assert_eq!(injection.params, vec![Param::String("x".to_string())]);
}

#[test]
fn combinators() {
    assert_eq!(
        compile_sql(&json!({"$or": [{"status": "a"}, {"price": {"$lt": 5}}]})).sql,
        "`default`.`status` = ? OR `default`.`price` < ?"
    );
    assert_eq!(
        compile_sql(&json!({"$or": [{"status": "a", "price": 1}, {"status": "b"}]})).sql,
        "(`default`.`status` = ? AND `default`.`price` = ?) OR `default`.`status` = ?"
    );
    assert_eq!(
        compile(&json!({"$or": []})).alwaysness(),
        Alwaysness::Never
    );
    assert_eq!(
        compile(&json!({"$and": []})).alwaysness(),
        Alwaysness::Always
    );
    assert_eq!(
        translation::compile_filter(&json!(null), &user_filters())
            .unwrap()
            .alwaysness(),
        Alwaysness::Always
    );
}

#[test]
fn joined_relations_add_their_join() {
    let select = helpers::select(helpers::table("users"))
        .where_(compile(&json!({"organization": {"id": "123"}})));
    let query = sql::select_to_sql(&select).unwrap();
    insta::assert_snapshot!(snapshot(&query), @r###"
    SELECT `users`.* FROM `users` LEFT JOIN `organizations` ON `organizations`.`id` = `users`.`organizationId` WHERE `organizations`.`id` = ?

    [(1, String("123"))]
    "###);
}

#[test]
fn a_join_is_added_once() {
    let select = helpers::select(helpers::table("users")).where_(compile(&json!([
        {"organization": {"id": "1"}},
        {"organization": {"name": "Acme"}}
    ])));
    assert_eq!(
        sql::select_to_sql(&select).unwrap().sql,
        "SELECT `users`.* FROM `users` LEFT JOIN `organizations` ON `organizations`.`id` = `users`.`organizationId` \
         WHERE `organizations`.`id` = ? AND `organizations`.`name` = ?"
    );
}

#[test]
fn an_unrestricted_relation_drops_its_join() {
    let select = helpers::select(helpers::table("users"))
        .where_(compile(&json!({"organization": {}})));
    assert_eq!(
        sql::select_to_sql(&select).unwrap().sql,
        "SELECT `users`.* FROM `users`"
    );
}

#[test]
fn an_optional_relation_keeps_its_join() {
    let definitions = FilterDefinitions::new().with(
        "organization",
        FilterDefinition::optional_joined_relation(organization_inner_join(), organization_filters()),
    );
    let predicate =
        translation::compile_filter(&json!({"organization": {"id": {"$gte": null}}}), &definitions)
            .unwrap();
    let select = helpers::select(helpers::table("users")).where_(predicate);
    assert_eq!(
        sql::select_to_sql(&select).unwrap().sql,
        "SELECT `users`.* FROM `users` JOIN `organizations` ON `organizations`.`id` = `users`.`organizationId`"
    );
}

#[test]
fn exists_relations_correlate_with_the_parent() {
    let select = helpers::select(helpers::table("users"))
        .where_(compile(&json!({"registrations": {"$elemMatch": {"period": "p1"}}})));
    let query = sql::select_to_sql(&select).unwrap();
    assert_eq!(
        query.sql,
        "SELECT `users`.* FROM `users` WHERE EXISTS (SELECT `registrations`.* FROM `registrations` \
         WHERE `registrations`.`userId` = `users`.`id` AND `registrations`.`periodId` = ?)"
    );
    assert_eq!(query.params, vec![Param::String("p1".to_string())]);
}

#[test]
fn unknown_keys_are_rejected() {
    let error = compile_error(&json!({"unknown": 1}));
    assert_eq!(error, translation::Error::UnknownFilterKey("unknown".to_string()));
    assert_eq!(error.code(), "unknown_filter_key");
    assert_eq!(error.to_string(), "Unknown filter unknown");

    assert_eq!(
        compile_error(&json!({"$where": "1"})),
        translation::Error::UnknownFilterKey("$where".to_string())
    );
    assert_eq!(
        compile_error(&json!({"settings.unknown": 1})),
        translation::Error::UnknownFilterKey("unknown".to_string())
    );
}

#[test]
fn comparisons_need_a_column() {
    assert_eq!(
        compile_error(&json!("x")).to_string(),
        "Cannot compare at root level"
    );
    assert_eq!(
        compile_error(&json!({"$eq": 1})).to_string(),
        "Cannot compare at root level"
    );
    assert_eq!(
        compile_error(&json!({"settings": 1})).to_string(),
        "Cannot compare at root level"
    );
}

#[test]
fn options_follow_the_filter_settings() {
    let settings = query_engine_configuration::FilterSettings { max_in_values: 3 };
    let options = FilterOptions::from(&settings);
    assert_eq!(options.max_in_values, 3);
    assert_eq!(options.now, None);
}

#[test]
fn columns_with_children_accept_both_operators_and_child_keys() {
    let definitions = FilterDefinitions::new().with(
        "profile",
        FilterDefinition::column_with_children(
            ColumnDescriptor::new(helpers::column("profile"), ValueType::JsonObject).nullable(),
            FilterDefinitions::new().with(
                "city",
                FilterDefinition::column(ColumnDescriptor::new(
                    helpers::column("city"),
                    ValueType::String,
                )),
            ),
        ),
    );
    let predicate =
        translation::compile_filter(&json!({"profile": {"city": "Oslo"}}), &definitions).unwrap();
    assert_eq!(common::render(&predicate).sql, "`default`.`city` = ?");

    let predicate =
        translation::compile_filter(&json!({"profile": {"$eq": null}}), &definitions).unwrap();
    assert_eq!(
        common::render(&predicate).sql,
        "`default`.`profile` IS NULL OR `default`.`profile` = CAST('null' AS JSON)"
    );
}

#[test]
fn restricted_columns_reject_the_filter() {
    let salary = ColumnDescriptor::new(helpers::column("salary"), ValueType::Number)
        .with_permission_check(|| Err("You cannot filter on salary".to_string()));
    let definitions = FilterDefinitions::new()
        .with(
            "name",
            FilterDefinition::column(ColumnDescriptor::new(
                helpers::column("name"),
                ValueType::String,
            )),
        )
        .with("salary", FilterDefinition::column(salary.clone()))
        .with("private", FilterDefinition::wildcard(move |_| salary.clone()));

    for filter in [
        json!({"salary": {"$gt": 1000}}),
        json!({"$or": [{"name": "Ann"}, {"salary": 10}]}),
        json!({"private": {"bonus": 5}}),
        json!({"private.bonus": 5}),
    ] {
        let error = translation::compile_filter(&filter, &definitions).unwrap_err();
        assert_eq!(
            error,
            translation::Error::PermissionDenied("You cannot filter on salary".to_string())
        );
        assert_eq!(error.code(), "permission_denied");
    }

    let allowed = ColumnDescriptor::new(helpers::column("name"), ValueType::String)
        .with_permission_check(|| Ok(()));
    let definitions = FilterDefinitions::new().with("name", FilterDefinition::column(allowed));
    let predicate = translation::compile_filter(&json!({"name": "Ann"}), &definitions).unwrap();
    assert_eq!(common::render(&predicate).sql, "`default`.`name` = ?");
}

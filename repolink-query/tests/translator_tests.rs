mod common;

use chrono::{FixedOffset, TimeZone};
use pretty_assertions::assert_eq;
use repolink_model::{ContentTypeDescriptor, ContentTypeRegistry, ModelError};
use repolink_query::{
    ContentQuery, Expr, QueryCompiler, QueryError, call, field, in_folder, in_tree, key, lit, type_is,
};
use rust_decimal::Decimal;

fn compile(predicate: Expr) -> String {
    let registry = common::registry();
    QueryCompiler::new(&registry).compile_predicate(&predicate).unwrap()
}

fn compile_typed(predicate: Expr) -> Result<String, QueryError> {
    let registry = common::registry();
    QueryCompiler::new(&registry)
        .for_type(&"Workspace".into())
        .compile_predicate(&predicate)
}

// ── Boolean fields ───────────────────────────────────────────────

#[test]
fn boolean_equality_is_symmetric() {
    let expected = "IsWallContainer:yes";
    assert_eq!(compile(field("IsWallContainer").eq(true)), expected);
    assert_eq!(compile(lit(true).eq(field("IsWallContainer"))), expected);
    assert_eq!(compile(field("IsWallContainer").ne(false)), expected);
}

#[test]
fn boolean_negation_renders_no() {
    assert_eq!(compile(field("Hidden").ne(true)), "Hidden:no");
    assert_eq!(compile(field("Hidden").eq(false)), "Hidden:no");
}

#[test]
fn bare_boolean_field_is_a_predicate() {
    assert_eq!(compile(field("Hidden")), "Hidden:yes");
    assert_eq!(compile(!field("Hidden")), "-Hidden:yes");
}

#[test]
fn ordering_on_booleans_is_rejected() {
    let registry = common::registry();
    let err = QueryCompiler::new(&registry)
        .compile_predicate(&field("Hidden").gt(true))
        .unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedExpression(_)));
}

// ── Type membership ──────────────────────────────────────────────

#[test]
fn type_membership_and_boolean_field() {
    let predicate = type_is("Workspace").and(field("IsWallContainer").eq(true));
    assert_eq!(compile(predicate), "+TypeIs:workspace +IsWallContainer:yes");
}

#[test]
fn of_type_narrowing_renders_required_groups() {
    let registry = common::registry();
    let compiler = QueryCompiler::new(&registry);

    let query = ContentQuery::new().of_type("Workspace").filter(field("IsWallContainer").eq(true));
    assert_eq!(compiler.compile(&query).unwrap(), "+TypeIs:workspace +IsWallContainer:yes");

    let query = ContentQuery::new()
        .of_type("Workspace")
        .filter(field("IsWallContainer").eq(true).or(field("DisplayName").eq("Intranet")));
    assert_eq!(
        compiler.compile(&query).unwrap(),
        "+TypeIs:workspace +(IsWallContainer:yes DisplayName:Intranet)"
    );

    let query = ContentQuery::new().of_type("Workspace");
    assert_eq!(compiler.compile(&query).unwrap(), "+TypeIs:workspace");
}

#[test]
fn unregistered_type_uses_its_own_name() {
    assert_eq!(compile(type_is("Memo")), "TypeIs:memo");
}

#[test]
fn ambiguous_type_name_fails_compilation() {
    let mut registry = ContentTypeRegistry::new();
    registry
        .register("Task", ContentTypeDescriptor::new("Task"))
        .register("TodoItem", ContentTypeDescriptor::new("Task"));

    let err = QueryCompiler::new(&registry).compile_predicate(&type_is("Task")).unwrap_err();
    assert!(matches!(err, QueryError::Model(ModelError::AmbiguousTypeName { .. })));
}

// ── Field names ──────────────────────────────────────────────────

#[test]
fn typed_properties_use_wire_names() {
    assert_eq!(compile_typed(field("Rating").ge(3)).unwrap(), "RateAvg:>=3");
}

#[test]
fn dynamic_keys_are_used_verbatim() {
    assert_eq!(compile_typed(key("Rating").ge(3)).unwrap(), "Rating:>=3");
}

#[test]
fn unknown_typed_property_is_rejected() {
    let err = compile_typed(field("Nope").eq(1)).unwrap_err();
    assert!(matches!(err, QueryError::UnknownProperty { ref property, .. } if property == "Nope"));
}

#[test]
fn non_boolean_typed_field_cannot_stand_alone() {
    assert!(compile_typed(field("DisplayName")).is_err());
    assert_eq!(compile_typed(field("IsWallContainer")).unwrap(), "IsWallContainer:yes");
}

// ── Comparisons ──────────────────────────────────────────────────

#[test]
fn comparison_operators() {
    assert_eq!(compile(key("Index").eq(5)), "Index:5");
    assert_eq!(compile(key("Index").ne(5)), "-Index:5");
    assert_eq!(compile(key("Index").gt(5)), "Index:>5");
    assert_eq!(compile(key("Index").ge(5)), "Index:>=5");
    assert_eq!(compile(key("Index").lt(5)), "Index:<5");
    assert_eq!(compile(key("Index").le(5)), "Index:<=5");
}

#[test]
fn literal_on_the_left_is_flipped() {
    assert_eq!(compile(lit(5).lt(key("Index"))), "Index:>5");
    assert_eq!(compile(lit(5).ge(key("Index"))), "Index:<=5");
}

#[test]
fn constant_arithmetic_is_folded() {
    assert_eq!(compile(key("Index").gt(lit(2) * 3 + 1)), "Index:>7");
    assert_eq!(compile(key("Price").lt(lit(Decimal::new(150, 2)) + 1)), "Price:<2.5");
}

#[test]
fn arithmetic_on_fields_is_rejected() {
    let registry = common::registry();
    let err = QueryCompiler::new(&registry)
        .compile_predicate(&key("Index").gt(key("Other") + 1))
        .unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedExpression(_)));
}

#[test]
fn string_values_are_quoted_when_needed() {
    assert_eq!(compile(key("Name").eq("Intranet")), "Name:Intranet");
    assert_eq!(compile(key("DisplayName").eq("My Site")), "DisplayName:'My Site'");
    assert_eq!(compile(key("DisplayName").eq("it's")), "DisplayName:'it\\'s'");
}

#[test]
fn datetimes_render_in_utc() {
    let deadline = FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 1, 10, 30, 0)
        .unwrap();
    assert_eq!(compile(key("Deadline").lt(deadline)), "Deadline:<'2024-03-01 08:30:00'");
}

#[test]
fn invalid_comparisons_are_rejected() {
    let registry = common::registry();
    let compiler = QueryCompiler::new(&registry);
    for predicate in [
        key("A").eq(key("B")),
        lit(1).eq(lit(1)),
        Expr::Field(repolink_query::FieldRef::Key("A".into())).eq(repolink_query::Literal::Null),
        lit(3),
    ] {
        assert!(
            matches!(compiler.compile_predicate(&predicate), Err(QueryError::UnsupportedExpression(_))),
            "{predicate:?} should be rejected"
        );
    }
}

// ── Boolean composition ──────────────────────────────────────────

#[test]
fn and_chains_flatten() {
    let predicate = key("A").eq(1).and(key("B").eq(2)).and(key("C").eq(3));
    assert_eq!(compile(predicate), "+A:1 +B:2 +C:3");
}

#[test]
fn or_chains_flatten() {
    let predicate = key("A").eq(1).or(key("B").eq(2).or(key("C").eq(3)));
    assert_eq!(compile(predicate), "A:1 B:2 C:3");
}

#[test]
fn nested_groups_are_parenthesized() {
    let predicate = key("A").eq(1).and(key("B").eq(2).or(key("C").eq(3)));
    assert_eq!(compile(predicate), "+A:1 +(B:2 C:3)");

    let predicate = key("A").eq(1).and(key("B").eq(2)).or(key("C").eq(3));
    assert_eq!(compile(predicate), "(+A:1 +B:2) C:3");
}

#[test]
fn negation_inside_and_becomes_prohibited_clause() {
    let predicate = key("A").eq(1).and(!key("B").eq(2));
    assert_eq!(compile(predicate), "+A:1 -B:2");

    let predicate = key("A").eq(1).and(key("B").ne(2));
    assert_eq!(compile(predicate), "+A:1 -B:2");
}

#[test]
fn double_negation_cancels() {
    assert_eq!(compile(!!key("A").eq(1)), "A:1");
}

#[test]
fn negated_group() {
    let predicate = !(key("A").eq(1).and(key("B").eq(2)));
    assert_eq!(compile(predicate), "-(+A:1 +B:2)");
}

// ── Method calls ─────────────────────────────────────────────────

#[test]
fn wildcard_methods() {
    assert_eq!(compile(key("Name").starts_with("Intra")), "Name:Intra*");
    assert_eq!(compile(key("Name").ends_with("net")), "Name:*net");
    assert_eq!(compile(key("Name").contains("my site")), "Name:*my\\ site*");
}

#[test]
fn tree_and_folder_membership() {
    assert_eq!(compile(in_tree("/Root/Sites")), "InTree:'/Root/Sites'");
    assert_eq!(
        compile(in_folder("/Root/Sites").and(key("Index").gt(0))),
        "+InFolder:'/Root/Sites' +Index:>0"
    );
}

#[test]
fn unknown_methods_are_rejected() {
    let registry = common::registry();
    let err = QueryCompiler::new(&registry)
        .compile_predicate(&call("Matches", Some(key("Name")), vec![lit("x.*")]))
        .unwrap_err();
    assert!(err.to_string().contains("Matches"));
}

// ── Query settings ───────────────────────────────────────────────

#[test]
fn keywords_follow_the_predicate() {
    let registry = common::registry();
    let query = ContentQuery::new()
        .of_type("Workspace")
        .filter(field("IsWallContainer").eq(true))
        .sort_by("DisplayName")
        .sort_by_desc("Rating")
        .top(10)
        .skip(20)
        .auto_filters(false)
        .lifespan(true)
        .count_only();

    assert_eq!(
        QueryCompiler::new(&registry).compile(&query).unwrap(),
        "+TypeIs:workspace +IsWallContainer:yes .SORT:DisplayName .REVERSESORT:RateAvg .TOP:10 .SKIP:20 \
         .AUTOFILTERS:OFF .LIFESPAN:ON .COUNTONLY"
    );
}

#[test]
fn filters_accumulate_with_and() {
    let registry = common::registry();
    let query = ContentQuery::new().filter(key("A").eq(1)).filter(key("B").eq(2));
    assert_eq!(QueryCompiler::new(&registry).compile(&query).unwrap(), "+A:1 +B:2");
}

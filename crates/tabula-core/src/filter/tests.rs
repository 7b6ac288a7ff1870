use crate::{
    expr::{ColumnPath, Expr},
    filter::{CompareOp, DateSpan, Degeneracy, Filter, TextOp},
    id::{Id, IdSet},
    value::{ColumnType, Value},
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use time::macros::date;

type Row = BTreeMap<String, Value>;

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.clone()))
        .collect()
}

fn amount_between(min: Option<i64>, max: Option<i64>) -> Filter {
    Filter::numeric_range(
        Expr::column("amount"),
        min.map(Value::Int),
        max.map(Value::Int),
        ColumnType::Int,
    )
}

// ==========================================================================
// Degeneracy
// ==========================================================================

#[test]
fn numeric_range_degeneracy_follows_bounds() {
    assert_eq!(amount_between(None, None).degeneracy(), Degeneracy::AlwaysTrue);
    assert_eq!(amount_between(Some(1), None).degeneracy(), Degeneracy::Normal);
    assert_eq!(amount_between(None, Some(9)).degeneracy(), Degeneracy::Normal);
    assert_eq!(amount_between(Some(1), Some(9)).degeneracy(), Degeneracy::Normal);
    assert_eq!(
        amount_between(Some(9), Some(1)).degeneracy(),
        Degeneracy::AlwaysFalse
    );
}

#[test]
fn empty_in_lists_are_always_false() {
    let values = Filter::values_in(Expr::column("name"), Vec::new(), ColumnType::Text);
    assert_eq!(values.degeneracy(), Degeneracy::AlwaysFalse);

    let ids = Filter::ids_in(Expr::column("id"), IdSet::new());
    assert_eq!(ids.degeneracy(), Degeneracy::AlwaysFalse);
}

#[test]
fn empty_starts_with_matches_everything() {
    let filter = Filter::text(Expr::column("name"), TextOp::StartsWith, "", false);
    assert_eq!(filter.degeneracy(), Degeneracy::AlwaysTrue);

    // Even a NULL value matches: the empty pattern matches everything.
    let r = row(&[("name", Value::Null)]);
    assert_eq!(filter.matches(&r), Ok(true));
}

#[test]
fn unbounded_date_span_is_always_true_and_inverted_is_always_false() {
    let unbounded = Filter::date_range(Expr::column("when"), DateSpan::new(None, None));
    assert_eq!(unbounded.degeneracy(), Degeneracy::AlwaysTrue);

    let inverted = Filter::date_range(
        Expr::column("when"),
        DateSpan::new(Some(date!(2024 - 06 - 01)), Some(date!(2024 - 01 - 01))),
    );
    assert_eq!(inverted.degeneracy(), Degeneracy::AlwaysFalse);
}

// ==========================================================================
// Combinators
// ==========================================================================

#[test]
fn and_prunes_true_children_and_short_circuits_false() {
    let keep = amount_between(Some(1), Some(9));

    let pruned = Filter::and_all(vec![amount_between(None, None), keep.clone()]);
    assert_eq!(pruned, keep);

    let collapsed = Filter::and_all(vec![keep, amount_between(Some(9), Some(1))]);
    assert_eq!(collapsed, Filter::Constant(false));
}

#[test]
fn or_prunes_false_children_and_short_circuits_true() {
    let keep = amount_between(Some(1), Some(9));

    let pruned = Filter::or_all(vec![amount_between(Some(9), Some(1)), keep.clone()]);
    assert_eq!(pruned, keep);

    let collapsed = Filter::or_all(vec![keep, amount_between(None, None)]);
    assert_eq!(collapsed, Filter::Constant(true));
}

#[test]
fn nested_same_kind_combinators_flatten() {
    let a = amount_between(Some(1), None);
    let b = amount_between(None, Some(9));
    let c = Filter::text(Expr::column("name"), TextOp::Contains, "x", false);

    let nested = Filter::and_all(vec![Filter::and_all(vec![a.clone(), b.clone()]), c.clone()]);
    let flat = Filter::and_all(vec![a, b, c]);
    assert_eq!(nested, flat);

    if let Filter::And(children) = &flat {
        assert_eq!(children.len(), 3);
    } else {
        panic!("expected an n-ary And, got {flat:?}");
    }
}

#[test]
fn double_negation_collapses() {
    let f = amount_between(Some(1), Some(9));
    assert_eq!(f.clone().negate().negate(), f);
}

#[test]
fn empty_combinators_fold_to_neutral_constants() {
    assert_eq!(Filter::and_all(Vec::new()), Filter::Constant(true));
    assert_eq!(Filter::or_all(Vec::new()), Filter::Constant(false));
}

// ==========================================================================
// Evaluation
// ==========================================================================

#[test]
fn compare_null_semantics() {
    let eq = Filter::compare(
        Expr::column("a"),
        Expr::column("b"),
        CompareOp::Eq,
        ColumnType::Int,
    );

    // Two NULL operands match.
    let both_null = row(&[("a", Value::Null), ("b", Value::Null)]);
    assert_eq!(eq.matches(&both_null), Ok(true));

    // One NULL operand never matches, whatever the operator.
    let one_null = row(&[("a", Value::Null), ("b", Value::Int(0))]);
    assert_eq!(eq.matches(&one_null), Ok(false));

    let ne = Filter::compare(
        Expr::column("a"),
        Expr::column("b"),
        CompareOp::Ne,
        ColumnType::Int,
    );
    assert_eq!(ne.matches(&one_null), Ok(false));
}

#[test]
fn null_as_default_substitutes_zero() {
    let filter = Filter::compare_null_as_default(
        Expr::column("a"),
        Expr::constant(0i64, ColumnType::Int),
        CompareOp::Eq,
        ColumnType::Int,
    );

    let r = row(&[("a", Value::Null)]);
    assert_eq!(filter.matches(&r), Ok(true));
}

#[test]
fn not_null_predicate_via_ne_null_constant() {
    let filter = Filter::compare(
        Expr::column("a"),
        Expr::Constant(crate::expr::Constant::null(ColumnType::Int)),
        CompareOp::Ne,
        ColumnType::Int,
    );

    assert_eq!(filter.matches(&row(&[("a", Value::Int(3))])), Ok(true));
    assert_eq!(filter.matches(&row(&[("a", Value::Null)])), Ok(false));
}

#[test]
fn ids_in_reads_null_as_sentinel() {
    let mut ids = IdSet::new();
    ids.insert(Id::SENTINEL);

    let filter = Filter::ids_in(Expr::column("parent"), ids);
    assert_eq!(filter.matches(&row(&[("parent", Value::Null)])), Ok(true));
    assert_eq!(filter.matches(&row(&[("parent", Value::Int(3))])), Ok(false));
}

#[test]
fn date_range_includes_with_open_end() {
    let filter = Filter::date_range_includes(
        Expr::column("from"),
        Expr::column("to"),
        date!(2024 - 03 - 15),
    );

    let open_ended = row(&[("from", Value::Date(date!(2024 - 01 - 01))), ("to", Value::Null)]);
    assert_eq!(filter.matches(&open_ended), Ok(true));

    let closed = row(&[
        ("from", Value::Date(date!(2024 - 01 - 01))),
        ("to", Value::Date(date!(2024 - 02 - 01))),
    ]);
    assert_eq!(filter.matches(&closed), Ok(false));
}

#[test]
fn date_range_overlaps_detects_disjoint_periods() {
    let filter = Filter::date_range_overlaps(
        Expr::column("from"),
        Expr::column("to"),
        DateSpan::new(Some(date!(2024 - 03 - 01)), Some(date!(2024 - 03 - 31))),
    );

    let overlapping = row(&[
        ("from", Value::Date(date!(2024 - 02 - 15))),
        ("to", Value::Date(date!(2024 - 03 - 05))),
    ]);
    assert_eq!(filter.matches(&overlapping), Ok(true));

    let disjoint = row(&[
        ("from", Value::Date(date!(2024 - 01 - 01))),
        ("to", Value::Date(date!(2024 - 01 - 31))),
    ]);
    assert_eq!(filter.matches(&disjoint), Ok(false));
}

#[test]
fn required_columns_deduplicates_nested_references() {
    let filter = Filter::and_all(vec![
        amount_between(Some(1), None),
        Filter::or_all(vec![
            Filter::text(Expr::column("name"), TextOp::Contains, "x", true),
            Filter::compare(
                Expr::column("amount"),
                Expr::column("owner.balance"),
                CompareOp::Lt,
                ColumnType::Int,
            ),
        ]),
    ]);

    let columns = filter.required_columns();
    assert_eq!(columns.len(), 3);
    assert!(columns.contains(&ColumnPath::parse("amount")));
    assert!(columns.contains(&ColumnPath::parse("name")));
    assert!(columns.contains(&ColumnPath::parse("owner.balance")));
}

// ==========================================================================
// Algebraic laws
// ==========================================================================

fn arb_int_value() -> impl Strategy<Value = Value> {
    prop_oneof![Just(Value::Null), (-4i64..=4).prop_map(Value::Int)]
}

fn arb_text_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        "[abx]{0,3}".prop_map(Value::from),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Filter> {
    prop_oneof![
        Just(Filter::Constant(true)),
        Just(Filter::Constant(false)),
        (arb_int_value(), any::<bool>()).prop_map(|(v, null_as_default)| {
            let cmp = Filter::compare(
                Expr::column("amount"),
                Expr::constant(v, ColumnType::Int),
                CompareOp::Le,
                ColumnType::Int,
            );
            if null_as_default {
                if let Filter::Compare(mut inner) = cmp {
                    inner.null_as_default = true;
                    Filter::Compare(inner)
                } else {
                    cmp
                }
            } else {
                cmp
            }
        }),
        (proptest::option::of(-4i64..=4), proptest::option::of(-4i64..=4))
            .prop_map(|(min, max)| amount_between(min, max)),
        "[abx]{0,2}".prop_map(|pattern| {
            Filter::text(Expr::column("name"), TextOp::StartsWith, pattern, false)
        }),
    ]
}

fn arb_filter() -> impl Strategy<Value = Filter> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Filter::And),
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Filter::Or),
            inner.prop_map(|f| Filter::Not(Box::new(f))),
        ]
    })
}

fn arb_row() -> impl Strategy<Value = Row> {
    (arb_int_value(), arb_text_value()).prop_map(|(amount, name)| {
        row(&[("amount", amount), ("name", name)])
    })
}

proptest! {
    #[test]
    fn flattened_and_is_equivalent(
        a in arb_filter(),
        b in arb_filter(),
        c in arb_filter(),
        r in arb_row(),
    ) {
        let nested = Filter::And(vec![Filter::And(vec![a.clone(), b.clone()]), c.clone()]);
        let flat = Filter::and_all(vec![a, b, c]);

        prop_assert_eq!(nested.degeneracy(), flat.degeneracy());
        prop_assert_eq!(nested.matches(&r), flat.matches(&r));
    }

    #[test]
    fn flattened_or_is_equivalent(
        a in arb_filter(),
        b in arb_filter(),
        c in arb_filter(),
        r in arb_row(),
    ) {
        let nested = Filter::Or(vec![Filter::Or(vec![a.clone(), b.clone()]), c.clone()]);
        let flat = Filter::or_all(vec![a, b, c]);

        prop_assert_eq!(nested.degeneracy(), flat.degeneracy());
        prop_assert_eq!(nested.matches(&r), flat.matches(&r));
    }

    #[test]
    fn double_negation_preserves_evaluation(f in arb_filter(), r in arb_row()) {
        let twice = f.clone().negate().negate();
        prop_assert_eq!(f.matches(&r), twice.matches(&r));
    }

    #[test]
    fn always_true_is_a_conjunction_identity(g in arb_filter(), r in arb_row()) {
        let t = amount_between(None, None);
        prop_assert_eq!(t.degeneracy(), Degeneracy::AlwaysTrue);

        let conj = Filter::and_all(vec![t, g.clone()]);
        prop_assert_eq!(conj.matches(&r), g.matches(&r));
    }

    #[test]
    fn always_false_is_a_disjunction_identity(g in arb_filter(), r in arb_row()) {
        let f = amount_between(Some(4), Some(-4));
        prop_assert_eq!(f.degeneracy(), Degeneracy::AlwaysFalse);

        let disj = Filter::or_all(vec![f, g.clone()]);
        prop_assert_eq!(disj.matches(&r), g.matches(&r));
    }

    #[test]
    fn always_true_filters_match_every_row(f in arb_filter(), r in arb_row()) {
        if f.degeneracy() == Degeneracy::AlwaysTrue {
            prop_assert_eq!(f.matches(&r), Ok(true));
        }
    }
}

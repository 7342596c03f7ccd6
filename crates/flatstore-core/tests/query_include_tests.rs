#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeSet;

use common::{
    chain_models, collection, item_id, node_ref, rec, ranked_models, NODE_A, NODE_B, NODE_C,
};
use flatstore_core::model::Models;
use flatstore_core::query::{count_where, SelectionResults, SELECTION_ENTITY};
use flatstore_core::{find_where, pick_included_deep, IncludeOptions, WhereClause};
use serde_json::{json, Map, Value};

fn names(rows: &[&flatstore_core::Record]) -> Vec<String> {
    rows.iter()
        .map(|r| r.get("name").and_then(Value::as_str).unwrap().to_string())
        .collect()
}

#[test]
fn test_order_by_name_desc() {
    let mut models = Models::new();
    models.insert(
        "e".into(),
        collection(vec![
            json!({ "id": "1", "name": "b" }),
            json!({ "id": "2", "name": "a" }),
            json!({ "id": "3", "name": "c" }),
        ]),
    );
    let rows = find_where(&models, "e", &WhereClause::new(), Some("name desc"), 0, 0);
    assert_eq!(names(&rows), vec!["c", "b", "a"]);
}

#[test]
fn test_limit_offset_follow_the_active_order() {
    let models = ranked_models(10);
    let rows = find_where(&models, "item", &WhereClause::new(), Some("rank asc"), 2, 1);
    assert_eq!(names(&rows), vec!["n01", "n02"]);

    let rows = find_where(&models, "item", &WhereClause::new(), Some("rank desc"), 2, 1);
    assert_eq!(names(&rows), vec!["n08", "n07"]);
}

#[test]
fn test_random_order_keeps_every_row() {
    let models = ranked_models(10);
    let rows = find_where(&models, "item", &WhereClause::new(), Some("random"), 0, 0);
    let ids: BTreeSet<_> = rows.iter().map(|r| r.id().unwrap()).collect();
    assert_eq!(ids.len(), 10);
}

#[test]
fn test_where_list_intersection() {
    let mut models = Models::new();
    models.insert(
        "post".into(),
        collection(vec![
            json!({ "id": "p1", "tags": ["y", "z"] }),
            json!({ "id": "p2", "tags": ["z"] }),
            json!({ "id": "p3", "tags": "x" }),
        ]),
    );
    let where_clause = WhereClause::new().and("tags", json!(["x", "y"])).unwrap();
    let ids: Vec<_> = find_where(&models, "post", &where_clause, Some("id"), 0, 0)
        .iter()
        .map(|r| r.id().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["p1", "p3"]);
    assert_eq!(count_where(&models, "post", &where_clause), 2);
}

#[test]
fn test_where_regex_and_form_pairs() {
    let models = ranked_models(12);
    let where_clause = WhereClause::from_value(&json!([["name", "/^N1/"]])).unwrap();
    let rows = find_where(&models, "item", &where_clause, Some("name"), 0, 0);
    assert_eq!(names(&rows), vec!["n10", "n11"]);

    assert!(WhereClause::from_value(&json!({ "name": "/([/" })).is_err());
}

#[test]
fn test_chain_inclusion_and_global_cap() {
    let models = chain_models();
    let root = models["node"][NODE_A].clone();

    let all = pick_included_deep(&root, &models, None, &IncludeOptions::default()).unwrap();
    assert_eq!(
        all.keys().cloned().collect::<Vec<_>>(),
        vec![node_ref(NODE_B), node_ref(NODE_C)]
    );
    assert_eq!(all[&node_ref(NODE_C)].depth, 2);

    let capped = IncludeOptions {
        max_depth: 1,
        ..IncludeOptions::default()
    };
    let one = pick_included_deep(&root, &models, None, &capped).unwrap();
    assert_eq!(one.keys().cloned().collect::<Vec<_>>(), vec![node_ref(NODE_B)]);
}

#[test]
fn test_per_entity_cap_prunes_subtree() {
    let tag = "tag0-0000-0000-0001";
    let mut models = chain_models();
    models.insert(
        "tag".into(),
        collection(vec![json!({ "id": tag, "node": node_ref(NODE_C) })]),
    );
    let root = rec(json!({ "tag": format!("tag/{}", tag), "first": node_ref(NODE_A) }));

    let mut options = IncludeOptions::default();
    options.entity_depth.insert("tag".into(), 0);
    let inc = pick_included_deep(&root, &models, None, &options).unwrap();
    assert!(!inc.contains_key(&format!("tag/{}", tag)));
    // C is not reached through the pruned tag, only through A -> B -> C
    assert_eq!(inc[&node_ref(NODE_C)].depth, 3);
    assert_eq!(inc.len(), 3);
}

#[test]
fn test_cycle_terminates_with_each_node_once() {
    let mut models = Models::new();
    models.insert(
        "node".into(),
        collection(vec![
            json!({ "id": NODE_A, "next": node_ref(NODE_B) }),
            json!({ "id": NODE_B, "next": node_ref(NODE_A) }),
        ]),
    );
    let root = models["node"][NODE_A].clone();
    let inc = pick_included_deep(&root, &models, None, &IncludeOptions::default()).unwrap();
    assert_eq!(inc.len(), 2);
    assert_eq!(inc[&node_ref(NODE_B)].depth, 1);
    assert_eq!(inc[&node_ref(NODE_A)].depth, 2);
}

fn with_name_selection(models: &mut Models, id: &str) -> String {
    models.insert(
        SELECTION_ENTITY.into(),
        collection(vec![json!({
            "id": id,
            "of": "item",
            "where": { "name": "$name" },
            "order_by": "rank"
        })]),
    );
    format!("{}/{}", SELECTION_ENTITY, id)
}

fn name_params(name: &str) -> IncludeOptions {
    let mut params = Map::new();
    params.insert("$name".into(), json!(name));
    IncludeOptions {
        where_params: Some(params),
        ..IncludeOptions::default()
    }
}

#[test]
fn test_selection_with_placeholder() {
    let mut models = ranked_models(5);
    let sel = with_name_selection(&mut models, "sel0-0000-0000-0001");
    let root = rec(json!({ "list": [sel.clone()] }));

    let mut results = SelectionResults::new();
    let inc = pick_included_deep(&root, &models, Some(&mut results), &name_params("n03")).unwrap();

    let item = format!("item/{}", item_id(3));
    assert!(inc.contains_key(&item));
    assert!(inc.contains_key(&sel));
    assert_eq!(inc.len(), 2);
    assert_eq!(results[&sel], vec![item]);
}

#[test]
fn test_selection_params_apply_on_first_encounter_only() {
    let mut models = ranked_models(5);
    let sel = with_name_selection(&mut models, "sel0-0000-0000-0002");
    let root = rec(json!({ "list": [sel.clone()] }));
    let mut results = SelectionResults::new();

    pick_included_deep(&root, &models, Some(&mut results), &name_params("n01")).unwrap();
    let second =
        pick_included_deep(&root, &models, Some(&mut results), &name_params("n04")).unwrap();

    let first_item = format!("item/{}", item_id(1));
    assert_eq!(results[&sel], vec![first_item.clone()]);
    // the recorded membership is reused, the new params are not applied
    assert!(second.contains_key(&first_item));
    assert!(!second.contains_key(&format!("item/{}", item_id(4))));
}

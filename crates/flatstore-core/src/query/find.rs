use crate::model::{Models, Record};

use super::order::OrderBy;
use super::where_clause::WhereClause;

/// Matching records of `entity`, ordered, then sliced by `offset` / `limit`
///
/// An unknown entity yields no rows. `limit == 0` means no limit. Without an
/// `order_by` rows come in id order.
pub fn find_where<'a>(
    models: &'a Models,
    entity: &str,
    where_clause: &WhereClause,
    order_by: Option<&str>,
    limit: usize,
    offset: usize,
) -> Vec<&'a Record> {
    let Some(collection) = models.get(entity) else {
        return Vec::new();
    };
    let mut found: Vec<&Record> = collection
        .values()
        .filter(|r| where_clause.matches(r))
        .collect();

    if let Some(order) = order_by.and_then(OrderBy::parse) {
        order.sort(&mut found);
    }

    let take = if limit == 0 { usize::MAX } else { limit };
    found.into_iter().skip(offset).take(take).collect()
}

pub fn count_where(models: &Models, entity: &str, where_clause: &WhereClause) -> usize {
    models
        .get(entity)
        .map(|c| c.values().filter(|r| where_clause.matches(r)).count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Collection;
    use serde_json::json;

    fn models() -> Models {
        let mut foo = Collection::new();
        for (i, name) in ["b", "a", "c"].iter().enumerate() {
            let id = format!("id{}", i);
            foo.insert(
                id.clone(),
                Record::from_value(json!({ "id": id, "name": name })).unwrap(),
            );
        }
        let mut m = Models::new();
        m.insert("foo".into(), foo);
        m
    }

    fn names(rows: &[&Record]) -> Vec<String> {
        rows.iter()
            .map(|r| r.get("name").and_then(|v| v.as_str()).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_order_desc() {
        let m = models();
        let rows = find_where(&m, "foo", &WhereClause::new(), Some("name desc"), 0, 0);
        assert_eq!(names(&rows), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_limit_offset_after_order() {
        let m = models();
        let rows = find_where(&m, "foo", &WhereClause::new(), Some("name"), 1, 1);
        assert_eq!(names(&rows), vec!["b"]);
        let rows = find_where(&m, "foo", &WhereClause::new(), Some("name"), 0, 2);
        assert_eq!(names(&rows), vec!["c"]);
    }

    #[test]
    fn test_unknown_entity_and_count() {
        let m = models();
        assert!(find_where(&m, "nope", &WhereClause::new(), None, 0, 0).is_empty());
        let w = WhereClause::from_value(&json!({ "name": ["a", "c"] })).unwrap();
        assert_eq!(count_where(&m, "foo", &w), 2);
        assert_eq!(count_where(&m, "nope", &w), 0);
    }
}

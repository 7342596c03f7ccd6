use crate::model::{is_hidden_field, is_reserved_field, Record};

/// External view of a record: every hidden (`__`) field removed
///
/// Applied to anything that crosses the trust boundary (responses, exports).
pub fn output_record(record: &Record) -> Record {
    let mut out = record.clone();
    out.retain(|key, _| !is_hidden_field(key));
    out
}

pub fn output_collection<'a, I>(records: I) -> Vec<Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().map(output_record).collect()
}

/// Drop top-level `_`-prefixed fields from a client payload
///
/// Reserved fields (`_created_at`, `_owner`, ...) and hidden fields are only
/// ever set by the store itself; clients cannot smuggle them in on create
/// or update.
pub fn strip_client_reserved(mut payload: Record) -> Record {
    payload.retain(|key, _| !is_reserved_field(key));
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: serde_json::Value) -> Record {
        Record::from_value(v).unwrap()
    }

    #[test]
    fn test_output_record_strips_hidden_only() {
        let r = rec(json!({
            "id": "a",
            "_owner": "u1",
            "__secret": "x",
            "nested": { "__kept": 1 }
        }));
        let out = output_record(&r);
        assert!(!out.contains_key("__secret"));
        assert_eq!(out.owner(), Some("u1"));
        // only top-level keys are projected
        assert_eq!(out.get("nested"), Some(&json!({ "__kept": 1 })));
        // source untouched
        assert!(r.contains_key("__secret"));
    }

    #[test]
    fn test_output_collection() {
        let rows = vec![
            rec(json!({ "id": "a", "__h": 1 })),
            rec(json!({ "id": "b" })),
        ];
        let out = output_collection(&rows);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.keys().all(|k| !k.starts_with("__"))));
    }

    #[test]
    fn test_strip_client_reserved() {
        let payload = rec(json!({
            "id": "a",
            "name": "n",
            "_owner": "intruder",
            "_created_at": "2000-01-01",
            "__hidden": true
        }));
        let clean = strip_client_reserved(payload);
        assert_eq!(clean.keys().cloned().collect::<Vec<_>>(), vec!["id", "name"]);
    }
}

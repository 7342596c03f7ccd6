use std::time::Instant;

use serde_json::{Map, Value};

use crate::model::{Action, Audience, Record};
use crate::repository::{by_created_at, stable_sort_by};
use crate::{log_op_end, log_op_start};

use super::projection::output_record;
use super::store::Store;

/// Which entities a dump covers besides the access check
#[derive(Debug, Clone, Default)]
pub struct DumpFilter {
    /// When set, only these entities
    pub allow: Option<Vec<String>>,
    pub deny: Vec<String>,
}

impl DumpFilter {
    /// Parse comma-separated allow and deny lists; empty items are ignored
    pub fn from_lists(allow: Option<&str>, deny: Option<&str>) -> Self {
        let split = |s: &str| -> Vec<String> {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        };
        Self {
            allow: allow.map(split),
            deny: deny.map(split).unwrap_or_default(),
        }
    }

    fn admits(&self, entity: &str) -> bool {
        if self.deny.iter().any(|e| e == entity) {
            return false;
        }
        match &self.allow {
            Some(allow) => allow.iter().any(|e| e == entity),
            None => true,
        }
    }
}

/// Bulk export of every entity `audience` may list
///
/// Returns `entity -> id -> record`, records projected for the outside and
/// in default listing order.
pub fn dump(store: &Store, audience: Audience, filter: &DumpFilter) -> Map<String, Value> {
    let start = Instant::now();
    log_op_start!("dump");

    let mut out = Map::new();
    for entity in store.entities() {
        if !filter.admits(entity) || !store.has_access(entity, audience, Action::ReadAll) {
            continue;
        }
        let records: Vec<&Record> = store
            .models()
            .get(entity)
            .map(|c| c.values().collect())
            .unwrap_or_default();
        let sorted = stable_sort_by(records, &|a: &&Record, b: &&Record| by_created_at(a, b));

        let rows: Map<String, Value> = sorted
            .into_iter()
            .filter_map(|r| {
                let id = r.id()?.to_string();
                Some((id, output_record(r).into_value()))
            })
            .collect();
        out.insert(entity.to_string(), Value::Object(rows));
    }

    log_op_end!(
        "dump",
        duration_ms = start.elapsed().as_millis() as u64,
        entity_count = out.len()
    );
    out
}

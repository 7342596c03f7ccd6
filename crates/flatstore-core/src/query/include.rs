//! Reference inclusion
//!
//! Starting from a root record, every top-level field value (or list item)
//! shaped like `"entity/id"` that resolves in the models is included, keyed
//! by that reference string, and its own references are followed in turn.
//!
//! The walk is breadth first over an explicit queue with a visited set, so
//! every reference is handled once, at the smallest depth it occurs at. The
//! root's direct references are depth 1.
//!
//! References to the selection entity are stored queries: the selection
//! record itself is included, and its `of` / `where` / `order_by` / `limit`
//! query is run with [`find_where`]; each match is included at the
//! selection's own depth and its references are followed from there.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::Result;
use crate::model::{Models, Record};
use crate::repository::Paging;
use crate::uid::{parse_reference, reference};

use super::find::find_where;
use super::where_clause::{substitute_params, WhereClause};

/// Entity name of stored selections
pub const SELECTION_ENTITY: &str = "_$selection";

/// Ordered match references per selection reference
pub type SelectionResults = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default)]
pub struct IncludeOptions {
    /// Deepest depth included; `0` means unlimited
    pub max_depth: usize,
    /// Per-entity depth caps, checked against the included record's entity
    pub entity_depth: BTreeMap<String, usize>,
    /// Values for selection where placeholders
    pub where_params: Option<Map<String, Value>>,
}

impl IncludeOptions {
    fn allows(&self, entity: &str, depth: usize) -> bool {
        if self.max_depth > 0 && depth > self.max_depth {
            return false;
        }
        self.entity_depth
            .get(entity)
            .map(|cap| depth <= *cap)
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncludedRecord<'a> {
    pub entity: String,
    pub depth: usize,
    pub record: &'a Record,
}

/// Reference-shaped strings among a record's top-level values, in field order
fn references_of(record: &Record) -> Vec<&str> {
    let mut refs = Vec::new();
    for (_, value) in record.iter() {
        let items: &[Value] = match value {
            Value::Array(list) => list,
            single => std::slice::from_ref(single),
        };
        for item in items {
            if let Some(s) = item.as_str() {
                if parse_reference(s).is_some() {
                    refs.push(s);
                }
            }
        }
    }
    refs
}

/// Collect every record reachable from `root`
///
/// When `selections` is given, the ordered match list of each selection is
/// recorded under the selection's reference. A selection the caller already
/// has an entry for is not queried again: its recorded matches are included
/// and `where_params` are not applied to it.
///
/// A record beyond a depth cap is neither included nor walked.
///
/// # Errors
///
/// Returns `InvalidWhere` when a stored selection has an unusable `where`
/// and `InvalidPaging` when its `limit` is not a non-negative integer.
pub fn pick_included_deep<'a>(
    root: &Record,
    models: &'a Models,
    mut selections: Option<&mut SelectionResults>,
    options: &IncludeOptions,
) -> Result<BTreeMap<String, IncludedRecord<'a>>> {
    let mut included = BTreeMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(Vec<String>, usize)> = VecDeque::new();

    let root_refs = references_of(root).into_iter().map(String::from).collect();
    queue.push_back((root_refs, 1));

    while let Some((refs, depth)) = queue.pop_front() {
        if options.max_depth > 0 && depth > options.max_depth {
            continue;
        }
        for r in refs {
            if !visited.insert(r.clone()) {
                continue;
            }
            let Some((entity, id)) = parse_reference(&r) else {
                continue;
            };
            let Some(found) = models.get(entity).and_then(|c| c.get(id)) else {
                continue;
            };
            if !options.allows(entity, depth) {
                continue;
            }

            included.insert(
                r.clone(),
                IncludedRecord {
                    entity: entity.to_string(),
                    depth,
                    record: found,
                },
            );
            queue.push_back((owned_refs(found), depth + 1));

            if entity != SELECTION_ENTITY {
                continue;
            }

            let recorded = selections
                .as_deref()
                .and_then(|out| out.get(&r))
                .map(|refs| recorded_matches(refs, models));
            let matches = match recorded {
                Some(matches) => matches,
                None => {
                    let matches = run_selection(found, models, options)?;
                    if let Some(out) = selections.as_deref_mut() {
                        out.insert(r.clone(), matches.iter().map(|m| m.0.clone()).collect());
                    }
                    matches
                }
            };
            for (mref, of, m) in matches {
                if !visited.insert(mref.clone()) || !options.allows(of, depth) {
                    continue;
                }
                included.insert(
                    mref,
                    IncludedRecord {
                        entity: of.to_string(),
                        depth,
                        record: m,
                    },
                );
                queue.push_back((owned_refs(m), depth + 1));
            }
        }
    }

    Ok(included)
}

fn owned_refs(record: &Record) -> Vec<String> {
    references_of(record).into_iter().map(String::from).collect()
}

/// Selection match: reference, entity, record
type Match<'a> = (String, &'a str, &'a Record);

fn run_selection<'a>(
    selection: &'a Record,
    models: &'a Models,
    options: &IncludeOptions,
) -> Result<Vec<Match<'a>>> {
    let of = selection.get("of").and_then(Value::as_str).unwrap_or_default();
    let raw_where = selection.get("where").cloned().unwrap_or(Value::Null);
    let raw_where = match &options.where_params {
        Some(params) => substitute_params(&raw_where, params),
        None => raw_where,
    };
    let where_clause = WhereClause::from_value(&raw_where)?;
    let order_by = selection.get("order_by").and_then(Value::as_str);
    let limit = Paging::from_values(selection.get("limit"), None)?.limit;

    Ok(find_where(models, of, &where_clause, order_by, limit, 0)
        .into_iter()
        .filter_map(|m| m.id().map(|id| (reference(of, id), of, m)))
        .collect())
}

/// Matches of a selection the caller already resolved; stale references
/// are skipped
fn recorded_matches<'a>(refs: &[String], models: &'a Models) -> Vec<Match<'a>> {
    refs.iter()
        .filter_map(|r| {
            let (entity, id) = parse_reference(r)?;
            let (entity, collection) = models.get_key_value(entity)?;
            let found = collection.get(id)?;
            Some((r.clone(), entity.as_str(), found))
        })
        .collect()
}

use std::cmp::Ordering;

use rand::seq::SliceRandom;

use crate::model::Record;

use super::values::compare_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Parsed `order_by` expression
///
/// Either the literal `random` (any case) or a comma-separated list of
/// `field [asc|desc]`; a missing or unrecognised direction means ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    Random,
    Fields(Vec<(String, Direction)>),
}

impl OrderBy {
    /// `None` for an empty expression
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return None;
        }
        if expr.eq_ignore_ascii_case("random") {
            return Some(OrderBy::Random);
        }
        let fields: Vec<(String, Direction)> = expr
            .split(',')
            .filter_map(|part| {
                let mut tokens = part.split_whitespace();
                let field = tokens.next()?;
                let dir = match tokens.next() {
                    Some(d) if d.eq_ignore_ascii_case("desc") => Direction::Desc,
                    _ => Direction::Asc,
                };
                Some((field.to_string(), dir))
            })
            .collect();
        if fields.is_empty() {
            None
        } else {
            Some(OrderBy::Fields(fields))
        }
    }

    /// Sort in place; stable, missing fields last in either direction
    pub fn sort(&self, rows: &mut [&Record]) {
        match self {
            OrderBy::Random => rows.shuffle(&mut rand::thread_rng()),
            OrderBy::Fields(fields) => rows.sort_by(|a, b| compare_by(fields, a, b)),
        }
    }
}

fn compare_by(fields: &[(String, Direction)], a: &Record, b: &Record) -> Ordering {
    for (field, dir) in fields {
        let ord = match (a.get(field), b.get(field)) {
            (Some(x), Some(y)) => match dir {
                Direction::Asc => compare_values(x, y),
                Direction::Desc => compare_values(y, x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

//! Identifier generation and reference parsing
//!
//! Record ids produced by [`model_uid`] look like `1A2B-C3D4-E5F6-G7H8`: the
//! current unix time in seconds (upper-case base 36) followed by random
//! upper-case alphanumerics, cut into four groups of four. Ids generated in
//! later seconds sort after earlier ones.

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SHORT_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-";

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

fn random_chars(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Time-prefixed sortable record id (`xxxx-xxxx-xxxx-xxxx`)
pub fn model_uid() -> String {
    let secs = chrono::Utc::now().timestamp().max(0) as u64;
    let mut raw = to_base36(secs);
    raw.truncate(16);
    let fill = 16 - raw.len();
    raw.push_str(&random_chars(ALPHABET, fill));

    raw.as_bytes()
        .chunks(4)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}

/// Random v4 UUID
pub fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short url-safe random id (11 characters)
pub fn short_uid() -> String {
    random_chars(SHORT_ALPHABET, 11)
}

fn model_uid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^-/]{4}(?:-[^/-]{4}){3}$").expect("static regex"))
}

fn entity_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^/\s]+$").expect("static regex"))
}

/// True for ids shaped like [`model_uid`] output
pub fn is_model_uid_like(s: &str) -> bool {
    model_uid_re().is_match(s)
}

/// True for names usable as the entity half of a reference
pub fn is_entity_name_like(s: &str) -> bool {
    entity_name_re().is_match(s)
}

/// Split an `"entity/id"` reference
///
/// Returns `None` unless the value has exactly one slash, the entity part has
/// no whitespace, and the id part looks like a model uid.
pub fn parse_reference(s: &str) -> Option<(&str, &str)> {
    let (entity, id) = s.split_once('/')?;
    if is_entity_name_like(entity) && is_model_uid_like(id) {
        Some((entity, id))
    } else {
        None
    }
}

pub fn is_reference_like(s: &str) -> bool {
    parse_reference(s).is_some()
}

/// Build the `"entity/id"` reference string for a record
pub fn reference(entity: &str, id: &str) -> String {
    format!("{}/{}", entity, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_uid_shape() {
        let id = model_uid();
        assert_eq!(id.len(), 19);
        assert!(is_model_uid_like(&id), "{}", id);
        assert!(id
            .chars()
            .all(|c| c == '-' || c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_model_uids_differ() {
        assert_ne!(model_uid(), model_uid());
    }

    #[test]
    fn test_model_uid_time_prefix_sorts() {
        let now = to_base36(chrono::Utc::now().timestamp() as u64);
        assert!(model_uid().replace('-', "").starts_with(&now[..4]));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_uuid_and_short_uid() {
        assert_eq!(uuid().len(), 36);
        assert_eq!(short_uid().len(), 11);
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse_reference("page/ABCD-EFGH-IJKL-MNOP"),
            Some(("page", "ABCD-EFGH-IJKL-MNOP"))
        );
        assert_eq!(parse_reference("page/abc"), None);
        assert_eq!(parse_reference("my page/ABCD-EFGH-IJKL-MNOP"), None);
        assert_eq!(parse_reference("ABCD-EFGH-IJKL-MNOP"), None);
        assert_eq!(parse_reference("a/b/ABCD-EFGH-IJKL-MNOP"), None);
        assert!(is_reference_like(&reference("user", &model_uid())));
    }
}

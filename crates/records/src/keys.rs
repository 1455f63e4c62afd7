//! Composite key derivation.
//!
//! Keys use the host ledger's composite-key layout: a NUL, the document
//! type, a NUL, the id, and a closing NUL. Document type names never
//! contain NUL, so the first two delimiters always bracket the type and
//! everything up to the final delimiter is the id. That makes the mapping
//! injective for arbitrary id strings.

use crate::types::DocType;

const DELIMITER: char = '\u{0}';

/// Storage key for the record `(doc_type, id)`.
pub fn derive_key(doc_type: DocType, id: &str) -> String {
    let mut key = String::with_capacity(doc_type.as_str().len() + id.len() + 3);
    key.push(DELIMITER);
    key.push_str(doc_type.as_str());
    key.push(DELIMITER);
    key.push_str(id);
    key.push(DELIMITER);
    key
}

/// Split a composite key back into its document type and id.
///
/// Returns `None` for keys not produced by [`derive_key`].
pub fn parse_key(key: &str) -> Option<(DocType, &str)> {
    let rest = key.strip_prefix(DELIMITER)?;
    let (doc_type, rest) = rest.split_once(DELIMITER)?;
    let id = rest.strip_suffix(DELIMITER)?;
    let doc_type = doc_type.parse::<DocType>().ok()?;
    Some((doc_type, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_different_types_never_collide() {
        let keys: Vec<String> = DocType::ALL
            .iter()
            .map(|d| derive_key(*d, "42"))
            .collect();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn parse_inverts_derive() {
        for id in ["b-1", "", "with\u{0}nul", "Bike", "\u{0}"] {
            for doc in DocType::ALL {
                let key = derive_key(*doc, id);
                assert_eq!(parse_key(&key), Some((*doc, id)), "key {:?}", key);
            }
        }
    }

    #[test]
    fn ids_that_look_like_delimited_types_stay_distinct() {
        // "User\0x" as a Bike id must not alias a User record named "x".
        let tricky = derive_key(DocType::Bike, "User\u{0}x");
        assert_ne!(tricky, derive_key(DocType::User, "x"));
        assert_eq!(parse_key(&tricky), Some((DocType::Bike, "User\u{0}x")));
    }

    #[test]
    fn foreign_keys_do_not_parse() {
        assert_eq!(parse_key("plain"), None);
        assert_eq!(parse_key("\u{0}Unknown\u{0}x\u{0}"), None);
        assert_eq!(parse_key("\u{0}Bike\u{0}x"), None);
    }
}

//! Raw search responses and the flattening parser.
//!
//! The native library returns each per-target search response in a
//! count-prefixed, index-addressed shape: a top-level entry count, entries
//! carrying an attribute-name count with the names addressable by index, and
//! each attribute carrying a count-prefixed value list. [`parse`] converts
//! one such response into ordinary keyed records.

use std::collections::HashMap;

/// Count-prefixed value list for one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawValues {
    /// Number of values present.
    pub count: usize,
    /// The values, in server order.
    pub values: Vec<String>,
}

/// One directory entry in native response shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// The entry's distinguished name.
    pub dn: String,
    /// Number of attribute names present.
    pub count: usize,
    /// Attribute names, addressable by index.
    pub names: Vec<String>,
    /// Value lists keyed by attribute name.
    pub values: HashMap<String, RawValues>,
}

/// Secondary result diagnostics for one response.
///
/// The data a `parse result` call extracts from a result handle. Purely
/// informational — never consulted when judging the operation itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultDiagnostic {
    /// Result code reported inside the response.
    pub code: i32,
    /// Matched DN, when the server reported one.
    pub matched_dn: String,
    /// Diagnostic message, possibly empty.
    pub message: String,
    /// Referral URIs, possibly empty.
    pub referrals: Vec<String>,
}

/// One raw per-target search response.
///
/// Produced by the driver, consumed exactly once by [`parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSearchResponse {
    /// Number of entries present.
    pub count: usize,
    /// The entries, in server order.
    pub entries: Vec<RawEntry>,
    /// Secondary diagnostics captured with the response, when available.
    pub diagnostic: Option<ResultDiagnostic>,
}

/// A flattened directory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRecord {
    /// The entry's distinguished name.
    pub dn: String,
    /// Attribute values keyed by attribute name. Value order within one
    /// attribute matches the server's order exactly.
    pub attributes: HashMap<String, Vec<String>>,
}

/// Flattens one raw search response into records.
///
/// Reads are strictly count-then-index: the top-level entry count bounds the
/// entries visited, each entry's attribute-name count bounds the names read,
/// and each attribute's value count bounds the values copied. Entry order and
/// per-attribute value order are preserved exactly; no network interaction
/// takes place.
///
/// Cannot fail on well-formed input. Counts inconsistent with the available
/// slots are a contract violation by the response's producer and panic.
#[must_use]
pub fn parse(response: RawSearchResponse) -> Vec<SearchRecord> {
    let mut records = Vec::with_capacity(response.count);
    for i in 0..response.count {
        let entry = &response.entries[i];
        let mut attributes: HashMap<String, Vec<String>> = HashMap::with_capacity(entry.count);
        for f in 0..entry.count {
            let name = &entry.names[f];
            let raw = &entry.values[name.as_str()];
            let slot = attributes.entry(name.clone()).or_default();
            for v in 0..raw.count {
                slot.push(raw.values[v].clone());
            }
        }
        records.push(SearchRecord {
            dn: entry.dn.clone(),
            attributes,
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_entry(dn: &str, attrs: &[(&str, &[&str])]) -> RawEntry {
        let mut values = HashMap::new();
        let mut names = Vec::new();
        for (name, vals) in attrs {
            names.push((*name).to_string());
            values.insert(
                (*name).to_string(),
                RawValues {
                    count: vals.len(),
                    values: vals.iter().map(|v| (*v).to_string()).collect(),
                },
            );
        }
        RawEntry {
            dn: dn.to_string(),
            count: names.len(),
            names,
            values,
        }
    }

    fn raw_response(entries: Vec<RawEntry>) -> RawSearchResponse {
        RawSearchResponse {
            count: entries.len(),
            entries,
            diagnostic: None,
        }
    }

    #[test]
    fn flattens_entries_in_order() {
        let response = raw_response(vec![
            raw_entry("cn=a,dc=x", &[("mail", &["a@x", "a2@x"])]),
            raw_entry("cn=b,dc=x", &[("mail", &["b@x"])]),
        ]);

        let records = parse(response);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].dn, "cn=a,dc=x");
        assert_eq!(
            records[0].attributes["mail"],
            vec!["a@x".to_string(), "a2@x".to_string()]
        );
        assert_eq!(records[1].dn, "cn=b,dc=x");
        assert_eq!(records[1].attributes["mail"], vec!["b@x".to_string()]);
    }

    #[test]
    fn preserves_value_order_within_attribute() {
        let response = raw_response(vec![raw_entry(
            "cn=svc,dc=x",
            &[("objectClass", &["top", "person", "inetOrgPerson"])],
        )]);

        let records = parse(response);
        assert_eq!(
            records[0].attributes["objectClass"],
            vec!["top", "person", "inetOrgPerson"]
        );
    }

    #[test]
    fn counts_bound_the_reads() {
        // The counts, not the slot lengths, decide what is visible.
        let mut entry = raw_entry("cn=a,dc=x", &[("mail", &["a@x", "ignored"])]);
        entry.values.get_mut("mail").unwrap().count = 1;
        let mut response = raw_response(vec![entry, raw_entry("cn=ignored,dc=x", &[])]);
        response.count = 1;

        let records = parse(response);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attributes["mail"], vec!["a@x"]);
    }

    #[test]
    fn parse_is_deterministic() {
        let response = raw_response(vec![
            raw_entry("cn=a,dc=x", &[("cn", &["a"]), ("mail", &["a@x"])]),
            raw_entry("cn=b,dc=x", &[("cn", &["b"])]),
        ]);

        let first = parse(response.clone());
        let second = parse(response);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_response_yields_no_records() {
        let records = parse(raw_response(Vec::new()));
        assert!(records.is_empty());
    }
}

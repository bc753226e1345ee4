#![deny(missing_docs)]

//! # Media-Type Negotiation
//!
//! Minimal `Accept` header parsing: clauses are split, `q` parameters
//! read, and clauses tried in quality order (stable for ties) against
//! the offered media types. Wildcards `*/*` and `type/*` are honored.

/// One parsed `Accept` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptClause {
    /// Media type, e.g. `application/json` or `*/*`.
    pub media_type: String,
    /// Quality weight in `[0, 1]`, default 1.
    pub quality: f32,
}

/// Parses an `Accept` header into clauses sorted by descending quality.
/// Clauses with `q=0` are dropped; ties keep the header's order.
pub fn parse_accept(header: &str) -> Vec<AcceptClause> {
    let mut clauses: Vec<AcceptClause> = Vec::new();
    for part in header.split(',') {
        let mut pieces = part.split(';');
        let media_type = match pieces.next() {
            Some(mt) => mt.trim().to_ascii_lowercase(),
            None => continue,
        };
        if media_type.is_empty() {
            continue;
        }
        let mut quality = 1.0f32;
        for param in pieces {
            let mut kv = param.splitn(2, '=');
            let key = kv.next().map(str::trim).unwrap_or_default();
            let value = kv.next().map(str::trim).unwrap_or_default();
            if key.eq_ignore_ascii_case("q") {
                quality = value.parse().unwrap_or(1.0);
            }
        }
        if quality > 0.0 {
            clauses.push(AcceptClause {
                media_type,
                quality,
            });
        }
    }
    // Stable sort keeps header order for equal qualities.
    clauses.sort_by(|a, b| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    clauses
}

/// True when an accept clause admits the offered media type.
fn clause_matches(clause: &str, offered: &str) -> bool {
    if clause == "*/*" || clause == offered {
        return true;
    }
    match (clause.split_once('/'), offered.split_once('/')) {
        (Some((clause_type, "*")), Some((offered_type, _))) => clause_type == offered_type,
        _ => false,
    }
}

/// Picks the first offered media type acceptable to the header, in
/// clause quality order. An absent header means `*/*`.
pub fn first_acceptable<'o>(header: Option<&str>, offered: &[&'o str]) -> Option<&'o str> {
    let header = header.unwrap_or("*/*");
    for clause in parse_accept(header) {
        for &candidate in offered {
            if clause_matches(&clause.media_type, &candidate.to_ascii_lowercase()) {
                return Some(candidate);
            }
        }
    }
    None
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PARTITION filtering for no-local delivery.
//!
//! Every connection publishes under a partition named after its own
//! [`ConnectionId`]. Subscription endpoints then choose what they see:
//!
//! - **local** endpoints subscribe to every partition except their own id,
//!   so messages published by the same connection are never delivered back;
//! - **remote** endpoints subscribe to every partition, including their own.
//!
//! Routing topology is untouched: the filter lives purely in the subscriber
//! PARTITION QoS.
//!
//! # Wildcards
//!
//! Partition names follow DDS fnmatch-style matching:
//!
//! | Pattern  | Matches                          |
//! |----------|----------------------------------|
//! | `*`      | any sequence (including empty)   |
//! | `?`      | exactly one character            |
//! | `[abc]`  | one character from the set       |
//! | `[!abc]` | one character outside the set    |
//! | `\x`     | literal `x`                      |
//!
//! DDS has no negation operator, so [`PartitionExpression::AllExcept`] is
//! rendered as a finite pattern list whose union is "every name but one":
//! all strictly shorter names, all names diverging at some position, and
//! all strict extensions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a connection inside a domain.
///
/// Built from the participant's federation id and participant id, rendered
/// as two fixed-width 8-digit hex fields. Fixed width makes the rendering
/// injective, so two live participants never share an id string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    federation_id: u32,
    participant_id: u32,
}

impl ConnectionId {
    /// Create a connection id from its two components.
    pub const fn new(federation_id: u32, participant_id: u32) -> Self {
        Self {
            federation_id,
            participant_id,
        }
    }

    /// Federation (cluster) component.
    pub const fn federation_id(&self) -> u32 {
        self.federation_id
    }

    /// Per-participant component.
    pub const fn participant_id(&self) -> u32 {
        self.participant_id
    }

    /// The 8-byte structured id as a big-endian integer.
    pub const fn as_u64(&self) -> u64 {
        ((self.federation_id as u64) << 32) | self.participant_id as u64
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}{:08x}", self.federation_id, self.participant_id)
    }
}

/// PARTITION QoS policy.
///
/// Empty list = default partition (the single name `""`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// Partition names or wildcard patterns.
    pub names: Vec<String>,
}

impl Partition {
    /// Create a partition policy from names.
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Partition with a single name.
    pub fn single(name: &str) -> Self {
        Self {
            names: vec![name.to_string()],
        }
    }

    /// Partition matching every name.
    pub fn match_all() -> Self {
        Self::single("*")
    }

    /// Check if this is the default partition (empty list).
    pub fn is_default(&self) -> bool {
        self.names.is_empty()
    }

    fn effective(&self) -> impl Iterator<Item = &str> + '_ {
        let default = self.names.is_empty().then_some("");
        self.names.iter().map(String::as_str).chain(default)
    }

    /// True if any entry of this partition matches the concrete `name`.
    pub fn matches_name(&self, name: &str) -> bool {
        self.effective().any(|entry| {
            if is_pattern(entry) {
                wildcard_match(entry, name)
            } else {
                entry == name
            }
        })
    }

    /// Check compatibility between offered (publisher) and requested
    /// (subscriber) partitions.
    ///
    /// **Rule:** some pair of entries must match. A pattern matches a
    /// concrete name; two patterns only match if they are identical.
    pub fn is_compatible_with(&self, requested: &Partition) -> bool {
        self.effective()
            .any(|offered| requested.effective().any(|req| entries_match(offered, req)))
    }
}

fn entries_match(offered: &str, requested: &str) -> bool {
    match (is_pattern(offered), is_pattern(requested)) {
        (true, true) | (false, false) => offered == requested,
        (false, true) => wildcard_match(requested, offered),
        (true, false) => wildcard_match(offered, requested),
    }
}

/// Partition selection for a subscription endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionExpression {
    /// Every partition, including the connection's own.
    MatchAll,
    /// Every partition except exactly this name.
    AllExcept(String),
}

impl PartitionExpression {
    /// Evaluate the expression against a concrete partition name.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::MatchAll => true,
            Self::AllExcept(excluded) => name != excluded,
        }
    }

    /// Render into a PARTITION policy the domain understands.
    pub fn to_partition(&self) -> Partition {
        match self {
            Self::MatchAll => Partition::match_all(),
            Self::AllExcept(excluded) => Partition::new(negate(excluded)),
        }
    }
}

/// Filter for local-visibility endpoints: everything but `id`.
pub fn local_partitions(id: &ConnectionId) -> PartitionExpression {
    PartitionExpression::AllExcept(id.to_string())
}

/// Filter for remote-visibility endpoints: everything.
pub fn remote_partitions() -> PartitionExpression {
    PartitionExpression::MatchAll
}

fn negate(excluded: &str) -> Vec<String> {
    let chars: Vec<char> = excluded.chars().collect();
    let mut patterns = Vec::with_capacity(2 * chars.len() + 1);

    // Strictly shorter names (length 0 is the default partition)
    for len in 0..chars.len() {
        patterns.push("?".repeat(len));
    }

    // Same prefix, then a different character
    for (i, &c) in chars.iter().enumerate() {
        let mut pattern = escape(&chars[..i]);
        pattern.push_str("[!");
        if matches!(c, ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
        pattern.push_str("]*");
        patterns.push(pattern);
    }

    // Strict extensions
    let mut longer = escape(&chars);
    longer.push_str("?*");
    patterns.push(longer);

    patterns
}

fn escape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    for &c in chars {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// True if `entry` contains wildcard metacharacters.
pub fn is_pattern(entry: &str) -> bool {
    entry.contains(['*', '?', '[', '\\'])
}

/// fnmatch-style match of `name` against `pattern`.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    fn matches(text: &[char], pattern: &[char]) -> bool {
        let Some(&head) = pattern.first() else {
            return text.is_empty();
        };
        match head {
            '*' => {
                matches(text, &pattern[1..]) || (!text.is_empty() && matches(&text[1..], pattern))
            }
            '?' => !text.is_empty() && matches(&text[1..], &pattern[1..]),
            '[' => {
                let Some(&c) = text.first() else {
                    return false;
                };
                match match_class(c, pattern) {
                    Some((true, consumed)) => matches(&text[1..], &pattern[consumed..]),
                    Some((false, _)) => false,
                    // Unterminated class: literal '['
                    None => c == '[' && matches(&text[1..], &pattern[1..]),
                }
            }
            '\\' if pattern.len() > 1 => {
                text.first() == Some(&pattern[1]) && matches(&text[1..], &pattern[2..])
            }
            literal => text.first() == Some(&literal) && matches(&text[1..], &pattern[1..]),
        }
    }

    matches(&name, &pattern)
}

/// Match `c` against the bracket expression at the start of `pattern`.
///
/// Returns `(matched, consumed)` or `None` if the class is unterminated.
fn match_class(c: char, pattern: &[char]) -> Option<(bool, usize)> {
    let mut i = 1;
    let negated = matches!(pattern.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    loop {
        let mut lo = *pattern.get(i)?;
        if lo == ']' && !first {
            return Some((matched != negated, i + 1));
        }
        first = false;
        if lo == '\\' {
            i += 1;
            lo = *pattern.get(i)?;
        }
        i += 1;

        let is_range = pattern.get(i) == Some(&'-') && pattern.get(i + 1).is_some_and(|&n| n != ']');
        if is_range {
            let mut hi = pattern[i + 1];
            i += 2;
            if hi == '\\' {
                hi = *pattern.get(i)?;
                i += 1;
            }
            if (lo..=hi).contains(&c) {
                matched = true;
            }
        } else if lo == c {
            matched = true;
        }
    }
}

//! PocketBase filter expressions.

use std::fmt;

/// Quote a value as a PocketBase string literal.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if matches!(c, '\'' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Conjunction of field comparisons, e.g. `mac_address='aa' && is_active=true`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `field = 'value'`, with the value quoted and escaped.
    pub fn eq(mut self, field: &str, value: &str) -> Self {
        self.clauses.push(format!("{}={}", field, quote(value)));
        self
    }

    /// `field = true|false`.
    pub fn eq_bool(mut self, field: &str, value: bool) -> Self {
        self.clauses.push(format!("{}={}", field, value));
        self
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" && "))
    }
}

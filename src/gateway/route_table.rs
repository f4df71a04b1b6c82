use std::fmt;

/// Which upstream a request is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Ui,
    Api,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Ui => f.write_str("ui"),
            Target::Api => f.write_str("api"),
        }
    }
}

/// Path prefixes served by the API backend.
pub const API_PREFIXES: [&str; 5] = ["/llm", "/upload", "/api", "/contracts", "/files"];

#[derive(Debug, Clone)]
pub struct RouteRule {
    prefix: String,
    target: Target,
}

impl RouteRule {
    pub fn new(prefix: impl Into<String>, target: Target) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            target,
        }
    }

    /// Mount-style match: the prefix must end at a segment boundary.
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        let len = self.prefix.len();
        path.len() >= len
            && path.is_char_boundary(len)
            && path[..len].eq_ignore_ascii_case(&self.prefix)
            && (path.len() == len || path.as_bytes()[len] == b'/')
    }
}

/// Ordered prefix rules, first match wins, with a catch-all target.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
    fallback: Target,
}

impl RouteTable {
    pub fn new(fallback: Target) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn with_rule(mut self, prefix: impl Into<String>, target: Target) -> Self {
        self.rules.push(RouteRule::new(prefix, target));
        self
    }

    pub fn resolve(&self, path: &str) -> Target {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(|rule| rule.target)
            .unwrap_or(self.fallback)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        API_PREFIXES
            .iter()
            .fold(RouteTable::new(Target::Ui), |table, prefix| {
                table.with_rule(*prefix, Target::Api)
            })
    }
}

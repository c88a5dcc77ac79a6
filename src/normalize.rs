use std::fmt;

/// Canonical comparison key for an author name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NormalizedAuthor(String);

impl NormalizedAuthor {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, raw: &str) -> bool {
        normalize(raw) == self.0
    }
}

impl fmt::Display for NormalizedAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercases, trims, and strips any leading `by <whitespace>` bylines.
///
/// Repeated bylines (`"by by jane"`) are all stripped so the result is stable
/// under a second application. A bare `"by"` is a name, not a byline.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut rest = lowered.trim();
    while let Some(stripped) = strip_byline(rest) {
        rest = stripped;
    }
    rest.to_string()
}

fn strip_byline(s: &str) -> Option<&str> {
    let after = s.strip_prefix("by")?;
    let trimmed = after.trim_start();
    if trimmed.len() == after.len() {
        return None;
    }
    Some(trimmed)
}

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("limit must be a positive integer")]
    InvalidLimit,

    #[error("offset must be a non-negative integer")]
    InvalidOffset,
}

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Validate a requested window and cap `limit` at `max_limit`.
    pub fn new(limit: i64, offset: i64, max_limit: i64) -> Result<Self, PageError> {
        if limit <= 0 {
            return Err(PageError::InvalidLimit);
        }
        if offset < 0 {
            return Err(PageError::InvalidOffset);
        }

        let applied_limit = if limit > max_limit {
            tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };

        Ok(Self { limit: applied_limit, offset })
    }

    /// Window that covers every row. Used by the unpaginated `get_all` variants.
    pub fn all() -> Self {
        Self { limit: i64::MAX, offset: 0 }
    }

    /// Apply this window to an already ordered in-memory sequence.
    pub fn slice<T: Clone>(&self, rows: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(self.limit).unwrap_or(usize::MAX);
        rows.iter().skip(start).take(take).cloned().collect()
    }
}

/// Normalised search term: trimmed, and `None` when empty.
pub fn search_term(term: &Option<String>) -> Option<&str> {
    term.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

/// `ILIKE` pattern for a substring match, with LIKE metacharacters escaped.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Case-insensitive substring test used by the in-memory backend to mirror
/// `ILIKE '%term%'`.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Case-insensitive equality for names and emails, mirroring the
/// `LOWER(...)` unique indexes.
pub fn same_key(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reference to a named catalog list, written as `owner/slug`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListRef {
    pub owner: String,
    pub slug: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListRefError {
    #[error("list reference must look like owner/slug (got {0:?})")]
    Malformed(String),
}

impl FromStr for ListRef {
    type Err = ListRefError;

    /// Split at the first `/`. Both halves must be non-empty; a slug is
    /// assumed not to contain the separator itself.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, slug) = s
            .split_once('/')
            .ok_or_else(|| ListRefError::Malformed(s.to_string()))?;
        if owner.is_empty() || slug.is_empty() {
            return Err(ListRefError::Malformed(s.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            slug: slug.to_string(),
        })
    }
}

impl fmt::Display for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

impl ListRef {
    /// Parse a reference that is known at compile time. Panics on malformed
    /// input, which for a built-in constant is a programming error rather
    /// than a runtime condition.
    pub fn known(s: &str) -> Self {
        s.parse()
            .unwrap_or_else(|e| panic!("invalid built-in list reference {:?}: {}", s, e))
    }
}

/// Parse a batch of user-supplied list arguments, failing on the first
/// malformed one with no partial results.
pub fn parse_list_refs(args: &[String]) -> Result<Vec<ListRef>, ListRefError> {
    args.iter().map(|arg| arg.parse()).collect()
}

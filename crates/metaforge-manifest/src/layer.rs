use serde::{Deserialize, Serialize};
use std::fmt;

/// The sentinel revision meaning "track the branch tip".
pub const HEAD_SENTINEL: &str = "HEAD";

/// Revision policy for a layer.
///
/// `Head` tracks the tip of the declared branch and is pulled forward on every
/// synchronization. `Pinned` locks the checkout to one immutable revision that
/// never moves unless the declaration changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Revision {
    Head,
    Pinned(String),
}

impl Revision {
    pub fn parse(s: &str) -> Self {
        if s == HEAD_SENTINEL {
            Self::Head
        } else {
            Self::Pinned(s.to_owned())
        }
    }

    pub fn is_head(&self) -> bool {
        matches!(self, Self::Head)
    }

    /// The pinned revision identifier, if any.
    pub fn pinned(&self) -> Option<&str> {
        match self {
            Self::Head => None,
            Self::Pinned(rev) => Some(rev),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => f.write_str(HEAD_SENTINEL),
            Self::Pinned(rev) => f.write_str(rev),
        }
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Revision> for String {
    fn from(rev: Revision) -> Self {
        rev.to_string()
    }
}

/// One declared layer: a named repository pinned to a branch and revision.
///
/// Declaration order in the manifest is significant and preserved by
/// [`Manifest`](crate::Manifest); it determines both reconciliation order and
/// the ordering of generated configuration sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub repository: String,
    pub branch: String,
    pub revision: Revision,
}

impl LayerSpec {
    pub fn new(
        name: impl Into<String>,
        repository: impl Into<String>,
        branch: impl Into<String>,
        revision: Revision,
    ) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            branch: branch.into(),
            revision,
        }
    }
}

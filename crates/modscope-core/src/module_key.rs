use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of a loaded module: its file path.
///
/// Keys are compared by the exact path they were created from; the loader is
/// responsible for canonicalizing paths before minting keys so that two
/// spellings of the same file collapse to one cache entry. Cloning is cheap
/// (shared allocation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey(Arc<PathBuf>);

impl ModuleKey {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Arc::new(path.into()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File stem, used as the module's simple name in candidate matching.
    pub fn simple_name(&self) -> &str {
        self.0
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl Serialize for ModuleKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_path().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModuleKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        PathBuf::deserialize(deserializer).map(ModuleKey::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_name_strips_extension() {
        let key = ModuleKey::new("/opt/mods/Foo.mdim");
        assert_eq!(key.simple_name(), "Foo");
    }

    #[test]
    fn equality_is_by_path() {
        let a = ModuleKey::new("/a/b.mdim");
        let b = ModuleKey::new("/a/b.mdim");
        let c = ModuleKey::new("/a/c.mdim");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

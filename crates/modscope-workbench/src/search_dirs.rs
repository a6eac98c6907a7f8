use std::path::{Path, PathBuf};

use modscope_core::MODULE_EXT;

/// Registry of directories consulted when a dependency has to be located by
/// simple name. Owned by the session and passed explicitly to whoever needs
/// it; every successful load appends the module's parent directory.
#[derive(Debug, Default)]
pub struct SearchDirs {
    dirs: Vec<PathBuf>,
}

impl SearchDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a directory unless already registered. Registration order is
    /// preserved because it doubles as candidate probe order.
    pub fn register(&mut self, dir: &Path) {
        if !self.dirs.iter().any(|d| d == dir) {
            tracing::debug!(dir = %dir.display(), "registered search directory");
            self.dirs.push(dir.to_path_buf());
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Candidate file paths for a module known only by simple name: for
    /// each directory in registration order, the exact casing first, then
    /// lowercase.
    pub fn candidates_for(&self, simple_name: &str) -> Vec<PathBuf> {
        let mut out = Vec::with_capacity(self.dirs.len() * 2);
        let lower = simple_name.to_lowercase();
        for dir in &self.dirs {
            out.push(dir.join(format!("{simple_name}.{MODULE_EXT}")));
            if lower != simple_name {
                out.push(dir.join(format!("{lower}.{MODULE_EXT}")));
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.dirs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_dedups_and_keeps_order() {
        let mut dirs = SearchDirs::new();
        dirs.register(Path::new("/a"));
        dirs.register(Path::new("/b"));
        dirs.register(Path::new("/a"));
        assert_eq!(dirs.dirs(), [PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn candidates_cover_both_casings_per_dir() {
        let mut dirs = SearchDirs::new();
        dirs.register(Path::new("/mods"));
        assert_eq!(
            dirs.candidates_for("Foo"),
            [
                PathBuf::from("/mods/Foo.mdim"),
                PathBuf::from("/mods/foo.mdim"),
            ]
        );
        // Already-lowercase names produce no duplicate.
        assert_eq!(dirs.candidates_for("foo"), [PathBuf::from("/mods/foo.mdim")]);
    }
}

use std::path::PathBuf;

use modscope_core::{MetadataHandle, SearchHit};
use modscope_metadata::PeekInfo;

use crate::search_dirs::SearchDirs;

/// Candidate module paths for a search hit without a resolved target:
/// search-directory heuristics on the simple name, then the hit's literal
/// path when it is not already covered.
pub fn derive_candidates(hit: &SearchHit, dirs: &SearchDirs) -> Vec<PathBuf> {
    let mut candidates = dirs.candidates_for(&hit.module_name);
    if let Some(path) = &hit.module_path {
        if !candidates.iter().any(|c| c == path) {
            candidates.push(path.clone());
        }
    }
    candidates
}

/// Picks the candidate to load.
///
/// With a known handle, candidates are probed in list order with a
/// header-only read; the first image whose row counts cover the handle
/// wins, and list order is the only tie-break. Without a handle, or when
/// nothing probes positive, the first candidate is taken as a best effort
/// and the load itself reports whatever is wrong with it.
///
/// Does blocking file I/O; run it on a blocking worker.
pub fn pick_candidate(
    candidates: &[PathBuf],
    handle: Option<MetadataHandle>,
) -> Option<PathBuf> {
    if let Some(handle) = handle {
        for path in candidates {
            let Ok(bytes) = std::fs::read(path) else {
                continue;
            };
            match PeekInfo::read(&bytes) {
                Ok(peek) if peek.contains(handle) => {
                    tracing::debug!(path = %path.display(), %handle, "candidate probe matched");
                    return Some(path.clone());
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(path = %path.display(), %err, "candidate probe failed");
                }
            }
        }
    }
    candidates.first().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscope_core::HandleKind;
    use modscope_metadata::ModuleImageBuilder;
    use std::path::Path;

    fn hit(name: &str) -> SearchHit {
        SearchHit::unresolved(name.to_owned(), name.to_owned())
    }

    #[test]
    fn literal_path_is_appended_once() {
        let mut dirs = SearchDirs::new();
        dirs.register(Path::new("/mods"));
        let mut h = hit("Foo");
        h.module_path = Some(PathBuf::from("/elsewhere/Foo.mdim"));
        let candidates = derive_candidates(&h, &dirs);
        assert_eq!(
            candidates,
            [
                PathBuf::from("/mods/Foo.mdim"),
                PathBuf::from("/mods/foo.mdim"),
                PathBuf::from("/elsewhere/Foo.mdim"),
            ]
        );

        h.module_path = Some(PathBuf::from("/mods/Foo.mdim"));
        assert_eq!(derive_candidates(&h, &dirs).len(), 2);
    }

    #[test]
    fn probe_prefers_the_image_that_carries_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        // First candidate exists but has no methods; second carries one.
        let empty = dir.path().join("Empty.mdim");
        ModuleImageBuilder::new("Empty").write_to(&empty).unwrap();
        let full = dir.path().join("Full.mdim");
        let mut b = ModuleImageBuilder::new("Full");
        let t = b.add_type("Ns", "T");
        let method = b.add_method(t, "Run");
        b.write_to(&full).unwrap();

        let missing = dir.path().join("missing.mdim");
        let candidates = vec![missing.clone(), empty.clone(), full.clone()];
        assert_eq!(pick_candidate(&candidates, Some(method)), Some(full));

        // No handle: first candidate, even one the load will then reject.
        assert_eq!(pick_candidate(&candidates, None), Some(missing.clone()));

        // Handle nothing carries: same fallback.
        let huge = modscope_core::MetadataHandle::new(HandleKind::Event, 7).unwrap();
        assert_eq!(pick_candidate(&candidates, Some(huge)), Some(missing));
    }
}

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fxhash::FxHashMap;

use modscope_core::{MetadataHandle, ModuleKey};
use modscope_error::{Error, FatalError, WarningError};
use modscope_metadata::{ModuleImage, SymbolStatus, TypeSystem};

use crate::search_dirs::SearchDirs;

/// One parsed module resident in the cache.
///
/// The cache hands out shared ownership; unloading removes the cache's
/// reference and the backing image is released once the last holder drops.
#[derive(Debug)]
pub struct LoadedModule {
    key: ModuleKey,
    image: ModuleImage,
    type_system: TypeSystem,
}

impl LoadedModule {
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    pub fn image(&self) -> &ModuleImage {
        &self.image
    }

    pub fn type_system(&self) -> &TypeSystem {
        &self.type_system
    }

    pub fn name(&self) -> &str {
        self.image.name()
    }

    /// False when the image declared debug symbols but they could not be
    /// decoded and the load degraded.
    pub fn symbols_loaded(&self) -> bool {
        !matches!(self.image.symbol_status(), SymbolStatus::Failed(_))
    }

    pub fn contains(&self, handle: MetadataHandle) -> bool {
        self.type_system.contains(handle)
    }
}

/// Reads and parses a module file. Pure with respect to the cache, so it
/// can run on a blocking worker while the session keeps serving commands.
///
/// The returned path is canonical; the cache keys off it so two spellings
/// of the same file collapse to one entry.
pub fn fetch(path: &Path) -> Result<(PathBuf, ModuleImage), Error> {
    let canonical = std::fs::canonicalize(path).map_err(|err| io_error("canonicalize", path, err))?;
    let bytes = std::fs::read(&canonical).map_err(|err| io_error("read", &canonical, err))?;
    let image = ModuleImage::parse(bytes).map_err(|err| {
        Error::from(FatalError::MalformedImage {
            path: canonical.clone(),
            detail: err.to_string(),
        })
    })?;
    if let SymbolStatus::Failed(detail) = image.symbol_status() {
        let warning = Error::from(WarningError::SymbolsUnavailable {
            path: canonical.clone(),
            detail: detail.clone(),
        });
        tracing::warn!(%warning, "loaded without debug symbols");
    }
    Ok((canonical, image))
}

fn io_error(operation: &'static str, path: &Path, err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::NotFound {
        FatalError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into()
    } else {
        FatalError::FileOperation {
            operation,
            path: path.to_path_buf(),
            source: Arc::new(err),
        }
        .into()
    }
}

/// The module cache: canonical path to parsed module, insertion-ordered.
///
/// Failed loads are never inserted, so a missing or malformed file leaves
/// no trace here.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: FxHashMap<ModuleKey, Arc<LoadedModule>>,
    order: Vec<ModuleKey>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a module file, returning the cached entry when the canonical
    /// path is already resident. Registers the module's parent directory as
    /// a search directory on first load.
    pub fn load(&mut self, path: &Path, dirs: &mut SearchDirs) -> Result<Arc<LoadedModule>, Error> {
        let canonical =
            std::fs::canonicalize(path).map_err(|err| io_error("canonicalize", path, err))?;
        let key = ModuleKey::new(canonical.clone());
        if let Some(existing) = self.modules.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let (_, image) = fetch(&canonical)?;
        Ok(self.insert(key, image, dirs))
    }

    /// Commits an already-fetched image. Idempotent on the canonical path,
    /// same as [`load`](Self::load).
    pub fn insert_fetched(
        &mut self,
        canonical: PathBuf,
        image: ModuleImage,
        dirs: &mut SearchDirs,
    ) -> Arc<LoadedModule> {
        let key = ModuleKey::new(canonical);
        if let Some(existing) = self.modules.get(&key) {
            return Arc::clone(existing);
        }
        self.insert(key, image, dirs)
    }

    fn insert(
        &mut self,
        key: ModuleKey,
        image: ModuleImage,
        dirs: &mut SearchDirs,
    ) -> Arc<LoadedModule> {
        if let Some(parent) = key.path().parent() {
            dirs.register(parent);
        }
        let type_system = TypeSystem::build(&image);
        let module = Arc::new(LoadedModule {
            key: key.clone(),
            image,
            type_system,
        });
        tracing::info!(module = %key, name = module.name(), "module loaded");
        self.modules.insert(key.clone(), Arc::clone(&module));
        self.order.push(key);
        module
    }

    /// Removes the entry and returns it so the caller can purge the index
    /// and history for the same key.
    pub fn unload(&mut self, key: &ModuleKey) -> Option<Arc<LoadedModule>> {
        let module = self.modules.remove(key)?;
        self.order.retain(|k| k != key);
        tracing::info!(module = %key, "module unloaded");
        Some(module)
    }

    pub fn clear(&mut self) {
        self.modules.clear();
        self.order.clear();
    }

    pub fn get(&self, key: &ModuleKey) -> Option<&Arc<LoadedModule>> {
        self.modules.get(key)
    }

    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.modules.contains_key(key)
    }

    /// Loaded modules in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<LoadedModule>> {
        self.order.iter().filter_map(|k| self.modules.get(k))
    }

    /// Canonical paths of the resident modules, in load order. Embedders
    /// persist this as the session's module list.
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.order.iter().map(|k| k.path().to_path_buf()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscope_metadata::ModuleImageBuilder;

    fn write_module(dir: &Path, file: &str, name: &str) -> PathBuf {
        let path = dir.join(file);
        ModuleImageBuilder::new(name).write_to(&path).unwrap();
        path
    }

    #[test]
    fn load_is_idempotent_by_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(dir.path(), "Foo.mdim", "Foo");

        let mut cache = ModuleCache::new();
        let mut dirs = SearchDirs::new();
        let first = cache.load(&path, &mut dirs).unwrap();
        let second = cache.load(&path, &mut dirs).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(dirs.dirs().len(), 1);
    }

    #[test]
    fn missing_file_is_reported_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ModuleCache::new();
        let mut dirs = SearchDirs::new();

        let err = cache
            .load(&dir.path().join("absent.mdim"), &mut dirs)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Fatal(FatalError::FileNotFound { .. })
        ));
        assert!(cache.is_empty());
        assert!(dirs.dirs().is_empty());
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.mdim");
        std::fs::write(&path, b"not an image").unwrap();

        let mut cache = ModuleCache::new();
        let mut dirs = SearchDirs::new();
        let err = cache.load(&path, &mut dirs).unwrap_err();
        assert!(matches!(
            err,
            Error::Fatal(FatalError::MalformedImage { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn degraded_symbols_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NoSyms.mdim");
        let mut b = ModuleImageBuilder::new("NoSyms");
        b.add_type("Ns", "T");
        b.corrupt_symbol_section(500);
        b.write_to(&path).unwrap();

        let mut cache = ModuleCache::new();
        let mut dirs = SearchDirs::new();
        let module = cache.load(&path, &mut dirs).unwrap();
        assert!(!module.symbols_loaded());
        assert_eq!(module.name(), "NoSyms");
    }

    #[test]
    fn unload_removes_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(dir.path(), "Foo.mdim", "Foo");

        let mut cache = ModuleCache::new();
        let mut dirs = SearchDirs::new();
        let module = cache.load(&path, &mut dirs).unwrap();
        let key = module.key().clone();

        assert!(cache.unload(&key).is_some());
        assert!(!cache.contains(&key));
        assert!(cache.unload(&key).is_none());
    }
}

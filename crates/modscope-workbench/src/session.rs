use std::path::PathBuf;

use futures::future::join_all;
use fxhash::FxHashMap;
use tokio::sync::{mpsc, oneshot};

use modscope_core::{LoadProgress, MetadataHandle, ModuleKey, NodeRef, SearchHit};
use modscope_error::{Error, InternalError};
use modscope_metadata::ModuleImage;
use modscope_tree::{EntityResolver, ModuleTree, NavHistory, NodeKind, Resolution, SymbolIndex};

use crate::cancel::{CancellationHandle, CancellationToken};
use crate::candidates;
use crate::loader::{self, ModuleCache};
use crate::search_dirs::SearchDirs;

/// Read-only copy of one tree node, handed across the channel to the
/// presentation layer.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeRef>,
    pub children: Vec<NodeRef>,
    pub handle: Option<MetadataHandle>,
    pub is_public_api: bool,
}

type Responder<T> = oneshot::Sender<T>;
type Progress = Option<mpsc::Sender<LoadProgress>>;

#[derive(Debug)]
enum SessionMessage {
    Command(Command),
    Shutdown,
}

#[derive(Debug)]
enum Command {
    LoadModules {
        paths: Vec<PathBuf>,
        progress: Progress,
        token: CancellationToken,
        responder: Responder<Vec<Result<NodeRef, Error>>>,
    },
    Unload {
        key: ModuleKey,
        responder: Responder<bool>,
    },
    ClearAll {
        responder: Responder<()>,
    },
    RegisterSearchDir {
        dir: PathBuf,
        responder: Responder<()>,
    },
    Select {
        node: NodeRef,
        responder: Responder<()>,
    },
    GoBack {
        responder: Responder<Option<NodeRef>>,
    },
    GoForward {
        responder: Responder<Option<NodeRef>>,
    },
    ResolveHandle {
        handle: MetadataHandle,
        hint: Option<ModuleKey>,
        responder: Responder<Resolution>,
    },
    ResolveSearchHit {
        hit: SearchHit,
        progress: Progress,
        token: CancellationToken,
        responder: Responder<Resolution>,
    },
    /// Internal: a background candidate fetch finished and wants to commit.
    CommitCandidate {
        outcome: Result<(PathBuf, ModuleImage), Error>,
        hit: SearchHit,
        /// The caller's token.
        token: CancellationToken,
        /// Fired when a newer search-hit resolution superseded this one.
        supersede: CancellationToken,
        progress: Progress,
        responder: Responder<Resolution>,
    },
    TreeRoots {
        responder: Responder<Vec<NodeRef>>,
    },
    NodeInfo {
        node: NodeRef,
        responder: Responder<Option<NodeSnapshot>>,
    },
    LoadedPaths {
        responder: Responder<Vec<PathBuf>>,
    },
}

/// Clonable front door to the session actor.
///
/// All state mutation happens on the session task; handle methods just
/// exchange messages with it, so the presentation layer can call from
/// anywhere without locking.
#[derive(Debug, Clone)]
pub struct WorkbenchHandle {
    sender: mpsc::Sender<SessionMessage>,
}

impl Default for WorkbenchHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbenchHandle {
    /// Spawns the session actor on the current runtime.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(64);
        let session = Session::new(receiver, sender.clone());
        tokio::spawn(session.run());
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<T>) -> Command,
    ) -> Result<T, Error> {
        let (responder, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Command(build(responder)))
            .await
            .map_err(|_| InternalError::ChannelClosed("session command"))?;
        rx.await
            .map_err(|_| InternalError::ChannelClosed("session reply").into())
    }

    /// Loads a set of module files, returning a per-path result in input
    /// order. Each success is the root node of the module's tree.
    pub async fn load_modules(
        &self,
        paths: Vec<PathBuf>,
    ) -> Result<Vec<Result<NodeRef, Error>>, Error> {
        self.load_modules_with(paths, None, CancellationToken::never())
            .await
    }

    pub async fn load_modules_with(
        &self,
        paths: Vec<PathBuf>,
        progress: Progress,
        token: CancellationToken,
    ) -> Result<Vec<Result<NodeRef, Error>>, Error> {
        self.request(|responder| Command::LoadModules {
            paths,
            progress,
            token,
            responder,
        })
        .await
    }

    /// Single-path convenience over [`load_modules`](Self::load_modules).
    pub async fn load_module(&self, path: impl Into<PathBuf>) -> Result<NodeRef, Error> {
        let mut results = self.load_modules(vec![path.into()]).await?;
        results
            .pop()
            .unwrap_or_else(|| Err(InternalError::InvalidState("empty load result").into()))
    }

    /// Unloads a module; returns whether it was resident. Index entries and
    /// history entries for the module go with it.
    pub async fn unload(&self, key: ModuleKey) -> Result<bool, Error> {
        self.request(|responder| Command::Unload { key, responder })
            .await
    }

    pub async fn clear_all(&self) -> Result<(), Error> {
        self.request(|responder| Command::ClearAll { responder }).await
    }

    /// Adds a directory to the candidate search list ahead of any loads.
    pub async fn register_search_dir(&self, dir: impl Into<PathBuf>) -> Result<(), Error> {
        self.request(|responder| Command::RegisterSearchDir {
            dir: dir.into(),
            responder,
        })
        .await
    }

    /// Records a user-driven selection change.
    pub async fn select(&self, node: NodeRef) -> Result<(), Error> {
        self.request(|responder| Command::Select { node, responder })
            .await
    }

    pub async fn go_back(&self) -> Result<Option<NodeRef>, Error> {
        self.request(|responder| Command::GoBack { responder }).await
    }

    pub async fn go_forward(&self) -> Result<Option<NodeRef>, Error> {
        self.request(|responder| Command::GoForward { responder })
            .await
    }

    /// Resolves a metadata handle to a node, preferring the hinted module.
    pub async fn resolve_handle(
        &self,
        handle: MetadataHandle,
        hint: Option<ModuleKey>,
    ) -> Result<Resolution, Error> {
        self.request(|responder| Command::ResolveHandle {
            handle,
            hint,
            responder,
        })
        .await
    }

    /// Resolves a search hit, loading its module on demand. A newer call
    /// cancels the in-flight one; the superseded call resolves to
    /// [`Resolution::NotFound`] rather than an error.
    pub async fn resolve_search_hit(&self, hit: SearchHit) -> Result<Resolution, Error> {
        self.resolve_search_hit_with(hit, None, CancellationToken::never())
            .await
    }

    /// Like [`resolve_search_hit`](Self::resolve_search_hit), with progress
    /// reporting and a caller-held token. Firing the token makes the
    /// resolution settle to [`Resolution::NotFound`] without touching the
    /// cache.
    pub async fn resolve_search_hit_with(
        &self,
        hit: SearchHit,
        progress: Progress,
        token: CancellationToken,
    ) -> Result<Resolution, Error> {
        self.request(|responder| Command::ResolveSearchHit {
            hit,
            progress,
            token,
            responder,
        })
        .await
    }

    /// Root node of each loaded module's tree, in load order.
    pub async fn tree_roots(&self) -> Result<Vec<NodeRef>, Error> {
        self.request(|responder| Command::TreeRoots { responder })
            .await
    }

    pub async fn node_info(&self, node: NodeRef) -> Result<Option<NodeSnapshot>, Error> {
        self.request(|responder| Command::NodeInfo { node, responder })
            .await
    }

    pub async fn loaded_paths(&self) -> Result<Vec<PathBuf>, Error> {
        self.request(|responder| Command::LoadedPaths { responder })
            .await
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(SessionMessage::Shutdown).await;
    }
}

struct Session {
    receiver: mpsc::Receiver<SessionMessage>,
    /// Loopback for background tasks to submit commit commands.
    sender: mpsc::Sender<SessionMessage>,
    cache: ModuleCache,
    dirs: SearchDirs,
    trees: FxHashMap<ModuleKey, ModuleTree>,
    index: SymbolIndex,
    history: NavHistory,
    /// Cancellation handle of the in-flight search-hit resolution.
    inflight: Option<CancellationHandle>,
}

impl Session {
    fn new(
        receiver: mpsc::Receiver<SessionMessage>,
        sender: mpsc::Sender<SessionMessage>,
    ) -> Self {
        Self {
            receiver,
            sender,
            cache: ModuleCache::new(),
            dirs: SearchDirs::new(),
            trees: FxHashMap::default(),
            index: SymbolIndex::default(),
            history: NavHistory::new(),
            inflight: None,
        }
    }

    async fn run(mut self) {
        while let Some(message) = self.receiver.recv().await {
            match message {
                SessionMessage::Command(command) => self.handle(command).await,
                SessionMessage::Shutdown => break,
            }
        }
        tracing::debug!("session actor stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::LoadModules {
                paths,
                progress,
                token,
                responder,
            } => {
                let results = self.load_modules(paths, &progress, &token).await;
                let _ = responder.send(results);
            }
            Command::Unload { key, responder } => {
                let _ = responder.send(self.unload(&key));
            }
            Command::ClearAll { responder } => {
                self.cache.clear();
                self.trees.clear();
                self.index.clear();
                self.history.clear();
                let _ = responder.send(());
            }
            Command::RegisterSearchDir { dir, responder } => {
                self.dirs.register(&dir);
                let _ = responder.send(());
            }
            Command::Select { node, responder } => {
                self.history.record_selection(node);
                let _ = responder.send(());
            }
            Command::GoBack { responder } => {
                let _ = responder.send(self.history.go_back());
            }
            Command::GoForward { responder } => {
                let _ = responder.send(self.history.go_forward());
            }
            Command::ResolveHandle {
                handle,
                hint,
                responder,
            } => {
                let _ = responder.send(self.resolve(handle, hint.as_ref()));
            }
            Command::ResolveSearchHit {
                hit,
                progress,
                token,
                responder,
            } => {
                self.start_search_hit_resolution(hit, progress, token, responder);
            }
            Command::CommitCandidate {
                outcome,
                hit,
                token,
                supersede,
                progress,
                responder,
            } => {
                let resolution = self
                    .commit_candidate(outcome, &hit, &token, &supersede, &progress)
                    .await;
                let _ = responder.send(resolution);
            }
            Command::TreeRoots { responder } => {
                let roots = self
                    .cache
                    .iter()
                    .filter_map(|m| self.trees.get(m.key()))
                    .map(|tree| tree.node_ref(tree.root()))
                    .collect();
                let _ = responder.send(roots);
            }
            Command::NodeInfo { node, responder } => {
                let _ = responder.send(self.node_info(&node));
            }
            Command::LoadedPaths { responder } => {
                let _ = responder.send(self.cache.loaded_paths());
            }
        }
    }

    /// Fetches all paths in parallel on blocking workers, then commits the
    /// results in input order on the session task.
    async fn load_modules(
        &mut self,
        paths: Vec<PathBuf>,
        progress: &Progress,
        token: &CancellationToken,
    ) -> Vec<Result<NodeRef, Error>> {
        for path in &paths {
            report(progress, LoadProgress::for_path("loading module", path)).await;
        }
        let fetches = paths
            .into_iter()
            .map(|path| run_blocking(move || loader::fetch(&path)));
        let fetched = join_all(fetches).await;

        let mut results = Vec::with_capacity(fetched.len());
        for outcome in fetched {
            match outcome {
                _ if token.is_cancelled() => results.push(Err(Error::Cancelled)),
                Ok((canonical, image)) => results.push(Ok(self.commit_module(canonical, image))),
                Err(err) => {
                    tracing::warn!(%err, "module load failed");
                    report(progress, LoadProgress::status(format!("load failed: {err}"))).await;
                    results.push(Err(err));
                }
            }
        }
        results
    }

    /// Inserts a fetched image into the cache and (re)builds its tree and
    /// index entries. Idempotent: a resident module is returned as-is.
    fn commit_module(&mut self, canonical: PathBuf, image: ModuleImage) -> NodeRef {
        let key = ModuleKey::new(canonical.clone());
        if let (Some(_), Some(tree)) = (self.cache.get(&key), self.trees.get(&key)) {
            return tree.node_ref(tree.root());
        }
        let module = self.cache.insert_fetched(canonical, image, &mut self.dirs);
        let (tree, diagnostics) = ModuleTree::build(
            module.key().clone(),
            module.name(),
            module.type_system(),
        );
        if diagnostics.skipped_members > 0 {
            let warning = Error::from(modscope_error::WarningError::MembersSkipped {
                path: module.key().path().to_path_buf(),
                count: diagnostics.skipped_members,
            });
            tracing::warn!(%warning, "definitions skipped during tree build");
        }
        self.index.reindex(&tree);
        let root = tree.node_ref(tree.root());
        self.trees.insert(module.key().clone(), tree);
        root
    }

    fn unload(&mut self, key: &ModuleKey) -> bool {
        let Some(_module) = self.cache.unload(key) else {
            return false;
        };
        self.trees.remove(key);
        self.index.remove_module(key);
        self.history.purge_module(key);
        true
    }

    fn resolve(&self, handle: MetadataHandle, hint: Option<&ModuleKey>) -> Resolution {
        let resolver = EntityResolver::new(&self.index);
        resolver.resolve(
            handle,
            hint,
            self.cache.iter().map(|m| (m.key(), m.type_system())),
        )
    }

    /// Kicks off candidate probing on background workers. The commit comes
    /// back through the loopback channel so all mutation stays here.
    fn start_search_hit_resolution(
        &mut self,
        hit: SearchHit,
        progress: Progress,
        token: CancellationToken,
        responder: Responder<Resolution>,
    ) {
        if let Some(target) = &hit.target {
            let _ = responder.send(Resolution::Found(target.clone()));
            return;
        }
        if token.is_cancelled() {
            tracing::debug!(module = %hit.module_name, "search-hit resolution cancelled before start");
            let _ = responder.send(Resolution::NotFound);
            return;
        }

        // Last request wins: supersede whatever is still in flight.
        if let Some(previous) = self.inflight.take() {
            tracing::debug!("cancelling superseded search-hit resolution");
            previous.cancel();
        }
        let (supersede, handle) = CancellationToken::new();
        self.inflight = Some(handle);

        let candidates = candidates::derive_candidates(&hit, &self.dirs);
        if candidates.is_empty() {
            tracing::debug!(module = %hit.module_name, "no candidate paths for search hit");
            let _ = responder.send(Resolution::NotFound);
            return;
        }

        let sender = self.sender.clone();
        let handle_hint = hit.handle;
        tokio::spawn(async move {
            report(
                &progress,
                LoadProgress::status(format!("locating {}", hit.module_name)),
            )
            .await;
            let caller = token.clone();
            let newer = supersede.clone();
            let outcome = run_blocking(move || {
                if caller.is_cancelled() || newer.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let Some(path) = candidates::pick_candidate(&candidates, handle_hint) else {
                    return Err(Error::Internal(InternalError::InvalidState(
                        "empty candidate list",
                    )));
                };
                if caller.is_cancelled() || newer.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                loader::fetch(&path)
            })
            .await;

            let commit = Command::CommitCandidate {
                outcome,
                hit,
                token,
                supersede,
                progress,
                responder,
            };
            if sender.send(SessionMessage::Command(commit)).await.is_err() {
                tracing::debug!("session gone before candidate commit");
            }
        });
    }

    /// Final stage of a search-hit resolution, running on the session task.
    /// Both the caller's token and the supersession token are checked before
    /// any mutation; a cancelled request is swallowed into `NotFound` and
    /// leaves no cache entry behind.
    async fn commit_candidate(
        &mut self,
        outcome: Result<(PathBuf, ModuleImage), Error>,
        hit: &SearchHit,
        token: &CancellationToken,
        supersede: &CancellationToken,
        progress: &Progress,
    ) -> Resolution {
        let (canonical, image) = match outcome {
            Ok(fetched) => fetched,
            Err(err) => {
                if err.is_cancelled() {
                    tracing::debug!(module = %hit.module_name, "search-hit resolution cancelled");
                } else {
                    tracing::warn!(module = %hit.module_name, %err, "candidate load failed");
                }
                report(progress, LoadProgress::status(format!("{err}"))).await;
                return Resolution::NotFound;
            }
        };
        if token.is_cancelled() || supersede.is_cancelled() {
            tracing::debug!(module = %hit.module_name, "cancelled before commit, discarding fetch");
            report(progress, LoadProgress::status("resolution cancelled")).await;
            return Resolution::NotFound;
        }

        report(
            progress,
            LoadProgress::for_path("indexing module", &canonical),
        )
        .await;
        let root = self.commit_module(canonical, image);
        match hit.handle {
            Some(handle) => self.resolve(handle, Some(&root.module)),
            // No handle to chase: the module itself is the target.
            None => Resolution::Found(root),
        }
    }

    fn node_info(&self, node: &NodeRef) -> Option<NodeSnapshot> {
        let tree = self.trees.get(&node.module)?;
        let n = tree.node(node.node)?;
        Some(NodeSnapshot {
            name: n.name.clone(),
            kind: n.kind,
            parent: n.parent.map(|id| tree.node_ref(id)),
            children: n.children.iter().map(|&id| tree.node_ref(id)).collect(),
            handle: n.handle,
            is_public_api: n.is_public_api,
        })
    }
}

async fn report(progress: &Progress, update: LoadProgress) {
    if let Some(tx) = progress {
        // A dropped receiver just means nobody is watching.
        let _ = tx.send(update).await;
    }
}

/// Runs blocking file work off the session task, folding a worker panic
/// into an internal error instead of poisoning the actor.
async fn run_blocking<T: Send + 'static>(
    work: impl FnOnce() -> Result<T, Error> + Send + 'static,
) -> Result<T, Error> {
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(join_err) => {
            tracing::error!(%join_err, "blocking worker failed");
            Err(InternalError::InvalidState("blocking worker failed").into())
        }
    }
}

//! The template context tree.
//!
//! A [`Tree`] is an arena of [`Node`]s, one per mounted (sub)directory of the
//! template, plus the state every node shares: the output collection, the set
//! of already generated source files and the control files that ran. Nodes
//! refer to each other by [`NodeId`]; scripts hold the same ids inside
//! [`Value::Node`].

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use indexmap::IndexMap;
use log::{debug, error};
use walkdir::WalkDir;

use crate::config::Config;
use crate::constants::CONTROL_MARKER;
use crate::error::{Error, Result};
use crate::fragment::{self, Phase};
use crate::generator::{self, Content};
use crate::loader::Macros;
use crate::scope::Scope;
use crate::script::Value;

/// Handle to a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One (sub)directory's template context.
#[derive(Debug)]
pub struct Node {
    root: PathBuf,
    scope: Scope,
    config: Config,
    subs: IndexMap<String, NodeId>,
}

impl Node {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mounted children keyed by the subfolder name they were mounted with.
    pub fn subs(&self) -> &IndexMap<String, NodeId> {
        &self.subs
    }
}

/// Returns true for control file names such as `_proyo_`.
pub fn is_control_file(name: &str) -> bool {
    name.starts_with(CONTROL_MARKER) && name.ends_with(CONTROL_MARKER)
}

pub struct Tree {
    nodes: Vec<Node>,
    macros: Macros,
    ignore: GlobSet,
    files: IndexMap<String, Content>,
    generated: HashSet<PathBuf>,
    ran: IndexMap<PathBuf, NodeId>,
}

impl Tree {
    /// Creates a tree whose root node is bound to `root`.
    ///
    /// # Arguments
    /// * `root` - Template directory
    /// * `variables` - Initial scope of the root node
    /// * `macros` - Replacement bodies keyed by file base name
    pub fn new(
        root: impl Into<PathBuf>,
        variables: IndexMap<String, Value>,
        macros: Macros,
    ) -> Self {
        let root = root.into();
        let id = NodeId(0);
        let scope = Scope::new(id, &root, variables);
        Self {
            nodes: vec![Node {
                root,
                scope,
                config: Config::default(),
                subs: IndexMap::new(),
            }],
            macros,
            ignore: GlobSet::empty(),
            files: IndexMap::new(),
            generated: HashSet::new(),
            ran: IndexMap::new(),
        }
    }

    /// Excludes entries matching `ignore` (relative to the root directory)
    /// from traversal.
    pub fn with_ignore(mut self, ignore: GlobSet) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn scope(&self, id: NodeId) -> &Scope {
        &self.nodes[id.0].scope
    }

    pub(crate) fn scope_mut(&mut self, id: NodeId) -> &mut Scope {
        &mut self.nodes[id.0].scope
    }

    /// Generated output, keyed by path relative to the generating node.
    pub fn files(&self) -> &IndexMap<String, Content> {
        &self.files
    }

    pub fn into_files(self) -> IndexMap<String, Content> {
        self.files
    }

    /// Returns `id` followed by all of its descendants, depth first.
    pub fn all_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        for &child in self.nodes[id.0].subs.values() {
            out.extend(self.all_children(child));
        }
        out
    }

    /// Merges `bindings` into the scope of `id` only.
    pub fn update(&mut self, id: NodeId, bindings: IndexMap<String, Value>) {
        self.scope_mut(id).update(bindings);
    }

    /// Merges `bindings` into the scope of `id` and every existing descendant.
    pub fn update_global(&mut self, id: NodeId, bindings: IndexMap<String, Value>) {
        for node in self.all_children(id) {
            self.scope_mut(node).update(bindings.clone());
        }
    }

    /// Returns the child context for `subfolder`, creating it on first use.
    ///
    /// A new child starts from a copy of the parent's current scope and
    /// config. Every call applies `extra` to the child's scope.
    ///
    /// # Errors
    /// * `Error::MountError` if the subdirectory does not exist
    pub fn mount(
        &mut self,
        parent: NodeId,
        subfolder: &str,
        extra: IndexMap<String, Value>,
    ) -> Result<NodeId> {
        let existing = self.nodes[parent.0].subs.get(subfolder).copied();
        let child = match existing {
            Some(child) => child,
            None => {
                let folder = self.nodes[parent.0].root.join(subfolder);
                if !folder.is_dir() {
                    return Err(Error::MountError {
                        folder: folder.display().to_string(),
                    });
                }
                let id = NodeId(self.nodes.len());
                debug!("Mounting {} as node {}", folder.display(), id.0);
                let parent_node = &self.nodes[parent.0];
                let node = Node {
                    scope: parent_node.scope.fork(id, &folder),
                    config: parent_node.config.clone(),
                    root: folder,
                    subs: IndexMap::new(),
                };
                self.nodes.push(node);
                self.nodes[parent.0].subs.insert(subfolder.to_string(), id);
                id
            }
        };
        self.update(child, extra);
        Ok(child)
    }

    /// Applies configuration options to node `id`.
    pub fn configure(&mut self, id: NodeId, params: &IndexMap<String, Value>) -> Result<()> {
        self.nodes[id.0].config.apply(params)
    }

    pub(crate) fn push_config(
        &mut self,
        id: NodeId,
        overrides: &IndexMap<String, Value>,
    ) -> Result<Config> {
        let saved = self.nodes[id.0].config.clone();
        self.configure(id, overrides)?;
        Ok(saved)
    }

    pub(crate) fn pop_config(&mut self, id: NodeId, saved: Config) {
        self.nodes[id.0].config = saved;
    }

    /// Runs `f` with `overrides` applied to node `id`, restoring the previous
    /// configuration afterwards whatever `f` returns.
    pub fn with_config<R>(
        &mut self,
        id: NodeId,
        overrides: &IndexMap<String, Value>,
        f: impl FnOnce(&mut Tree) -> R,
    ) -> Result<R> {
        let saved = self.push_config(id, overrides)?;
        let result = f(self);
        self.pop_config(id, saved);
        Ok(result)
    }

    /// Reads a template file, preferring a macro registered for its base name.
    pub(crate) fn load_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        let base = path.file_name().map(|n| n.to_string_lossy());
        match base.and_then(|b| self.macros.get(b.as_ref())) {
            Some(text) => Ok(text.clone().into_bytes()),
            None => fs::read(path),
        }
    }

    pub(crate) fn load_text(&self, path: &Path) -> io::Result<String> {
        String::from_utf8(self.load_bytes(path)?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub(crate) fn emit(&mut self, relative: String, content: Content) {
        debug!("Generated {}", relative);
        self.files.insert(relative, content);
    }

    fn is_ignored(&self, path: &Path) -> bool {
        path.strip_prefix(&self.nodes[0].root)
            .map(|relative| self.ignore.is_match(relative))
            .unwrap_or(false)
    }

    /// Runs the PARSE chunk of every control file directly inside node `id`.
    pub fn parse(&mut self, id: NodeId) {
        let root = self.nodes[id.0].root.clone();
        let entries = match sorted_entries(&root) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to parse {}: {}", root.display(), e);
                return;
            }
        };
        for (name, path, is_dir) in entries {
            if !is_dir && is_control_file(&name) && !self.is_ignored(&path) {
                fragment::run_control_file(self, id, &path, Phase::Parse);
            }
        }
    }

    /// Walks node `id`'s directory: runs its control files and renders every
    /// regular file below it into the output collection.
    pub fn run(&mut self, id: NodeId) {
        self.run_path(id, "");
    }

    fn run_path(&mut self, id: NodeId, subpath: &str) {
        let root = &self.nodes[id.0].root;
        let dir = if subpath.is_empty() {
            root.clone()
        } else {
            root.join(subpath)
        };
        let entries = match sorted_entries(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to read {}: {}", dir.display(), e);
                return;
            }
        };

        let mut to_generate = Vec::new();
        for (name, path, is_dir) in entries {
            let relative = if subpath.is_empty() {
                name.clone()
            } else {
                format!("{subpath}/{name}")
            };
            if self.is_ignored(&path) {
                debug!("Skipping ignored {}", path.display());
            } else if is_dir {
                self.run_path(id, &relative);
            } else if is_control_file(&name) {
                // Control files run once per node, at its top level only.
                if subpath.is_empty() {
                    fragment::run_control_file(self, id, &path, Phase::Run);
                    self.ran.insert(path, id);
                } else {
                    debug!("Skipping nested control file {}", path.display());
                }
            } else if self.generated.contains(&path) {
                debug!("Skipping already generated {}", path.display());
            } else {
                to_generate.push((relative, path));
            }
        }

        if !self.nodes[id.0].config.collect_files() {
            debug!("File collection disabled in {}", dir.display());
            return;
        }
        for (relative, path) in to_generate {
            self.generated.insert(path.clone());
            generator::generate_file(self, id, &relative, &path);
        }
    }

    /// Control files that ran and carry a POST_RUN chunk.
    pub fn pending_post_run(&self) -> Vec<PathBuf> {
        self.ran
            .keys()
            .filter(|path| {
                self.load_text(path)
                    .map(|text| fragment::split_chunks(&text).len() > Phase::PostRun.chunk_index())
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Runs the POST_RUN chunk of every control file that ran, against the
    /// node that ran it.
    pub fn post_run_all(&mut self) {
        let ran: Vec<(PathBuf, NodeId)> =
            self.ran.iter().map(|(path, id)| (path.clone(), *id)).collect();
        for (path, id) in ran {
            fragment::run_control_file(self, id, &path, Phase::PostRun);
        }
    }
}

/// Lists the direct entries of `dir` sorted by file name, as
/// `(name, path, is_dir)`.
fn sorted_entries(dir: &Path) -> walkdir::Result<Vec<(String, PathBuf, bool)>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry?;
            Ok((
                entry.file_name().to_string_lossy().into_owned(),
                entry.path().to_path_buf(),
                entry.file_type().is_dir(),
            ))
        })
        .collect()
}

//! Variable scope owned by each node of the context tree.

use std::path::Path;

use indexmap::IndexMap;

use crate::constants::{FOLDER_VAR, NODE_VAR};
use crate::script::Value;
use crate::tree::NodeId;

/// Ordered mapping of variable name to value.
///
/// Every scope carries two reserved bindings: [`FOLDER_VAR`] (the owning
/// node's directory) and [`NODE_VAR`] (a handle to the owning node). They are
/// re-asserted after every merge, so no update can shadow them away.
#[derive(Debug, Clone)]
pub struct Scope {
    vars: IndexMap<String, Value>,
    owner: NodeId,
    folder: String,
}

impl Scope {
    pub(crate) fn new(owner: NodeId, folder: &Path, vars: IndexMap<String, Value>) -> Self {
        let mut scope = Self {
            vars,
            owner,
            folder: folder.to_string_lossy().into_owned(),
        };
        scope.reassert();
        scope
    }

    /// Copies this scope for a child node; the copy is independent afterwards.
    pub(crate) fn fork(&self, owner: NodeId, folder: &Path) -> Self {
        Self::new(owner, folder, self.vars.clone())
    }

    fn reassert(&mut self) {
        self.vars
            .insert(FOLDER_VAR.to_string(), Value::Str(self.folder.clone()));
        self.vars.insert(NODE_VAR.to_string(), Value::Node(self.owner));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn vars(&self) -> &IndexMap<String, Value> {
        &self.vars
    }

    /// Merges `bindings` in place, then restores the reserved bindings.
    pub fn update<I>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.vars.extend(bindings);
        self.reassert();
    }

    /// Writes a single binding as a template file's script would.
    pub(crate) fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
        self.reassert();
    }
}

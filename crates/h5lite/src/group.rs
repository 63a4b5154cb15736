//! Group handles: the lazily decoded tree of named objects.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::Error;
use crate::file::FileInner;
use crate::types::AttrValue;
use crate::variable::Variable;

/// A handle to a group (or dataset) within an open file.
///
/// Children, attributes, and the dataset value decode on first access and
/// are cached in the file's object arena, so repeated reads return the
/// same results without re-parsing.
#[derive(Clone)]
pub struct Group {
    file: Rc<FileInner>,
    address: u64,
    name: String,
    path: String,
}

impl Group {
    pub(crate) fn root(file: Rc<FileInner>, address: u64) -> Group {
        Group {
            file,
            address,
            name: String::new(),
            path: String::new(),
        }
    }

    fn child(&self, name: String, address: u64) -> Group {
        let path = format!("{}/{}", self.path, name);
        Group {
            file: self.file.clone(),
            address,
            name,
            path,
        }
    }

    /// The group's own name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path: empty for the root, `/a/b` for descendants.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Child names in file order.
    pub fn child_names(&self) -> Result<Vec<String>, Error> {
        let node = self.file.object(self.address)?;
        let children = self.file.children(&node)?;
        Ok(children.into_iter().map(|(name, _)| name).collect())
    }

    /// Handles for every child, in file order.
    pub fn groups(&self) -> Result<Vec<Group>, Error> {
        let node = self.file.object(self.address)?;
        let children = self.file.children(&node)?;
        Ok(children
            .into_iter()
            .map(|(name, address)| self.child(name, address))
            .collect())
    }

    /// Navigate a `/`-separated relative path. Returns `Ok(None)` when a
    /// component is missing.
    pub fn group(&self, path: &str) -> Result<Option<Group>, Error> {
        let mut current = self.clone();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let node = current.file.object(current.address)?;
            let children = current.file.children(&node)?;
            match children.into_iter().find(|(name, _)| name == component) {
                Some((name, address)) => current = current.child(name, address),
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// The object's attributes, decoded with global heap references
    /// resolved.
    pub fn attributes(&self) -> Result<BTreeMap<String, AttrValue>, Error> {
        let node = self.file.object(self.address)?;
        self.file.attributes(&node)
    }

    /// One attribute by name.
    pub fn attribute(&self, name: &str) -> Result<Option<AttrValue>, Error> {
        Ok(self.attributes()?.remove(name))
    }

    /// True when this object carries a dataset.
    pub fn is_dataset(&self) -> Result<bool, Error> {
        let node = self.file.object(self.address)?;
        Ok(node.header.is_dataset())
    }

    /// Materialize the dataset value, or `None` for a plain group.
    pub fn value(&self) -> Result<Option<Rc<Variable>>, Error> {
        let node = self.file.object(self.address)?;
        self.file.value(&node)
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("path", &self.path)
            .field("address", &self.address)
            .finish()
    }
}

//! Directory tree of the pages, used for the table of contents and dry-run previews.
//!
//! Nodes keep first-seen order at each level, so the tree mirrors reading order
//! rather than alphabetical order.

use std::path::Path;

use crate::types::path_segments;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// A directory or file segment of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    /// Link recorded by the first insertion that reached this node.
    pub link: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            link: None,
            children: Vec::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Finds the child with this name and kind, creating it at the end if missing.
    fn child_mut(&mut self, name: &str, kind: NodeKind) -> &mut Node {
        let pos = match self
            .children
            .iter()
            .position(|c| c.name == name && c.kind == kind)
        {
            Some(pos) => pos,
            None => {
                self.children.push(Node::new(name, kind));
                self.children.len() - 1
            }
        };
        &mut self.children[pos]
    }

    /// Renders the subtree depth-first as an indented list.
    ///
    /// The node itself is only printed when `indent` is non-empty, so calling
    /// this on a root with `""` renders its children at the first level.
    pub fn write_string(&self, indent: &str) -> String {
        let mut out = String::new();
        if !indent.is_empty() {
            out.push_str(indent);
            out.push_str("- ");
            out.push_str(&self.name);
            out.push('\n');
        }
        let child_indent = format!("{}  ", indent);
        for child in &self.children {
            out.push_str(&child.write_string(&child_indent));
        }
        out
    }
}

/// Returns the only child of `root` when it has exactly one, otherwise `root`.
///
/// Strips a single wrapping top-level directory from a displayed tree.
pub fn collapse_single_root(root: &Node) -> &Node {
    match root.children.as_slice() {
        [only] if !only.is_file() => only,
        _ => root,
    }
}

/// Tree built from `(directory, optional filename)` insertions.
#[derive(Debug, Clone, PartialEq)]
pub struct PathTree {
    root: Node,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub fn new() -> Self {
        Self {
            root: Node::new(".", NodeKind::Directory),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Inserts every segment of `dir`, then `file` as a leaf when given.
    pub fn add(&mut self, dir: &Path, file: Option<&str>) {
        self.add_with_link(dir, file, None);
    }

    /// Same as [`PathTree::add`], recording `link` on every node that has none yet.
    pub fn add_with_link(&mut self, dir: &Path, file: Option<&str>, link: Option<&str>) {
        let mut current = &mut self.root;
        for segment in path_segments(dir) {
            current = current.child_mut(&segment, NodeKind::Directory);
            if current.link.is_none() {
                current.link = link.map(str::to_string);
            }
        }
        if let Some(file) = file {
            let leaf = current.child_mut(file, NodeKind::File);
            if leaf.link.is_none() {
                leaf.link = link.map(str::to_string);
            }
        }
    }

    /// Root to display: collapsed only for directory trees with `strip_first_directory`.
    pub fn display_root(&self, directories_only: bool, strip_first_directory: bool) -> &Node {
        if directories_only && strip_first_directory {
            collapse_single_root(&self.root)
        } else {
            &self.root
        }
    }
}

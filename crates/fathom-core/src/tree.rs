//! Aggregate directory tree with incremental size totals.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entry::{EntryInsert, EntryKind, EntryView};
use crate::error::TreeError;

/// A file or symbolic link under a directory. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LeafEntry {
    /// Regular file.
    File {
        /// Absolute path.
        path: PathBuf,
        /// Size in bytes.
        size: u64,
    },
    /// Symbolic link with its raw, unresolved target. Never followed,
    /// contributes zero size to ancestors.
    Link {
        /// Absolute path.
        path: PathBuf,
        /// Raw link target string.
        target: String,
    },
}

impl LeafEntry {
    /// Absolute path of this leaf.
    pub fn path(&self) -> &Path {
        match self {
            LeafEntry::File { path, .. } | LeafEntry::Link { path, .. } => path,
        }
    }

    /// Size in bytes (0 for links).
    pub fn size(&self) -> u64 {
        match self {
            LeafEntry::File { size, .. } => *size,
            LeafEntry::Link { .. } => 0,
        }
    }

    /// Entry classification of this leaf.
    pub fn kind(&self) -> EntryKind {
        match self {
            LeafEntry::File { .. } => EntryKind::File,
            LeafEntry::Link { .. } => EntryKind::Link,
        }
    }
}

/// A directory with a running aggregate size.
///
/// `size` always equals the sum of the sizes of its immediate subdirectories
/// and leaves; the total is maintained incrementally on every insert rather
/// than recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    /// Absolute path of this directory.
    pub path: PathBuf,
    /// Aggregate size in bytes of everything beneath this directory.
    pub size: u64,
    /// Subdirectories keyed by their final path segment, in insertion order.
    pub dirs: IndexMap<CompactString, DirectoryNode>,
    /// Files and links in insertion order.
    pub leaves: Vec<LeafEntry>,
}

impl DirectoryNode {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            size: 0,
            dirs: IndexMap::new(),
            leaves: Vec::new(),
        }
    }

    /// One-level listing of this directory: subdirectories first, then
    /// leaves, each group in insertion order.
    pub fn children(&self) -> Vec<EntryView> {
        let mut out = Vec::with_capacity(self.dirs.len() + self.leaves.len());
        for dir in self.dirs.values() {
            out.push(EntryView::new(dir.path.clone(), dir.size, EntryKind::Directory));
        }
        for leaf in &self.leaves {
            out.push(EntryView::new(leaf.path().to_path_buf(), leaf.size(), leaf.kind()));
        }
        out
    }
}

/// Directory tree for one scan root, with per-directory aggregate sizes.
///
/// The tree is mutated through [`add_entry`] only, and relies on its caller
/// (the traversal engine) to register every directory before any of that
/// directory's children. Queries never fail on absent paths: during a live
/// scan, "not there yet" is an ordinary state.
///
/// [`add_entry`]: AggregateTree::add_entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateTree {
    root: DirectoryNode,
}

impl AggregateTree {
    /// Create an empty tree rooted at `root` (root node size 0).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: DirectoryNode::new(root.into()),
        }
    }

    /// The root directory node.
    pub fn root(&self) -> &DirectoryNode {
        &self.root
    }

    /// The root path this tree is indexed by.
    pub fn root_path(&self) -> &Path {
        &self.root.path
    }

    /// Register a directory, file, or link at `path`.
    ///
    /// Re-registering the root as a directory is an idempotent no-op. File
    /// and link inserts propagate their size delta to every ancestor
    /// directory exactly once. A path outside the root, or one whose parent
    /// directory has not been registered, is a contract violation; the
    /// insert is rejected before any mutation, so prior totals stay intact.
    ///
    /// Directory components are keyed by their lossy UTF-8 form: non-UTF-8
    /// sibling names whose lossy conversions coincide resolve to the same
    /// directory node.
    pub fn add_entry(&mut self, path: &Path, insert: EntryInsert) -> Result<(), TreeError> {
        if insert == EntryInsert::Dir && path == self.root.path.as_path() {
            return Ok(());
        }
        let names = self.path_names(path)?;
        Self::insert_at(&mut self.root, &names, path, &insert)?;
        Ok(())
    }

    /// The root entry plus a flat, one-level listing of its immediate
    /// children (directories first, then leaves, in insertion order).
    pub fn view_root(&self) -> Vec<EntryView> {
        let mut out = vec![EntryView::new(
            self.root.path.clone(),
            self.root.size,
            EntryKind::Directory,
        )];
        out.extend(self.root.children());
        out
    }

    /// One-level listing of the directory at `path`.
    ///
    /// Returns an empty listing when any component is missing, resolves to a
    /// leaf, or `path` is not a strict descendant of the root. Absence is a
    /// valid, common state during a live scan, so this never errors.
    pub fn view_path(&self, path: &Path) -> Vec<EntryView> {
        let Ok(names) = self.path_names(path) else {
            return Vec::new();
        };
        let mut node = &self.root;
        for name in &names {
            match node.dirs.get(name) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }
        node.children()
    }

    /// Split `path` into the name components below the root, each in its
    /// lossy UTF-8 form.
    ///
    /// Errors when `path` is not a strict descendant of the root.
    fn path_names(&self, path: &Path) -> Result<Vec<CompactString>, TreeError> {
        let relative = path
            .strip_prefix(&self.root.path)
            .map_err(|_| TreeError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.root.path.clone(),
            })?;
        let names: Vec<CompactString> = relative
            .components()
            .map(|c| CompactString::new(c.as_os_str().to_string_lossy()))
            .collect();
        if names.is_empty() {
            return Err(TreeError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.root.path.clone(),
            });
        }
        Ok(names)
    }

    /// Recursive insert. Ancestor sizes are bumped on the way back out, so a
    /// rejected insert leaves every total untouched.
    fn insert_at(
        node: &mut DirectoryNode,
        names: &[CompactString],
        path: &Path,
        insert: &EntryInsert,
    ) -> Result<u64, TreeError> {
        match names {
            [] => Err(TreeError::MissingParent {
                path: path.to_path_buf(),
            }),
            [name] => {
                let delta = insert.size();
                match insert {
                    EntryInsert::Dir => {
                        node.dirs
                            .entry(name.clone())
                            .or_insert_with(|| DirectoryNode::new(path.to_path_buf()));
                    }
                    EntryInsert::File { size } => {
                        node.leaves.push(LeafEntry::File {
                            path: path.to_path_buf(),
                            size: *size,
                        });
                    }
                    EntryInsert::Link { target } => {
                        node.leaves.push(LeafEntry::Link {
                            path: path.to_path_buf(),
                            target: target.clone(),
                        });
                    }
                }
                node.size += delta;
                Ok(delta)
            }
            [name, rest @ ..] => {
                let Some(child) = node.dirs.get_mut(name) else {
                    // A leaf occupying the component is a type clash, not a
                    // missing registration.
                    let clashes = node
                        .leaves
                        .iter()
                        .any(|l| {
                            l.path()
                                .file_name()
                                .is_some_and(|n| n.to_string_lossy() == name.as_str())
                        });
                    return Err(if clashes {
                        TreeError::NotADirectory {
                            path: path.to_path_buf(),
                        }
                    } else {
                        TreeError::MissingParent {
                            path: path.to_path_buf(),
                        }
                    });
                };
                let delta = Self::insert_at(child, rest, path, insert)?;
                node.size += delta;
                Ok(delta)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> AggregateTree {
        AggregateTree::new("/home/user")
    }

    fn view(path: &str, size: u64, kind: EntryKind) -> EntryView {
        EntryView::new(path, size, kind)
    }

    #[test]
    fn test_view_empty_tree() {
        let t = tree();
        assert_eq!(
            t.view_root(),
            vec![view("/home/user", 0, EntryKind::Directory)]
        );
        assert_eq!(t.view_path(Path::new("/home/user/does_not_exist")), vec![]);
    }

    #[test]
    fn test_root_registration_is_noop() {
        let mut t = tree();
        t.add_entry(Path::new("/home/user"), EntryInsert::Dir).unwrap();
        t.add_entry(Path::new("/home/user"), EntryInsert::Dir).unwrap();
        assert_eq!(
            t.view_root(),
            vec![view("/home/user", 0, EntryKind::Directory)]
        );
    }

    #[test]
    fn test_single_file() {
        let mut t = tree();
        t.add_entry(
            Path::new("/home/user/file.txt"),
            EntryInsert::File { size: 123 },
        )
        .unwrap();
        assert_eq!(
            t.view_root(),
            vec![
                view("/home/user", 123, EntryKind::Directory),
                view("/home/user/file.txt", 123, EntryKind::File),
            ]
        );
    }

    #[test]
    fn test_single_dir() {
        let mut t = tree();
        t.add_entry(Path::new("/home/user/new_dir"), EntryInsert::Dir)
            .unwrap();
        assert_eq!(
            t.view_root(),
            vec![
                view("/home/user", 0, EntryKind::Directory),
                view("/home/user/new_dir", 0, EntryKind::Directory),
            ]
        );
    }

    #[test]
    fn test_files_and_dirs_mixed() {
        let mut t = tree();
        t.add_entry(Path::new("/home/user/new_dir_1"), EntryInsert::Dir)
            .unwrap();
        t.add_entry(Path::new("/home/user/new_dir_2"), EntryInsert::Dir)
            .unwrap();
        t.add_entry(
            Path::new("/home/user/old_file.txt"),
            EntryInsert::File { size: 11 },
        )
        .unwrap();
        t.add_entry(
            Path::new("/home/user/new_dir_2/new_file_2.txt"),
            EntryInsert::File { size: 7 },
        )
        .unwrap();

        assert_eq!(
            t.view_root(),
            vec![
                view("/home/user", 18, EntryKind::Directory),
                view("/home/user/new_dir_1", 0, EntryKind::Directory),
                view("/home/user/new_dir_2", 7, EntryKind::Directory),
                view("/home/user/old_file.txt", 11, EntryKind::File),
            ]
        );
        assert_eq!(t.view_path(Path::new("/home/user/new_dir_1")), vec![]);
        assert_eq!(
            t.view_path(Path::new("/home/user/new_dir_2")),
            vec![view("/home/user/new_dir_2/new_file_2.txt", 7, EntryKind::File)]
        );
    }

    #[test]
    fn test_sizes_propagate_to_every_ancestor_once() {
        let mut t = tree();
        t.add_entry(Path::new("/home/user/a"), EntryInsert::Dir).unwrap();
        t.add_entry(Path::new("/home/user/a/b"), EntryInsert::Dir).unwrap();
        t.add_entry(
            Path::new("/home/user/a/b/deep.bin"),
            EntryInsert::File { size: 50 },
        )
        .unwrap();
        t.add_entry(
            Path::new("/home/user/a/shallow.bin"),
            EntryInsert::File { size: 100 },
        )
        .unwrap();

        assert_eq!(t.root().size, 150);
        assert_eq!(t.root().dirs["a"].size, 150);
        assert_eq!(t.root().dirs["a"].dirs["b"].size, 50);
        assert_invariant(t.root());
    }

    #[test]
    fn test_links_contribute_zero_size() {
        let mut t = tree();
        t.add_entry(
            Path::new("/home/user/a.lnk"),
            EntryInsert::Link {
                target: "/elsewhere".into(),
            },
        )
        .unwrap();
        t.add_entry(
            Path::new("/home/user/file.txt"),
            EntryInsert::File { size: 5 },
        )
        .unwrap();

        assert_eq!(t.root().size, 5);
        assert_eq!(
            t.view_root(),
            vec![
                view("/home/user", 5, EntryKind::Directory),
                view("/home/user/a.lnk", 0, EntryKind::Link),
                view("/home/user/file.txt", 5, EntryKind::File),
            ]
        );
    }

    #[test]
    fn test_missing_parent_rejected_without_mutation() {
        let mut t = tree();
        t.add_entry(
            Path::new("/home/user/present.txt"),
            EntryInsert::File { size: 9 },
        )
        .unwrap();

        let err = t
            .add_entry(
                Path::new("/home/user/ghost/file.txt"),
                EntryInsert::File { size: 1000 },
            )
            .unwrap_err();
        assert!(matches!(err, TreeError::MissingParent { .. }));
        // Totals untouched by the rejected insert.
        assert_eq!(t.root().size, 9);
    }

    #[test]
    fn test_leaf_as_parent_component() {
        let mut t = tree();
        t.add_entry(
            Path::new("/home/user/notadir"),
            EntryInsert::File { size: 1 },
        )
        .unwrap();
        let err = t
            .add_entry(
                Path::new("/home/user/notadir/child"),
                EntryInsert::File { size: 1 },
            )
            .unwrap_err();
        assert!(matches!(err, TreeError::NotADirectory { .. }));
    }

    #[test]
    fn test_outside_root_rejected() {
        let mut t = tree();
        let err = t
            .add_entry(Path::new("/etc/passwd"), EntryInsert::File { size: 1 })
            .unwrap_err();
        assert!(matches!(err, TreeError::OutsideRoot { .. }));
    }

    #[test]
    fn test_view_path_outside_root_is_empty() {
        let t = tree();
        assert_eq!(t.view_path(Path::new("/etc")), vec![]);
        // The root itself is not a strict descendant.
        assert_eq!(t.view_path(Path::new("/home/user")), vec![]);
    }

    #[test]
    fn test_view_path_on_leaf_is_empty() {
        let mut t = tree();
        t.add_entry(
            Path::new("/home/user/file.txt"),
            EntryInsert::File { size: 3 },
        )
        .unwrap();
        assert_eq!(t.view_path(Path::new("/home/user/file.txt")), vec![]);
    }

    /// Every directory's size equals the sum of its immediate children's.
    fn assert_invariant(node: &DirectoryNode) {
        let sum: u64 = node.dirs.values().map(|d| d.size).sum::<u64>()
            + node.leaves.iter().map(|l| l.size()).sum::<u64>();
        assert_eq!(node.size, sum, "aggregate mismatch at {}", node.path.display());
        for child in node.dirs.values() {
            assert_invariant(child);
        }
    }

    #[test]
    fn test_invariant_after_interleaved_inserts() {
        let mut t = tree();
        t.add_entry(Path::new("/home/user/d1"), EntryInsert::Dir).unwrap();
        t.add_entry(Path::new("/home/user/f1"), EntryInsert::File { size: 10 }).unwrap();
        t.add_entry(Path::new("/home/user/d1/d2"), EntryInsert::Dir).unwrap();
        t.add_entry(Path::new("/home/user/d1/f2"), EntryInsert::File { size: 20 }).unwrap();
        t.add_entry(Path::new("/home/user/d1/d2/f3"), EntryInsert::File { size: 30 }).unwrap();
        t.add_entry(
            Path::new("/home/user/d1/d2/l1"),
            EntryInsert::Link { target: "f3".into() },
        )
        .unwrap();
        t.add_entry(Path::new("/home/user/f4"), EntryInsert::File { size: 40 }).unwrap();

        assert_eq!(t.root().size, 100);
        assert_invariant(t.root());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_key_by_lossy_form() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        // Two distinct byte sequences with identical lossy conversions
        // resolve to the same directory node, per the documented keying.
        let mut t = tree();
        let dir_a = PathBuf::from("/home/user").join(OsString::from_vec(b"d\xff".to_vec()));
        let dir_b = PathBuf::from("/home/user").join(OsString::from_vec(b"d\xfe".to_vec()));

        t.add_entry(&dir_a, EntryInsert::Dir).unwrap();
        t.add_entry(&dir_b, EntryInsert::Dir).unwrap();
        assert_eq!(t.root().dirs.len(), 1);

        t.add_entry(&dir_a.join("f1"), EntryInsert::File { size: 5 })
            .unwrap();
        t.add_entry(&dir_b.join("f2"), EntryInsert::File { size: 7 })
            .unwrap();

        assert_eq!(t.root().size, 12);
        let node = t.root().dirs.values().next().unwrap();
        assert_eq!(node.size, 12);
        assert_eq!(node.leaves.len(), 2);
        assert_invariant(t.root());
    }
}

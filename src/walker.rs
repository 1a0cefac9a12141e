//! Lazy tree traversal over a Drive subtree.
//!
//! The walk runs off an explicit folder worklist instead of recursion,
//! so arbitrarily deep or cyclic remote trees cannot exhaust the call
//! stack. A visited set of folder ids keeps shortcut loops finite.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::client::DriveApi;
use crate::error::DriveError;
use crate::models::{ResourceKind, ResourceRef};

/// A downloadable file paired with its destination path, relative to
/// the mirror root.
#[derive(Debug, Clone)]
pub struct TraversalNode {
    pub resource: ResourceRef,
    /// Sanitized path segments; the last one is the file name.
    pub local_path: Vec<String>,
}

/// One step of a traversal. Failures are per-item: the walk continues
/// with the remaining siblings.
#[derive(Debug)]
pub enum WalkItem {
    /// A file to fetch.
    File(TraversalNode),
    /// A node that could not be resolved or enumerated.
    Failed {
        name: String,
        local_path: Vec<String>,
        error: DriveError,
    },
    /// A folder already being materialized in this traversal;
    /// informational, not a failure.
    CycleSkipped { name: String, local_path: Vec<String> },
}

/// Replace filesystem-reserved characters, collapse whitespace runs and
/// strip trailing dots/spaces (Windows cannot create such names).
pub fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(['.', ' ']);

    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

struct PendingFolder {
    id: String,
    name: String,
    /// Directory path of this folder relative to the mirror root.
    local_path: Vec<String>,
}

/// Pull-based walker: call [`Walker::next`] until it returns `None`.
///
/// One folder's pages are fully enumerated before any of its children
/// are yielded; folders queue up and are listed on demand, so the first
/// file can be fetched before distant subtrees have been touched.
pub struct Walker<'a, D: DriveApi + ?Sized> {
    drive: &'a D,
    recursive: bool,
    root: Option<ResourceRef>,
    visited: HashSet<String>,
    folders: VecDeque<PendingFolder>,
    buffer: VecDeque<WalkItem>,
}

impl<'a, D: DriveApi + ?Sized> Walker<'a, D> {
    pub fn new(drive: &'a D, root: ResourceRef, recursive: bool) -> Self {
        Self {
            drive,
            recursive,
            root: Some(root),
            visited: HashSet::new(),
            folders: VecDeque::new(),
            buffer: VecDeque::new(),
        }
    }

    /// Produce the next traversal step, or `None` when the subtree is
    /// exhausted.
    pub async fn next(&mut self) -> Option<WalkItem> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(item);
            }
            if let Some(root) = self.root.take() {
                self.start(root).await;
                continue;
            }
            let folder = self.folders.pop_front()?;
            self.enumerate(folder).await;
        }
    }

    /// Handle the root: resolve a shortcut root, yield a lone file, or
    /// seed the folder worklist.
    async fn start(&mut self, root: ResourceRef) {
        let root = if root.kind() == ResourceKind::Shortcut {
            match self.drive.resolve_shortcut(&root).await {
                Ok(target) => target,
                Err(error) => {
                    self.buffer.push_back(WalkItem::Failed {
                        name: root.name,
                        local_path: Vec::new(),
                        error,
                    });
                    return;
                }
            }
        } else {
            root
        };

        match root.kind() {
            ResourceKind::File => {
                let local_path = vec![sanitize_name(&root.name)];
                self.buffer.push_back(WalkItem::File(TraversalNode {
                    resource: root,
                    local_path,
                }));
            }
            ResourceKind::Folder => {
                self.visited.insert(root.id.clone());
                self.folders.push_back(PendingFolder {
                    id: root.id,
                    name: root.name,
                    local_path: Vec::new(),
                });
            }
            // resolve_shortcut never returns another shortcut
            ResourceKind::Shortcut => unreachable!("shortcut resolved to shortcut"),
        }
    }

    /// List one folder and turn its children into buffered items and
    /// queued subfolders.
    async fn enumerate(&mut self, folder: PendingFolder) {
        let children = match self.drive.list_children(&folder.id).await {
            Ok(children) => children,
            Err(error) => {
                self.buffer.push_back(WalkItem::Failed {
                    name: folder.name,
                    local_path: folder.local_path,
                    error,
                });
                return;
            }
        };
        debug!(folder = %folder.id, children = children.len(), "enumerated folder");

        for child in children {
            // Local names come from the entry as listed in the parent,
            // so a shortcut's display name wins over its target's.
            let display_name = child.name.clone();
            let mut child_path = folder.local_path.clone();
            child_path.push(sanitize_name(&display_name));

            let resolved = if child.kind() == ResourceKind::Shortcut {
                match self.drive.resolve_shortcut(&child).await {
                    Ok(target) => target,
                    Err(error) => {
                        self.buffer.push_back(WalkItem::Failed {
                            name: display_name,
                            local_path: child_path,
                            error,
                        });
                        continue;
                    }
                }
            } else {
                child
            };

            match resolved.kind() {
                ResourceKind::File => {
                    self.buffer.push_back(WalkItem::File(TraversalNode {
                        resource: resolved,
                        local_path: child_path,
                    }));
                }
                ResourceKind::Folder => {
                    if !self.recursive {
                        continue;
                    }
                    if !self.visited.insert(resolved.id.clone()) {
                        self.buffer.push_back(WalkItem::CycleSkipped {
                            name: display_name,
                            local_path: child_path,
                        });
                        continue;
                    }
                    self.folders.push_back(PendingFolder {
                        id: resolved.id,
                        name: display_name,
                        local_path: child_path,
                    });
                }
                ResourceKind::Shortcut => unreachable!("shortcut resolved to shortcut"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{ShortcutDetails, FOLDER_MIME, SHORTCUT_MIME};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// In-memory Drive double backed by adjacency lists.
    #[derive(Default)]
    struct FakeDrive {
        resources: HashMap<String, ResourceRef>,
        children: HashMap<String, Vec<String>>,
    }

    impl FakeDrive {
        fn file(&mut self, id: &str, name: &str) {
            self.insert(id, name, "text/plain", None);
        }

        fn folder(&mut self, id: &str, name: &str, child_ids: &[&str]) {
            self.insert(id, name, FOLDER_MIME, None);
            self.children
                .insert(id.to_string(), child_ids.iter().map(|s| s.to_string()).collect());
        }

        fn shortcut(&mut self, id: &str, name: &str, target_id: &str) {
            self.insert(id, name, SHORTCUT_MIME, Some(target_id.to_string()));
        }

        fn insert(&mut self, id: &str, name: &str, mime: &str, target: Option<String>) {
            self.resources.insert(
                id.to_string(),
                ResourceRef {
                    id: id.to_string(),
                    name: name.to_string(),
                    mime_type: mime.to_string(),
                    size: None,
                    shortcut_details: target.map(|target_id| ShortcutDetails {
                        target_id,
                        target_mime_type: None,
                    }),
                },
            );
        }

        fn get(&self, id: &str) -> ResourceRef {
            self.resources.get(id).expect("fixture resource").clone()
        }
    }

    #[async_trait]
    impl DriveApi for FakeDrive {
        async fn get_resource(&self, id: &str) -> Result<ResourceRef> {
            self.resources
                .get(id)
                .cloned()
                .ok_or_else(|| DriveError::NotFound(id.to_string()))
        }

        async fn list_children(&self, folder_id: &str) -> Result<Vec<ResourceRef>> {
            let ids = self
                .children
                .get(folder_id)
                .ok_or_else(|| DriveError::NotFound(folder_id.to_string()))?;
            Ok(ids.iter().map(|id| self.get(id)).collect())
        }
    }

    async fn collect<D: DriveApi>(drive: &D, root: ResourceRef, recursive: bool) -> Vec<WalkItem> {
        let mut walker = Walker::new(drive, root, recursive);
        let mut items = Vec::new();
        while let Some(item) = walker.next().await {
            items.push(item);
        }
        items
    }

    fn file_paths(items: &[WalkItem]) -> Vec<String> {
        items
            .iter()
            .filter_map(|item| match item {
                WalkItem::File(node) => Some(node.local_path.join("/")),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_file_root_yields_single_node() {
        let mut drive = FakeDrive::default();
        drive.file("f1", "notes.txt");

        let items = collect(&drive, drive.get("f1"), true).await;
        assert_eq!(file_paths(&items), vec!["notes.txt"]);
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_non_recursive_yields_files_only() {
        let mut drive = FakeDrive::default();
        drive.file("f1", "a.txt");
        drive.file("f2", "b.txt");
        drive.folder("sub1", "sub1", &[]);
        drive.folder("sub2", "sub2", &[]);
        drive.folder("root", "root", &["f1", "sub1", "f2", "sub2"]);

        let items = collect(&drive, drive.get("root"), false).await;
        assert_eq!(file_paths(&items), vec!["a.txt", "b.txt"]);
        // Subfolders produce nothing at all in non-recursive mode.
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_recursive_descends_in_listing_order() {
        let mut drive = FakeDrive::default();
        drive.file("f1", "a.txt");
        drive.file("f2", "b.txt");
        drive.file("f3", "deep.txt");
        drive.folder("inner", "inner", &["f3"]);
        drive.folder("sub", "sub", &["f2", "inner"]);
        drive.folder("root", "root", &["f1", "sub"]);

        let items = collect(&drive, drive.get("root"), true).await;
        assert_eq!(
            file_paths(&items),
            vec!["a.txt", "sub/b.txt", "sub/inner/deep.txt"]
        );
    }

    #[tokio::test]
    async fn test_shortcut_to_folder_recursed_under_shortcut_name() {
        let mut drive = FakeDrive::default();
        drive.file("f1", "a.txt");
        drive.file("f2", "report.pdf");
        drive.folder("target", "target-folder", &["f2"]);
        drive.shortcut("sc", "sub", "target");
        drive.folder("root", "root", &["f1", "sc"]);

        let items = collect(&drive, drive.get("root"), true).await;
        assert_eq!(file_paths(&items), vec!["a.txt", "sub/report.pdf"]);
    }

    #[tokio::test]
    async fn test_shortcut_to_file_uses_shortcut_display_name() {
        let mut drive = FakeDrive::default();
        drive.file("target", "internal-name.bin");
        drive.shortcut("sc", "linked.bin", "target");
        drive.folder("root", "root", &["sc"]);

        let items = collect(&drive, drive.get("root"), true).await;
        match &items[0] {
            WalkItem::File(node) => {
                assert_eq!(node.local_path, vec!["linked.bin"]);
                assert_eq!(node.resource.id, "target");
            }
            other => panic!("expected file, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cycle_via_shortcut_terminates() {
        let mut drive = FakeDrive::default();
        drive.file("f1", "a.txt");
        drive.shortcut("back", "loop", "root");
        drive.folder("sub", "sub", &["back"]);
        drive.folder("root", "root", &["f1", "sub"]);

        let items = collect(&drive, drive.get("root"), true).await;
        assert_eq!(file_paths(&items), vec!["a.txt"]);
        assert!(items
            .iter()
            .any(|item| matches!(item, WalkItem::CycleSkipped { name, .. } if name == "loop")));
    }

    #[tokio::test]
    async fn test_broken_shortcut_does_not_abort_siblings() {
        let mut drive = FakeDrive::default();
        drive.file("f1", "a.txt");
        drive.file("f2", "z.txt");
        drive.shortcut("sc", "dangling", "missing-id");
        drive.folder("root", "root", &["f1", "sc", "f2"]);

        let items = collect(&drive, drive.get("root"), true).await;
        assert_eq!(file_paths(&items), vec!["a.txt", "z.txt"]);
        assert!(items.iter().any(|item| matches!(
            item,
            WalkItem::Failed { name, error: DriveError::NotFound(_), .. } if name == "dangling"
        )));
    }

    #[tokio::test]
    async fn test_chained_shortcut_reported_not_followed() {
        let mut drive = FakeDrive::default();
        drive.file("real", "real.txt");
        drive.shortcut("inner", "inner-link", "real");
        drive.shortcut("outer", "outer-link", "inner");
        drive.folder("root", "root", &["outer"]);

        let items = collect(&drive, drive.get("root"), true).await;
        assert!(file_paths(&items).is_empty());
        assert!(items
            .iter()
            .any(|item| matches!(item, WalkItem::Failed { error: DriveError::NotFound(_), .. })));
    }

    #[tokio::test]
    async fn test_root_shortcut_resolved_first() {
        let mut drive = FakeDrive::default();
        drive.file("f1", "a.txt");
        drive.folder("target", "target", &["f1"]);
        drive.shortcut("sc", "link", "target");

        let items = collect(&drive, drive.get("sc"), true).await;
        assert_eq!(file_paths(&items), vec!["a.txt"]);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("what? <no>"), "what_ _no_");
        assert_eq!(sanitize_name("  spaced   out  "), "spaced out");
        assert_eq!(sanitize_name("trailing. . "), "trailing");
        assert_eq!(sanitize_name(".."), "_");
        assert_eq!(sanitize_name(""), "_");
    }
}

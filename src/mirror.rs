//! Mirror orchestration: ties reference resolution, traversal and
//! fetching together into the `cp` and `ls` operations.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::client::{DriveApi, DriveClient};
use crate::error::{DriveError, Result};
use crate::fetcher;
use crate::models::{ResourceKind, ResourceRef};
use crate::reference::extract_id;
use crate::walker::{WalkItem, Walker};

/// Outcome of one attempted item in a mirror run.
#[derive(Debug)]
pub enum Outcome {
    Copied { path: PathBuf, bytes: u64 },
    Failed(DriveError),
    /// Folder already materialized in this run; skipped, not a failure.
    SkippedCycle,
}

/// One line of the final report.
#[derive(Debug)]
pub struct ItemReport {
    /// Remote-relative path of the item, `/`-joined.
    pub path: String,
    pub outcome: Outcome,
}

/// Per-item results of a whole `cp` invocation.
#[derive(Debug, Default)]
pub struct Report {
    pub items: Vec<ItemReport>,
}

impl Report {
    pub fn copied(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, Outcome::Copied { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, Outcome::Failed(_)))
            .count()
    }

    /// True when no item failed. Cycle skips do not count as failures.
    pub fn ok(&self) -> bool {
        self.failed() == 0
    }

    fn record(&mut self, path: String, outcome: Outcome) {
        self.items.push(ItemReport { path, outcome });
    }
}

/// Mirror the subtree behind `reference` into `destination_root`.
///
/// Errors resolving the root reference abort the run; everything past
/// that point is collected per item and never stops the batch.
pub async fn copy(
    client: &DriveClient,
    reference: &str,
    destination_root: &Path,
    recursive: bool,
) -> Result<Report> {
    let id = extract_id(reference)?;
    let root = client.get_resource(&id).await?;
    info!(id = %root.id, name = %root.name, recursive, "mirroring");

    let mut report = Report::default();
    let mut walker = Walker::new(client, root, recursive);

    while let Some(item) = walker.next().await {
        match item {
            WalkItem::File(node) => {
                let rel = node.local_path.join("/");
                match fetcher::fetch(client, &node, destination_root).await {
                    Ok(fetched) => report.record(
                        rel,
                        Outcome::Copied {
                            path: fetched.path,
                            bytes: fetched.bytes,
                        },
                    ),
                    Err(error) => {
                        warn!(item = %rel, %error, "fetch failed");
                        report.record(rel, Outcome::Failed(error));
                    }
                }
            }
            WalkItem::Failed {
                name,
                local_path,
                error,
            } => {
                let rel = if local_path.is_empty() {
                    name
                } else {
                    local_path.join("/")
                };
                warn!(item = %rel, %error, "skipped");
                report.record(rel, Outcome::Failed(error));
            }
            WalkItem::CycleSkipped { local_path, .. } => {
                report.record(local_path.join("/"), Outcome::SkippedCycle);
            }
        }
    }

    Ok(report)
}

/// One row of a listing.
#[derive(Debug)]
pub struct Entry {
    pub id: String,
    pub name: String,
    /// For shortcuts this is the resolved target kind when the target
    /// is reachable.
    pub kind: ResourceKind,
    pub size: Option<u64>,
}

/// List the immediate children of `reference`: one `get_resource`, one
/// (pagination-resolved) `list_children`, no recursion, no fetching.
/// Shortcut children display the kind of their target.
pub async fn list<D: DriveApi + ?Sized>(drive: &D, reference: &str) -> Result<Vec<Entry>> {
    let id = extract_id(reference)?;
    let mut root = drive.get_resource(&id).await?;

    if root.kind() == ResourceKind::Shortcut {
        root = drive.resolve_shortcut(&root).await?;
    }

    if root.kind() == ResourceKind::File {
        return Ok(vec![entry_for(&root, root.kind())]);
    }

    let children = drive.list_children(&root.id).await?;
    let mut entries = Vec::with_capacity(children.len());

    for child in children {
        let kind = match child.kind() {
            ResourceKind::Shortcut => match drive.resolve_shortcut(&child).await {
                Ok(target) => target.kind(),
                // Unreachable target: still list the entry as a shortcut.
                Err(_) => ResourceKind::Shortcut,
            },
            kind => kind,
        };
        entries.push(entry_for(&child, kind));
    }

    Ok(entries)
}

fn entry_for(resource: &ResourceRef, kind: ResourceKind) -> Entry {
    Entry {
        id: resource.id.clone(),
        name: resource.name.clone(),
        kind,
        size: resource.size,
    }
}

//! Content fetcher: pulls one resolved file to its local destination.
//!
//! Google-native documents go through the export endpoint and get the
//! interoperable extension appended; everything else downloads as raw
//! bytes under its display name. Bytes stream into a `.tmp` sibling
//! which is renamed into place only on full completion, so an
//! interrupted transfer never leaves a truncated file claiming success.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::client::DriveClient;
use crate::error::{DriveError, Result};
use crate::models::{export_format, ExportFormat, ResourceRef};
use crate::walker::TraversalNode;

/// Decide the final file name and the export format, if any.
///
/// `base_name` is the sanitized display name from the traversal; the
/// mapped extension is appended only when not already present.
pub(crate) fn download_plan(resource: &ResourceRef, base_name: &str) -> (String, Option<ExportFormat>) {
    match export_format(&resource.mime_type) {
        Some(format) => {
            let name = if base_name.ends_with(format.extension) {
                base_name.to_string()
            } else {
                format!("{}{}", base_name, format.extension)
            };
            (name, Some(format))
        }
        None => (base_name.to_string(), None),
    }
}

/// A completed download.
#[derive(Debug)]
pub struct Fetched {
    /// Final local path, export extension included.
    pub path: PathBuf,
    pub bytes: u64,
}

/// Download one traversal node under `destination_root`, creating
/// intermediate directories as needed. Any existing file at the final
/// path is overwritten.
pub async fn fetch(
    client: &DriveClient,
    node: &TraversalNode,
    destination_root: &Path,
) -> Result<Fetched> {
    let (dir, base_name) = split_node_path(destination_root, &node.local_path);
    let (file_name, export) = download_plan(&node.resource, &base_name);

    fs::create_dir_all(&dir)
        .await
        .map_err(|source| DriveError::Filesystem {
            path: dir.clone(),
            source,
        })?;

    let final_path = dir.join(&file_name);
    let temp_path = dir.join(format!("{}.tmp", file_name));

    let response = match export {
        Some(format) => client
            .download_export(&node.resource.id, format.mime_type)
            .await,
        None => client.download_native(&node.resource.id).await,
    }
    .map_err(as_download_failure)?;

    let written = match stream_to_file(response, &temp_path).await {
        Ok(written) => written,
        Err(e) => {
            // Never leave a half-written temp file behind.
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }
    };

    // Remove-then-rename replaces an existing destination on every
    // platform.
    let _ = fs::remove_file(&final_path).await;
    fs::rename(&temp_path, &final_path)
        .await
        .map_err(|source| DriveError::Filesystem {
            path: final_path.clone(),
            source,
        })?;

    debug!(path = %final_path.display(), written, "fetched");
    Ok(Fetched {
        path: final_path,
        bytes: written,
    })
}

/// Split a node's relative segments into (directory, file base name).
fn split_node_path(destination_root: &Path, segments: &[String]) -> (PathBuf, String) {
    let mut dir = destination_root.to_path_buf();
    let (last, parents) = segments.split_last().expect("traversal path never empty");
    for segment in parents {
        dir.push(segment);
    }
    (dir, last.clone())
}

async fn stream_to_file(response: reqwest::Response, temp_path: &Path) -> Result<u64> {
    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|source| DriveError::Filesystem {
            path: temp_path.to_path_buf(),
            source,
        })?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| as_download_failure(DriveError::HttpError(e)))?;
        file.write_all(&chunk)
            .await
            .map_err(|source| DriveError::Filesystem {
                path: temp_path.to_path_buf(),
                source,
            })?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|source| DriveError::Filesystem {
            path: temp_path.to_path_buf(),
            source,
        })?;

    Ok(written)
}

/// Collapse transport failures and remote refusals (export unsupported,
/// export size cap) into `DownloadFailed`; resource-level outcomes
/// (`NotFound`, `PermissionDenied`, `RateLimited`) keep their identity.
fn as_download_failure(error: DriveError) -> DriveError {
    match error {
        e @ (DriveError::NotFound(_)
        | DriveError::PermissionDenied(_)
        | DriveError::RateLimited
        | DriveError::Filesystem { .. }) => e,
        DriveError::ApiError { status, message } => {
            DriveError::DownloadFailed(format!("remote refused ({}): {}", status, message))
        }
        DriveError::HttpError(e) => DriveError::DownloadFailed(format!("transport: {}", e)),
        other => DriveError::DownloadFailed(other.to_string()),
    }
}

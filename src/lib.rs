//! drive_mirror - Mirror Google Drive folders and files to the local
//! filesystem.
//!
//! Given a folder/file ID or a sharing URL, this library resolves the
//! reference, walks the remote tree (shortcuts followed, cycles
//! skipped), and streams content to disk. Google Docs, Sheets and
//! Slides are exported to docx/xlsx/pptx; everything else downloads as
//! native bytes.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use drive_mirror::{mirror, Authenticator, DriveClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::from_file("service-account.json")?;
//!     let client = DriveClient::new(auth);
//!
//!     let report = mirror::copy(
//!         &client,
//!         "https://drive.google.com/drive/folders/1abc123",
//!         Path::new("./backup"),
//!         true,
//!     )
//!     .await?;
//!
//!     println!("{} copied, {} failed", report.copied(), report.failed());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod fetcher;
pub mod mirror;
pub mod models;
pub mod reference;
pub mod walker;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::{DriveApi, DriveClient, RetryPolicy};
pub use error::{DriveError, Result};
pub use models::{ResourceKind, ResourceRef};
pub use reference::extract_id;

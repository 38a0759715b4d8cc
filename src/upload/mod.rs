//! Upload relay subsystem.
//!
//! # Data Flow
//! ```text
//! POST /upload (multipart)
//!     → handler.rs (reject non-multipart / missing file)
//!     → artifact.rs (stream file part to relay-<uuid>.upload)
//!     → spawned task:
//!           downstream::client (stream artifact to /analyze)
//!           artifact removed (always)
//!     → relay JSON reply, or 500 "Failed to process file"
//! ```

pub mod artifact;
pub mod handler;

pub use artifact::{ArtifactStore, UploadArtifact, MULTIPLE_FILES, NO_FILE_UPLOADED};
pub use handler::{upload, PROCESS_FAILED};

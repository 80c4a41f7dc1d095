use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

/// Static file service for the built frontend. Unmatched paths fall back to
/// the SPA entry point so the client-side router can take over.
pub fn spa_static_service(root: &Path, index: &str) -> ServeDir<ServeFile> {
    ServeDir::new(root).fallback(ServeFile::new(root.join(index)))
}

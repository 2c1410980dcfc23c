use std::io;
use std::path::Path;

/// Creates directory (and missing parents) if it doesn't exist
///
/// # Arguments
/// * `dir` - Path to the directory
///
/// # Errors
/// Fails with `AlreadyExists` when a non-directory entry occupies `dir`,
/// or with the underlying error when creation is denied.
pub fn create_dir(dir: &Path) -> io::Result<()> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a directory", dir.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => std::fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}

/// Removes a partially written file, logging instead of failing
pub async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("Failed to remove partial file {}: {}", path.display(), e);
        }
    }
}

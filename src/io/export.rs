//! Source loading and atomic writes of universe images and the album

use crate::album::compositor::Album;
use crate::generation::client::ImageBytes;
use crate::io::error::{MultiverseError, Result, file_system};
use crate::orchestration::store::BatchSnapshot;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read the source image and make sure it decodes
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a supported image
pub fn load_source(path: &Path) -> Result<ImageBytes> {
    let bytes = std::fs::read(path).map_err(file_system(path, "read source image"))?;
    let image = ImageBytes::from(bytes);
    image.decode().map_err(|source| MultiverseError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image)
}

/// Write `bytes` to `dir/filename` without ever leaving a partial file
///
/// The data goes to a temporary file in the same directory, which is then
/// renamed over the destination.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or any write fails
pub fn write_atomic(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(file_system(dir, "create directory"))?;

    let destination = dir.join(filename);
    let mut staged =
        tempfile::NamedTempFile::new_in(dir).map_err(file_system(dir, "create temporary file"))?;
    staged
        .write_all(bytes)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(file_system(staged.path(), "write temporary file"))?;
    staged
        .persist(&destination)
        .map_err(|persist| file_system(&destination, "rename into place")(persist.error))?;

    debug!(path = %destination.display(), bytes = bytes.len(), "written");
    Ok(destination)
}

/// File name for one universe image, using the extension of its encoding
pub fn universe_filename(key: &str, image: &ImageBytes) -> String {
    let extension = image
        .format()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png");
    format!("{key}.{extension}")
}

/// Write every successfully generated image of the snapshot to `dir`
///
/// # Errors
///
/// Returns an error on the first file that cannot be written
pub fn export_universe_images(dir: &Path, snapshot: &BatchSnapshot) -> Result<Vec<PathBuf>> {
    snapshot
        .tasks
        .iter()
        .filter_map(|(id, state)| state.result().map(|image| (id, image)))
        .map(|(id, image)| {
            write_atomic(dir, &universe_filename(id.as_str(), image), image.as_bytes())
        })
        .collect()
}

/// Write the album under its suggested file name
///
/// # Errors
///
/// Returns an error if the file cannot be written
pub fn export_album(dir: &Path, album: &Album) -> Result<PathBuf> {
    write_atomic(dir, &album.filename, &album.bytes)
}

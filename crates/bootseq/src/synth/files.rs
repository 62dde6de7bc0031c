use std::fs::DirBuilder;
use std::io::{self, Write};

use camino::Utf8Path;
use tempfile::Builder;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::errors::WriteError;

/// Writes `contents` to `path` through a temporary sibling and a rename.
///
/// Data is flushed and fsync'd before the temporary file is renamed into
/// place so the server never observes a partially written document. The file
/// carries credentials, so it is created readable by its owner only.
pub(super) fn atomic_write(path: &Utf8Path, contents: &[u8]) -> Result<(), WriteError> {
    let directory = document_directory(path).ok_or_else(|| WriteError::MissingParent {
        path: path.to_path_buf(),
    })?;

    let mut dirs = DirBuilder::new();
    dirs.recursive(true);
    dirs.create(directory.as_std_path())
        .map_err(|source| WriteError::CreateDirectory {
            path: directory.to_path_buf(),
            source,
        })?;

    persist(path, directory, contents).map_err(|source| WriteError::Persist {
        path: path.to_path_buf(),
        source,
    })
}

/// Directory holding `path`; a bare file name lives in the working directory.
fn document_directory(path: &Utf8Path) -> Option<&Utf8Path> {
    match path.parent() {
        Some(parent) if parent.as_str().is_empty() => Some(Utf8Path::new(".")),
        other => other,
    }
}

fn persist(path: &Utf8Path, directory: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let mut builder = Builder::new();
    builder.prefix(path.file_name().unwrap_or("bootseq"));
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        builder.permissions(Permissions::from_mode(0o600));
    }

    let mut file = builder.tempfile_in(directory.as_std_path())?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path.as_std_path())
        .map_err(|error| error.error)?;
    Ok(())
}

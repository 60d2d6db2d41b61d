use std::fs::{File, Metadata};
use std::path::Path;
use std::time::UNIX_EPOCH;

use super::BuildError;

/// An in-memory build context holding a single Dockerfile.
#[derive(Debug)]
pub struct BuildArchive {
    entry_name: String,
    bytes: Vec<u8>,
}

impl BuildArchive {
    /// Pack the file at `path` under its base name, copying size, mode and
    /// modification time from the file's metadata.
    pub fn from_dockerfile(path: &Path) -> Result<Self, BuildError> {
        let open_err = |source| BuildError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_err)?;
        let metadata = file.metadata().map_err(open_err)?;
        if !metadata.is_file() {
            return Err(BuildError::NotAFile(path.to_path_buf()));
        }

        let entry_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| BuildError::NotAFile(path.to_path_buf()))?;

        let mut header = tar::Header::new_gnu();
        header.set_path(&entry_name).map_err(BuildError::Archive)?;
        header.set_size(metadata.len());
        header.set_mode(file_mode(&metadata));
        if let Some(mtime) = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        {
            header.set_mtime(mtime.as_secs());
        }
        header.set_cksum();

        let mut builder = tar::Builder::new(Vec::new());
        builder.append(&header, file).map_err(BuildError::Archive)?;
        let bytes = builder.into_inner().map_err(BuildError::Archive)?;

        Ok(Self { entry_name, bytes })
    }

    /// Name of the Dockerfile inside the archive.
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &Metadata) -> u32 {
    0o600
}

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::build::BuildSpec;
use crate::config::Config;
use crate::docker::{ContainerSpec, MountSpec, normalize_tag};
use crate::error::PreconditionError;

/// Build the image spec: the configured Dockerfile, relative to `work_dir`.
pub fn build_spec(cfg: &Config, work_dir: &Path) -> BuildSpec {
    BuildSpec::new(work_dir.join(&cfg.dockerfile), cfg.image_tag.clone())
}

/// Build the container spec for `image` with `host_mount` bound at the
/// configured container path.
pub fn container_spec(cfg: &Config, image: &str, host_mount: &Path) -> ContainerSpec {
    ContainerSpec {
        image: normalize_tag(image),
        command: cfg.command.args().to_vec(),
        tty: cfg.interactive,
        stdin_attached: cfg.interactive,
        mounts: vec![MountSpec::bind(host_mount, cfg.container_mount.clone())],
        auto_remove: cfg.remove,
    }
}

/// Resolve the configured mount source to an absolute directory that exists.
pub fn resolve_mount(cfg: &Config, work_dir: &Path) -> Result<PathBuf, PreconditionError> {
    let path = work_dir.join(&cfg.host_mount);
    let resolved = match std::fs::canonicalize(&path) {
        Ok(p) => p,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PreconditionError::MountMissing(path));
        }
        Err(source) => return Err(PreconditionError::MountUnresolvable { path, source }),
    };
    if !resolved.is_dir() {
        return Err(PreconditionError::MountNotADirectory(resolved));
    }
    Ok(resolved)
}

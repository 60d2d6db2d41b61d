// Configuration — `.labrun` dotfile with command-line overrides.

mod loader;
mod types;

use std::path::{Path, PathBuf};

pub use loader::CONFIG_FILE;
pub use types::{Command, Config};

/// Values given on the command line; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub dockerfile: Option<String>,
    pub image_tag: Option<String>,
    pub host_mount: Option<String>,
    pub container_mount: Option<String>,
    pub command: Option<Command>,
    pub platform: Option<String>,
    pub remove: bool,
    pub batch: bool,
}

/// Load the config for `dir` and apply `overrides` on top.
///
/// An explicit config file must exist; the `.labrun` dotfile is optional.
pub fn load(dir: &Path, overrides: Overrides) -> anyhow::Result<Config> {
    let mut cfg = match &overrides.config_file {
        Some(path) => Config::load_file(&dir.join(path))?,
        None => Config::load(dir)?.unwrap_or_default(),
    };

    if let Some(dockerfile) = overrides.dockerfile {
        cfg.dockerfile = dockerfile;
    }
    if let Some(tag) = overrides.image_tag {
        cfg.image_tag = tag;
    }
    if let Some(host) = overrides.host_mount {
        cfg.host_mount = host;
    }
    if let Some(target) = overrides.container_mount {
        cfg.container_mount = target;
    }
    if let Some(command) = overrides.command {
        cfg.command = command;
    }
    if overrides.platform.is_some() {
        cfg.platform = overrides.platform;
    }
    cfg.remove |= overrides.remove;
    if overrides.batch {
        cfg.interactive = false;
    }

    Ok(cfg)
}

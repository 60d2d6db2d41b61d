use std::path::PathBuf;

use clap::Parser;

use labrun::config::{Command, Overrides};

#[derive(Parser, Debug)]
#[command(
    name = "labrun",
    version,
    about = "Build a Dockerfile and open a shell in it with a host directory mounted"
)]
pub struct Cli {
    /// Config file (defaults to `.labrun` in the working directory)
    #[arg(short = 'c', long, env = "LABRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Dockerfile to build
    #[arg(short = 'f', long, env = "LABRUN_DOCKERFILE")]
    pub dockerfile: Option<String>,

    /// Tag for the built image
    #[arg(short = 't', long, env = "LABRUN_TAG")]
    pub tag: Option<String>,

    /// Host directory to bind-mount
    #[arg(short = 'm', long, env = "LABRUN_MOUNT")]
    pub mount: Option<String>,

    /// Mount point inside the container
    #[arg(long, env = "LABRUN_TARGET")]
    pub target: Option<String>,

    /// Platform for image pulls, e.g. linux/amd64
    #[arg(long, env = "LABRUN_PLATFORM")]
    pub platform: Option<String>,

    /// Remove the container when it exits
    #[arg(long)]
    pub rm: bool,

    /// Run to completion and print the logs instead of attaching the terminal
    #[arg(long)]
    pub batch: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Command to run inside the container
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config.clone(),
            dockerfile: self.dockerfile.clone(),
            image_tag: self.tag.clone(),
            host_mount: self.mount.clone(),
            container_mount: self.target.clone(),
            command: (!self.command.is_empty()).then(|| Command::new(self.command.clone())),
            platform: self.platform.clone(),
            remove: self.rm,
            batch: self.batch,
        }
    }
}

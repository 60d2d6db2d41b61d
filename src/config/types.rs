use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// The command run inside the container.
///
/// Accepts either a shell-style string (`"/bin/sh -l"`) or a list of
/// arguments in config files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(Vec<String>);

impl Command {
    pub fn new(args: Vec<String>) -> Self {
        Self(args)
    }

    /// Split `line` with POSIX shell quoting rules.
    pub fn parse(line: &str) -> Result<Self, shell_words::ParseError> {
        shell_words::split(line).map(Self)
    }

    pub fn args(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Command {
    fn default() -> Self {
        Self(vec!["/bin/sh".to_string()])
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::join(&self.0))
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CommandVisitor;

        impl<'de> Visitor<'de> for CommandVisitor {
            type Value = Command;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a command string or a list of arguments")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Command, E> {
                let command = Command::parse(value).map_err(E::custom)?;
                if command.is_empty() {
                    return Err(E::custom("command must not be empty"));
                }
                Ok(command)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Command, A::Error> {
                let mut args = Vec::new();
                while let Some(arg) = seq.next_element::<String>()? {
                    args.push(arg);
                }
                if args.is_empty() {
                    return Err(de::Error::custom("command must not be empty"));
                }
                Ok(Command(args))
            }
        }

        deserializer.deserialize_any(CommandVisitor)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Dockerfile to build, relative to the working directory.
    pub dockerfile: String,
    pub image_tag: String,
    /// Host directory bind-mounted into the container.
    pub host_mount: String,
    pub container_mount: String,
    pub command: Command,
    /// Attach the terminal. When false the container runs to completion and
    /// its logs are printed.
    pub interactive: bool,
    /// Platform for image pulls, e.g. `linux/amd64`.
    pub platform: Option<String>,
    /// Remove the container once it exits.
    pub remove: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dockerfile: "dockers/Dockerfile.work".to_string(),
            image_tag: "lab:latest".to_string(),
            host_mount: ".".to_string(),
            container_mount: "/lab".to_string(),
            command: Command::default(),
            interactive: true,
            platform: None,
            remove: false,
        }
    }
}

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::command::Invocation;

pub const PLAN_VERSION: u32 = 1;
pub const DEFAULT_TARGETS: &[&str] = &["x86_64-apple-darwin"];
pub const DEFAULT_LIBRARY: &str = "hedera";
pub const DEFAULT_TOOLCHAIN: &str = "cargo";
pub const DEFAULT_DESTINATION: &str = "./hedera-sdk-go/libs";

/// Opaque compilation target name such as `x86_64-apple-darwin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetTriple(String);

impl TargetTriple {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetTriple {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TargetTriple {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    AddTarget,
    Compile,
    CreateDir,
    Copy,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::AddTarget => "add-target",
            Step::Compile => "compile",
            Step::CreateDir => "mkdir",
            Step::Copy => "copy",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: Step,
    pub invocation: Invocation,
}

/// Which targets to build and where their archives are staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    pub version: u32,
    #[serde(default = "default_library")]
    pub library: String,
    #[serde(default = "default_toolchain")]
    pub toolchain: String,
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default)]
    pub add_targets: bool,
    pub targets: Vec<TargetTriple>,
}

fn default_library() -> String {
    DEFAULT_LIBRARY.to_string()
}

fn default_toolchain() -> String {
    DEFAULT_TOOLCHAIN.to_string()
}

fn default_destination() -> String {
    DEFAULT_DESTINATION.to_string()
}

impl Default for StagePlan {
    fn default() -> Self {
        Self {
            version: PLAN_VERSION,
            library: default_library(),
            toolchain: default_toolchain(),
            destination: default_destination(),
            add_targets: false,
            targets: DEFAULT_TARGETS.iter().copied().map(TargetTriple::from).collect(),
        }
    }
}

impl StagePlan {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read stage plan: {}", path.display()))?;
        let plan: StagePlan = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse stage plan YAML: {}", path.display()))?;
        Ok(plan)
    }

    pub fn with_targets<I, T>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TargetTriple>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn archive_name(&self) -> String {
        format!("lib{}.a", self.library)
    }

    pub fn source_archive(&self, target: &TargetTriple) -> String {
        format!("target/{}/release/{}", target, self.archive_name())
    }

    pub fn destination_dir(&self, target: &TargetTriple) -> String {
        format!("{}/{}", self.destination.trim_end_matches('/'), target)
    }

    pub fn destination_archive(&self, target: &TargetTriple) -> String {
        format!("{}/{}", self.destination_dir(target), self.archive_name())
    }

    /// The commands run for one target, in execution order.
    pub fn steps(&self, target: &TargetTriple) -> Vec<PlannedStep> {
        let mut steps = Vec::with_capacity(4);
        if self.add_targets {
            steps.push(PlannedStep {
                step: Step::AddTarget,
                invocation: Invocation::new("rustup").args(["target", "add", target.as_str()]),
            });
        }
        steps.push(PlannedStep {
            step: Step::Compile,
            invocation: Invocation::new(self.toolchain.as_str()).args([
                "build",
                "--release",
                "--target",
                target.as_str(),
            ]),
        });
        steps.push(PlannedStep {
            step: Step::CreateDir,
            invocation: Invocation::new("mkdir")
                .arg("-p")
                .arg(self.destination_dir(target)),
        });
        steps.push(PlannedStep {
            step: Step::Copy,
            invocation: Invocation::new("cp")
                .arg(self.source_archive(target))
                .arg(self.destination_archive(target)),
        });
        steps
    }
}

/// Render `plan` as YAML into `destination`, creating parent directories.
pub fn write_plan(plan: &StagePlan, destination: &Path) -> Result<PathBuf> {
    let rendered = serde_yaml::to_string(plan)?;
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(destination, rendered)
        .with_context(|| format!("Failed to write stage plan: {}", destination.display()))?;

    Ok(destination.to_path_buf())
}

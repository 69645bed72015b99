use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::plan::{StagePlan, TargetTriple};

/// Record of the archives produced by a successful staging run.
#[derive(Debug, Serialize, Deserialize)]
pub struct StagingManifest {
    pub generated_at: DateTime<Utc>,
    pub library: String,
    pub destination: String,
    pub artifacts: Vec<StagedArtifact>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StagedArtifact {
    pub target: String,
    pub path: String,
    pub bytes: u64,
    pub sha256: String,
}

/// Describe the staged archive of every target. Repeated targets appear once.
pub fn build_manifest(plan: &StagePlan, targets: &[TargetTriple]) -> Result<StagingManifest> {
    let mut seen = HashSet::new();
    let mut artifacts = Vec::with_capacity(targets.len());

    for target in targets {
        if !seen.insert(target) {
            continue;
        }
        let path = plan.destination_archive(target);
        let metadata = fs::metadata(&path)
            .with_context(|| format!("Failed to inspect staged archive: {path}"))?;
        artifacts.push(StagedArtifact {
            target: target.to_string(),
            sha256: compute_sha256(Path::new(&path))?,
            bytes: metadata.len(),
            path,
        });
    }

    Ok(StagingManifest {
        generated_at: Utc::now(),
        library: plan.library.clone(),
        destination: plan.destination.clone(),
        artifacts,
    })
}

pub fn write_manifest(manifest: &StagingManifest, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create manifest directory: {}", parent.display())
        })?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create manifest: {}", path.display()))?;
    serde_yaml::to_writer(file, manifest)
        .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
    Ok(())
}

/// Compute the SHA256 digest of the file at `path` and return it as a hex string.
pub fn compute_sha256(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

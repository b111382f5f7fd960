//! Legacy key mappings.
//!
//! Java trees carry several `mappings/*.json` files mapping current language
//! keys to their pre-flattening names. They are merged in file-name order
//! (later files win on collisions) and the result is persisted next to them
//! so builds can load one file.

use packsmith_pack::KeyMapping;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ModulesError, ModulesResult};

pub const MAPPINGS_DIR: &str = "mappings";
pub const MERGED_MAPPING_FILE: &str = "all_mappings";

/// Returns true when the tree has a mappings directory at all.
pub async fn has_mappings(root: &Path) -> bool {
    tokio::fs::metadata(root.join(MAPPINGS_DIR))
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Merges every mapping file and persists the result to
/// `mappings/all_mappings`. A tree without a mappings directory yields an
/// empty mapping and writes nothing.
pub async fn merge_mappings(root: &Path) -> ModulesResult<KeyMapping> {
    let dir = root.join(MAPPINGS_DIR);
    if !has_mappings(root).await {
        debug!("No {} directory in {}", MAPPINGS_DIR, root.display());
        return Ok(KeyMapping::new());
    }

    let merged = collect(&dir).await?;
    let target = dir.join(MERGED_MAPPING_FILE);
    let staging = dir.join(format!(".{MERGED_MAPPING_FILE}.tmp"));
    let data = serde_json::to_vec(&merged).map_err(|e| ModulesError::Mapping {
        path: target.clone(),
        reason: e.to_string(),
    })?;
    tokio::fs::write(&staging, data)
        .await
        .map_err(|e| ModulesError::io(&staging, e))?;
    tokio::fs::rename(&staging, &target)
        .await
        .map_err(|e| ModulesError::io(&target, e))?;

    info!("Merged {} legacy mappings into {}", merged.len(), target.display());
    Ok(merged)
}

/// Loads the persisted mapping, merging in memory when it has not been
/// written yet.
pub async fn load_mapping(root: &Path) -> ModulesResult<KeyMapping> {
    let path = root.join(MAPPINGS_DIR).join(MERGED_MAPPING_FILE);
    match tokio::fs::read(&path).await {
        Ok(data) => parse(&path, &data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if has_mappings(root).await {
                collect(&root.join(MAPPINGS_DIR)).await
            } else {
                Ok(KeyMapping::new())
            }
        }
        Err(e) => Err(ModulesError::io(path, e)),
    }
}

async fn collect(dir: &Path) -> ModulesResult<KeyMapping> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ModulesError::io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ModulesError::io(dir, e))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut merged = KeyMapping::new();
    for path in files {
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| ModulesError::io(&path, e))?;
        merged.extend(parse(&path, &data)?);
    }
    Ok(merged)
}

fn parse(path: &Path, data: &[u8]) -> ModulesResult<KeyMapping> {
    serde_json::from_slice(data).map_err(|e| ModulesError::Mapping {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

use crate::persist::Collection;
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DATA_PREFIX: &str = "data/";
const IMAGES_PREFIX: &str = "images/";
pub const BUNDLE_FORMAT_V1: &str = "gradebook-data-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    version: u32,
    app_version: String,
    exported_at: DateTime<Utc>,
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    name: String,
    size: u64,
    sha256: String,
}

fn sha256_file(path: &Path) -> anyhow::Result<(String, u64)> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open {}", path.to_string_lossy()))?;
    let mut hasher = Sha256::new();
    let size = std::io::copy(&mut f, &mut hasher)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    Ok((format!("{:x}", hasher.finalize()), size))
}

/// Every file under `dir`, as `(path, "a/b/c")` with forward slashes.
fn walk_files(dir: &Path, prefix: &str, out: &mut Vec<(PathBuf, String)>) -> anyhow::Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.to_string_lossy()))?
        .collect::<Result<Vec<_>, _>>()?;
    // Deterministic bundle layout.
    entries.sort_by_key(|e| e.file_name());
    for ent in entries {
        let p = ent.path();
        let Some(name) = p.file_name().and_then(|s| s.to_str()).map(|s| s.to_string()) else {
            continue;
        };
        let rel = format!("{}{}", prefix, name);
        if p.is_dir() {
            walk_files(&p, &format!("{}/", rel), out)?;
        } else if p.is_file() {
            out.push((p, rel));
        }
    }
    Ok(())
}

/// Zips the collection files and image tree of `data_dir` into `out_path`.
pub fn export_data_bundle(data_dir: &Path, out_path: &Path) -> anyhow::Result<ExportSummary> {
    if !data_dir.is_dir() {
        return Err(anyhow!(
            "data directory not found: {}",
            data_dir.to_string_lossy()
        ));
    }

    let mut files: Vec<(PathBuf, String)> = Vec::new();
    for c in Collection::ALL {
        let p = data_dir.join(c.file_name());
        if p.is_file() {
            files.push((p, format!("{}{}", DATA_PREFIX, c.file_name())));
        }
    }
    let images_dir = data_dir.join("images");
    if images_dir.is_dir() {
        walk_files(&images_dir, IMAGES_PREFIX, &mut files)?;
    }

    let mut entries = Vec::with_capacity(files.len());
    for (path, name) in &files {
        let (sha256, size) = sha256_file(path)?;
        entries.push(ManifestEntry {
            name: name.clone(),
            size,
            sha256,
        });
    }

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = Manifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        version: 1,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: Utc::now(),
        entries,
    };
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (path, name) in &files {
        zip.start_file(name.as_str(), opts)
            .with_context(|| format!("failed to start entry {}", name))?;
        let mut f = File::open(path)
            .with_context(|| format!("failed to open {}", path.to_string_lossy()))?;
        std::io::copy(&mut f, &mut zip).with_context(|| format!("failed to write entry {}", name))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;
    tracing::info!(
        out = %out_path.to_string_lossy(),
        entries = files.len(),
        "data bundle exported"
    );

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: files.len() + 1,
    })
}

/// Maps a bundle entry name to its path under the data directory, refusing
/// anything that could land outside it.
fn entry_target(root: &Path, name: &str) -> anyhow::Result<PathBuf> {
    let rel = if let Some(rest) = name.strip_prefix(DATA_PREFIX) {
        PathBuf::from(rest)
    } else if name.starts_with(IMAGES_PREFIX) {
        PathBuf::from(name)
    } else {
        bail!("unexpected bundle entry: {}", name);
    };
    if rel.as_os_str().is_empty()
        || !rel.components().all(|c| matches!(c, Component::Normal(_)))
    {
        bail!("unsafe bundle entry name: {}", name);
    }
    Ok(root.join(rel))
}

fn sibling(dir: &Path, suffix: &str) -> anyhow::Result<PathBuf> {
    let name = dir
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("invalid data directory {}", dir.to_string_lossy()))?;
    Ok(dir.with_file_name(format!("{}.{}", name, suffix)))
}

/// Restores a bundle into `data_dir`. The bundle is extracted and verified in
/// a staging sibling first; the live directory is only replaced once every
/// entry checks out.
pub fn import_data_bundle(in_path: &Path, data_dir: &Path) -> anyhow::Result<ImportSummary> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: Manifest =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid")?;
    if manifest.format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", manifest.format));
    }

    let staging = sibling(data_dir, "importing")?;
    if staging.exists() {
        fs::remove_dir_all(&staging).with_context(|| {
            format!("failed to clear staging {}", staging.to_string_lossy())
        })?;
    }
    fs::create_dir_all(staging.join("images"))
        .with_context(|| format!("failed to create staging {}", staging.to_string_lossy()))?;

    if let Err(e) = extract_entries(&mut archive, &manifest, &staging) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    let previous = sibling(data_dir, "previous")?;
    if previous.exists() {
        fs::remove_dir_all(&previous).with_context(|| {
            format!("failed to remove {}", previous.to_string_lossy())
        })?;
    }
    if data_dir.exists() {
        fs::rename(data_dir, &previous).with_context(|| {
            format!(
                "failed to move existing data directory {}",
                data_dir.to_string_lossy()
            )
        })?;
    }
    fs::rename(&staging, data_dir).with_context(|| {
        format!(
            "failed to move restored data to {}",
            data_dir.to_string_lossy()
        )
    })?;
    if previous.exists() {
        if let Err(e) = fs::remove_dir_all(&previous) {
            tracing::warn!(error = %e, "could not remove previous data directory");
        }
    }

    tracing::info!(
        bundle = %in_path.to_string_lossy(),
        entries = manifest.entries.len(),
        "data bundle imported"
    );
    Ok(ImportSummary {
        bundle_format_detected: manifest.format,
        entry_count: manifest.entries.len(),
    })
}

fn extract_entries(
    archive: &mut ZipArchive<File>,
    manifest: &Manifest,
    staging: &Path,
) -> anyhow::Result<()> {
    for entry in &manifest.entries {
        let target = entry_target(staging, &entry.name)?;
        let mut file = archive
            .by_name(&entry.name)
            .with_context(|| format!("bundle missing {}", entry.name))?;
        // Declared size is checked before anything is read.
        if file.size() != entry.size {
            bail!(
                "size mismatch for {}: manifest {} bytes, bundle {} bytes",
                entry.name,
                entry.size,
                file.size()
            );
        }
        let mut bytes = Vec::new();
        (&mut file)
            .take(entry.size.saturating_add(1))
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {}", entry.name))?;
        drop(file);

        let digest = format!("{:x}", Sha256::digest(&bytes));
        if digest != entry.sha256 || bytes.len() as u64 != entry.size {
            bail!("checksum mismatch for {}", entry.name);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.to_string_lossy()))?;
        }
        let mut out = File::create(&target)
            .with_context(|| format!("failed to create {}", target.to_string_lossy()))?;
        out.write_all(&bytes)
            .with_context(|| format!("failed to write {}", target.to_string_lossy()))?;
        out.flush()
            .with_context(|| format!("failed to flush {}", target.to_string_lossy()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_targets_stay_inside_root() {
        let root = Path::new("/tmp/staging");
        assert_eq!(
            entry_target(root, "data/classes.json").expect("data entry"),
            root.join("classes.json")
        );
        assert_eq!(
            entry_target(root, "images/abc/page.png").expect("image entry"),
            root.join("images/abc/page.png")
        );
        assert!(entry_target(root, "images/../../etc/passwd").is_err());
        assert!(entry_target(root, "data/").is_err());
        assert!(entry_target(root, "other/file").is_err());
    }
}

//! Workspace bundles: a zip holding `manifest.json` and the sqlite database.
//! A bare sqlite file is accepted on import as a legacy backup.

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const WORKSPACE_DB: &str = "attendd.sqlite3";
const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/attendd.sqlite3";
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
pub const BUNDLE_FORMAT_V1: &str = "attendd-workspace-v1";
pub const LEGACY_SQLITE_FORMAT: &str = "legacy-sqlite3";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    version: u32,
    #[serde(default)]
    app_version: Option<String>,
    #[serde(default)]
    exported_at: Option<String>,
    #[serde(default)]
    source_workspace: Option<String>,
    db_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub db_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn put_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
) -> anyhow::Result<()> {
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(name, opts)
        .with_context(|| format!("failed to start bundle entry {name}"))?;
    zip.write_all(bytes)
        .with_context(|| format!("failed to write bundle entry {name}"))
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> anyhow::Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("bundle has no {name}"))?;
    let mut buf = Vec::new();
    entry
        .read_to_end(&mut buf)
        .with_context(|| format!("failed to read bundle entry {name}"))?;
    Ok(buf)
}

pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let db_path = workspace_path.join(WORKSPACE_DB);
    if !db_path.is_file() {
        bail!("no workspace database at {}", db_path.display());
    }
    let db_bytes = std::fs::read(&db_path)
        .with_context(|| format!("failed to read {}", db_path.display()))?;

    let manifest = Manifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        version: 1,
        app_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        exported_at: Some(chrono::Utc::now().to_rfc3339()),
        source_workspace: Some(workspace_path.to_string_lossy().into_owned()),
        db_sha256: sha256_hex(&db_bytes),
    };
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("failed to encode manifest")?;

    if let Some(dir) = out_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let file = File::create(out_path)
        .with_context(|| format!("failed to create bundle {}", out_path.display()))?;
    let mut zip = ZipWriter::new(file);
    put_entry(&mut zip, MANIFEST_ENTRY, &manifest_bytes)?;
    put_entry(&mut zip, DB_ENTRY, &db_bytes)?;
    zip.finish().context("failed to finish bundle")?;

    Ok(ExportSummary {
        bundle_format: manifest.format,
        entry_count: 2,
        db_sha256: manifest.db_sha256,
    })
}

/// Restores a workspace database from a bundle, or from a bare sqlite file.
/// The bundled database is extracted beside the live one and only replaces
/// it once its checksum matches the manifest.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path)
        .with_context(|| format!("failed to create workspace {}", workspace_path.display()))?;
    let dst = workspace_path.join(WORKSPACE_DB);

    if !is_zip_file(in_path)? {
        std::fs::copy(in_path, &dst).with_context(|| {
            format!("failed to copy {} to {}", in_path.display(), dst.display())
        })?;
        return Ok(ImportSummary {
            bundle_format_detected: LEGACY_SQLITE_FORMAT.to_string(),
        });
    }

    let file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.display()))?;
    let mut archive = ZipArchive::new(file).context("bundle is not a readable zip")?;

    let manifest: Manifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)
        .context("manifest.json is malformed")?;
    if manifest.format != BUNDLE_FORMAT_V1 {
        bail!("unsupported bundle format: {}", manifest.format);
    }

    let db_bytes = read_entry(&mut archive, DB_ENTRY)?;
    let expected = manifest.db_sha256.to_ascii_lowercase();
    let actual = sha256_hex(&db_bytes);
    if actual != expected {
        return Err(anyhow!(
            "database checksum mismatch: manifest {expected}, bundle {actual}"
        ));
    }

    let staged = workspace_path.join(format!("{WORKSPACE_DB}.importing"));
    std::fs::write(&staged, &db_bytes)
        .with_context(|| format!("failed to stage {}", staged.display()))?;
    if let Err(e) = std::fs::rename(&staged, &dst) {
        let _ = std::fs::remove_file(&staged);
        return Err(e).with_context(|| format!("failed to replace {}", dst.display()));
    }

    Ok(ImportSummary {
        bundle_format_detected: manifest.format,
    })
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut magic = [0u8; 4];
    let n = File::open(path)
        .and_then(|mut f| f.read(&mut magic))
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(n == magic.len() && magic == ZIP_MAGIC)
}

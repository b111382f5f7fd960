//! Reference assembler producing deterministic zip archives.
//!
//! Layers are applied in order: base pack, then each resource module, then
//! overlays. Plain files from later layers replace earlier ones; the
//! language file is merged key by key instead.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::assembler::{Assembled, AssemblyInput, LanguageFormat, OutputDirective, PackAssembler};
use crate::error::{AssemblyError, AssemblyResult};

/// Per-module descriptor file. Never copied into the output.
pub const MODULE_MANIFEST: &str = "module_manifest.json";

const PACK_META: &str = "pack.mcmeta";

type Language = BTreeMap<String, String>;

/// Assembler that walks directories on disk and writes a zip archive.
///
/// All filesystem and compression work runs on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipAssembler;

impl ZipAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous assembly. Used by [`PackAssembler::assemble`] from a
    /// blocking task.
    pub fn assemble_blocking(input: &AssemblyInput) -> AssemblyResult<Assembled> {
        let directive = &input.directive;
        let mut log = Vec::new();
        let mut entries: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut language = Language::new();

        if !input.base.is_dir() {
            return Err(AssemblyError::MissingBase(input.base.clone()));
        }
        layer_dir(&input.base, directive, &mut entries, &mut language)?;

        for module in &input.modules {
            if !module.dir.is_dir() {
                return Err(AssemblyError::MissingModule(module.dir.clone()));
            }
            layer_dir(&module.dir, directive, &mut entries, &mut language)?;
            log.push(format!("Applied module {}.", module.name));
        }

        for overlay in &input.overlays {
            let data = std::fs::read(overlay)?;
            let format = LanguageFormat::from_path(&overlay.to_string_lossy());
            let parsed = parse_language(&data, format, overlay)?;
            log.push(format!(
                "Merged {} entries from {}.",
                parsed.len(),
                overlay.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            ));
            language.extend(parsed);
        }

        if let Some(mapping) = &directive.mapping {
            let before = language.len();
            language = language
                .into_iter()
                .filter_map(|(key, value)| mapping.get(&key).map(|legacy| (legacy.clone(), value)))
                .collect();
            log.push(format!(
                "Mapped {} of {} keys to legacy names.",
                language.len(),
                before
            ));
        }

        entries.insert(
            directive.target_language.to_string(),
            render_language(&language, directive.format)?,
        );

        if let Some(pack_format) = directive.pack_format {
            let meta = entries.get(PACK_META).map(Vec::as_slice);
            let rewritten = rewrite_pack_format(meta, pack_format)?;
            entries.insert(PACK_META.to_string(), rewritten);
            log.push(format!("Set pack_format to {pack_format}."));
        }

        let bytes = write_archive(&entries)?;
        debug!(
            "Assembled {} archive: {} entries, {} bytes",
            input.platform,
            entries.len(),
            bytes.len()
        );
        log.push(format!("Wrote {} entries.", entries.len()));
        Ok(Assembled { bytes, log })
    }
}

#[async_trait]
impl PackAssembler for ZipAssembler {
    async fn assemble(&self, input: AssemblyInput) -> AssemblyResult<Assembled> {
        tokio::task::spawn_blocking(move || Self::assemble_blocking(&input))
            .await
            .map_err(|e| AssemblyError::Task(e.to_string()))?
    }
}

/// Copies every regular file under `dir` into `entries`, merging the
/// directive's language file into `language`.
fn layer_dir(
    dir: &Path,
    directive: &OutputDirective,
    entries: &mut BTreeMap<String, Vec<u8>>,
    language: &mut Language,
) -> AssemblyResult<()> {
    for (rel, path) in walk(dir)? {
        if rel == MODULE_MANIFEST {
            continue;
        }
        let data = std::fs::read(&path)?;
        if rel == directive.source_language {
            let format = LanguageFormat::from_path(directive.source_language);
            language.extend(parse_language(&data, format, &path)?);
        } else {
            entries.insert(rel, data);
        }
    }
    Ok(())
}

/// Lists regular files below `root` as (`/`-separated relative path, absolute
/// path), sorted. Hidden entries are skipped.
fn walk(root: &Path) -> AssemblyResult<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                let rel = path
                    .strip_prefix(root)
                    .map_err(|e| AssemblyError::Other(e.to_string()))?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push((rel, path));
            }
        }
    }
    out.sort();
    Ok(out)
}

fn parse_language(data: &[u8], format: LanguageFormat, path: &Path) -> AssemblyResult<Language> {
    match format {
        LanguageFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_slice(data).map_err(|source| AssemblyError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            let object = value
                .as_object()
                .ok_or_else(|| AssemblyError::InvalidOverlay(path.to_path_buf()))?;
            object
                .iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => Ok((k.clone(), s.clone())),
                    _ => Err(AssemblyError::InvalidOverlay(path.to_path_buf())),
                })
                .collect()
        }
        LanguageFormat::Lang => Ok(String::from_utf8_lossy(data)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.to_string()))
            .collect()),
    }
}

fn render_language(language: &Language, format: LanguageFormat) -> AssemblyResult<Vec<u8>> {
    match format {
        LanguageFormat::Json => serde_json::to_vec_pretty(language).map_err(|source| {
            AssemblyError::Json {
                path: PathBuf::from("<language>"),
                source,
            }
        }),
        LanguageFormat::Lang => {
            let mut out = String::new();
            for (key, value) in language {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
            Ok(out.into_bytes())
        }
    }
}

fn rewrite_pack_format(meta: Option<&[u8]>, pack_format: u32) -> AssemblyResult<Vec<u8>> {
    let mut value = match meta {
        Some(data) => serde_json::from_slice(data).map_err(|source| AssemblyError::Json {
            path: PathBuf::from(PACK_META),
            source,
        })?,
        None => serde_json::json!({ "pack": { "description": "" } }),
    };
    let pack = value
        .as_object_mut()
        .ok_or_else(|| AssemblyError::Other(format!("{PACK_META} is not an object")))?
        .entry("pack")
        .or_insert_with(|| serde_json::json!({}));
    let pack = pack
        .as_object_mut()
        .ok_or_else(|| AssemblyError::Other(format!("{PACK_META} `pack` is not an object")))?;
    pack.insert("pack_format".into(), pack_format.into());
    serde_json::to_vec_pretty(&value).map_err(|source| AssemblyError::Json {
        path: PathBuf::from(PACK_META),
        source,
    })
}

/// Writes entries in name order with fixed timestamps so equal inputs give
/// equal bytes.
fn write_archive(entries: &BTreeMap<String, Vec<u8>>) -> AssemblyResult<Vec<u8>> {
    let buf = std::io::Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(buf);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    for (name, data) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }

    let finished = zip.finish()?;
    Ok(finished.into_inner())
}

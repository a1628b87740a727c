//! Allow-listed local filesystem access.
//!
//! Every path a filesystem tool touches goes through [`AllowList::resolve`]
//! first: the path is made absolute, symlinks are resolved, and the result
//! must sit under one of the configured roots.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use ignore::WalkBuilder;
use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::dispatch::ToolError;

/// Canonical directory roots outside which nothing is touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    roots: Vec<PathBuf>,
}

impl AllowList {
    /// Canonicalize the given roots; roots that do not exist are dropped.
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut canonical = Vec::new();
        for root in roots {
            match root.canonicalize() {
                Ok(path) if path.is_dir() => {
                    if !canonical.contains(&path) {
                        canonical.push(path);
                    }
                }
                Ok(path) => warn!(root = %path.display(), "allow-list root is not a directory, ignoring"),
                Err(e) => warn!(root = %root.display(), error = %e, "allow-list root unavailable, ignoring"),
            }
        }
        Self { roots: canonical }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// `path` must already be canonical.
    pub fn contains(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }

    /// Resolve a caller-supplied path to its absolute, symlink-free form and
    /// check it against the roots. Targets that do not exist yet resolve
    /// through their deepest existing ancestor.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ToolError> {
        if raw.trim().is_empty() {
            return Err(ToolError::invalid_parameter("path", "must not be empty"));
        }

        let absolute = std::path::absolute(raw)
            .map_err(|e| ToolError::invalid_parameter("path", e))?;

        let mut existing = absolute.as_path();
        let mut missing: Vec<&std::ffi::OsStr> = Vec::new();
        let resolved_base = loop {
            match existing.canonicalize() {
                Ok(canonical) => break canonical,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // A dangling symlink would be followed on write.
                    if existing.symlink_metadata().is_ok() {
                        return Err(ToolError::path_not_allowed(raw));
                    }
                    match (existing.parent(), existing.components().next_back()) {
                        (Some(parent), Some(Component::Normal(name))) => {
                            missing.push(name);
                            existing = parent;
                        }
                        _ => return Err(ToolError::path_not_allowed(raw)),
                    }
                }
                Err(e) => {
                    return Err(ToolError::upstream(format!(
                        "Cannot resolve {raw}: {e}"
                    )));
                }
            }
        };

        let resolved = missing
            .iter()
            .rev()
            .fold(resolved_base, |path, name| path.join(name));

        if self.contains(&resolved) {
            Ok(resolved)
        } else {
            Err(ToolError::path_not_allowed(raw))
        }
    }
}

/// Sizes reported by the gzip helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transcoded {
    pub input_bytes: u64,
    pub output_bytes: u64,
}

pub fn gzip_file(source: &Path, output: &Path) -> io::Result<Transcoded> {
    let mut reader = BufReader::new(File::open(source)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(output)?), Compression::default());
    let input_bytes = io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(Transcoded {
        input_bytes,
        output_bytes: output.metadata()?.len(),
    })
}

pub fn gunzip_file(source: &Path, output: &Path) -> io::Result<Transcoded> {
    let mut decoder = GzDecoder::new(BufReader::new(File::open(source)?));
    let mut writer = BufWriter::new(File::create(output)?);
    let output_bytes = io::copy(&mut decoder, &mut writer)?;
    writer.flush()?;
    Ok(Transcoded {
        input_bytes: source.metadata()?.len(),
        output_bytes,
    })
}

#[derive(Error, Diagnostic, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    #[diagnostic(code(toolbelt::fs::io))]
    Io(#[from] io::Error),

    #[error("Invalid zip archive: {0}")]
    #[diagnostic(code(toolbelt::fs::zip))]
    Zip(#[from] ZipError),

    #[error("Archive entry '{0}' would extract outside the output directory")]
    #[diagnostic(code(toolbelt::fs::unsafe_entry))]
    UnsafeEntry(String),
}

impl From<ArchiveError> for ToolError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::UnsafeEntry(_) => ToolError::invalid_parameter("zip_path", &err),
            other => ToolError::upstream(other.to_string()),
        }
    }
}

/// Entries written by [`zip_paths`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archived {
    pub entries: Vec<String>,
    pub output_bytes: u64,
}

/// Write `sources` into a deflated zip at `output`.
///
/// A file is stored under its own name and a directory under its name plus
/// the relative path of each file below it. Links are not followed; files
/// resolving outside `allow`, and the archive itself, are left out.
pub fn zip_paths(sources: &[PathBuf], output: &Path, allow: &AllowList) -> Result<Archived, ArchiveError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(BufWriter::new(File::create(output)?));
    let mut entries = Vec::new();

    for source in sources {
        let base = source.parent().unwrap_or(source);
        let walker = WalkBuilder::new(source)
            .standard_filters(false)
            .follow_links(false)
            .build();
        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let include = path
                .canonicalize()
                .is_ok_and(|canonical| canonical != output && allow.contains(&canonical));
            if !include {
                continue;
            }
            let name = archive_name(path.strip_prefix(base).unwrap_or(path));
            writer.start_file(name.clone(), options)?;
            io::copy(&mut BufReader::new(File::open(path)?), &mut writer)?;
            entries.push(name);
        }
    }

    writer.finish()?.flush()?;
    Ok(Archived {
        entries,
        output_bytes: output.metadata()?.len(),
    })
}

/// Zip entry names always use `/`.
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

struct PlannedEntry {
    name: String,
    target: PathBuf,
    is_dir: bool,
}

/// Extract `archive` below `output_dir` (canonical, inside `allow`).
///
/// Every entry is checked before anything is written: names that are
/// absolute, climb with `..`, or land outside `output_dir` through an
/// existing link reject the whole archive.
pub fn unzip_file(archive: &Path, output_dir: &Path, allow: &AllowList) -> Result<Vec<String>, ArchiveError> {
    let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;

    let mut plan = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let entry = zip.by_index(index)?;
        let name = entry.name().to_string();
        let target = entry
            .enclosed_name()
            .map(|relative| output_dir.join(relative))
            .and_then(|joined| joined.to_str().and_then(|raw| allow.resolve(raw).ok()))
            .filter(|resolved| resolved.starts_with(output_dir))
            .ok_or_else(|| ArchiveError::UnsafeEntry(name.clone()))?;
        plan.push(PlannedEntry {
            name,
            target,
            is_dir: entry.is_dir(),
        });
    }

    for (index, planned) in plan.iter().enumerate() {
        if planned.is_dir {
            fs::create_dir_all(&planned.target)?;
            continue;
        }
        if let Some(parent) = planned.target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut entry = zip.by_index(index)?;
        let mut writer = BufWriter::new(File::create(&planned.target)?);
        io::copy(&mut entry, &mut writer)?;
        writer.flush()?;
    }
    debug!(entries = plan.len(), archive = %archive.display(), "archive extracted");

    Ok(plan.into_iter().map(|planned| planned.name).collect())
}

/// Result of a recursive name search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatches {
    pub paths: Vec<PathBuf>,
    pub truncated: bool,
}

/// Walk `root` (hidden and ignored files included, links not followed) for
/// entries whose file name contains `pattern`. Matches resolving outside
/// the allow-list are dropped.
pub fn find_by_name(root: &Path, pattern: &str, limit: usize, allow: &AllowList) -> NameMatches {
    let mut paths = Vec::new();
    let mut truncated = false;

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build();

    for entry in walker.filter_map(Result::ok) {
        if entry.depth() == 0 {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.contains(pattern));
        if !matches {
            continue;
        }
        let inside = entry
            .path()
            .canonicalize()
            .is_ok_and(|canonical| allow.contains(&canonical));
        if !inside {
            continue;
        }
        if paths.len() == limit {
            truncated = true;
            break;
        }
        paths.push(entry.into_path());
    }

    paths.sort();
    NameMatches { paths, truncated }
}

//! Allow-listed filesystem tools.
//!
//! Every path argument is resolved through the [`AllowList`] before any
//! filesystem call is made. The operations themselves are blocking and run
//! on the blocking pool.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::debug;

use super::{map_join_error, non_blank};
use crate::config::ALLOWED_DIRS;
use crate::dispatch::{Arguments, ParamSpec, ToolDescriptor, ToolError, ToolOutcome, ToolSet};
use crate::upstream::AllowList;
use crate::upstream::fs::{find_by_name, gunzip_file, gzip_file, unzip_file, zip_paths};

const EDIT_ACTIONS: &[&str] = &["add", "delete", "replace"];

pub struct FilesystemTools {
    allow: AllowList,
    timeout: Duration,
    descriptors: Vec<ToolDescriptor>,
}

impl FilesystemTools {
    /// Create the filesystem tool set.
    ///
    /// # Arguments
    /// * `allow` - the directories every path must resolve inside
    /// * `timeout` - per-call limit
    ///
    /// # Returns
    /// A tool set; with an empty allow-list every path is refused.
    pub fn new(allow: AllowList, timeout: Duration) -> Self {
        Self {
            allow,
            timeout,
            descriptors: descriptors(),
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }
}

impl ToolSet for FilesystemTools {
    fn server_name(&self) -> &'static str {
        "filesystem"
    }

    fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn cancel_safe(&self) -> bool {
        false
    }

    async fn call(&self, tool: &'static str, args: Arguments) -> ToolOutcome<Value> {
        if self.allow.is_empty() {
            return Err(ToolError::configuration_missing(&[ALLOWED_DIRS]));
        }
        let allow = self.allow.clone();
        tokio::task::spawn_blocking(move || run(tool, &allow, &args))
            .await
            .map_err(map_join_error)?
    }
}

fn run(tool: &str, allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    match tool {
        "read_file" => read_file(allow, args),
        "write_file" => write_file(allow, args),
        "edit_file" => edit_file(allow, args),
        "list_directory" => list_directory(allow, args),
        "create_directory" => create_directory(allow, args),
        "search_files" => search_files(allow, args),
        "get_file_info" => get_file_info(allow, args),
        "gzip_compress" => gzip_compress(allow, args),
        "gzip_decompress" => gzip_decompress(allow, args),
        "zip_compress" => zip_compress(allow, args),
        "zip_decompress" => zip_decompress(allow, args),
        other => Err(ToolError::unknown_tool(other)),
    }
}

fn io_error(path: &Path, err: io::Error) -> ToolError {
    ToolError::upstream(format!("{}: {err}", path.display()))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn require_file(path: &Path, name: &str) -> ToolOutcome<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ToolError::invalid_parameter(
            name,
            format!("{} is not a regular file", path.display()),
        )),
        Err(e) => Err(io_error(path, e)),
    }
}

fn read_file(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let path = allow.resolve(non_blank(args, "path")?)?;
    require_file(&path, "path")?;

    let bytes = fs::read(&path).map_err(|e| io_error(&path, e))?;
    let size = bytes.len();
    let content = String::from_utf8(bytes)
        .map_err(|_| ToolError::upstream(format!("{} is not valid UTF-8 text", path.display())))?;

    Ok(json!({ "path": display(&path), "content": content, "size_bytes": size }))
}

fn write_file(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let path = allow.resolve(non_blank(args, "path")?)?;
    let content = args.required_str("content")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    fs::write(&path, content).map_err(|e| io_error(&path, e))?;

    Ok(json!({ "path": display(&path), "bytes_written": content.len() }))
}

fn edit_file(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let path = allow.resolve(non_blank(args, "path")?)?;
    let action = args.required_str("action")?;
    let line_number = args.required_int("line_number")?;
    let content = args.str_or_empty("content");
    require_file(&path, "path")?;

    let original = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
    let mut lines: Vec<&str> = original.lines().collect();
    let index = usize::try_from(line_number - 1)
        .map_err(|_| ToolError::invalid_parameter("line_number", "must be at least 1"))?;

    let out_of_range = |limit: usize| {
        ToolError::invalid_parameter(
            "line_number",
            format!("{line_number} is outside 1..={limit} for {action}"),
        )
    };
    match action {
        "add" if index <= lines.len() => lines.insert(index, content),
        "add" => return Err(out_of_range(lines.len() + 1)),
        "delete" if index < lines.len() => {
            lines.remove(index);
        }
        "replace" if index < lines.len() => lines[index] = content,
        _ => return Err(out_of_range(lines.len())),
    }

    let mut updated = lines.join("\n");
    if original.ends_with('\n') && !lines.is_empty() {
        updated.push('\n');
    }
    let line_count = lines.len();
    fs::write(&path, updated).map_err(|e| io_error(&path, e))?;

    Ok(json!({
        "path": display(&path),
        "action": action,
        "line_number": line_number,
        "line_count": line_count,
    }))
}

fn list_directory(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let path = allow.resolve(non_blank(args, "path")?)?;
    if !path.is_dir() {
        return Err(ToolError::invalid_parameter(
            "path",
            format!("{} is not a directory", path.display()),
        ));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(&path).map_err(|e| io_error(&path, e))? {
        let entry = entry.map_err(|e| io_error(&path, e))?;
        let meta = entry.metadata().map_err(|e| io_error(&entry.path(), e))?;
        let file_type = meta.file_type();
        let (kind, size) = if file_type.is_symlink() {
            ("symlink", None)
        } else if file_type.is_dir() {
            ("directory", None)
        } else {
            ("file", Some(meta.len()))
        };
        entries.push((entry.file_name().to_string_lossy().into_owned(), kind, size));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let entries: Vec<Value> = entries
        .into_iter()
        .map(|(name, kind, size)| json!({ "name": name, "kind": kind, "size_bytes": size }))
        .collect();
    Ok(json!({ "path": display(&path), "entries": entries }))
}

fn create_directory(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let path = allow.resolve(non_blank(args, "path")?)?;
    let existed = path.is_dir();
    fs::create_dir_all(&path).map_err(|e| io_error(&path, e))?;
    Ok(json!({ "path": display(&path), "created": !existed }))
}

fn search_files(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let root = allow.resolve(non_blank(args, "path")?)?;
    let pattern = non_blank(args, "pattern")?;
    if !root.is_dir() {
        return Err(ToolError::invalid_parameter(
            "path",
            format!("{} is not a directory", root.display()),
        ));
    }
    let limit = args
        .int("max_results")
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(200);

    let found = find_by_name(&root, pattern, limit, allow);
    debug!(matches = found.paths.len(), truncated = found.truncated, "search finished");

    let matches: Vec<String> = found.paths.iter().map(|p| display(p)).collect();
    Ok(json!({
        "path": display(&root),
        "pattern": pattern,
        "matches": matches,
        "truncated": found.truncated,
    }))
}

fn get_file_info(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let raw = non_blank(args, "path")?;
    let path = allow.resolve(raw)?;
    let meta = fs::metadata(&path).map_err(|e| io_error(&path, e))?;
    // `resolve` follows links, so ask the caller's spelling.
    let is_symlink = std::path::absolute(raw)
        .and_then(fs::symlink_metadata)
        .is_ok_and(|m| m.file_type().is_symlink());

    Ok(json!({
        "path": display(&path),
        "is_file": meta.is_file(),
        "is_directory": meta.is_dir(),
        "is_symlink": is_symlink,
        "size_bytes": meta.len(),
        "modified": meta.modified().ok().map(epoch),
        "created": meta.created().ok().map(epoch),
        "readonly": meta.permissions().readonly(),
    }))
}

fn gzip_compress(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let raw_source = non_blank(args, "source_path")?;
    let source = allow.resolve(raw_source)?;
    let output = match args.str("output_path") {
        Some(raw) => allow.resolve(raw)?,
        None => allow.resolve(&format!("{raw_source}.gz"))?,
    };
    require_file(&source, "source_path")?;
    refuse_same_file(&source, &output)?;

    let sizes = gzip_file(&source, &output).map_err(|e| io_error(&source, e))?;
    Ok(json!({
        "source_path": display(&source),
        "output_path": display(&output),
        "original_size": sizes.input_bytes,
        "compressed_size": sizes.output_bytes,
    }))
}

fn gzip_decompress(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let source = allow.resolve(non_blank(args, "gzip_path")?)?;
    let output = allow.resolve(non_blank(args, "output_path")?)?;
    require_file(&source, "gzip_path")?;
    refuse_same_file(&source, &output)?;

    let sizes = gunzip_file(&source, &output).map_err(|e| io_error(&source, e))?;
    Ok(json!({
        "gzip_path": display(&source),
        "output_path": display(&output),
        "decompressed_size": sizes.output_bytes,
    }))
}

fn zip_compress(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let raw_sources = args.strings("source_paths");
    if raw_sources.is_empty() {
        return Err(ToolError::invalid_parameter(
            "source_paths",
            "must list at least one path",
        ));
    }
    let sources = raw_sources
        .iter()
        .map(|raw| allow.resolve(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let output = allow.resolve(non_blank(args, "output_path")?)?;
    for source in &sources {
        fs::symlink_metadata(source).map_err(|e| io_error(source, e))?;
        refuse_same_file(source, &output)?;
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let archived = zip_paths(&sources, &output, allow)?;
    Ok(json!({
        "output_path": display(&output),
        "files_added": archived.entries.len(),
        "entries": archived.entries,
        "compressed_size": archived.output_bytes,
    }))
}

fn zip_decompress(allow: &AllowList, args: &Arguments) -> ToolOutcome<Value> {
    let archive = allow.resolve(non_blank(args, "zip_path")?)?;
    let output_dir = allow.resolve(non_blank(args, "output_dir")?)?;
    require_file(&archive, "zip_path")?;

    fs::create_dir_all(&output_dir).map_err(|e| io_error(&output_dir, e))?;
    let files = unzip_file(&archive, &output_dir, allow)?;
    Ok(json!({
        "zip_path": display(&archive),
        "output_dir": display(&output_dir),
        "files_extracted": files.len(),
        "file_list": files,
    }))
}

/// Truncating the output would destroy the input.
fn refuse_same_file(source: &Path, output: &Path) -> ToolOutcome<()> {
    if source == output {
        return Err(ToolError::invalid_parameter(
            "output_path",
            "must differ from the input file",
        ));
    }
    Ok(())
}

fn epoch(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

fn path_param(name: &'static str, description: &'static str) -> ParamSpec {
    ParamSpec::string(name).required().describe(description)
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("read_file", "Read a UTF-8 text file.")
            .param(path_param("path", "File to read")),
        ToolDescriptor::new(
            "write_file",
            "Write content to a file, creating parent directories and replacing existing content.",
        )
        .param(path_param("path", "File to write"))
        .param(ParamSpec::string("content").required().describe("Content to write")),
        ToolDescriptor::new("edit_file", "Add, delete or replace a single line in a text file.")
            .param(path_param("path", "File to edit"))
            .param(
                ParamSpec::string("action")
                    .required()
                    .one_of(EDIT_ACTIONS)
                    .describe("add, delete or replace"),
            )
            .param(
                ParamSpec::integer("line_number")
                    .required()
                    .reject_outside(Some(1.0), None)
                    .describe("Line number (1-based); add accepts one past the last line"),
            )
            .param(
                ParamSpec::string("content")
                    .default_str("")
                    .describe("Line content for add and replace"),
            ),
        ToolDescriptor::new("list_directory", "List the entries of a directory.")
            .param(path_param("path", "Directory to list")),
        ToolDescriptor::new("create_directory", "Create a directory and any missing parents.")
            .param(path_param("path", "Directory to create")),
        ToolDescriptor::new(
            "search_files",
            "Recursively find files and directories whose name contains a pattern.",
        )
        .param(path_param("path", "Directory to search"))
        .param(ParamSpec::string("pattern").required().describe("Substring to match in names"))
        .param(
            ParamSpec::integer("max_results")
                .default_int(200)
                .clamp(Some(1.0), Some(1000.0))
                .describe("Maximum matches to return (1-1000, default: 200)"),
        ),
        ToolDescriptor::new("get_file_info", "Get size, timestamps and type of a file or directory.")
            .param(path_param("path", "Path to inspect")),
        ToolDescriptor::new("gzip_compress", "Compress a file with gzip.")
            .param(path_param("source_path", "File to compress"))
            .param(ParamSpec::string("output_path").describe("Destination (default: source_path + .gz)")),
        ToolDescriptor::new("gzip_decompress", "Decompress a gzip file.")
            .param(path_param("gzip_path", "Gzip file to decompress"))
            .param(path_param("output_path", "Destination file")),
        ToolDescriptor::new("zip_compress", "Compress files or directories into a zip archive.")
            .param(
                ParamSpec::string_array("source_paths")
                    .required()
                    .describe("Files or directories to add"),
            )
            .param(path_param("output_path", "Zip file to create")),
        ToolDescriptor::new(
            "zip_decompress",
            "Extract a zip archive; entries that would land outside the output directory are refused.",
        )
        .param(path_param("zip_path", "Zip file to extract"))
        .param(path_param("output_dir", "Directory to extract into")),
    ]
}

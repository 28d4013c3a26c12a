use crate::lua_parser::AppEntry;
use chrono::Local;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Depot entries sit five levels deep in a stock config.vdf.
const FALLBACK_INDENT: &str = "\t\t\t\t\t";

pub fn config_vdf_path(steam_folder: &str) -> PathBuf {
    Path::new(steam_folder).join("config").join("config.vdf")
}

/// Copies the config aside as `config.vdf.bak_YYYYMMDD_HHMMSS` and returns
/// the backup path. An existing backup with the same name is never replaced.
pub fn create_backup(config_path: &Path) -> Result<PathBuf, std::io::Error> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    create_backup_with_timestamp(config_path, &timestamp)
}

fn create_backup_with_timestamp(
    config_path: &Path,
    timestamp: &str,
) -> Result<PathBuf, std::io::Error> {
    let file_name = config_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "config.vdf".to_string());
    let backup_path = config_path.with_file_name(format!("{}.bak_{}", file_name, timestamp));
    if backup_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("backup already exists: {}", backup_path.display()),
        ));
    }
    fs::copy(config_path, &backup_path)?;
    Ok(backup_path)
}

/// Index of the first line containing the quoted CurrentCellID marker.
pub fn find_marker_line(lines: &[String]) -> Option<usize> {
    lines.iter().position(|l| l.contains("\"CurrentCellID\""))
}

/// Nearest line above the marker whose trimmed content is a lone closing
/// brace. New blocks go directly above it.
pub fn find_insert_index(lines: &[String], marker_line: usize) -> Option<usize> {
    lines[..marker_line].iter().rposition(|l| l.trim() == "}")
}

/// Leading whitespace of the nearest `"<digits>"` line above the insertion
/// point, so new blocks line up with the existing depot entries. Falls back
/// to five tabs when no such line exists or it carries no indent.
pub fn detect_indentation(lines: &[String], insert_index: usize) -> String {
    let app_id_line = Regex::new(r#"^"\d+"$"#).unwrap();
    for line in lines[..insert_index].iter().rev() {
        if app_id_line.is_match(line.trim()) {
            let indent = &line[..line.len() - line.trim_start().len()];
            if !indent.is_empty() {
                return indent.to_string();
            }
            break;
        }
    }
    FALLBACK_INDENT.to_string()
}

/// Four config lines per entry, ready to splice ahead of the closing brace.
pub fn build_key_blocks(entries: &[AppEntry], indent: &str) -> Vec<String> {
    let inner = format!("{}\t", indent);
    let mut blocks = Vec::with_capacity(entries.len() * 4);
    for entry in entries {
        blocks.push(format!("{}\"{}\"", indent, entry.app_id));
        blocks.push(format!("{}{{", indent));
        blocks.push(format!("{}\"DecryptionKey\"\t\t\"{}\"", inner, entry.key));
        blocks.push(format!("{}}}", indent));
    }
    blocks
}

/// Splices one DecryptionKey block per entry into the config text. Every
/// entry is inserted in order; nothing is de-duplicated. Line endings are
/// normalized to `\n` and the result is newline-terminated.
pub fn insert_decryption_keys(content: &str, entries: &[AppEntry]) -> Result<String, String> {
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

    let marker_line = find_marker_line(&lines)
        .ok_or_else(|| "\"CurrentCellID\" not found in config.".to_string())?;
    let insert_index = find_insert_index(&lines, marker_line)
        .ok_or_else(|| "Could not find closing brace before CurrentCellID.".to_string())?;

    let indent = detect_indentation(&lines, insert_index);
    let blocks = build_key_blocks(entries, &indent);
    lines.splice(insert_index..insert_index, blocks);

    let mut patched = lines.join("\n");
    patched.push('\n');
    Ok(patched)
}

use glob::{glob, Pattern};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEntry {
    pub app_id: String,
    pub key: String,
}

/// Reads the script leniently; generated Lua files are not always clean
/// UTF-8.
pub fn read_lua_file(path: &Path) -> Result<String, String> {
    let bytes =
        fs::read(path).map_err(|e| format!("Could not read {}: {}", path.display(), e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Returns the first `.lua` file in the folder (glob yields alphabetical
/// order). The folder half of the pattern is escaped so bracket characters
/// in its name stay literal.
pub fn find_first_lua_file(folder: &str) -> Result<PathBuf, String> {
    let pattern = Path::new(&Pattern::escape(folder)).join("*.lua");
    if let Ok(paths) = glob(&pattern.to_string_lossy()) {
        if let Some(path) = paths.flatten().next() {
            return Ok(path);
        }
    }
    Err("No .lua file found in selected folder.".to_string())
}

/// Extracts every `addappid(id, 0|1, "key")` statement in file order.
/// Duplicates are kept; the key must be exactly 64 hex characters.
pub fn extract_app_entries(content: &str) -> Result<Vec<AppEntry>, String> {
    let re = Regex::new(r#"(?i)addappid\s*\(\s*(\d+)\s*,\s*[01]\s*,\s*["']([a-fA-F0-9]{64})["']\s*\)"#)
        .unwrap();

    let entries: Vec<AppEntry> = re
        .captures_iter(content)
        .map(|cap| AppEntry {
            app_id: cap[1].to_string(),
            key: cap[2].to_string(),
        })
        .collect();

    if entries.is_empty() {
        return Err("No valid addappid(appid, 0 or 1, \"key\") lines found in Lua file.".to_string());
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn hex_key(c: char) -> String {
        c.to_string().repeat(64)
    }

    #[test]
    fn extracts_double_and_single_quoted_keys() {
        let lua = format!(
            "addappid(1593500, 0, \"{}\")\naddappid(1593501, 1, '{}')\n",
            hex_key('a'),
            hex_key('b')
        );
        let entries = extract_app_entries(&lua).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].app_id, "1593500");
        assert_eq!(entries[0].key, hex_key('a'));
        assert_eq!(entries[1].app_id, "1593501");
        assert_eq!(entries[1].key, hex_key('b'));
    }

    #[test]
    fn tolerates_whitespace_and_case() {
        let lua = format!(
            "AddAppId ( 42 ,  1 ,  \"{}\" )\nADDAPPID(7,0,'{}')",
            hex_key('c'),
            hex_key('d')
        );
        let entries = extract_app_entries(&lua).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].app_id, "42");
        assert_eq!(entries[1].app_id, "7");
    }

    #[test]
    fn keeps_file_order_and_duplicates() {
        let lua = format!(
            "addappid(9, 0, \"{k}\")\naddappid(3, 0, \"{k}\")\naddappid(9, 0, \"{k}\")\n",
            k = hex_key('e')
        );
        let entries = extract_app_entries(&lua).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.app_id.as_str()).collect();
        assert_eq!(ids, ["9", "3", "9"]);
    }

    #[test]
    fn rejects_malformed_statements() {
        let short_key = "a".repeat(63);
        let long_key = "a".repeat(65);
        let bad = format!(
            concat!(
                "addappid(1)\n",
                "addappid(2, 0)\n",
                "addappid(3, 2, \"{ok}\")\n",
                "addappid(4, 0, \"{short}\")\n",
                "addappid(5, 0, \"{long}\")\n",
                "addappid(6, 0, \"{bad_hex}\")\n",
            ),
            ok = hex_key('a'),
            short = short_key,
            long = long_key,
            bad_hex = format!("g{}", "a".repeat(63)),
        );
        let err = extract_app_entries(&bad).unwrap_err();
        assert_eq!(
            err,
            "No valid addappid(appid, 0 or 1, \"key\") lines found in Lua file."
        );
    }

    #[test]
    fn ignores_surrounding_lua_noise() {
        let lua = format!(
            "-- generated\nlocal x = 1\naddappid(10, 1, \"{}\") -- main app\nsetManifestid(10, \"123\")\n",
            hex_key('f')
        );
        let entries = extract_app_entries(&lua).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].app_id, "10");
    }

    #[test]
    fn finds_first_lua_file_alphabetically() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.lua"), "x").unwrap();
        fs::write(dir.path().join("a.lua"), "x").unwrap();
        fs::write(dir.path().join("c.manifest"), "x").unwrap();

        let found = find_first_lua_file(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(found.file_name().unwrap(), "a.lua");
    }

    #[test]
    fn finds_lua_files_in_bracketed_folder_names() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Games [2024]");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("app.lua"), "x").unwrap();

        let found = find_first_lua_file(folder.to_str().unwrap()).unwrap();
        assert_eq!(found.file_name().unwrap(), "app.lua");
    }

    #[test]
    fn errors_when_folder_has_no_lua_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("only.manifest"), "x").unwrap();

        let err = find_first_lua_file(dir.path().to_str().unwrap()).unwrap_err();
        assert_eq!(err, "No .lua file found in selected folder.");
    }

    #[test]
    fn reads_lua_files_with_broken_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dirty.lua");
        let mut bytes = format!("addappid(5, 0, \"{}\")", hex_key('a')).into_bytes();
        bytes.push(0xFF);
        fs::write(&path, bytes).unwrap();

        let content = read_lua_file(&path).unwrap();
        let entries = extract_app_entries(&content).unwrap();
        assert_eq!(entries[0].app_id, "5");
    }
}

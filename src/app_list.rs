use crate::lua_parser::AppEntry;
use std::fs;
use std::path::{Path, PathBuf};

/// Next `<n>.txt` path that does not exist yet, counting up from 0.
/// Files already in the folder are skipped, never reused or renumbered.
pub fn next_available_txt_path(folder: &Path) -> PathBuf {
    let mut counter = 0u32;
    loop {
        let candidate = folder.join(format!("{}.txt", counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Writes one `<appid> - <name>` file per entry plus one recording the Lua
/// file stem. Returns the created file names in creation order.
pub fn write_app_id_files(
    folder: &str,
    entries: &[AppEntry],
    lua_stem: &str,
    game_name: &str,
) -> Result<Vec<String>, std::io::Error> {
    let folder = Path::new(folder);
    let mut created = Vec::with_capacity(entries.len() + 1);

    for entry in entries {
        let path = next_available_txt_path(folder);
        fs::write(&path, format!("{} - {}", entry.app_id, game_name))?;
        created.push(
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
        );
    }

    let path = next_available_txt_path(folder);
    fs::write(&path, format!("{} - {}", lua_stem, game_name))?;
    created.push(
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string(),
    );

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(app_id: &str) -> AppEntry {
        AppEntry {
            app_id: app_id.to_string(),
            key: "a".repeat(64),
        }
    }

    #[test]
    fn counter_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0.txt"), "taken").unwrap();
        fs::write(dir.path().join("1.txt"), "taken").unwrap();

        let next = next_available_txt_path(dir.path());
        assert_eq!(next.file_name().unwrap(), "2.txt");
    }

    #[test]
    fn counter_fills_gaps() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0.txt"), "taken").unwrap();
        fs::write(dir.path().join("2.txt"), "taken").unwrap();

        let next = next_available_txt_path(dir.path());
        assert_eq!(next.file_name().unwrap(), "1.txt");
    }

    #[test]
    fn writes_entry_files_and_lua_stem_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0.txt"), "pre-existing").unwrap();

        let created = write_app_id_files(
            dir.path().to_str().unwrap(),
            &[entry("1593500"), entry("1593501")],
            "1593500",
            "Sample Game",
        )
        .unwrap();

        assert_eq!(created, ["1.txt", "2.txt", "3.txt"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("1.txt")).unwrap(),
            "1593500 - Sample Game"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("2.txt")).unwrap(),
            "1593501 - Sample Game"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("3.txt")).unwrap(),
            "1593500 - Sample Game"
        );
        // The file that was already there is left alone.
        assert_eq!(
            fs::read_to_string(dir.path().join("0.txt")).unwrap(),
            "pre-existing"
        );
    }

    #[test]
    fn lua_stem_file_is_written_even_without_entries() {
        let dir = tempfile::tempdir().unwrap();

        let created =
            write_app_id_files(dir.path().to_str().unwrap(), &[], "730", "Unknown Game").unwrap();

        assert_eq!(created, ["0.txt"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("0.txt")).unwrap(),
            "730 - Unknown Game"
        );
    }
}

use glob::{glob, Pattern};
use std::fs;
use std::path::Path;

/// Copies every `*.manifest` file from the source folder into the Steam
/// depot cache, creating the directory if needed. Existing files are
/// overwritten. Returns the number of files copied.
pub fn copy_manifest_files(source_folder: &str, steam_folder: &str) -> Result<usize, std::io::Error> {
    let depot_cache = Path::new(steam_folder).join("depotcache");
    fs::create_dir_all(&depot_cache)?;

    let mut copied = 0;
    let pattern = Path::new(&Pattern::escape(source_folder)).join("*.manifest");
    if let Ok(paths) = glob(&pattern.to_string_lossy()) {
        for path in paths.flatten() {
            if let Some(file_name) = path.file_name() {
                fs::copy(&path, depot_cache.join(file_name))?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}

/// Number of `*.manifest` files in the folder, for the preview dialog.
pub fn count_manifest_files(folder: &str) -> usize {
    let pattern = Path::new(&Pattern::escape(folder)).join("*.manifest");
    match glob(&pattern.to_string_lossy()) {
        Ok(paths) => paths.flatten().count(),
        Err(_) => 0,
    }
}

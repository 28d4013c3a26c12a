use crate::api::ApiClient;
use crate::app_list::write_app_id_files;
use crate::config::{
    load_game_name_cache, load_settings, save_game_name_cache, save_settings, AppConfig,
};
use crate::lua_parser::{extract_app_entries, find_first_lua_file, read_lua_file};
use crate::manifest::{copy_manifest_files, count_manifest_files};
use crate::vdf_patch::{config_vdf_path, create_backup, insert_decryption_keys};
use eframe::egui;
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

const APPLY_STEPS: u32 = 6;

pub struct PatcherApp {
    config: AppConfig,
    // Per-run only; deliberately never persisted.
    lua_folder: String,

    game_cache: Arc<Mutex<HashMap<String, String>>>,
    system_log: Arc<Mutex<Vec<String>>>,
    apply_state: Arc<Mutex<ApplyState>>,

    status_msg: String,
    dialog: Option<Dialog>,
}

#[derive(Default)]
struct ApplyState {
    running: bool,
    step: u32,
    status: String,
    outcome: Option<Result<ApplySummary, String>>,
}

struct ApplySummary {
    entry_count: usize,
    backup_name: String,
    created_files: Vec<String>,
}

enum DialogKind {
    Info,
    Warning,
    Error,
}

struct Dialog {
    title: String,
    message: String,
    kind: DialogKind,
}

impl PatcherApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = load_settings();
        let cache_map = load_game_name_cache();

        let system_log = Arc::new(Mutex::new(Vec::new()));
        system_log.lock().unwrap().push("Ready.".to_string());

        let app = Self {
            config,
            lua_folder: String::new(),
            game_cache: Arc::new(Mutex::new(cache_map)),
            system_log,
            apply_state: Arc::new(Mutex::new(ApplyState::default())),
            status_msg: "Ready".to_string(),
            dialog: None,
        };

        app.configure_visuals(&cc.egui_ctx);
        app
    }

    fn configure_visuals(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();

        let bg_color = egui::Color32::from_rgb(18, 20, 23);
        let surface_color = egui::Color32::from_rgb(30, 33, 38);
        let accent = egui::Color32::from_rgb(64, 186, 140);
        let text_color = egui::Color32::from_rgb(214, 217, 220);

        visuals.window_fill = bg_color;
        visuals.panel_fill = bg_color;

        visuals.widgets.noninteractive.bg_fill = bg_color;
        visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, text_color);

        visuals.widgets.inactive.bg_fill = surface_color;
        visuals.widgets.inactive.weak_bg_fill = surface_color;
        visuals.widgets.inactive.rounding = egui::Rounding::same(4.0);
        visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, egui::Color32::from_gray(150));

        visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(42, 47, 54);
        visuals.widgets.hovered.fg_stroke = egui::Stroke::new(1.5, accent);
        visuals.widgets.hovered.rounding = egui::Rounding::same(4.0);

        visuals.widgets.active.bg_fill = egui::Color32::from_rgb(54, 60, 68);
        visuals.widgets.active.fg_stroke = egui::Stroke::new(2.0, accent);
        visuals.widgets.active.rounding = egui::Rounding::same(4.0);

        visuals.selection.bg_fill = egui::Color32::from_rgb(24, 90, 70);
        visuals.selection.stroke = egui::Stroke::new(1.0, accent);

        ctx.set_visuals(visuals);
    }

    fn log<S: Into<String>>(&self, msg: S) {
        push_log(&self.system_log, msg.into());
    }

    fn show_info<S: Into<String>>(&mut self, title: &str, message: S) {
        self.dialog = Some(Dialog {
            title: title.to_string(),
            message: message.into(),
            kind: DialogKind::Info,
        });
    }

    fn show_warning<S: Into<String>>(&mut self, title: &str, message: S) {
        self.dialog = Some(Dialog {
            title: title.to_string(),
            message: message.into(),
            kind: DialogKind::Warning,
        });
    }

    fn show_error<S: Into<String>>(&mut self, title: &str, message: S) {
        self.dialog = Some(Dialog {
            title: title.to_string(),
            message: message.into(),
            kind: DialogKind::Error,
        });
    }

    /// Full validation for the Validate Paths button, collecting every
    /// failure into one dialog.
    fn run_validation(&mut self) {
        let mut errors: Vec<&str> = Vec::new();

        let steam = self.config.steam_folder.trim();
        if steam.is_empty() {
            errors.push("Steam folder not selected");
        } else if !Path::new(steam).is_dir() {
            errors.push("Steam folder does not exist");
        } else if !config_vdf_path(steam).exists() {
            errors.push("Invalid Steam installation folder");
        }

        let lua = self.lua_folder.trim();
        if lua.is_empty() {
            errors.push("Lua folder not selected");
        } else if !Path::new(lua).is_dir() {
            errors.push("Lua folder does not exist");
        } else if find_first_lua_file(lua).is_err() {
            errors.push("No .lua files found in selected folder");
        }

        let app_list = self.config.app_list_folder.trim();
        if app_list.is_empty() {
            errors.push("AppList folder not selected");
        } else if !Path::new(app_list).is_dir() {
            errors.push("AppList folder does not exist");
        }

        if errors.is_empty() {
            self.show_info("Validation Success", "All paths are valid!");
        } else {
            let mut message = String::from("Validation Errors:");
            for e in &errors {
                message.push_str("\n\u{2022} ");
                message.push_str(e);
            }
            self.show_error("Validation Failed", message);
        }
    }

    /// Lighter pre-flight check used by Preview and Apply.
    fn paths_are_usable(&mut self) -> bool {
        let mut errors: Vec<&str> = Vec::new();

        let steam = self.config.steam_folder.trim();
        if steam.is_empty() || !Path::new(steam).is_dir() {
            errors.push("Invalid Steam folder");
        }
        let lua = self.lua_folder.trim();
        if lua.is_empty() || !Path::new(lua).is_dir() {
            errors.push("Invalid Lua folder");
        }
        let app_list = self.config.app_list_folder.trim();
        if app_list.is_empty() || !Path::new(app_list).is_dir() {
            errors.push("Invalid AppList folder");
        }

        if errors.is_empty() {
            true
        } else {
            self.show_error("Validation Error", errors.join("\n"));
            false
        }
    }

    fn show_preview(&mut self) {
        if !self.paths_are_usable() {
            return;
        }
        match self.build_preview_text() {
            Ok(text) => self.show_info("Preview Changes", text),
            Err(e) => self.show_error(
                "Preview Error",
                format!("Error previewing changes:\n{}", e),
            ),
        }
    }

    fn build_preview_text(&self) -> Result<String, String> {
        let lua_folder = self.lua_folder.trim();
        let lua_file = find_first_lua_file(lua_folder)?;
        let content = read_lua_file(&lua_file)?;
        let entries = extract_app_entries(&content)?;

        let file_name = lua_file.file_name().unwrap_or_default().to_string_lossy();
        let mut text = format!("Found {} app entries in {}:\n\n", entries.len(), file_name);
        for entry in entries.iter().take(10) {
            text.push_str(&format!(
                "AppID: {}, Key: {}...\n",
                entry.app_id,
                &entry.key[..16]
            ));
        }
        if entries.len() > 10 {
            text.push_str(&format!("\n... and {} more entries", entries.len() - 10));
        }
        text.push_str(&format!(
            "\n\nManifest files to copy: {}",
            count_manifest_files(lua_folder)
        ));
        Ok(text)
    }

    fn apply_changes(&mut self) {
        if !self.paths_are_usable() {
            return;
        }

        {
            let mut state = self.apply_state.lock().unwrap();
            if state.running {
                return;
            }
            *state = ApplyState {
                running: true,
                step: 0,
                status: "Starting...".to_string(),
                outcome: None,
            };
        }

        let mut config_snapshot = self.config.clone();
        config_snapshot.steam_folder = config_snapshot.steam_folder.trim().to_string();
        config_snapshot.app_list_folder = config_snapshot.app_list_folder.trim().to_string();
        let lua_folder = self.lua_folder.trim().to_string();

        let state_arc = self.apply_state.clone();
        let log_arc = self.system_log.clone();
        let cache_arc = self.game_cache.clone();

        self.status_msg = "Applying changes...".to_string();
        self.log("Starting apply sequence.");

        std::thread::spawn(move || {
            let set_status = |step: u32, status: &str| {
                if let Ok(mut state) = state_arc.lock() {
                    state.step = step;
                    state.status = status.to_string();
                }
                push_log(&log_arc, format!("STEP {}: {}", step, status));
                info!("step {}: {}", step, status);
            };
            let log_line = |msg: String| {
                info!("{}", msg);
                push_log(&log_arc, msg);
            };

            let outcome =
                run_apply_sequence(&config_snapshot, &lua_folder, &cache_arc, &set_status, &log_line);

            if let Ok(mut state) = state_arc.lock() {
                state.running = false;
                state.outcome = Some(outcome);
            }
        });
    }

    fn poll_apply_state(&mut self, ctx: &egui::Context) {
        let outcome = {
            let mut state = self.apply_state.lock().unwrap();
            if state.running {
                self.status_msg = state.status.clone();
                ctx.request_repaint_after(std::time::Duration::from_millis(100));
            }
            state.outcome.take()
        };

        if let Some(result) = outcome {
            match result {
                Ok(summary) => {
                    let shown: Vec<String> =
                        summary.created_files.iter().take(5).cloned().collect();
                    let mut message = format!(
                        "Successfully processed {} app entries!\n\nBackup created: {}\nAppID files created: {}",
                        summary.entry_count,
                        summary.backup_name,
                        shown.join(", ")
                    );
                    if summary.created_files.len() > 5 {
                        message.push_str(&format!(
                            " and {} more...",
                            summary.created_files.len() - 5
                        ));
                    }
                    self.show_info("Success", message);
                    self.status_msg = "Operation completed successfully".to_string();
                    self.log("Apply sequence finished.");
                }
                Err(e) => {
                    self.show_error("Error", format!("An error occurred:\n{}", e));
                    self.status_msg = "Error occurred".to_string();
                    self.log(format!("Apply failed: {}", e));
                }
            }
        }
    }

    fn show_dialog_window(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.dialog else {
            return;
        };
        let title = dialog.title.clone();
        let message = dialog.message.clone();
        let color = match dialog.kind {
            DialogKind::Info => egui::Color32::from_rgb(214, 217, 220),
            DialogKind::Warning => egui::Color32::from_rgb(255, 165, 0),
            DialogKind::Error => egui::Color32::from_rgb(235, 120, 120),
        };

        let mut close = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_max_width(460.0);
                ui.label(egui::RichText::new(message).color(color));
                ui.add_space(12.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        close = true;
                    }
                });
            });
        if close {
            self.dialog = None;
        }
    }
}

impl eframe::App for PatcherApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_apply_state(ctx);

        let main_frame = egui::containers::Frame::default()
            .inner_margin(16.0)
            .fill(egui::Color32::from_rgb(18, 20, 23));

        egui::TopBottomPanel::top("header")
            .frame(main_frame)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(2.0);
                    ui.label(
                        egui::RichText::new("DEPOT PATCHER")
                            .color(egui::Color32::from_rgb(64, 186, 140))
                            .size(22.0)
                            .family(egui::FontFamily::Monospace)
                            .strong(),
                    );
                    ui.label(
                        egui::RichText::new("config.vdf keys + depot cache + AppList")
                            .size(11.0)
                            .color(egui::Color32::from_gray(140)),
                    );
                    ui.add_space(2.0);
                });
                ui.separator();
            });

        egui::TopBottomPanel::bottom("log")
            .min_height(90.0)
            .frame(main_frame)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new("LOG")
                        .font(egui::FontId::proportional(13.0))
                        .color(egui::Color32::from_rgb(64, 186, 140)),
                );
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .max_height(110.0)
                    .show(ui, |ui| {
                        let logs = self.system_log.lock().unwrap();
                        for line in logs.iter() {
                            ui.label(
                                egui::RichText::new(line)
                                    .font(egui::FontId::monospace(11.0))
                                    .color(egui::Color32::from_gray(180)),
                            );
                        }
                    });
            });

        egui::CentralPanel::default()
            .frame(main_frame.inner_margin(10.0))
            .show(ctx, |ui| {
                let busy = self.apply_state.lock().unwrap().running || self.dialog.is_some();

                let steam_valid = config_vdf_path(self.config.steam_folder.trim()).exists();
                if path_row(
                    ui,
                    "Steam Folder:",
                    steam_valid,
                    &mut self.config.steam_folder,
                    !busy,
                ) {
                    let picked = self.config.steam_folder.trim().to_string();
                    if let Err(msg) = validate_steam_folder(&picked) {
                        self.show_warning("Invalid Steam Path", msg);
                    }
                }

                let lua_valid = Path::new(self.lua_folder.trim()).is_dir();
                path_row(
                    ui,
                    "Folder Containing Lua + Manifest Files:",
                    lua_valid,
                    &mut self.lua_folder,
                    !busy,
                );

                let app_list_valid = Path::new(self.config.app_list_folder.trim()).is_dir();
                path_row(
                    ui,
                    "AppList Folder:",
                    app_list_valid,
                    &mut self.config.app_list_folder,
                    !busy,
                );

                ui.add_space(8.0);
                ui.add_enabled_ui(!busy, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("Validate Paths").clicked() {
                            self.run_validation();
                        }
                        if ui.button("Preview Changes").clicked() {
                            self.show_preview();
                        }
                        if ui.button("Apply Changes").clicked() {
                            self.apply_changes();
                        }
                    });
                    ui.add_space(4.0);
                    ui.checkbox(
                        &mut self.config.restart_steam,
                        "Restart Steam automatically",
                    );
                });

                ui.add_space(8.0);
                let (running, step, status) = {
                    let state = self.apply_state.lock().unwrap();
                    (state.running, state.step, state.status.clone())
                };
                if running {
                    ui.add(
                        egui::ProgressBar::new(step as f32 / APPLY_STEPS as f32)
                            .desired_width(380.0)
                            .text(status),
                    );
                    ui.add_space(4.0);
                }
                ui.label(
                    egui::RichText::new(&self.status_msg)
                        .color(egui::Color32::from_rgb(120, 200, 160)),
                );
            });

        self.show_dialog_window(ctx);
    }
}

fn path_row(
    ui: &mut egui::Ui,
    label: &str,
    valid: bool,
    text: &mut String,
    enabled: bool,
) -> bool {
    let mut picked = false;
    ui.label(label);
    ui.horizontal(|ui| {
        let tint = if valid {
            egui::Color32::from_rgb(120, 200, 160)
        } else {
            egui::Color32::from_rgb(235, 120, 120)
        };
        ui.add(
            egui::TextEdit::singleline(text)
                .desired_width(430.0)
                .text_color(tint),
        );
        if ui
            .add_enabled(enabled, egui::Button::new("Browse"))
            .clicked()
        {
            let mut dialog = rfd::FileDialog::new();
            if !text.trim().is_empty() && Path::new(text.trim()).is_dir() {
                dialog = dialog.set_directory(text.trim());
            }
            if let Some(path) = dialog.pick_folder() {
                *text = path.to_string_lossy().to_string();
                picked = true;
            }
        }
    });
    ui.add_space(4.0);
    picked
}

fn validate_steam_folder(path: &str) -> Result<(), String> {
    if config_vdf_path(path).exists() {
        Ok(())
    } else {
        Err(format!(
            "No config.vdf found in {}\nPlease select a valid Steam installation folder.",
            Path::new(path).join("config").display()
        ))
    }
}

fn push_log(log: &Mutex<Vec<String>>, msg: String) {
    if let Ok(mut lines) = log.lock() {
        lines.push(msg);
        // Keep last 50 lines
        if lines.len() > 50 {
            lines.remove(0);
        }
    }
}

fn run_apply_sequence(
    config: &AppConfig,
    lua_folder: &str,
    game_cache: &Arc<Mutex<HashMap<String, String>>>,
    set_status: &impl Fn(u32, &str),
    log_line: &impl Fn(String),
) -> Result<ApplySummary, String> {
    let steam_folder = config.steam_folder.as_str();

    if config.restart_steam {
        set_status(0, "Closing Steam...");
        let _ = std::process::Command::new("taskkill")
            .args(["/F", "/IM", "steam.exe"])
            .output();
        std::thread::sleep(std::time::Duration::from_secs(2));
    }

    set_status(1, "Copying manifest files...");
    let copied = copy_manifest_files(lua_folder, steam_folder)
        .map_err(|e| format!("Could not copy manifest files: {}", e))?;
    log_line(format!("Copied {} manifest files to depotcache.", copied));

    set_status(2, "Parsing Lua file...");
    let lua_file = find_first_lua_file(lua_folder)?;
    let content = read_lua_file(&lua_file)?;
    let entries = extract_app_entries(&content)?;
    log_line(format!(
        "Parsed {} app entries from {}.",
        entries.len(),
        lua_file.file_name().unwrap_or_default().to_string_lossy()
    ));

    set_status(3, "Creating backup...");
    let config_path = config_vdf_path(steam_folder);
    let backup_path =
        create_backup(&config_path).map_err(|e| format!("Could not create backup: {}", e))?;
    let backup_name = backup_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    log_line(format!("Backup created: {}", backup_name));

    set_status(4, "Reading config file...");
    let bytes =
        fs::read(&config_path).map_err(|e| format!("Could not read config: {}", e))?;
    let patched = insert_decryption_keys(&String::from_utf8_lossy(&bytes), &entries)?;

    set_status(5, "Writing modified config...");
    fs::write(&config_path, patched).map_err(|e| format!("Could not write config: {}", e))?;

    set_status(6, "Creating AppID files...");
    let lua_stem = lua_file
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let game_name = resolve_game_name(&lua_stem, game_cache);
    log_line(format!("Using game name: {}", game_name));
    let created_files = write_app_id_files(&config.app_list_folder, &entries, &lua_stem, &game_name)
        .map_err(|e| format!("Could not write AppID files: {}", e))?;
    log_line(format!("Created {} AppID files.", created_files.len()));

    if let Err(e) = save_settings(config) {
        warn!("could not save settings: {}", e);
    }

    if config.restart_steam {
        log_line("Relaunching Steam.".to_string());
        let _ = open::that("steam://open/main");
    }

    Ok(ApplySummary {
        entry_count: entries.len(),
        backup_name,
        created_files,
    })
}

/// One lookup per apply, keyed on the Lua file stem. The cache makes repeat
/// applies offline.
fn resolve_game_name(app_id: &str, game_cache: &Arc<Mutex<HashMap<String, String>>>) -> String {
    if let Ok(cache) = game_cache.lock() {
        if let Some(name) = cache.get(app_id) {
            return name.clone();
        }
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            warn!("could not start a runtime for the name lookup: {}", e);
            return "Unknown Game".to_string();
        }
    };
    let client = ApiClient::new();
    let name = match rt.block_on(client.get_game_name(app_id)) {
        Ok(name) => name,
        Err(e) => {
            warn!("name lookup failed for {}: {}", app_id, e);
            "Unknown Game".to_string()
        }
    };

    if name != "Unknown Game" {
        if let Ok(mut cache) = game_cache.lock() {
            cache.insert(app_id.to_string(), name.clone());
            let _ = save_game_name_cache(&cache);
        }
    }
    name
}

use crate::config::AppConfig;
use crate::filesystem::{get_drives, read_directory, DriveInfo, FileEntry, FileType};
use crate::filter::{DateFilter, FilterState, SizeFilter, TypeFilter};
use crate::format::{format_modified, format_size, type_label};
use crate::navigation::{Location, Navigator};
use crate::sizing::SizeCalculator;
use crate::sort::{sort_entries, SortColumn, SortState};
use anyhow::Result;
use chrono::Local;
use eframe::egui;
use egui_extras::{Column, TableBuilder};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Duration;

/// How often pending folder sizes are polled while workers are running.
const SIZE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_SIZE_UPDATES_PER_FRAME: usize = 64;
const ROW_HEIGHT: f32 = 20.0;

type Listing = (PathBuf, Result<Vec<FileEntry>>);

/// Picks the first usable start location: explicit argument, last session,
/// working directory, drives list.
pub fn start_location(arg: Option<PathBuf>, config: &AppConfig) -> Location {
    if let Some(path) = arg {
        match dunce::canonicalize(&path) {
            Ok(path) if path.is_dir() => return Location::Directory(path),
            _ => warn!("{} is not a directory, ignoring", path.display()),
        }
    }
    if let Some(last) = &config.last_path {
        if last.is_dir() {
            return Location::Directory(last.clone());
        }
    }
    match std::env::current_dir() {
        Ok(cwd) => Location::Directory(cwd),
        Err(_) => Location::Drives,
    }
}

enum Action {
    Open(usize),
    OpenDrive(PathBuf),
    Select(PathBuf),
}

pub struct FileManagerApp {
    navigator: Navigator,
    entries: Vec<FileEntry>,
    drives: Vec<DriveInfo>,
    selected: Option<PathBuf>,
    error_message: Option<String>,

    // Filtering & sorting
    filters: FilterState,
    sort: SortState,

    // Folder sizes
    sizer: SizeCalculator,
    folder_sizes: HashMap<PathBuf, u64>,

    // Threading
    load_req_tx: Sender<PathBuf>,
    load_res_rx: Receiver<Listing>,
    is_loading: bool,

    // Path bar
    path_input: String,
    path_edit_mode: bool,
    focus_search: bool,
    scroll_to_selected: bool,

    /// Where settings are written; `None` keeps them in memory only.
    config_path: Option<PathBuf>,
}

impl FileManagerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, start: Location, config: AppConfig) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        Self::with_context(
            cc.egui_ctx.clone(),
            start,
            config,
            AppConfig::default_path(),
        )
    }

    fn with_context(
        ctx: egui::Context,
        start: Location,
        config: AppConfig,
        config_path: Option<PathBuf>,
    ) -> Self {
        let (tx, rx) = channel::<PathBuf>();
        let (res_tx, res_rx) = channel::<Listing>();

        let spawned = thread::Builder::new()
            .name("directory-loader".into())
            .spawn(move || {
                while let Ok(path) = rx.recv() {
                    let result = read_directory(&path);
                    if res_tx.send((path, result)).is_err() {
                        break;
                    }
                    ctx.request_repaint();
                }
            });
        if let Err(e) = spawned {
            error!("Failed to start directory loader: {}", e);
        }

        let mut app = Self {
            navigator: Navigator::new(start),
            entries: Vec::new(),
            drives: Vec::new(),
            selected: None,
            error_message: None,
            filters: FilterState {
                show_hidden: config.show_hidden,
                ..FilterState::default()
            },
            sort: config.sort_state(),
            sizer: SizeCalculator::new(),
            folder_sizes: HashMap::new(),
            load_req_tx: tx,
            load_res_rx: res_rx,
            is_loading: false,
            path_input: String::new(),
            path_edit_mode: false,
            focus_search: false,
            scroll_to_selected: false,
            config_path,
        };
        app.load_location();
        app
    }

    fn save_state(&self) {
        let config = AppConfig {
            last_path: self.navigator.current_dir().map(Path::to_path_buf),
            show_hidden: self.filters.show_hidden,
            sort_column: self.sort.column,
            sort_order: self.sort.order,
        };
        if let Some(path) = &self.config_path {
            if let Err(e) = config.save_to(path) {
                warn!("Could not save settings: {:#}", e);
            }
        }
    }

    // --- Navigation ---

    fn load_location(&mut self) {
        self.selected = None;
        self.error_message = None;
        self.path_edit_mode = false;
        self.path_input = self.navigator.current().label();
        self.entries.clear();
        self.sizer.begin_listing();

        match self.navigator.current().clone() {
            Location::Drives => {
                self.drives = get_drives();
                self.is_loading = false;
                info!("Listing {} drives", self.drives.len());
            }
            Location::Directory(path) => {
                self.prune_size_cache(&path);
                self.is_loading = true;
                debug!("Requesting listing of {}", path.display());
                if self.load_req_tx.send(path).is_err() {
                    self.is_loading = false;
                    self.error_message = Some("Directory loader stopped".to_string());
                }
            }
        }
    }

    /// Keeps sizes below `current` and the children of its ancestors, so going
    /// back up stays instant while unrelated subtrees are forgotten.
    fn prune_size_cache(&mut self, current: &Path) {
        self.folder_sizes.retain(|path, _| {
            path.starts_with(current)
                || path
                    .parent()
                    .is_some_and(|parent| current.starts_with(parent))
        });
    }

    fn apply_listing(&mut self, path: PathBuf, result: Result<Vec<FileEntry>>) {
        // A newer navigation already superseded this listing.
        if self.navigator.current_dir() != Some(path.as_path()) {
            debug!("Dropping stale listing of {}", path.display());
            return;
        }
        self.is_loading = false;

        match result {
            Ok(mut entries) => {
                for entry in entries.iter().filter(|e| e.is_dir()) {
                    if !self.folder_sizes.contains_key(&entry.path) {
                        self.sizer.request(entry.path.clone());
                    }
                }
                sort_entries(&mut entries, self.sort, &self.folder_sizes);
                info!(
                    "Listed {} ({} entries, {} folders to size)",
                    path.display(),
                    entries.len(),
                    self.sizer.pending()
                );
                self.entries = entries;
            }
            Err(e) => {
                error!("{:#}", e);
                self.entries.clear();
                self.error_message = Some(format!("{:#}", e));
            }
        }
    }

    fn after_move(&mut self, moved: bool) {
        if moved {
            self.load_location();
            self.save_state();
        }
    }

    fn enter(&mut self, path: PathBuf) {
        let moved = self.navigator.enter(path);
        self.after_move(moved);
    }

    fn go_up(&mut self) {
        let moved = self.navigator.go_up();
        self.after_move(moved);
    }

    fn go_back(&mut self) {
        let moved = self.navigator.go_back();
        self.after_move(moved);
    }

    fn go_forward(&mut self) {
        let moved = self.navigator.go_forward();
        self.after_move(moved);
    }

    fn show_drives(&mut self) {
        let moved = self.navigator.show_drives();
        self.after_move(moved);
    }

    fn refresh(&mut self) {
        // By parent: the listing may still be loading and `entries` empty.
        if let Some(dir) = self.navigator.current_dir().map(Path::to_path_buf) {
            self.folder_sizes
                .retain(|path, _| path.parent() != Some(dir.as_path()));
        }
        self.load_location();
    }

    fn submit_path_input(&mut self) {
        let typed = PathBuf::from(self.path_input.trim());
        match dunce::canonicalize(&typed) {
            Ok(path) if path.is_dir() => self.enter(path),
            _ => {
                warn!("Not a directory: {}", typed.display());
                self.error_message = Some(format!("Not a directory: {}", typed.display()));
            }
        }
        self.path_edit_mode = false;
    }

    // --- Operations ---

    fn open_entry(&mut self, index: usize) {
        let Some(entry) = self.entries.get(index) else {
            return;
        };
        let path = entry.path.clone();
        let follow_dir = match entry.file_type {
            FileType::Directory => true,
            FileType::Symlink => path.is_dir(),
            FileType::File | FileType::Unknown => false,
        };

        if follow_dir {
            self.enter(path);
        } else if let Err(e) = open::that(&path) {
            error!("Failed to open {}: {}", path.display(), e);
            self.error_message = Some(format!("Failed to open: {}", e));
        }
    }

    fn poll_sizes(&mut self) {
        let updates = self.sizer.poll(MAX_SIZE_UPDATES_PER_FRAME);
        if updates.is_empty() {
            return;
        }
        for (path, size) in updates {
            self.folder_sizes.insert(path, size);
        }
        if self.sort.column == SortColumn::Size {
            sort_entries(&mut self.entries, self.sort, &self.folder_sizes);
        }
    }

    fn click_header(&mut self, column: SortColumn) {
        self.sort.click(column);
        sort_entries(&mut self.entries, self.sort, &self.folder_sizes);
        self.save_state();
    }

    fn visible_indices(&self) -> Vec<usize> {
        let now = Local::now();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                self.filters
                    .matches(e, self.folder_sizes.get(&e.path).copied(), now)
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn move_selection(&mut self, visible: &[usize], delta: isize) {
        // `visible` can predate a reload that emptied `entries`.
        let paths: Vec<&PathBuf> = visible
            .iter()
            .filter_map(|&i| self.entries.get(i))
            .map(|e| &e.path)
            .collect();
        if paths.is_empty() {
            return;
        }
        let current = self
            .selected
            .as_ref()
            .and_then(|sel| paths.iter().position(|p| *p == sel));
        let next = match current {
            Some(pos) => (pos as isize + delta).clamp(0, paths.len() as isize - 1) as usize,
            None => 0,
        };
        let next_path = paths[next].clone();
        self.selected = Some(next_path);
        self.scroll_to_selected = true;
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context, visible: &[usize]) {
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::F)) {
            self.focus_search = true;
        }

        // Anything that reloads the listing ends the frame's shortcut handling.
        let reloaded = if ctx.input(|i| i.key_pressed(egui::Key::Backspace)) {
            self.go_up();
            true
        } else if ctx.input(|i| i.modifiers.alt && i.key_pressed(egui::Key::ArrowLeft)) {
            self.go_back();
            true
        } else if ctx.input(|i| i.modifiers.alt && i.key_pressed(egui::Key::ArrowRight)) {
            self.go_forward();
            true
        } else if ctx.input(|i| i.key_pressed(egui::Key::F5)) {
            self.refresh();
            true
        } else {
            false
        };
        if reloaded {
            return;
        }

        // Arrow key navigation
        if ctx.input(|i| !i.modifiers.alt && i.key_pressed(egui::Key::ArrowDown)) {
            self.move_selection(visible, 1);
        }
        if ctx.input(|i| !i.modifiers.alt && i.key_pressed(egui::Key::ArrowUp)) {
            self.move_selection(visible, -1);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
            let index = self
                .selected
                .as_ref()
                .and_then(|sel| self.entries.iter().position(|e| &e.path == sel));
            if let Some(index) = index {
                self.open_entry(index);
            }
        }
    }

    // --- Panels ---

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.navigator.can_go_back(), egui::Button::new("⬅"))
                .on_hover_text("Back (Alt+Left)")
                .clicked()
            {
                self.go_back();
            }
            if ui
                .add_enabled(self.navigator.can_go_forward(), egui::Button::new("➡"))
                .on_hover_text("Forward (Alt+Right)")
                .clicked()
            {
                self.go_forward();
            }
            if ui.button("⬆ Up").on_hover_text("Up Level (Backspace)").clicked() {
                self.go_up();
            }
            if ui.button("🖴 Drives").on_hover_text("Show Drives").clicked() {
                self.show_drives();
            }
            if ui.button("⟳").on_hover_text("Refresh (F5)").clicked() {
                self.refresh();
            }

            ui.separator();
            self.path_bar(ui);
        });

        ui.add_space(2.0);
        ui.horizontal(|ui| {
            egui::ComboBox::from_label("Type")
                .selected_text(self.filters.type_filter.label())
                .show_ui(ui, |ui| {
                    for option in TypeFilter::ALL {
                        ui.selectable_value(&mut self.filters.type_filter, option, option.label());
                    }
                });
            egui::ComboBox::from_label("Size")
                .selected_text(self.filters.size_filter.label())
                .show_ui(ui, |ui| {
                    for option in SizeFilter::ALL {
                        ui.selectable_value(&mut self.filters.size_filter, option, option.label());
                    }
                });
            egui::ComboBox::from_label("Modified")
                .selected_text(self.filters.date_filter.label())
                .show_ui(ui, |ui| {
                    for option in DateFilter::ALL {
                        ui.selectable_value(&mut self.filters.date_filter, option, option.label());
                    }
                });

            ui.separator();
            if ui.checkbox(&mut self.filters.show_hidden, "Hidden").changed() {
                self.save_state();
            }

            ui.separator();
            ui.label("🔍");
            let search_resp = ui.add(
                egui::TextEdit::singleline(&mut self.filters.query)
                    .hint_text("Filter by name...")
                    .desired_width(180.0),
            );
            if self.focus_search {
                search_resp.request_focus();
                self.focus_search = false;
            }

            if ui
                .add_enabled(self.filters.is_active(), egui::Button::new("✖ Clear"))
                .on_hover_text("Reset filters")
                .clicked()
            {
                self.filters.reset();
            }
        });
        ui.add_space(4.0);
    }

    fn path_bar(&mut self, ui: &mut egui::Ui) {
        if self.path_edit_mode {
            let path_resp = ui.add_sized(
                [ui.available_width().max(200.0), ui.available_height()],
                egui::TextEdit::singleline(&mut self.path_input).hint_text("Path..."),
            );
            if path_resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.submit_path_input();
            } else if path_resp.lost_focus() {
                self.path_edit_mode = false;
            } else {
                path_resp.request_focus();
            }
            return;
        }

        let mut path_to_navigate = None;
        match self.navigator.current() {
            Location::Drives => {
                ui.label(egui::RichText::new("Drives").strong());
            }
            Location::Directory(current) => {
                egui::ScrollArea::horizontal()
                    .id_salt("breadcrumbs")
                    .max_width(ui.available_width() - 40.0)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            let mut prefix = PathBuf::new();
                            let components: Vec<_> = current.components().collect();
                            for (i, comp) in components.iter().enumerate() {
                                prefix.push(comp);
                                let label = comp.as_os_str().to_string_lossy();
                                if ui.button(label.as_ref()).clicked() {
                                    path_to_navigate = Some(prefix.clone());
                                }
                                if i + 1 < components.len() {
                                    ui.label("›");
                                }
                            }
                        });
                    });
            }
        }
        if let Some(p) = path_to_navigate {
            self.enter(p);
        }

        if ui.button("✏").on_hover_text("Edit Path").clicked() {
            self.path_edit_mode = true;
            self.path_input = self.navigator.current().label();
        }
    }

    fn status_bar(&self, ui: &mut egui::Ui, visible: usize) {
        ui.horizontal(|ui| {
            match self.navigator.current() {
                Location::Drives => ui.label(format!("{} drives", self.drives.len())),
                Location::Directory(_) => {
                    ui.label(format!("{} of {} items", visible, self.entries.len()))
                }
            };
            let pending = self.sizer.pending();
            if pending > 0 {
                ui.separator();
                ui.spinner();
                ui.label(format!("Sizing {} folders", pending));
            }
            if let Some(err) = &self.error_message {
                ui.separator();
                ui.colored_label(egui::Color32::RED, format!("⚠ {}", err));
            }
        });
    }

    fn icon_for_entry(entry: &FileEntry) -> (&'static str, egui::Color32) {
        match entry.file_type {
            FileType::Directory => ("📁", egui::Color32::from_rgb(249, 226, 175)),
            FileType::Symlink => ("🔗", egui::Color32::from_rgb(148, 226, 213)),
            FileType::File => ("📄", egui::Color32::from_rgb(205, 214, 244)),
            FileType::Unknown => ("?", egui::Color32::from_rgb(243, 139, 168)),
        }
    }

    fn listing_table(&self, ui: &mut egui::Ui, visible: &[usize]) -> (Option<Action>, Option<SortColumn>) {
        let mut action = None;
        let mut header_clicked = None;
        let meta_color = egui::Color32::from_rgb(166, 173, 200);

        let mut table = TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::initial(320.0).at_least(120.0).resizable(true))
            .column(Column::initial(110.0).at_least(80.0).resizable(true))
            .column(Column::initial(90.0).at_least(60.0).resizable(true))
            .column(Column::remainder().at_least(120.0));

        if self.scroll_to_selected {
            let row = self.selected.as_ref().and_then(|sel| {
                visible.iter().position(|&i| &self.entries[i].path == sel)
            });
            if let Some(row) = row {
                table = table.scroll_to_row(row, None);
            }
        }

        table
            .header(22.0, |mut header| {
                for column in [
                    SortColumn::Name,
                    SortColumn::Size,
                    SortColumn::Type,
                    SortColumn::Modified,
                ] {
                    header.col(|ui| {
                        let label = egui::RichText::new(self.sort.header_label(column)).strong();
                        if ui.button(label).clicked() {
                            header_clicked = Some(column);
                        }
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, visible.len(), |mut row| {
                    let index = visible[row.index()];
                    let entry = &self.entries[index];
                    let is_selected = self.selected.as_ref() == Some(&entry.path);

                    row.col(|ui| {
                        let (icon, icon_color) = Self::icon_for_entry(entry);
                        ui.colored_label(icon_color, icon);
                        let name_resp = ui.selectable_label(is_selected, &entry.name);
                        if name_resp.double_clicked() {
                            action = Some(Action::Open(index));
                        } else if name_resp.clicked() {
                            action = Some(Action::Select(entry.path.clone()));
                        }
                    });
                    row.col(|ui| {
                        let size = if entry.is_dir() {
                            self.folder_sizes.get(&entry.path).copied()
                        } else {
                            Some(entry.size)
                        };
                        ui.colored_label(meta_color, format_size(size));
                    });
                    row.col(|ui| {
                        ui.colored_label(meta_color, type_label(entry));
                    });
                    row.col(|ui| {
                        ui.colored_label(meta_color, format_modified(entry.modified));
                    });
                });
            });

        (action, header_clicked)
    }

    fn drives_table(&self, ui: &mut egui::Ui) -> Option<Action> {
        let mut action = None;
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::initial(260.0).at_least(120.0).resizable(true))
            .column(Column::initial(160.0).at_least(80.0).resizable(true))
            .column(Column::initial(110.0).at_least(80.0).resizable(true))
            .column(Column::remainder().at_least(80.0))
            .header(22.0, |mut header| {
                for title in ["Mount Point", "Name", "Size", "Free"] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, self.drives.len(), |mut row| {
                    let drive = &self.drives[row.index()];
                    row.col(|ui| {
                        let label = format!("🖴 {}", drive.mount_point.to_string_lossy());
                        let resp = ui.selectable_label(false, label);
                        if resp.double_clicked() {
                            action = Some(Action::OpenDrive(drive.mount_point.clone()));
                        }
                    });
                    row.col(|ui| {
                        ui.label(&drive.name);
                    });
                    row.col(|ui| {
                        ui.label(format_size(Some(drive.total_space)));
                    });
                    row.col(|ui| {
                        ui.label(format_size(Some(drive.available_space)));
                    });
                });
            });
        action
    }
}

impl eframe::App for FileManagerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Event Handling ---
        while let Ok((path, result)) = self.load_res_rx.try_recv() {
            self.apply_listing(path, result);
        }
        self.poll_sizes();

        let visible = self.visible_indices();
        self.handle_shortcuts(ctx, &visible);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            self.toolbar(ui);
        });

        // Navigation from the toolbar may have replaced the listing.
        let visible = self.visible_indices();

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            self.status_bar(ui, visible.len());
        });

        let mut action = None;
        let mut header_clicked = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.is_loading {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
                return;
            }
            match self.navigator.current() {
                Location::Drives => action = self.drives_table(ui),
                Location::Directory(_) => {
                    (action, header_clicked) = self.listing_table(ui, &visible);
                }
            }
        });
        self.scroll_to_selected = false;

        if let Some(column) = header_clicked {
            self.click_header(column);
        }
        match action {
            Some(Action::Open(index)) => self.open_entry(index),
            Some(Action::OpenDrive(path)) => self.enter(path),
            Some(Action::Select(path)) => self.selected = Some(path),
            None => {}
        }

        if self.is_loading || self.sizer.pending() > 0 {
            ctx.request_repaint_after(SIZE_POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Instant;
    use tempfile::TempDir;

    fn app_at(dir: &Path) -> FileManagerApp {
        FileManagerApp::with_context(
            egui::Context::default(),
            Location::Directory(dir.to_path_buf()),
            AppConfig::default(),
            None,
        )
    }

    /// Applies the listing synchronously instead of waiting for the loader thread.
    fn list_now(app: &mut FileManagerApp, dir: &Path) {
        app.apply_listing(dir.to_path_buf(), read_directory(dir));
    }

    fn key_press(key: egui::Key) -> egui::Event {
        egui::Event::Key {
            key,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        }
    }

    fn two_file_listing(tmp: &TempDir) -> PathBuf {
        let dir = tmp.path().join("listing");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.txt"), "a").unwrap();
        fs::write(dir.join("b.txt"), "b").unwrap();
        dir
    }

    #[test]
    fn start_location_prefers_argument() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::default();
        let expected = dunce::canonicalize(tmp.path()).unwrap();
        assert_eq!(
            start_location(Some(tmp.path().to_path_buf()), &config),
            Location::Directory(expected)
        );
    }

    #[test]
    fn start_location_falls_back_to_last_path() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig {
            last_path: Some(tmp.path().to_path_buf()),
            ..AppConfig::default()
        };
        let bogus = tmp.path().join("missing");
        assert_eq!(
            start_location(Some(bogus), &config),
            Location::Directory(tmp.path().to_path_buf())
        );
    }

    #[test]
    fn start_location_skips_stale_last_path() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig {
            last_path: Some(tmp.path().join("deleted")),
            ..AppConfig::default()
        };
        let expected = match std::env::current_dir() {
            Ok(cwd) => Location::Directory(cwd),
            Err(_) => Location::Drives,
        };
        assert_eq!(start_location(None, &config), expected);
    }

    #[test]
    fn arrow_key_in_the_same_frame_as_go_up_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let dir = two_file_listing(&tmp);
        let mut app = app_at(&dir);
        list_now(&mut app, &dir);
        let visible = app.visible_indices();
        assert_eq!(visible, vec![0, 1]);

        let ctx = egui::Context::default();
        let input = egui::RawInput {
            events: vec![
                key_press(egui::Key::Backspace),
                key_press(egui::Key::ArrowDown),
            ],
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| app.handle_shortcuts(ctx, &visible));

        assert_eq!(
            app.navigator.current(),
            &Location::Directory(tmp.path().to_path_buf())
        );
        assert!(app.entries.is_empty());
        assert_eq!(app.selected, None);
    }

    #[test]
    fn arrow_key_in_the_same_frame_as_refresh_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let dir = two_file_listing(&tmp);
        let mut app = app_at(&dir);
        list_now(&mut app, &dir);
        let visible = app.visible_indices();

        let ctx = egui::Context::default();
        let input = egui::RawInput {
            events: vec![key_press(egui::Key::F5), key_press(egui::Key::ArrowUp)],
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| app.handle_shortcuts(ctx, &visible));

        assert!(app.entries.is_empty());
        assert_eq!(app.selected, None);
    }

    #[test]
    fn move_selection_skips_indices_from_an_old_listing() {
        let tmp = TempDir::new().unwrap();
        let dir = two_file_listing(&tmp);
        let mut app = app_at(&dir);
        list_now(&mut app, &dir);

        app.move_selection(&[0, 1], 1);
        assert_eq!(app.selected, Some(dir.join("a.txt")));
        app.move_selection(&[0, 1], 1);
        assert_eq!(app.selected, Some(dir.join("b.txt")));

        app.entries.clear();
        app.move_selection(&[0, 1], 1);
        assert_eq!(app.selected, Some(dir.join("b.txt")));
    }

    #[test]
    fn listing_for_a_location_already_left_is_dropped() {
        let tmp = TempDir::new().unwrap();
        let dir = two_file_listing(&tmp);
        let mut app = app_at(&dir);
        list_now(&mut app, &dir);

        app.apply_listing(tmp.path().to_path_buf(), Ok(Vec::new()));
        assert_eq!(app.entries.len(), 2);
    }

    #[test]
    fn failed_listing_clears_entries_and_reports() {
        let tmp = TempDir::new().unwrap();
        let dir = two_file_listing(&tmp);
        let mut app = app_at(&dir);
        list_now(&mut app, &dir);
        assert_eq!(app.entries.len(), 2);

        app.apply_listing(dir.clone(), Err(anyhow::anyhow!("Cannot open listing")));
        assert!(app.entries.is_empty());
        assert!(!app.is_loading);
        assert_eq!(app.error_message.as_deref(), Some("Cannot open listing"));
    }

    #[test]
    fn cached_folder_sizes_are_not_requested_again() {
        let tmp = TempDir::new().unwrap();
        let cached = tmp.path().join("cached");
        let fresh = tmp.path().join("fresh");
        fs::create_dir(&cached).unwrap();
        fs::create_dir(&fresh).unwrap();

        let mut app = app_at(tmp.path());
        app.folder_sizes.insert(cached.clone(), 42);
        list_now(&mut app, tmp.path());

        assert_eq!(app.sizer.pending(), 1);
        assert_eq!(app.folder_sizes.get(&cached), Some(&42));
    }

    #[test]
    fn poll_sizes_fills_the_cache() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("data"), [0u8; 7]).unwrap();

        let mut app = app_at(tmp.path());
        list_now(&mut app, tmp.path());

        let deadline = Instant::now() + Duration::from_secs(10);
        while app.sizer.pending() > 0 && Instant::now() < deadline {
            app.poll_sizes();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(app.folder_sizes.get(&sub), Some(&7));
    }

    #[test]
    fn refresh_clears_child_sizes_even_while_loading() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("current");
        let child = dir.join("child");
        let sibling = tmp.path().join("sibling");
        fs::create_dir_all(&child).unwrap();

        let mut app = app_at(&dir);
        list_now(&mut app, &dir);
        app.folder_sizes.insert(child.clone(), 10);
        app.folder_sizes.insert(sibling.clone(), 20);

        // Listing requested but not yet delivered.
        app.load_location();
        assert!(app.entries.is_empty());

        app.refresh();
        assert!(!app.folder_sizes.contains_key(&child));
        assert_eq!(app.folder_sizes.get(&sibling), Some(&20));
    }

    #[test]
    fn moving_away_forgets_unrelated_sizes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");
        fs::create_dir_all(&dir).unwrap();

        let mut app = app_at(&dir);
        let below = dir.join("c");
        let ancestor_child = tmp.path().join("a").join("x");
        let unrelated = tmp.path().join("z").join("y");
        app.folder_sizes.insert(below.clone(), 1);
        app.folder_sizes.insert(ancestor_child.clone(), 2);
        app.folder_sizes.insert(unrelated.clone(), 3);

        app.load_location();
        assert!(app.folder_sizes.contains_key(&below));
        assert!(app.folder_sizes.contains_key(&ancestor_child));
        assert!(!app.folder_sizes.contains_key(&unrelated));
    }
}

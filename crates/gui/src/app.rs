//! Main window: image table, export controls, status log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eframe::egui;
use webpanim_core::document::{Document, ExportConfig, ImageEntry};
use webpanim_core::export;
use webpanim_core::settings;
use webpanim_core::store::{ImageStore, MoveDirection};

const THUMB_SIZE: egui::Vec2 = egui::Vec2::new(80.0, 45.0);

// ─── Status log ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum LogKind {
    Info,
    Error,
}

struct LogLine {
    kind: LogKind,
    text: String,
}

// ─── Edit actions ───────────────────────────────────────────────

/// Actions shared by the Edit menu and the row context menu.
#[derive(Debug, Clone, Copy, PartialEq)]
enum EditAction {
    Copy,
    Paste,
    Delete,
    MoveUp,
    MoveDown,
}

// ─── Main app ───────────────────────────────────────────────────

pub struct WebpanimApp {
    config: ExportConfig,
    store: ImageStore,
    /// Selected row indices, kept sorted.
    selected: Vec<usize>,
    /// Click anchor for shift-selection.
    select_anchor: Option<usize>,
    /// App-local copy slot for duration paste.
    copied: Option<u32>,
    log_lines: Vec<LogLine>,
    settings_file: PathBuf,
    /// Lazily decoded thumbnails, keyed by table path. `None` marks a
    /// path that failed to decode so it is not retried every frame.
    thumbnails: HashMap<String, Option<egui::TextureHandle>>,
}

impl WebpanimApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings_file = settings::settings_path();
        let config = settings::load(&settings_file);

        Self {
            config,
            store: ImageStore::new(),
            selected: Vec::new(),
            select_anchor: None,
            copied: None,
            log_lines: Vec::new(),
            settings_file,
            thumbnails: HashMap::new(),
        }
    }

    // ─── Log helpers ────────────────────────────────────────────

    fn log_info(&mut self, text: impl Into<String>) {
        self.log_lines.push(LogLine {
            kind: LogKind::Info,
            text: text.into(),
        });
    }

    fn log_error(&mut self, text: impl Into<String>) {
        self.log_lines.push(LogLine {
            kind: LogKind::Error,
            text: text.into(),
        });
    }

    fn clear_log(&mut self) {
        self.log_lines.clear();
    }

    // ─── Document state ─────────────────────────────────────────

    fn current_document(&self) -> Document {
        Document {
            config: self.config.clone(),
            images: self.store.to_vec(),
        }
    }

    fn set_document(&mut self, document: Document) {
        self.config = document.config;
        self.store.replace_all(document.images);
        self.selected.clear();
        self.select_anchor = None;
        self.thumbnails.clear();
    }

    /// Directory beside the current destination, for dialog start dirs.
    fn dst_dir(&self) -> Option<PathBuf> {
        let dst = self.config.dst_path.trim();
        if dst.is_empty() {
            return None;
        }
        Path::new(dst)
            .parent()
            .filter(|p| p.is_dir())
            .map(Path::to_path_buf)
    }

    fn new_document(&mut self) {
        self.set_document(Document::default());
        self.clear_log();
        self.log_info("New");
    }

    fn open_document(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("JSON File", &["json"]);
        if let Some(dir) = self.dst_dir() {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.pick_file() else { return };

        self.clear_log();
        match Document::load(&path) {
            Ok(document) => {
                self.set_document(document);
                self.log_info(format!("Open: {}", path.display()));
            }
            Err(e) => self.log_error(format!("[ERROR] Open failed: {e:#}")),
        }
    }

    fn save_document(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("JSON File", &["json"])
            .set_file_name("animation.json");
        if let Some(dir) = self.dst_dir() {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else { return };

        self.clear_log();
        match self.current_document().save(&path) {
            Ok(()) => self.log_info(format!("Save: {}", path.display())),
            Err(e) => self.log_error(format!("[ERROR] Save failed: {e:#}")),
        }
    }

    fn browse_destination(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("WebP", &["webp"])
            .set_file_name("animation.webp");
        if let Some(dir) = self.dst_dir() {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.save_file() {
            self.config.dst_path = path.to_string_lossy().replace('\\', "/");
        }
    }

    // ─── Selection ──────────────────────────────────────────────

    fn is_selected(&self, row: usize) -> bool {
        self.selected.binary_search(&row).is_ok()
    }

    fn handle_click(&mut self, row: usize, modifiers: egui::Modifiers) {
        if modifiers.shift {
            let anchor = self.select_anchor.unwrap_or(row);
            let (lo, hi) = if anchor <= row { (anchor, row) } else { (row, anchor) };
            self.selected = (lo..=hi).collect();
        } else if modifiers.ctrl || modifiers.command {
            match self.selected.binary_search(&row) {
                Ok(i) => {
                    self.selected.remove(i);
                }
                Err(i) => self.selected.insert(i, row),
            }
            self.select_anchor = Some(row);
        } else {
            self.selected = vec![row];
            self.select_anchor = Some(row);
        }
    }

    // ─── Edit actions ───────────────────────────────────────────

    fn apply_edit(&mut self, action: EditAction, ctx: &egui::Context) {
        match action {
            EditAction::Copy => {
                if let Some(entry) = self.selected.first().and_then(|&row| self.store.get(row)) {
                    self.copied = Some(entry.duration);
                    ctx.copy_text(entry.duration.to_string());
                }
            }
            EditAction::Paste => {
                let Some(value) = self.copied else { return };
                for &row in &self.selected {
                    if let Some(entry) = self.store.get_mut(row) {
                        entry.duration = value.max(1);
                    }
                }
            }
            EditAction::Delete => {
                if !self.selected.is_empty() {
                    self.store.remove_rows(&self.selected);
                    self.selected.clear();
                    self.select_anchor = None;
                }
            }
            EditAction::MoveUp => self.move_selected(MoveDirection::Up),
            EditAction::MoveDown => self.move_selected(MoveDirection::Down),
        }
    }

    fn move_selected(&mut self, direction: MoveDirection) {
        if self.selected.is_empty() {
            return;
        }
        self.selected = self.store.move_rows(&self.selected, direction);
        self.select_anchor = self.selected.first().copied();
    }

    // ─── Drag-and-drop ──────────────────────────────────────────

    /// Append dropped local `.png` files in sorted order, one log line
    /// each. Everything else is ignored.
    fn take_dropped(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if dropped.is_empty() {
            return;
        }

        let mut paths: Vec<String> = dropped
            .into_iter()
            .filter(|p| p.is_file())
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return;
        }

        self.clear_log();
        for path in paths {
            self.log_info(format!("add: {path}"));
            self.store.push(ImageEntry::new(path));
        }
    }

    // ─── Thumbnails ─────────────────────────────────────────────

    fn thumbnail(&mut self, ctx: &egui::Context, path: &str) -> Option<egui::TextureHandle> {
        if let Some(cached) = self.thumbnails.get(path) {
            return cached.clone();
        }
        let texture = load_thumbnail(ctx, path);
        self.thumbnails.insert(path.to_string(), texture.clone());
        texture
    }

    // ─── Export ─────────────────────────────────────────────────

    fn export(&mut self) {
        self.clear_log();
        let document = self.current_document();
        let plan = match export::plan(&document) {
            Ok(plan) => plan,
            Err(e) => {
                self.log_error(format!("[ERROR] {e}"));
                return;
            }
        };

        self.log_info(format!("Destination: {}", plan.dst_path.display()));
        self.log_info(format!("Encoding {} frames...", plan.frames.len()));
        match export::run(&plan) {
            Ok(path) => self.log_info(format!("Done! {}", path.display())),
            Err(e) => self.log_error(format!("[ERROR] {e}")),
        }
    }

    // ─── UI sections ────────────────────────────────────────────

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("New").clicked() {
                    ui.close_menu();
                    self.new_document();
                }
                if ui.button("Open...").clicked() {
                    ui.close_menu();
                    self.open_document();
                }
                if ui.button("Save...").clicked() {
                    ui.close_menu();
                    self.save_document();
                }
                ui.separator();
                if ui.button("Exit").clicked() {
                    ui.close_menu();
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
            ui.menu_button("Edit", |ui| {
                let mut action = None;
                if ui.button("Copy").clicked() {
                    action = Some(EditAction::Copy);
                }
                if ui.button("Paste").clicked() {
                    action = Some(EditAction::Paste);
                }
                if ui.button("Delete").clicked() {
                    action = Some(EditAction::Delete);
                }
                ui.separator();
                if ui.button("Move Up").clicked() {
                    action = Some(EditAction::MoveUp);
                }
                if ui.button("Move Down").clicked() {
                    action = Some(EditAction::MoveDown);
                }
                if let Some(action) = action {
                    ui.close_menu();
                    self.apply_edit(action, ctx);
                }
            });
        });
    }

    fn export_panel(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label("Destination:");
            if ui.button("Browse...").clicked() {
                self.browse_destination();
            }
            ui.add(
                egui::TextEdit::singleline(&mut self.config.dst_path)
                    .hint_text("out/animation.webp")
                    .desired_width(f32::INFINITY),
            );
        });
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.config.is_loop, "Loop");
            ui.checkbox(&mut self.config.is_lossless, "Lossless");
            ui.separator();
            ui.label("Quality:");
            ui.add(egui::DragValue::new(&mut self.config.quality).range(0..=100));
        });
        ui.vertical_centered(|ui| {
            let button = egui::Button::new(egui::RichText::new("Create WebP").size(16.0).strong())
                .min_size(egui::vec2(180.0, 28.0));
            if ui.add(button).clicked() {
                self.export();
            }
        });
        ui.add_space(4.0);
    }

    fn log_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Log");
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for line in &self.log_lines {
                    match line.kind {
                        LogKind::Info => {
                            ui.monospace(&line.text);
                        }
                        LogKind::Error => {
                            ui.label(
                                egui::RichText::new(&line.text)
                                    .monospace()
                                    .color(egui::Color32::RED),
                            );
                        }
                    }
                }
                if self.log_lines.is_empty() {
                    ui.weak("No log messages yet");
                }
            });
    }

    fn table(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let mut clicked: Option<(usize, egui::Modifiers)> = None;
        let mut action: Option<EditAction> = None;

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for row in 0..self.store.len() {
                    let path = match self.store.get(row) {
                        Some(entry) => entry.path.clone(),
                        None => continue,
                    };
                    let texture = self.thumbnail(ctx, &path);
                    let selected = self.is_selected(row);
                    let name = Path::new(&path)
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.clone());

                    ui.horizontal(|ui| {
                        match &texture {
                            Some(tex) => {
                                ui.image(egui::load::SizedTexture::new(tex.id(), tex.size_vec2()));
                            }
                            None => {
                                let (rect, _) =
                                    ui.allocate_exact_size(THUMB_SIZE, egui::Sense::hover());
                                ui.painter().rect_filled(
                                    rect,
                                    egui::CornerRadius::same(2),
                                    ui.visuals().extreme_bg_color,
                                );
                                ui.painter().text(
                                    rect.center(),
                                    egui::Align2::CENTER_CENTER,
                                    "?",
                                    egui::FontId::proportional(16.0),
                                    ui.visuals().weak_text_color(),
                                );
                            }
                        }

                        let label = ui.selectable_label(selected, &name).on_hover_text(&path);
                        if label.clicked() {
                            clicked = Some((row, ui.input(|i| i.modifiers)));
                        }
                        label.context_menu(|ui| {
                            for (text, a) in [
                                ("Copy", EditAction::Copy),
                                ("Paste", EditAction::Paste),
                                ("Delete", EditAction::Delete),
                            ] {
                                if ui.button(text).clicked() {
                                    action = Some(a);
                                    ui.close_menu();
                                }
                            }
                            ui.separator();
                            for (text, a) in [
                                ("Move Up", EditAction::MoveUp),
                                ("Move Down", EditAction::MoveDown),
                            ] {
                                if ui.button(text).clicked() {
                                    action = Some(a);
                                    ui.close_menu();
                                }
                            }
                        });

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if let Some(entry) = self.store.get_mut(row) {
                                ui.add(
                                    egui::DragValue::new(&mut entry.duration)
                                        .range(1..=600_000)
                                        .suffix(" ms"),
                                );
                            }
                            ui.label("Duration:");
                        });
                    });
                }
            });

        // Selection updates land before context-menu actions so the
        // action targets the row that was just clicked.
        if let Some((row, modifiers)) = clicked {
            self.handle_click(row, modifiers);
        }
        if let Some(action) = action {
            self.apply_edit(action, ctx);
        }
    }
}

impl eframe::App for WebpanimApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.take_dropped(ctx);

        if ctx.input(|i| i.key_pressed(egui::Key::Delete)) && !ctx.wants_keyboard_input() {
            self.apply_edit(EditAction::Delete, ctx);
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
        });

        // Bottom panels stack outside-in: log sits below the export controls.
        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .min_height(80.0)
            .default_height(140.0)
            .show(ctx, |ui| {
                self.log_panel(ui);
            });

        egui::TopBottomPanel::bottom("export_panel").show(ctx, |ui| {
            self.export_panel(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Images");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("{} frame(s)", self.store.len()));
                });
            });
            ui.separator();

            if self.store.is_empty() {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.weak("Drop .png files here to add frames");
                });
            } else {
                self.table(ctx, ui);
            }
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = settings::save(&self.settings_file, &self.config) {
            log::warn!("Failed to save settings: {e:#}");
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────

/// Decode `path` and downscale it to the table's thumbnail size.
fn load_thumbnail(ctx: &egui::Context, path: &str) -> Option<egui::TextureHandle> {
    let img = image::open(path).ok()?;
    let thumb = img
        .thumbnail(THUMB_SIZE.x as u32, THUMB_SIZE.y as u32)
        .to_rgba8();
    let (w, h) = thumb.dimensions();
    let color = egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], &thumb);
    Some(ctx.load_texture(format!("thumb:{path}"), color, egui::TextureOptions::LINEAR))
}

use eframe::egui::{
    Color32, ComboBox, Context, FontId, Grid, Label, RichText, Sense, TextWrapMode, Ui,
};
use rfd::FileDialog;

use libmdpp_soft_trigger::orchestrator::Orchestrator;
use libmdpp_soft_trigger::settings::SettingsForm;
use libmdpp_soft_trigger::status::StatusLevel;
use libmdpp_soft_trigger::text_fitter::TextMetric;

const STATUS_HEIGHT: f32 = 48.0;

struct EguiMetric<'a> {
    ctx: &'a Context,
}

impl TextMetric for EguiMetric<'_> {
    fn wrapped_height(&self, text: &str, font_size: f32, wrap_width: f32) -> f32 {
        self.ctx
            .fonts(|fonts| {
                fonts.layout(
                    text.to_owned(),
                    FontId::proportional(font_size),
                    Color32::WHITE,
                    wrap_width,
                )
            })
            .size()
            .y
    }
}

fn json_dialog(title: &str) -> FileDialog {
    let dialog = FileDialog::new()
        .set_title(title)
        .add_filter("JSON files", &["json"]);
    match std::env::current_dir() {
        Ok(dir) => dialog.set_directory(dir),
        Err(_) => dialog,
    }
}

/// The online soft trigger settings console
pub struct ControlApp {
    orchestrator: Orchestrator,
    form: SettingsForm,
}

impl ControlApp {
    /// Create the application
    pub fn new(cc: &eframe::CreationContext<'_>, orchestrator: Orchestrator) -> Self {
        let mut visuals = eframe::egui::Visuals::dark();
        visuals.override_text_color = Some(Color32::LIGHT_GRAY);
        cc.egui_ctx.set_visuals(visuals);
        let form = orchestrator.form();
        ControlApp { orchestrator, form }
    }

    fn load(&mut self) {
        match json_dialog("Load settings from file").pick_file() {
            Some(path) => {
                if self.orchestrator.load_settings(&path).is_ok() {
                    self.form = self.orchestrator.form();
                }
            }
            None => self
                .orchestrator
                .report(StatusLevel::Warning, "No changes made!"),
        }
    }

    fn save(&mut self) {
        match json_dialog("Save settings to file").save_file() {
            Some(path) => {
                if self.orchestrator.update_settings(&self.form).is_ok() {
                    if let Ok(written) = self.orchestrator.save_settings(&path) {
                        log::info!("Saved settings to {}", written.display());
                    }
                }
            }
            None => self
                .orchestrator
                .report(StatusLevel::Warning, "Nothing saved!"),
        }
    }

    fn render_settings(&mut self, ui: &mut Ui, names: &[String]) {
        ui.label("Input ring:");
        ui.text_edit_singleline(&mut self.form.input);
        ui.end_row();

        ui.label("Output ring:");
        ui.text_edit_singleline(&mut self.form.output);
        ui.end_row();

        ui.label(format!("Trigger Channel {}:", self.form.trigger_channel));
        let current = names
            .get(self.form.trigger_channel as usize)
            .map(|name| name.as_str())
            .unwrap_or("");
        ComboBox::from_id_source("trigger_channel")
            .selected_text(format!("{}: {current}", self.form.trigger_channel))
            .show_ui(ui, |ui| {
                for (ch, name) in names.iter().enumerate() {
                    ui.selectable_value(
                        &mut self.form.trigger_channel,
                        ch as i64,
                        format!("{ch}: {name}"),
                    );
                }
            });
        ui.end_row();

        ui.label("Channel name:");
        let mut name = current.to_string();
        if ui.text_edit_singleline(&mut name).changed() {
            if let Err(e) = self
                .orchestrator
                .set_channel_name(self.form.trigger_channel, &name)
            {
                self.orchestrator.report(StatusLevel::Error, &e.to_string());
            }
        }
        ui.end_row();

        ui.label("Window Start:");
        ui.text_edit_singleline(&mut self.form.window_start);
        ui.end_row();

        ui.label("Window Width:");
        ui.text_edit_singleline(&mut self.form.window_width);
        ui.end_row();
    }

    fn render_status(&mut self, ui: &mut Ui) {
        let (rect, _) = ui.allocate_exact_size(
            eframe::epaint::vec2(ui.available_width(), STATUS_HEIGHT),
            Sense::hover(),
        );
        let metric = EguiMetric { ctx: ui.ctx() };
        let size = self
            .orchestrator
            .status_font_size(&metric, rect.width(), rect.height());
        let status = self.orchestrator.status();
        let [r, g, b] = status.level.rgb();
        ui.put(
            rect,
            Label::new(
                RichText::new(&status.text)
                    .size(size)
                    .color(Color32::from_rgb(r, g, b)),
            )
            .wrap_mode(TextWrapMode::Wrap),
        );
    }
}

impl eframe::App for ControlApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let names = self.orchestrator.settings().channel_names().to_vec();
        eframe::egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Load...").clicked() {
                    self.load();
                }
                if ui.button("Save...").clicked() {
                    self.save();
                }
            });

            ui.separator();
            ui.label(
                RichText::new("Soft Trigger Settings")
                    .color(Color32::LIGHT_BLUE)
                    .size(18.0),
            );
            Grid::new("SettingsGrid").show(ui, |ui| {
                self.render_settings(ui, &names);
            });

            if ui.button("Apply").clicked() {
                log::info!("Applying settings...");
                if let Err(e) = self.orchestrator.apply_settings(&self.form) {
                    log::warn!("Settings not applied: {e}");
                }
            }

            ui.separator();
            self.render_status(ui);
        });
    }
}

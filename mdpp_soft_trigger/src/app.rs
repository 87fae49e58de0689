use std::time::Duration;

use eframe::egui::{
    Color32, ComboBox, Context, FontId, Grid, Label, RichText, Sense, TextWrapMode, Ui,
};
use rfd::FileDialog;

use libmdpp_soft_trigger::orchestrator::Orchestrator;
use libmdpp_soft_trigger::settings::SettingsForm;
use libmdpp_soft_trigger::status::StatusLevel;
use libmdpp_soft_trigger::text_fitter::{TextFitter, TextMetric};

const STATUS_HEIGHT: f32 = 48.0;
const PATH_LABEL_WIDTH: f32 = 300.0;
const PATH_LABEL_HEIGHT: f32 = 18.0;
const PATH_START_SIZE: f32 = 14.0;

/// Measures text with the fonts egui renders with
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

/// A path label whose font size is refit only when its text changes
#[derive(Debug, Default)]
struct FittedLabel {
    text: String,
    size: Option<f32>,
}

impl FittedLabel {
    fn show(&mut self, ui: &mut Ui, text: &str) {
        let size = match self.size {
            Some(size) if self.text == text => size,
            _ => {
                let metric = EguiMetric { ctx: ui.ctx() };
                let size = TextFitter::PATH_LABEL.fit(
                    &metric,
                    text,
                    PATH_LABEL_WIDTH,
                    PATH_LABEL_HEIGHT,
                    PATH_START_SIZE,
                );
                self.text = text.to_string();
                self.size = Some(size);
                size
            }
        };
        let (rect, _) = ui.allocate_exact_size(
            eframe::epaint::vec2(PATH_LABEL_WIDTH, PATH_LABEL_HEIGHT),
            Sense::hover(),
        );
        ui.put(
            rect,
            Label::new(RichText::new(text).size(size)).wrap_mode(TextWrapMode::Wrap),
        );
    }
}

fn file_dialog() -> FileDialog {
    let dialog = FileDialog::new().add_filter("evt files", &["evt"]);
    match std::env::current_dir() {
        Ok(dir) => dialog.set_directory(dir),
        Err(_) => dialog,
    }
}

fn channel_combo(ui: &mut Ui, id: &str, selected: &mut i64, names: &[String]) {
    let current = names
        .get(*selected as usize)
        .map(|name| name.as_str())
        .unwrap_or("");
    ComboBox::from_id_source(id)
        .selected_text(format!("{selected}: {current}"))
        .show_ui(ui, |ui| {
            for (ch, name) in names.iter().enumerate() {
                ui.selectable_value(selected, ch as i64, format!("{ch}: {name}"));
            }
        });
}

/// The offline soft trigger console.
///
/// All state lives in the Orchestrator; the app only keeps the values being edited.
pub struct SoftTriggerApp {
    orchestrator: Orchestrator,
    form: SettingsForm,
    input_label: FittedLabel,
    output_label: FittedLabel,
}

impl SoftTriggerApp {
    /// Create the application
    pub fn new(cc: &eframe::CreationContext<'_>, orchestrator: Orchestrator) -> Self {
        let mut visuals = eframe::egui::Visuals::dark();
        visuals.override_text_color = Some(Color32::LIGHT_GRAY);
        cc.egui_ctx.set_visuals(visuals);
        let form = orchestrator.form();
        SoftTriggerApp {
            orchestrator,
            form,
            input_label: FittedLabel::default(),
            output_label: FittedLabel::default(),
        }
    }

    fn render_files(&mut self, ui: &mut Ui) {
        ui.label("Input file:");
        self.input_label.show(ui, &self.form.input);
        if ui.button("Browse...").clicked() {
            match file_dialog().set_title("File to convert").pick_file() {
                Some(path) => self.form.input = path.to_string_lossy().to_string(),
                None => self
                    .orchestrator
                    .report(StatusLevel::Warning, "Nothing selected!"),
            }
        }
        ui.end_row();

        ui.label("Output file:");
        self.output_label.show(ui, &self.form.output);
        if ui.button("Browse...").clicked() {
            match file_dialog()
                .set_title("Converted file saving to")
                .save_file()
            {
                Some(path) => self.form.output = path.to_string_lossy().to_string(),
                None => self
                    .orchestrator
                    .report(StatusLevel::Warning, "Nothing selected!"),
            }
        }
        ui.end_row();
    }

    fn render_trigger(&mut self, ui: &mut Ui, names: &[String]) {
        ui.label(format!("Trigger Channel {}:", self.form.trigger_channel));
        channel_combo(ui, "trigger_channel", &mut self.form.trigger_channel, names);
        ui.end_row();

        ui.label("Channel name:");
        let mut name = names
            .get(self.form.trigger_channel as usize)
            .cloned()
            .unwrap_or_default();
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

        ui.checkbox(&mut self.form.cut3s, "cut3s");
        ui.end_row();

        ui.checkbox(&mut self.form.rf_enabled, "RF cut");
        ui.add_enabled_ui(self.form.rf_enabled, |ui| {
            channel_combo(ui, "rf_channel", &mut self.form.rf_channel, names);
        });
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

impl eframe::App for SoftTriggerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if let Some(result) = self.orchestrator.poll() {
            log::info!("Conversion ended: {:?}", result.status);
        }
        let enabled = self.orchestrator.controls_enabled();
        let names = self.orchestrator.settings().channel_names().to_vec();

        eframe::egui::CentralPanel::default().show(ctx, |ui| {
            ui.label(
                RichText::new("Configuration")
                    .color(Color32::LIGHT_BLUE)
                    .size(18.0),
            );
            ui.add_enabled_ui(enabled, |ui| {
                Grid::new("ConversionGrid").show(ui, |ui| {
                    self.render_files(ui);
                    self.render_trigger(ui, &names);
                });

                // You can only click start if there isn't already a conversion running
                if ui.button("Start").clicked() {
                    log::info!("Starting conversion...");
                    if let Err(e) = self.orchestrator.validate_and_start(&self.form) {
                        log::warn!("Conversion not started: {e}");
                    }
                }
            });

            ui.separator();
            self.render_status(ui);
        });

        if self.orchestrator.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}

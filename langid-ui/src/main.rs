use std::time::Duration;

use eframe::{egui, Frame};
use egui::Context;

use reqwest::blocking::Client;
use reqwest::Result;
use serde::Deserialize;

/// One row of a `/v1/guess?format=json` answer.
#[derive(Debug, Deserialize)]
struct LanguageScore {
    language: String,
    probability: f32,
}

/// REST context holding a reusable blocking HTTP client.
struct RESTContext {
    client: Client,
    base_url: String,
}

impl RESTContext {
    /// Creates a new REST context with a timeout.
    ///
    /// The server address comes from `LANGID_SERVER_URL`.
    fn new() -> Result<Self> {
        let base_url = std::env::var("LANGID_SERVER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000".to_owned());
        Self::with_base_url(&base_url)
    }

    fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::new(5, 0))
            .build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a POST request to `/v1/guess` with the text as body.
    fn post_guess(&self, text: &str) -> Result<Vec<LanguageScore>> {
        self.client
            .post(self.url("/v1/guess"))
            .query(&[("format", "json")])
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(text.to_owned())
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a GET request to `/v1/models`.
    fn get_models(&self) -> Result<String> {
        self.client
            .get(self.url("/v1/models"))
            .send()?
            .error_for_status()?
            .text()
    }

    /// Sends a GET request to `/v1/loaded_model`.
    fn get_loaded_model(&self) -> Result<String> {
        self.client
            .get(self.url("/v1/loaded_model"))
            .send()?
            .error_for_status()?
            .text()
    }

    /// Sends a PUT request to `/v1/load_model`.
    ///
    /// Loading a large model may take longer than the default timeout.
    fn put_load_model(&self, name: &str) -> Result<String> {
        self.client
            .put(self.url("/v1/load_model"))
            .query(&[("name", name)])
            .timeout(Duration::new(60, 0))
            .send()?
            .error_for_status()?
            .text()
    }
}

/// Global UI state (MUST persist between frames in egui).
struct LanguageGuesserUI {
    rest: RESTContext,
    text: String,
    scores: Vec<LanguageScore>,
    status: Option<String>,

    available_models: Vec<String>,
    selected_model: String,
    loaded_model: String,
}

impl LanguageGuesserUI {
    /// Initializes the UI and fetches the model list.
    fn new() -> Result<Self> {
        let mut ui = Self {
            rest: RESTContext::new()?,
            text: String::new(),
            scores: Vec::new(),
            status: None,

            available_models: Vec::new(),
            selected_model: String::new(),
            loaded_model: String::new(),
        };
        ui.get_models();
        ui.get_loaded_model();
        Ok(ui)
    }

    /// Performs the guess request.
    fn post_guess(&mut self) {
        match self.rest.post_guess(&self.text) {
            Ok(scores) => {
                self.scores = scores;
                self.status = None;
            }
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    /// Performs the get models request.
    fn get_models(&mut self) {
        match self.rest.get_models() {
            Ok(models) => {
                self.available_models = models
                    .lines()
                    .map(|s| s.trim().to_owned())
                    .filter(|s| !s.is_empty())
                    .collect()
            }
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    /// Performs the get loaded model request.
    fn get_loaded_model(&mut self) {
        match self.rest.get_loaded_model() {
            Ok(name) => {
                self.loaded_model = name.trim().to_owned();
                self.selected_model = self.loaded_model.clone();
            }
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    /// Performs the load model request.
    ///
    /// On failure the drop-down goes back to the model the server still uses.
    fn put_load_model(&mut self) {
        match self.rest.put_load_model(&self.selected_model) {
            Ok(message) => {
                self.loaded_model = self.selected_model.clone();
                self.scores.clear();
                self.status = Some(message);
            }
            Err(e) => {
                let error = format!("Error: {e}");
                self.selected_model = self.loaded_model.clone();
                self.get_loaded_model();
                self.status = Some(error);
            }
        }
    }
}

impl eframe::App for LanguageGuesserUI {
    /// UI update loop (called every frame).
    fn update(&mut self, ctx: &Context, _: &mut Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            // Drop-down for models
            let previous_model = self.selected_model.clone();
            ui.horizontal(|ui| {
                ui.label("Model:");
                egui::ComboBox::from_id_salt("model")
                    .selected_text(&self.selected_model)
                    .show_ui(ui, |ui| {
                        for model in &self.available_models {
                            ui.selectable_value(&mut self.selected_model, model.clone(), model);
                        }
                    });
                if ui.button("Refresh").clicked() {
                    self.get_models();
                }
            });
            // Check if the user changed the selection
            if self.selected_model != previous_model && !self.selected_model.is_empty() {
                self.put_load_model();
            }

            ui.separator();

            ui.add(
                egui::TextEdit::multiline(&mut self.text)
                    .hint_text("Type or paste some text")
                    .desired_rows(6)
                    .desired_width(f32::INFINITY),
            );

            if ui
                .add_sized([200.0, 40.0], egui::Button::new("Guess"))
                .clicked()
            {
                self.post_guess();
            }

            ui.separator();

            // Output
            egui::Grid::new("scores_grid")
                .num_columns(2)
                .spacing([20.0, 6.0])
                .striped(true)
                .show(ui, |ui| {
                    for score in &self.scores {
                        ui.label(&score.language);
                        ui.add(
                            egui::ProgressBar::new(score.probability)
                                .text(format!("{:.2}%", score.probability * 100.0)),
                        );
                        ui.end_row();
                    }
                });

            if let Some(status) = &self.status {
                ui.label(status);
            } else if self.scores.is_empty() {
                ui.label("Click Guess to start");
            }
        });
    }
}

/// Application entry point.
fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([440.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "langid",
        options,
        Box::new(|_| Ok(Box::new(LanguageGuesserUI::new()?))),
    )
}

use std::path::PathBuf;
use std::sync::RwLock;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{get, post, put, web, App, HttpResponse, HttpServer, Responder};

use log::{info, warn};
use serde::Deserialize;
use langid_core::LangIdError;
use langid_core::model::identifier::LanguageIdentifier;

mod config;

use config::ServerConfig;

/// Browser front-end served on `/`.
const INDEX_HTML: &str = include_str!("../static/index.html");

/// Largest number of texts accepted by `/v1/guess_batch`.
const MAX_BATCH: usize = 1000;

/// Query parameters for the `/v1/guess` endpoint
#[derive(Deserialize)]
struct GuessParams {
	format: Option<String> // -> "text" (default) or "json"
}

#[derive(Deserialize)]
struct ModelQuery {
	name: Option<String>
}

#[derive(Debug, PartialEq)]
enum OutputFormat {
	Text,
	Json,
}

struct SharedData {
	data_dir: PathBuf,
	identifier: RwLock<Option<LanguageIdentifier>>
}

impl GuessParams {
	/// Determines how the prediction is written back.
	fn output_format(&self) -> Result<OutputFormat, String> {
		match &self.format {
			None => Ok(OutputFormat::Text),
			Some(s) if s.eq_ignore_ascii_case("text") => Ok(OutputFormat::Text),
			Some(s) if s.eq_ignore_ascii_case("json") => Ok(OutputFormat::Json),
			Some(_) => Err("Format must be 'text' or 'json'".into()),
		}
	}
}

/// Maps a model loading error to a status code.
fn load_error_response(e: LangIdError) -> HttpResponse {
	match e {
		LangIdError::InvalidPath(_) => HttpResponse::BadRequest().body(format!("Invalid model name: {e}")),
		LangIdError::ModelNotFound(_) => HttpResponse::NotFound().body(format!("Failed to load model: {e}")),
		_ => HttpResponse::InternalServerError().body(format!("Failed to load model: {e}")),
	}
}

fn no_model() -> HttpResponse {
	HttpResponse::Conflict().body("No model loaded")
}

fn lock_failed() -> HttpResponse {
	HttpResponse::InternalServerError().body("Model lock failed")
}

#[get("/")]
async fn get_index() -> impl Responder {
	HttpResponse::Ok().content_type("text/html; charset=utf-8").body(INDEX_HTML)
}

/// HTTP POST endpoint `/v1/guess`
///
/// Guesses the language of the request body.
/// Returns one `language percentage%` line per language, or JSON with `?format=json`.
#[post("/v1/guess")]
async fn post_guess(data: web::Data<SharedData>, query: web::Query<GuessParams>, text: String) -> impl Responder {
	let format = match query.output_format() {
		Ok(f) => f,
		Err(e) => return HttpResponse::BadRequest().body(e)
	};

	let identifier = match data.identifier.read() {
		Ok(i) => i,
		Err(_) => return lock_failed(),
	};
	let Some(identifier) = identifier.as_ref() else {
		return no_model();
	};

	match identifier.guess(&text) {
		Ok(prediction) if format == OutputFormat::Json => HttpResponse::Ok().json(prediction),
		Ok(prediction) => HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(prediction.render()),
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// HTTP POST endpoint `/v1/guess_batch`
///
/// Body is a JSON array of at most `MAX_BATCH` texts; returns a JSON array of predictions.
#[post("/v1/guess_batch")]
async fn post_guess_batch(data: web::Data<SharedData>, texts: web::Json<Vec<String>>) -> impl Responder {
	if texts.len() > MAX_BATCH {
		return HttpResponse::PayloadTooLarge().body(format!("At most {MAX_BATCH} texts per batch"));
	}

	let identifier = match data.identifier.read() {
		Ok(i) => i,
		Err(_) => return lock_failed(),
	};
	let Some(identifier) = identifier.as_ref() else {
		return no_model();
	};

	match identifier.guess_batch(texts.as_slice()) {
		Ok(predictions) => HttpResponse::Ok().json(predictions),
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// HTTP POST endpoint `/v1/encode`
///
/// Returns the n-gram count vector of the request body as JSON.
#[post("/v1/encode")]
async fn post_encode(data: web::Data<SharedData>, text: String) -> impl Responder {
	let identifier = match data.identifier.read() {
		Ok(i) => i,
		Err(_) => return lock_failed(),
	};
	match identifier.as_ref() {
		Some(identifier) => HttpResponse::Ok().json(identifier.encode(&text)),
		None => no_model(),
	}
}

#[get("/v1/languages")]
async fn get_languages(data: web::Data<SharedData>) -> impl Responder {
	let identifier = match data.identifier.read() {
		Ok(i) => i,
		Err(_) => return lock_failed(),
	};
	match identifier.as_ref() {
		Some(identifier) => HttpResponse::Ok().json(identifier.languages()),
		None => no_model(),
	}
}

#[get("/v1/models")]
async fn get_models(data: web::Data<SharedData>) -> impl Responder {
	match LanguageIdentifier::list_models(&data.data_dir) {
		Ok(models) => HttpResponse::Ok().body(models.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list models")
	}
}

#[get("/v1/loaded_model")]
async fn get_loaded_model(data: web::Data<SharedData>) -> impl Responder {
	match data.identifier.read() {
		Ok(identifier) => HttpResponse::Ok().body(identifier.as_ref().map(|i| i.name().to_owned()).unwrap_or_default()),
		Err(_) => lock_failed(),
	}
}

/// HTTP PUT endpoint `/v1/load_model?name=...`
///
/// Replaces the loaded model. The previous one stays in place if loading fails.
#[put("/v1/load_model")]
async fn put_model(data: web::Data<SharedData>, query: web::Query<ModelQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty model name"),
	};

	// Loading happens outside the lock and off the worker thread so guesses keep being served
	let data_dir = data.data_dir.clone();
	let model = name.to_owned();
	let identifier = match web::block(move || LanguageIdentifier::open(&data_dir, &model)).await {
		Ok(Ok(i)) => i,
		Ok(Err(e)) => {
			warn!("Failed to load model '{name}': {e}");
			return load_error_response(e);
		}
		Err(e) => {
			warn!("Loader for model '{name}' did not finish: {e}");
			return HttpResponse::InternalServerError().body("Failed to load model");
		}
	};

	match data.identifier.write() {
		Ok(mut current) => {
			*current = Some(identifier);
			info!("Model '{name}' loaded");
			HttpResponse::Ok().body("Model loaded successfully")
		}
		Err(_) => lock_failed(),
	}
}

/// Registers every endpoint.
fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(get_index)
		.service(post_guess)
		.service(post_guess_batch)
		.service(post_encode)
		.service(get_languages)
		.service(get_models)
		.service(get_loaded_model)
		.service(put_model);
}

/// Main entry point for the server.
///
/// Reads `ServerConfig` from the environment, optionally loads the
/// start-up model, and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = ServerConfig::from_env();
	let identifier = match &config.model {
		Some(name) => match LanguageIdentifier::open(&config.data_dir, name) {
			Ok(identifier) => Some(identifier),
			Err(e) => {
				warn!("Start-up model '{name}' not loaded: {e}");
				None
			}
		},
		None => None,
	};

	let shared_data = web::Data::new(SharedData {
		data_dir: config.data_dir.clone(),
		identifier: RwLock::new(identifier),
	});

	info!("Serving models from {} on http://{}", config.data_dir.display(), config.bind_addr());
	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.configure(routes)
	})
		.bind(config.bind_addr())?
		.run()
		.await
}

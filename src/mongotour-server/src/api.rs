use actix_files::NamedFile;
use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use std::sync::Arc;
use tera::Tera;

use mongotour_core::config::{Config, ConfigError};
use mongotour_core::models::ErrorResponse;
use mongotour_core::runner::{run_sequence, SequenceError};
use mongotour_core::store::StoreConnector;

/// Template rendered with the operation log
pub const RESULTS_TEMPLATE: &str = "databasetest.html";

/// Shared application state
pub struct AppState {
    pub config: Arc<Config>,
    pub connector: Arc<dyn StoreConnector>,
    pub templates: Arc<Tera>,
    /// Raw service bindings captured from the environment at startup
    pub vcap_services: Option<String>,
}

/// Load the page templates from `config.templates_dir`
pub fn load_templates(config: &Config) -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_template_file(config.template_path(RESULTS_TEMPLATE), Some(RESULTS_TEMPLATE))?;
    Ok(tera)
}

/// Render the results page for a run's log entries
pub fn render_commands(templates: &Tera, commands: Vec<String>) -> Result<String, tera::Error> {
    let mut context = tera::Context::new();
    context.insert("commands", &commands);
    templates.render(RESULTS_TEMPLATE, &context)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("configuration error")]
    Config(#[from] ConfigError),

    #[error("failed to connect to document store")]
    Connect(#[source] anyhow::Error),

    #[error("database test failed")]
    Sequence(#[from] SequenceError),

    #[error("failed to render page")]
    Render(#[from] tera::Error),

    #[error("page not found")]
    NotFound(#[from] std::io::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Connect(e) => Some(format!("{:#}", e)),
            ApiError::NotFound(_) => None,
            other => std::error::Error::source(other).map(|s| s.to_string()),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            message,
        })
    }
}

/// Landing page
/// GET /
pub async fn index(state: web::Data<AppState>) -> Result<NamedFile, ApiError> {
    let path = state.config.index_path();
    NamedFile::open_async(&path).await.map_err(|e| {
        tracing::warn!(path = %path, "Landing page unavailable: {}", e);
        ApiError::NotFound(e)
    })
}

/// Run the operation sequence against a fresh connection and render its log
/// GET /databasetest
#[tracing::instrument(skip(state))]
pub async fn database_test(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let url = state
        .config
        .connection_url(state.vcap_services.as_deref())
        .map_err(|e| {
            tracing::error!("Failed to resolve connection url: {}", e);
            e
        })?;

    let store = state
        .connector
        .connect(&url, &state.config.collection_name)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect: {:#}", e);
            ApiError::Connect(e)
        })?;

    let mut log = run_sequence(store.as_ref()).await?;

    if state.config.print_log {
        if let Err(e) = log.print() {
            tracing::warn!("Failed to print log: {}", e);
        }
    }

    let page = render_commands(&state.templates, log.take())?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/databasetest", web::get().to(database_test));
}

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod store;

use std::sync::Arc;

use actix_web::error::JsonPayloadError;
use actix_web::web;
use tera::Tera;

use crate::error::AppError;
use crate::store::MenuStore;

// Re-export endpoint functions for integration tests
pub use crate::handlers::health::health;

/// Shared per-application state handed to every handler.
pub struct AppState {
    pub store: Arc<dyn MenuStore>,
    pub templates: Tera,
}

impl AppState {
    pub fn new(store: Arc<dyn MenuStore>) -> Result<Self, AppError> {
        let templates = handlers::admin::templates()?;
        Ok(AppState { store, templates })
    }
}

/// Body deserialization failures become 422 like any other invalid input;
/// malformed requests keep actix's default response.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| match err {
        JsonPayloadError::Deserialize(e) => AppError::invalid("body", e.to_string()).into(),
        other => other.into(),
    })
}

/// Registers every route. The application must also carry
/// `web::Data<AppState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use crate::handlers::{admin, dishes};

    cfg.app_data(json_config())
        .service(health)
        .service(dishes::list_dishes)
        .service(dishes::create_dish)
        .service(dishes::show_dish)
        .service(dishes::update_dish)
        .service(dishes::destroy_dish)
        .service(admin::dashboard)
        .service(admin::index)
        // must precede the `{id}` routes
        .service(admin::new_restaurant)
        .service(admin::create_restaurant)
        .service(admin::show_restaurant)
        .service(admin::edit_restaurant)
        .service(admin::update_restaurant)
        .service(admin::destroy_restaurant);
}

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use menu_admin::config::Config;
use menu_admin::db::PgStore;
use menu_admin::store::{MemoryStore, MenuStore};
use menu_admin::{AppState, configure};

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config =
        Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let store: Arc<dyn MenuStore> = match &config.database_url {
        Some(url) => {
            log::info!("Connecting to Postgres with a pool of {}", config.pool_size);
            Arc::new(PgStore::connect(url, config.pool_size).map_err(io::Error::other)?)
        }
        None => {
            log::warn!("DATABASE_URL is not set, data will be kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    let state = web::Data::new(AppState::new(store).map_err(io::Error::other)?);

    log::info!(
        "Starting menu admin server on {}:{}",
        config.bind_address,
        config.port
    );

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}

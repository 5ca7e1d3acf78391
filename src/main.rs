use actix_web::{web, App, HttpServer};
use log::{error, info};

mod config;
mod error;
mod game;
mod models;
mod routes;
mod websocket;

use crate::config::ServerConfig;
use crate::models::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().filter_or("LOG_LEVEL", "info"));

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    info!(
        "Starting chess session host at ws://{}:{}/ws/<session>",
        config.host, config.port
    );
    info!(
        "Default time control {}s + {}s per move",
        config.session.total_length, config.session.per_move
    );
    let bind_address = (config.host.clone(), config.port);

    // Create shared application state
    let app_state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind_address)?
    .run()
    .await
}

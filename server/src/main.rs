use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use canvas_server::config::ServerConfig;
use canvas_server::expiry::spawn_expiry_scheduler;
use canvas_server::handlers;
use canvas_server::server::spawn_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env().map_err(|err| {
        log::error!("{}", err);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
    })?;

    let srv_tx = spawn_server(config.stroke_settings);
    spawn_expiry_scheduler(srv_tx.clone(), config.sweep_interval);

    let ws_settings = config.ws_settings();

    log::info!("Listening on {}", config.bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(srv_tx.clone()))
            .app_data(web::Data::new(ws_settings))
            .wrap(Logger::default())
            .configure(handlers::root)
    })
    .bind(config.bind_addr)?
    .run()
    .await
}

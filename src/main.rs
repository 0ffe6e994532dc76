use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use exam_server::{
    app_state::AppState, auth::JwtService, config::Config, handlers,
    middleware::RequestIdMiddleware,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    if config.is_production() {
        config.validate_for_production();
    }

    let host = config.web_server_host.clone();
    let port = config.web_server_port;
    let jwt = JwtService::new(&config.jwt_secret, config.jwt_expiration_hours);

    let state = AppState::new(config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = Arc::new(state);
    let session_service = state.session_service.clone();

    log::info!("Starting exam server on {}:{}", host, port);

    let state_data = web::Data::new(state);
    let jwt_data = web::Data::new(jwt);

    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .app_data(jwt_data.clone())
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    session_service.shutdown();
    log::info!("Exam server stopped");
    Ok(())
}

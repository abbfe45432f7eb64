use actix_web::{error, middleware, web, App, HttpServer, Result};
use ghcrm_api::config::Opts;
use ghcrm_api::handlers;
use ghcrm_api::CONFIG;

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    let (_handle, _opt) = Opts::parse_from_args();
    let config = CONFIG.clone();
    let state = config.into_state().await;
    let state2 = state.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::PathConfig::default())
            .app_data(web::JsonConfig::default())
            .app_data(web::QueryConfig::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .default_service(web::route().to(not_found))
            .service(web::scope("/api/auth").configure(handlers::auth::init))
            .service(web::scope("/api/projects").configure(handlers::project::init))
    })
    .keep_alive(std::time::Duration::from_secs(300))
    .bind(("0.0.0.0", state2.config.port))?
    .run()
    .await
}

async fn not_found() -> Result<&'static str> {
    Err(error::ErrorNotFound("route not found"))
}

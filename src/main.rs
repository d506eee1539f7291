mod auth;
mod config;
mod db;
mod domain;
mod entity;
mod error;
mod flash;
mod password;
mod response;
mod routes;
mod validate;

#[cfg(test)]
mod test_support;

use std::io;

use actix_web::{
    body::MessageBody,
    cookie::Key,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware, web, App, HttpServer,
};
use config::AppConfig;
use db::connect_db;
use log::info;
use password::PasswordHasher;
use sea_orm::DatabaseConnection;

pub struct AppDependencies {
    pub db: web::Data<DatabaseConnection>,
    pub hasher: web::Data<PasswordHasher>,
    pub key: Key,
    pub cookie_secure: bool,
}

/// The full application, shared by the server and the HTTP tests.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(deps.db)
        .app_data(deps.hasher)
        .wrap(middleware::from_fn(flash::flash_handler))
        .wrap(auth::session_middleware(deps.key, deps.cookie_secure))
        .wrap(middleware::Logger::default())
        .configure(routes::config)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let config = AppConfig::from_env();
    let db = connect_db(&config)
        .await
        .map_err(|e| io::Error::other(format!("database connect failed: {}", e)))?;
    let hasher = PasswordHasher::new(config.bcrypt_cost)
        .map_err(|e| io::Error::other(format!("password hasher init failed: {}", e)))?;

    let db = web::Data::new(db);
    let hasher = web::Data::new(hasher);
    let key = config.session_key();
    let cookie_secure = config.cookie_secure;
    let server_port = config.server_port;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            db: db.clone(),
            hasher: hasher.clone(),
            key: key.clone(),
            cookie_secure,
        })
    })
    .bind(("0.0.0.0", server_port))?;
    info!("server started at http://0.0.0.0:{}", server_port);
    server.run().await
}

pub mod account;
pub mod dto;
pub mod home;
pub mod message;
pub mod user;

use actix_web::web;

use crate::response::form_error_handler;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(form_error_handler))
        .configure(home::config)
        .configure(account::config)
        .service(web::scope("/users").configure(user::config))
        .service(web::scope("/messages").configure(message::config));
}

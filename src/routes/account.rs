use actix_session::Session;
use actix_web::{web, HttpResponse};
use log::info;
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::auth::{do_login, do_logout, CurrentUser};
use crate::domain::user::{authenticate, signup, NewUser};
use crate::error::AppError;
use crate::password::PasswordHasher;
use crate::response::{redirect, render};
use crate::validate;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/signup")
            .route(web::get().to(signup_page))
            .route(web::post().to(signup_submit)),
    )
    .service(
        web::resource("/login")
            .route(web::get().to(login_page))
            .route(web::post().to(login_submit)),
    )
    .service(web::resource("/logout").route(web::post().to(logout)));
}

#[derive(Deserialize)]
struct SignupForm {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    image_url: Option<String>,
}

#[derive(Deserialize)]
struct LoginForm {
    username: Option<String>,
    password: Option<String>,
}

async fn signup_page(session: Session) -> HttpResponse {
    render("signup", None::<()>, &session)
}

async fn signup_submit(
    db: web::Data<DatabaseConnection>,
    hasher: web::Data<PasswordHasher>,
    session: Session,
    form: web::Form<SignupForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let new_user = parse_signup(form).map_err(|e| e.redirect_to("/signup"))?;

    let created = signup(db.get_ref(), hasher.get_ref(), new_user)
        .await
        .map_err(|e| AppError::from(e).redirect_to("/signup"))?;
    info!("user {} signed up", created.username);
    do_login(&session, &created)?;
    Ok(redirect("/", format!("Welcome to Warbler, {}!", created.username)))
}

fn parse_signup(form: SignupForm) -> Result<NewUser, AppError> {
    Ok(NewUser {
        username: validate::username(form.username)?,
        email: validate::email(form.email)?,
        password: validate::password(form.password)?,
        image_url: validate::optional(form.image_url),
    })
}

async fn login_page(session: Session) -> HttpResponse {
    render("login", None::<()>, &session)
}

async fn login_submit(
    db: web::Data<DatabaseConnection>,
    hasher: web::Data<PasswordHasher>,
    session: Session,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let username = validate::required(form.username, "Username is required.").map_err(|e| e.redirect_to("/login"))?;
    let password = validate::required(form.password, "Password is required.").map_err(|e| e.redirect_to("/login"))?;

    let user = authenticate(db.get_ref(), hasher.get_ref(), username.trim(), &password)
        .await
        .map_err(|e| AppError::from(e).redirect_to("/login"))?
        .ok_or_else(|| AppError::fail("Invalid credentials.").redirect_to("/login"))?;
    do_login(&session, &user)?;
    Ok(redirect("/", format!("Hello, {}!", user.username)))
}

async fn logout(auth: CurrentUser, session: Session) -> HttpResponse {
    do_logout(&session);
    info!("user {} logged out", auth.0.username);
    redirect("/login", "Successfully logged out.")
}

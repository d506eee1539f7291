use actix_session::Session;
use actix_web::{web, HttpResponse};
use log::info;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::auth::{do_logout, CurrentUser};
use crate::domain::follow::{follow, followers, following, is_following, unfollow};
use crate::domain::like::liked_messages;
use crate::domain::message::messages_of;
use crate::domain::user::{delete_user, find_user, profile_counts, search_users, update_profile, ProfileUpdate};
use crate::domain::DomainError;
use crate::entity::user;
use crate::error::{map_tx_error, AppError};
use crate::password::PasswordHasher;
use crate::response::{redirect, render};
use crate::routes::dto::{to_counts_dto, to_user_summary, with_liked, CountsDto, MessageDto, UserSummary};
use crate::validate;

const PROFILE_FORM: &str = "/users/profile";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(list_users)))
        .service(
            web::resource("/profile")
                .route(web::get().to(profile_page))
                .route(web::post().to(profile_submit)),
        )
        .service(web::resource("/delete").route(web::post().to(delete_account)))
        .service(web::resource("/follow/{id:\\d+}").route(web::post().to(add_follow)))
        .service(web::resource("/stop-following/{id:\\d+}").route(web::post().to(stop_following)))
        .service(web::resource("/{id:\\d+}").route(web::get().to(show_user)))
        .service(web::resource("/{id:\\d+}/following").route(web::get().to(show_following)))
        .service(web::resource("/{id:\\d+}/followers").route(web::get().to(show_followers)))
        .service(web::resource("/{id:\\d+}/likes").route(web::get().to(show_likes)));
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct ProfileForm {
    username: Option<String>,
    email: Option<String>,
    image_url: Option<String>,
    header_image_url: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsersPage {
    q: Option<String>,
    users: Vec<UserSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfilePage {
    user: UserSummary,
    counts: CountsDto,
    messages: Vec<MessageDto>,
    is_following: bool,
    is_self: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelationPage {
    user: UserSummary,
    users: Vec<UserSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LikesPage {
    user: UserSummary,
    messages: Vec<MessageDto>,
}

/// Only the owner ever sees the email.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditProfilePage {
    username: String,
    email: String,
    image_url: String,
    header_image_url: String,
    bio: String,
    location: String,
}

async fn list_users(
    _auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    session: Session,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let q = validate::optional(query.into_inner().q);
    let users = search_users(db.get_ref(), q.as_deref()).await?;
    let page = UsersPage {
        q,
        users: users.iter().map(to_user_summary).collect(),
    };
    Ok(render("users", Some(page), &session))
}

async fn show_user(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let viewer = auth.0;
    let shown = find_user(db.get_ref(), path.into_inner()).await?;
    let counts = profile_counts(db.get_ref(), shown.id).await?;
    let rows = messages_of(db.get_ref(), shown.id)
        .await?
        .into_iter()
        .map(|m| (m, shown.clone()))
        .collect();
    let messages = with_liked(db.get_ref(), viewer.id, rows).await?;
    let is_following = is_following(db.get_ref(), viewer.id, shown.id).await?;

    let page = ProfilePage {
        user: to_user_summary(&shown),
        counts: to_counts_dto(counts),
        messages,
        is_following,
        is_self: viewer.id == shown.id,
    };
    Ok(render("user", Some(page), &session))
}

async fn show_following(
    _auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let shown = find_user(db.get_ref(), path.into_inner()).await?;
    let users = following(db.get_ref(), shown.id).await?;
    Ok(render("following", Some(relation_page(&shown, users)), &session))
}

async fn show_followers(
    _auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let shown = find_user(db.get_ref(), path.into_inner()).await?;
    let users = followers(db.get_ref(), shown.id).await?;
    Ok(render("followers", Some(relation_page(&shown, users)), &session))
}

fn relation_page(shown: &user::Model, users: Vec<user::Model>) -> RelationPage {
    RelationPage {
        user: to_user_summary(shown),
        users: users.iter().map(to_user_summary).collect(),
    }
}

async fn show_likes(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let shown = find_user(db.get_ref(), path.into_inner()).await?;
    let rows = liked_messages(db.get_ref(), shown.id).await?;
    let messages = with_liked(db.get_ref(), auth.0.id, rows).await?;
    let page = LikesPage {
        user: to_user_summary(&shown),
        messages,
    };
    Ok(render("likes", Some(page), &session))
}

async fn add_follow(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let actor_id = auth.0.id;
    let target_id = path.into_inner();
    let back = following_path(actor_id);

    let target = db
        .transaction::<_, user::Model, DomainError>(move |txn| {
            Box::pin(async move { follow(txn, actor_id, target_id).await })
        })
        .await
        .map_err(|e| map_tx_error(e).redirect_to(back.clone()))?;
    Ok(redirect(back, format!("You are now following @{}.", target.username)))
}

async fn stop_following(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let actor_id = auth.0.id;
    let target_id = path.into_inner();
    let back = following_path(actor_id);

    let target = db
        .transaction::<_, user::Model, DomainError>(move |txn| {
            Box::pin(async move { unfollow(txn, actor_id, target_id).await })
        })
        .await
        .map_err(|e| map_tx_error(e).redirect_to(back.clone()))?;
    Ok(redirect(back, format!("You stopped following @{}.", target.username)))
}

fn following_path(user_id: i32) -> String {
    format!("/users/{}/following", user_id)
}

async fn profile_page(auth: CurrentUser, session: Session) -> HttpResponse {
    let current = auth.0;
    let page = EditProfilePage {
        username: current.username,
        email: current.email,
        image_url: current.image_url,
        header_image_url: current.header_image_url,
        bio: current.bio,
        location: current.location,
    };
    render("edit-profile", Some(page), &session)
}

async fn profile_submit(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    hasher: web::Data<PasswordHasher>,
    form: web::Form<ProfileForm>,
) -> Result<HttpResponse, AppError> {
    let current = auth.0;
    let form = form.into_inner();
    let password = validate::required(form.password, "Password is required.").map_err(|e| e.redirect_to(PROFILE_FORM))?;
    let update = parse_profile(form.username, form.email, form.image_url, form.header_image_url, form.bio, form.location)
        .map_err(|e| e.redirect_to(PROFILE_FORM))?;

    if !hasher.verify(&password, &current.password) {
        return Err(AppError::fail("Invalid password.").redirect_to(PROFILE_FORM));
    }

    let updated = update_profile(db.get_ref(), current.id, update)
        .await
        .map_err(|e| AppError::from(e).redirect_to(PROFILE_FORM))?;
    info!("user {} updated profile", updated.id);
    Ok(redirect(format!("/users/{}", updated.id), "Profile updated."))
}

fn parse_profile(
    username: Option<String>,
    email: Option<String>,
    image_url: Option<String>,
    header_image_url: Option<String>,
    bio: Option<String>,
    location: Option<String>,
) -> Result<ProfileUpdate, AppError> {
    Ok(ProfileUpdate {
        username: validate::username(username)?,
        email: validate::email(email)?,
        image_url: validate::optional(image_url),
        header_image_url: validate::optional(header_image_url),
        bio: validate::optional(bio).unwrap_or_default(),
        location: validate::optional(location).unwrap_or_default(),
    })
}

async fn delete_account(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let user_id = auth.0.id;
    db.transaction::<_, (), DomainError>(move |txn| Box::pin(async move { delete_user(txn, user_id).await }))
        .await
        .map_err(map_tx_error)?;
    do_logout(&session);
    Ok(redirect("/signup", "Account deleted."))
}

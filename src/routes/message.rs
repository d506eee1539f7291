use actix_session::Session;
use actix_web::{web, HttpResponse};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::domain::like::{has_liked, toggle_like, LikeState};
use crate::domain::message::{create_message, delete_message, find_message_with_author};
use crate::domain::DomainError;
use crate::entity::message;
use crate::error::{map_tx_error, AppError};
use crate::response::{redirect, render};
use crate::routes::dto::{to_message_dto, MessageDto};
use crate::validate;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/new")
            .route(web::get().to(new_message_page))
            .route(web::post().to(new_message_submit)),
    )
    .service(web::resource("/{id:\\d+}").route(web::get().to(show_message)))
    .service(web::resource("/{id:\\d+}/delete").route(web::post().to(remove_message)))
    .service(web::resource("/{id:\\d+}/like-toggle").route(web::post().to(like_toggle)));
}

#[derive(Deserialize)]
struct MessageForm {
    text: Option<String>,
}

#[derive(Deserialize)]
struct LikeForm {
    origin_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessagePage {
    message: MessageDto,
    owned: bool,
}

async fn new_message_page(_auth: CurrentUser, session: Session) -> HttpResponse {
    render("new-message", None::<()>, &session)
}

async fn new_message_submit(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    form: web::Form<MessageForm>,
) -> Result<HttpResponse, AppError> {
    let user_id = auth.0.id;
    let text = validate::message_text(form.into_inner().text).map_err(|e| e.redirect_to("/messages/new"))?;

    create_message(db.get_ref(), user_id, text).await?;
    Ok(redirect(format!("/users/{}", user_id), "Message posted."))
}

async fn show_message(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let viewer_id = auth.0.id;
    let (found, author) = find_message_with_author(db.get_ref(), path.into_inner()).await?;
    let liked = has_liked(db.get_ref(), viewer_id, found.id).await?;
    let owned = found.user_id == viewer_id;
    let page = MessagePage {
        message: to_message_dto(found, &author, liked),
        owned,
    };
    Ok(render("message", Some(page), &session))
}

async fn remove_message(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let actor_id = auth.0.id;
    let message_id = path.into_inner();

    db.transaction::<_, message::Model, DomainError>(move |txn| {
        Box::pin(async move { delete_message(txn, actor_id, message_id).await })
    })
    .await
    .map_err(map_tx_error)?;
    Ok(redirect(format!("/users/{}", actor_id), "Message deleted!"))
}

async fn like_toggle(
    auth: CurrentUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<LikeForm>,
) -> Result<HttpResponse, AppError> {
    let actor_id = auth.0.id;
    let message_id = path.into_inner();
    let origin = validate::local_path(form.into_inner().origin_url)?;

    let state = db
        .transaction::<_, LikeState, DomainError>(move |txn| {
            Box::pin(async move { toggle_like(txn, actor_id, message_id).await })
        })
        .await
        .map_err(|e| map_tx_error(e).redirect_to(origin.clone()))?;
    let notice = match state {
        LikeState::Liked => "Message liked.",
        LikeState::Unliked => "Message unliked.",
    };
    Ok(redirect(origin, notice))
}

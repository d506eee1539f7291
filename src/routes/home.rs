use actix_session::Session;
use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::auth::OptionalCurrentUser;
use crate::domain::message::feed;
use crate::domain::user::profile_counts;
use crate::error::AppError;
use crate::response::render;
use crate::routes::dto::{to_counts_dto, to_user_summary, with_liked, CountsDto, MessageDto, UserSummary};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(homepage)));
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HomePage {
    user: UserSummary,
    counts: CountsDto,
    messages: Vec<MessageDto>,
}

async fn homepage(
    auth: OptionalCurrentUser,
    db: web::Data<DatabaseConnection>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let Some(current) = auth.0 else {
        return Ok(render("anon-home", None::<()>, &session));
    };

    let counts = profile_counts(db.get_ref(), current.id).await?;
    let rows = feed(db.get_ref(), current.id).await?;
    let messages = with_liked(db.get_ref(), current.id, rows).await?;
    let page = HomePage {
        user: to_user_summary(&current),
        counts: to_counts_dto(counts),
        messages,
    };
    Ok(render("home", Some(page), &session))
}

use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::domain::like::liked_among;
use crate::domain::user::ProfileCounts;
use crate::entity::{message, user};
use crate::error::AppError;

/// Public face of a user; never carries the email or password hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: String,
    pub location: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i32,
    pub text: String,
    pub timestamp: String,
    pub user: UserSummary,
    pub liked: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsDto {
    pub messages: u64,
    pub following: u64,
    pub followers: u64,
    pub likes: u64,
}

pub fn to_user_summary(model: &user::Model) -> UserSummary {
    UserSummary {
        id: model.id,
        username: model.username.clone(),
        image_url: model.image_url.clone(),
        header_image_url: model.header_image_url.clone(),
        bio: model.bio.clone(),
        location: model.location.clone(),
    }
}

pub fn to_message_dto(model: message::Model, author: &user::Model, liked: bool) -> MessageDto {
    MessageDto {
        id: model.id,
        text: model.text,
        timestamp: to_rfc3339(model.timestamp),
        user: to_user_summary(author),
        liked,
    }
}

pub fn to_counts_dto(counts: ProfileCounts) -> CountsDto {
    CountsDto {
        messages: counts.messages,
        following: counts.following,
        followers: counts.followers,
        likes: counts.likes,
    }
}

/// Builds message rows, marking the ones `viewer_id` has liked.
pub async fn with_liked(
    db: &DatabaseConnection,
    viewer_id: i32,
    rows: Vec<(message::Model, user::Model)>,
) -> Result<Vec<MessageDto>, AppError> {
    let ids: Vec<i32> = rows.iter().map(|(m, _)| m.id).collect();
    let liked = liked_among(db, viewer_id, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|(m, author)| {
            let is_liked = liked.contains(&m.id);
            to_message_dto(m, &author, is_liked)
        })
        .collect())
}

fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

use std::collections::HashSet;

use log::debug;
use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};

use crate::db::is_unique_violation;
use crate::domain::message::find_message;
use crate::domain::DomainError;
use crate::entity::{like, message, user};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeState {
    Liked,
    Unliked,
}

/// Flips the like of `actor_id` on a message it does not own.
pub async fn toggle_like<C: ConnectionTrait>(db: &C, actor_id: i32, message_id: i32) -> Result<LikeState, DomainError> {
    let target = find_message(db, message_id).await?;
    if target.user_id == actor_id {
        return Err(DomainError::SelfLike);
    }

    let removed = like::Entity::delete_many()
        .filter(like::Column::UserId.eq(actor_id))
        .filter(like::Column::MessageId.eq(message_id))
        .exec(db)
        .await?;
    if removed.rows_affected > 0 {
        debug!("user {} unliked message {}", actor_id, message_id);
        return Ok(LikeState::Unliked);
    }

    let row = like::ActiveModel {
        user_id: Set(actor_id),
        message_id: Set(message_id),
    };
    match like::Entity::insert(row).exec_without_returning(db).await {
        Ok(_) => {}
        // added concurrently
        Err(err) if is_unique_violation(&err) => {}
        Err(err) => return Err(err.into()),
    }
    debug!("user {} liked message {}", actor_id, message_id);
    Ok(LikeState::Liked)
}

pub async fn has_liked<C: ConnectionTrait>(db: &C, user_id: i32, message_id: i32) -> Result<bool, DomainError> {
    let count = like::Entity::find()
        .filter(like::Column::UserId.eq(user_id))
        .filter(like::Column::MessageId.eq(message_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Which of `message_ids` the user has liked.
pub async fn liked_among<C: ConnectionTrait>(db: &C, user_id: i32, message_ids: &[i32]) -> Result<HashSet<i32>, DomainError> {
    if message_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let rows = like::Entity::find()
        .filter(like::Column::UserId.eq(user_id))
        .filter(like::Column::MessageId.is_in(message_ids.iter().copied()))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| r.message_id).collect())
}

/// Messages the user liked, with their authors, newest first.
pub async fn liked_messages<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<(message::Model, user::Model)>, DomainError> {
    let liked = Query::select()
        .column(like::Column::MessageId)
        .from(like::Entity)
        .and_where(like::Column::UserId.eq(user_id))
        .to_owned();
    let rows = message::Entity::find()
        .find_also_related(user::Entity)
        .filter(message::Column::Id.in_subquery(liked))
        .order_by_desc(message::Column::Timestamp)
        .order_by_desc(message::Column::Id)
        .all(db)
        .await?;
    Ok(rows.into_iter().filter_map(|(m, u)| u.map(|u| (m, u))).collect())
}

/// Users who liked the message.
pub async fn users_liked<C: ConnectionTrait>(db: &C, message_id: i32) -> Result<Vec<user::Model>, DomainError> {
    let likers = Query::select()
        .column(like::Column::UserId)
        .from(like::Entity)
        .and_where(like::Column::MessageId.eq(message_id))
        .to_owned();
    Ok(user::Entity::find()
        .filter(user::Column::Id.in_subquery(likers))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?)
}

use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::domain::follow::followed_ids;
use crate::domain::DomainError;
use crate::entity::{like, message, user};

/// Upper bound on messages returned by the feed and profile listings.
pub const LIST_LIMIT: u64 = 100;

pub async fn create_message<C: ConnectionTrait>(db: &C, user_id: i32, text: String) -> Result<message::Model, DomainError> {
    let active = message::ActiveModel {
        text: Set(text),
        timestamp: Set(Utc::now()),
        user_id: Set(user_id),
        ..Default::default()
    };
    let created = active.insert(db).await?;
    debug!("message created id={} user={}", created.id, user_id);
    Ok(created)
}

pub async fn find_message<C: ConnectionTrait>(db: &C, message_id: i32) -> Result<message::Model, DomainError> {
    message::Entity::find_by_id(message_id)
        .one(db)
        .await?
        .ok_or(DomainError::MessageNotFound)
}

/// Message together with its author.
pub async fn find_message_with_author<C: ConnectionTrait>(
    db: &C,
    message_id: i32,
) -> Result<(message::Model, user::Model), DomainError> {
    message::Entity::find_by_id(message_id)
        .find_also_related(user::Entity)
        .one(db)
        .await?
        .and_then(|(m, u)| u.map(|u| (m, u)))
        .ok_or(DomainError::MessageNotFound)
}

/// Deletes a message owned by `actor_id`, with the likes pointing at it.
pub async fn delete_message<C: ConnectionTrait>(db: &C, actor_id: i32, message_id: i32) -> Result<message::Model, DomainError> {
    let found = find_message(db, message_id).await?;
    if found.user_id != actor_id {
        return Err(DomainError::NotOwner);
    }

    like::Entity::delete_many()
        .filter(like::Column::MessageId.eq(message_id))
        .exec(db)
        .await?;
    message::Entity::delete_by_id(message_id).exec(db).await?;
    debug!("message deleted id={} user={}", message_id, actor_id);
    Ok(found)
}

/// A user's own messages, newest first.
pub async fn messages_of<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<message::Model>, DomainError> {
    Ok(message::Entity::find()
        .filter(message::Column::UserId.eq(user_id))
        .order_by_desc(message::Column::Timestamp)
        .order_by_desc(message::Column::Id)
        .limit(LIST_LIMIT)
        .all(db)
        .await?)
}

/// Messages from `user_id` and everyone they follow, newest first.
pub async fn feed<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<(message::Model, user::Model)>, DomainError> {
    let rows = message::Entity::find()
        .find_also_related(user::Entity)
        .filter(
            Condition::any()
                .add(message::Column::UserId.eq(user_id))
                .add(message::Column::UserId.in_subquery(followed_ids(user_id))),
        )
        .order_by_desc(message::Column::Timestamp)
        .order_by_desc(message::Column::Id)
        .limit(LIST_LIMIT)
        .all(db)
        .await?;
    Ok(rows.into_iter().filter_map(|(m, u)| u.map(|u| (m, u))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::follow::follow;
    use crate::domain::user::find_user;
    use crate::test_support::{seed_message, seed_user, test_db, test_hasher};
    use sea_orm::{ModelTrait, PaginatorTrait};

    #[actix_web::test]
    async fn message_belongs_to_its_author() {
        let db = test_db().await;
        let u = seed_user(&db, &test_hasher(), "u").await;
        let m1 = create_message(&db, u.id, "test".to_string()).await.expect("create");

        let author = find_user(&db, u.id).await.expect("user");
        let owned = author.find_related(message::Entity).all(&db).await.expect("related");
        assert_eq!(owned, vec![m1.clone()]);
        assert_eq!(m1.text, "test");
        assert_eq!(m1.user_id, u.id);

        let (found, found_author) = find_message_with_author(&db, m1.id).await.expect("find");
        assert_eq!(found, m1);
        assert_eq!(found_author, author);
    }

    #[actix_web::test]
    async fn only_the_owner_can_delete() {
        let db = test_db().await;
        let hasher = test_hasher();
        let u1 = seed_user(&db, &hasher, "u1").await;
        let u2 = seed_user(&db, &hasher, "u2").await;
        let m1 = seed_message(&db, u1.id, "m1-text").await;
        crate::domain::like::toggle_like(&db, u2.id, m1.id).await.expect("like");

        assert!(matches!(delete_message(&db, u2.id, m1.id).await, Err(DomainError::NotOwner)));
        assert!(find_message(&db, m1.id).await.is_ok());

        delete_message(&db, u1.id, m1.id).await.expect("owner delete");
        assert!(matches!(find_message(&db, m1.id).await, Err(DomainError::MessageNotFound)));
        assert_eq!(like::Entity::find().count(&db).await.expect("count"), 0);
        assert!(matches!(delete_message(&db, u1.id, m1.id).await, Err(DomainError::MessageNotFound)));
    }

    #[actix_web::test]
    async fn feed_contains_own_and_followed_messages_newest_first() {
        let db = test_db().await;
        let hasher = test_hasher();
        let u1 = seed_user(&db, &hasher, "u1").await;
        let u2 = seed_user(&db, &hasher, "u2").await;
        let u3 = seed_user(&db, &hasher, "u3").await;
        seed_message(&db, u1.id, "from-u1").await;
        seed_message(&db, u2.id, "from-u2").await;
        seed_message(&db, u3.id, "from-u3").await;
        seed_message(&db, u2.id, "from-u2-again").await;
        follow(&db, u1.id, u2.id).await.expect("follow");

        let texts: Vec<String> = feed(&db, u1.id).await.expect("feed").into_iter().map(|(m, _)| m.text).collect();
        assert_eq!(texts, vec!["from-u2-again", "from-u2", "from-u1"]);

        let own: Vec<String> = messages_of(&db, u2.id).await.expect("messages").into_iter().map(|m| m.text).collect();
        assert_eq!(own, vec!["from-u2-again", "from-u2"]);
    }
}

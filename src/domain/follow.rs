use log::debug;
use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};

use crate::db::is_unique_violation;
use crate::domain::user::find_user;
use crate::domain::DomainError;
use crate::entity::{follow, user};

pub async fn is_following<C: ConnectionTrait>(db: &C, actor_id: i32, other_id: i32) -> Result<bool, DomainError> {
    let count = follow::Entity::find()
        .filter(follow::Column::UserFollowingId.eq(actor_id))
        .filter(follow::Column::UserBeingFollowedId.eq(other_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Same edge as `is_following`, read from the other end.
pub async fn is_followed_by<C: ConnectionTrait>(db: &C, actor_id: i32, other_id: i32) -> Result<bool, DomainError> {
    is_following(db, other_id, actor_id).await
}

/// Records that `actor_id` follows `target_id` and returns the target.
pub async fn follow<C: ConnectionTrait>(db: &C, actor_id: i32, target_id: i32) -> Result<user::Model, DomainError> {
    if actor_id == target_id {
        return Err(DomainError::SelfFollow);
    }
    let target = find_user(db, target_id).await?;
    if is_following(db, actor_id, target_id).await? {
        return Err(DomainError::AlreadyFollowing(target.username));
    }

    let edge = follow::ActiveModel {
        user_being_followed_id: Set(target_id),
        user_following_id: Set(actor_id),
    };
    // a concurrent request may have inserted the same pair after the check
    match follow::Entity::insert(edge).exec_without_returning(db).await {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => return Err(DomainError::AlreadyFollowing(target.username)),
        Err(err) => return Err(err.into()),
    }
    debug!("user {} now follows {}", actor_id, target_id);
    Ok(target)
}

pub async fn unfollow<C: ConnectionTrait>(db: &C, actor_id: i32, target_id: i32) -> Result<user::Model, DomainError> {
    let target = find_user(db, target_id).await?;
    let removed = follow::Entity::delete_many()
        .filter(follow::Column::UserFollowingId.eq(actor_id))
        .filter(follow::Column::UserBeingFollowedId.eq(target_id))
        .exec(db)
        .await?;
    if removed.rows_affected == 0 {
        return Err(DomainError::NotFollowing(target.username));
    }
    debug!("user {} stopped following {}", actor_id, target_id);
    Ok(target)
}

/// Users that `user_id` follows.
pub async fn following<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<user::Model>, DomainError> {
    users_in(db, followed_ids(user_id)).await
}

/// Users that follow `user_id`.
pub async fn followers<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<user::Model>, DomainError> {
    let following = Query::select()
        .column(follow::Column::UserFollowingId)
        .from(follow::Entity)
        .and_where(follow::Column::UserBeingFollowedId.eq(user_id))
        .to_owned();
    users_in(db, following).await
}

/// Ids of everyone `user_id` follows, as a subquery.
pub fn followed_ids(user_id: i32) -> SelectStatement {
    Query::select()
        .column(follow::Column::UserBeingFollowedId)
        .from(follow::Entity)
        .and_where(follow::Column::UserFollowingId.eq(user_id))
        .to_owned()
}

async fn users_in<C: ConnectionTrait>(db: &C, ids: SelectStatement) -> Result<Vec<user::Model>, DomainError> {
    Ok(user::Entity::find()
        .filter(user::Column::Id.in_subquery(ids))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_user, test_db, test_hasher};

    #[actix_web::test]
    async fn follow_is_visible_from_both_ends() {
        let db = test_db().await;
        let hasher = test_hasher();
        let u1 = seed_user(&db, &hasher, "u1").await;
        let u2 = seed_user(&db, &hasher, "u2").await;

        let target = follow(&db, u2.id, u1.id).await.expect("follow");
        assert_eq!(target, u1);

        assert!(is_following(&db, u2.id, u1.id).await.expect("query"));
        assert!(!is_following(&db, u1.id, u2.id).await.expect("query"));
        assert!(is_followed_by(&db, u1.id, u2.id).await.expect("query"));
        assert!(!is_followed_by(&db, u2.id, u1.id).await.expect("query"));

        assert_eq!(followers(&db, u1.id).await.expect("followers"), vec![u2.clone()]);
        assert!(following(&db, u1.id).await.expect("following").is_empty());
        assert!(followers(&db, u2.id).await.expect("followers").is_empty());
        assert_eq!(following(&db, u2.id).await.expect("following"), vec![u1]);
    }

    #[actix_web::test]
    async fn self_follow_is_rejected() {
        let db = test_db().await;
        let u1 = seed_user(&db, &test_hasher(), "u1").await;
        assert!(matches!(follow(&db, u1.id, u1.id).await, Err(DomainError::SelfFollow)));
        assert!(!is_following(&db, u1.id, u1.id).await.expect("query"));
    }

    #[actix_web::test]
    async fn second_follow_is_rejected() {
        let db = test_db().await;
        let hasher = test_hasher();
        let u1 = seed_user(&db, &hasher, "u1").await;
        let u2 = seed_user(&db, &hasher, "u2").await;

        follow(&db, u2.id, u1.id).await.expect("first follow");
        let err = follow(&db, u2.id, u1.id).await.expect_err("second follow");
        assert!(matches!(err, DomainError::AlreadyFollowing(ref name) if name == "u1"));
        assert_eq!(followers(&db, u1.id).await.expect("followers").len(), 1);
    }

    #[actix_web::test]
    async fn storage_rejects_duplicate_edge() {
        let db = test_db().await;
        let hasher = test_hasher();
        let u1 = seed_user(&db, &hasher, "u1").await;
        let u2 = seed_user(&db, &hasher, "u2").await;
        let edge = || follow::ActiveModel {
            user_being_followed_id: Set(u1.id),
            user_following_id: Set(u2.id),
        };

        follow::Entity::insert(edge()).exec_without_returning(&db).await.expect("first insert");
        let err = follow::Entity::insert(edge())
            .exec_without_returning(&db)
            .await
            .expect_err("duplicate insert");
        assert!(is_unique_violation(&err));
    }

    #[actix_web::test]
    async fn storage_rejects_self_edge() {
        let db = test_db().await;
        let u1 = seed_user(&db, &test_hasher(), "u1").await;
        let edge = follow::ActiveModel {
            user_being_followed_id: Set(u1.id),
            user_following_id: Set(u1.id),
        };

        let err = follow::Entity::insert(edge)
            .exec_without_returning(&db)
            .await
            .expect_err("self edge");
        assert!(!is_unique_violation(&err), "got {:?}", err);
        assert!(err.to_string().contains("CHECK"), "got {}", err);
        assert_eq!(follow::Entity::find().count(&db).await.expect("count"), 0);
    }

    #[actix_web::test]
    async fn following_unknown_user_fails() {
        let db = test_db().await;
        let u1 = seed_user(&db, &test_hasher(), "u1").await;
        assert!(matches!(follow(&db, u1.id, 999).await, Err(DomainError::UserNotFound)));
    }

    #[actix_web::test]
    async fn unfollow_removes_edge_once() {
        let db = test_db().await;
        let hasher = test_hasher();
        let u1 = seed_user(&db, &hasher, "u1").await;
        let u2 = seed_user(&db, &hasher, "u2").await;

        follow(&db, u2.id, u1.id).await.expect("follow");
        unfollow(&db, u2.id, u1.id).await.expect("unfollow");
        assert!(!is_following(&db, u2.id, u1.id).await.expect("query"));
        assert!(matches!(unfollow(&db, u2.id, u1.id).await, Err(DomainError::NotFollowing(_))));
    }
}

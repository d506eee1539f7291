use log::info;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use sea_orm::ActiveValue::Unchanged;

use crate::db::is_unique_violation;
use crate::domain::DomainError;
use crate::entity::user::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};
use crate::entity::{follow, like, message, user};
use crate::password::PasswordHasher;

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: String,
    pub location: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProfileCounts {
    pub messages: u64,
    pub following: u64,
    pub followers: u64,
    pub likes: u64,
}

/// Inserts a user with a hashed password; a taken username or email is `DomainError::Taken`.
pub async fn signup<C: ConnectionTrait>(
    db: &C,
    hasher: &PasswordHasher,
    new_user: NewUser,
) -> Result<user::Model, DomainError> {
    let password = hasher.hash(&new_user.password)?;
    let active = user::ActiveModel {
        username: Set(new_user.username),
        email: Set(new_user.email),
        image_url: Set(or_default(new_user.image_url, DEFAULT_IMAGE_URL)),
        header_image_url: Set(DEFAULT_HEADER_IMAGE_URL.to_string()),
        bio: Set(String::new()),
        location: Set(String::new()),
        password: Set(password),
        ..Default::default()
    };

    let created = active.insert(db).await.map_err(taken_or_db)?;
    info!("user signed up id={} username={}", created.id, created.username);
    Ok(created)
}

/// The user, if the password verifies.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<Option<user::Model>, DomainError> {
    let found = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;

    let verified = match found {
        Some(user) => hasher.verify(password, &user.password).then_some(user),
        None => {
            hasher.verify_decoy(password);
            None
        }
    };
    Ok(verified)
}

pub async fn find_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model, DomainError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(DomainError::UserNotFound)
}

pub async fn update_profile<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    update: ProfileUpdate,
) -> Result<user::Model, DomainError> {
    let active = user::ActiveModel {
        id: Unchanged(user_id),
        username: Set(update.username),
        email: Set(update.email),
        image_url: Set(or_default(update.image_url, DEFAULT_IMAGE_URL)),
        header_image_url: Set(or_default(update.header_image_url, DEFAULT_HEADER_IMAGE_URL)),
        bio: Set(update.bio),
        location: Set(update.location),
        ..Default::default()
    };
    active.update(db).await.map_err(|err| match err {
        DbErr::RecordNotUpdated => DomainError::UserNotFound,
        other => taken_or_db(other),
    })
}

/// Users whose username contains `q` literally and case-sensitively;
/// everyone when `q` is blank.
pub async fn search_users<C: ConnectionTrait>(db: &C, q: Option<&str>) -> Result<Vec<user::Model>, DomainError> {
    let mut select = user::Entity::find();
    if let Some(q) = q.map(str::trim).filter(|q| !q.is_empty()) {
        select = select.filter(Expr::cust_with_values("instr(\"username\", ?) > 0", [q.to_string()]));
    }
    Ok(select.order_by_asc(user::Column::Username).all(db).await?)
}

pub async fn profile_counts<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<ProfileCounts, DomainError> {
    let messages = message::Entity::find()
        .filter(message::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    let following = follow::Entity::find()
        .filter(follow::Column::UserFollowingId.eq(user_id))
        .count(db)
        .await?;
    let followers = follow::Entity::find()
        .filter(follow::Column::UserBeingFollowedId.eq(user_id))
        .count(db)
        .await?;
    let likes = like::Entity::find()
        .filter(like::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    Ok(ProfileCounts { messages, following, followers, likes })
}

/// Removes the user with every message, follow and like that references it.
/// Run it inside a transaction so the cascade is all-or-nothing.
pub async fn delete_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<(), DomainError> {
    let owned_messages = Query::select()
        .column(message::Column::Id)
        .from(message::Entity)
        .and_where(message::Column::UserId.eq(user_id))
        .to_owned();

    like::Entity::delete_many()
        .filter(
            Condition::any()
                .add(like::Column::UserId.eq(user_id))
                .add(like::Column::MessageId.in_subquery(owned_messages)),
        )
        .exec(db)
        .await?;
    follow::Entity::delete_many()
        .filter(
            Condition::any()
                .add(follow::Column::UserFollowingId.eq(user_id))
                .add(follow::Column::UserBeingFollowedId.eq(user_id)),
        )
        .exec(db)
        .await?;
    message::Entity::delete_many()
        .filter(message::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    let deleted = user::Entity::delete_by_id(user_id).exec(db).await?;
    if deleted.rows_affected == 0 {
        return Err(DomainError::UserNotFound);
    }
    info!("user deleted id={}", user_id);
    Ok(())
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn taken_or_db(err: DbErr) -> DomainError {
    if is_unique_violation(&err) {
        DomainError::Taken
    } else {
        DomainError::Db(err)
    }
}

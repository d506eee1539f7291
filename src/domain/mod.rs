//! Invariant-enforcing operations over users, messages, follows and likes.
//!
//! Every function takes any `ConnectionTrait`, so callers decide whether it
//! runs on the pool or inside a transaction.

pub mod follow;
pub mod like;
pub mod message;
pub mod user;

use bcrypt::BcryptError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Username or email collided; deliberately does not say which.
    #[error("username or email already taken")]
    Taken,
    #[error("user not found")]
    UserNotFound,
    #[error("message not found")]
    MessageNotFound,
    #[error("cannot follow yourself")]
    SelfFollow,
    #[error("already following @{0}")]
    AlreadyFollowing(String),
    #[error("not following @{0}")]
    NotFollowing(String),
    #[error("cannot like your own message")]
    SelfLike,
    #[error("message belongs to another user")]
    NotOwner,
    #[error("password hashing failed: {0}")]
    Hash(#[from] BcryptError),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

use actix_web::{http::StatusCode, ResponseError};
use log::error;
use sea_orm::TransactionError;
use thiserror::Error;

use crate::domain::DomainError;
use crate::response::response_from_error;

pub const ACCESS_UNAUTHORIZED: &str = "Access unauthorized.";
pub const NOT_OWNER: &str = "ACCESS UNAUTHORIZED";

#[derive(Debug, Error)]
pub enum AppError {
    /// Flashed and redirected; always HTTP 200.
    #[error("{msg}")]
    Biz { code: i32, msg: String, redirect: String },
    /// Logged in, but the resource belongs to someone else.
    #[error("ACCESS UNAUTHORIZED")]
    NotOwner,
}

impl AppError {
    fn biz(code: i32, msg: impl Into<String>) -> Self {
        Self::Biz { code, msg: msg.into(), redirect: "/".to_string() }
    }

    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::biz(1, msg)
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self::biz(2, msg)
    }

    pub fn need_login() -> Self {
        Self::biz(3, ACCESS_UNAUTHORIZED)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::biz(4, msg)
    }

    pub fn system_exception() -> Self {
        Self::biz(99, "Something went wrong. Please try again.")
    }

    /// Sends validation and business failures back to `to`. Login, lookup
    /// and system failures keep landing on `/`.
    pub fn redirect_to(self, to: impl Into<String>) -> Self {
        match self {
            Self::Biz { code, msg, .. } if code == 1 || code == 2 => Self::Biz { code, msg, redirect: to.into() },
            other => other,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Biz { code, .. } => *code,
            Self::NotOwner => 5,
        }
    }

    pub fn msg(&self) -> &str {
        match self {
            Self::Biz { msg, .. } => msg,
            Self::NotOwner => NOT_OWNER,
        }
    }

    pub fn redirect(&self) -> Option<&str> {
        match self {
            Self::Biz { redirect, .. } => Some(redirect),
            Self::NotOwner => None,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Taken => Self::fail("Username or email already taken"),
            DomainError::UserNotFound => Self::not_found("User not found."),
            DomainError::MessageNotFound => Self::not_found("Message not found."),
            DomainError::SelfFollow => Self::fail("You cannot follow yourself."),
            DomainError::AlreadyFollowing(name) => Self::fail(format!("You are already following @{}.", name)),
            DomainError::NotFollowing(name) => Self::fail(format!("You are not following @{}.", name)),
            DomainError::SelfLike => Self::fail("Cannot like your own messages!"),
            DomainError::NotOwner => Self::NotOwner,
            DomainError::Hash(e) => {
                error!("password hashing failed: {}", e);
                Self::system_exception()
            }
            DomainError::Db(e) => {
                error!("database error: {}", e);
                Self::system_exception()
            }
        }
    }
}

pub fn map_tx_error(err: TransactionError<DomainError>) -> AppError {
    match err {
        TransactionError::Connection(e) => {
            error!("transaction failed: {}", e);
            AppError::system_exception()
        }
        TransactionError::Transaction(domain) => domain.into(),
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotOwner => StatusCode::UNAUTHORIZED,
            Self::Biz { .. } => StatusCode::OK,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        response_from_error(self)
    }
}

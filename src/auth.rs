use actix_session::config::CookieContentSecurity;
use actix_session::{storage::CookieSessionStore, Session, SessionExt, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use log::{error, info, warn};
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::entity::user;
use crate::error::AppError;

pub const CURR_USER_KEY: &str = "curr_user";
pub const SESSION_COOKIE: &str = "warbler_session";

/// Private (encrypted) cookie session; the cookie holds only the user id and
/// pending flash messages.
pub fn session_middleware(key: Key, cookie_secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.to_owned())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_same_site(SameSite::Lax)
        .cookie_content_security(CookieContentSecurity::Private)
        .build()
}

/// The logged-in user. Anonymous requests are rejected with "Access
/// unauthorized." before any other extractor or handler work runs.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub user::Model);

#[derive(Clone, Debug)]
pub struct OptionalCurrentUser(pub Option<user::Model>);

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req.get_session();
        let user_id = match session_user_id(&session) {
            Some(id) => id,
            None => return Box::pin(async { Err(AppError::need_login().into()) }),
        };
        let db = match req.app_data::<web::Data<DatabaseConnection>>() {
            Some(db) => db.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };

        Box::pin(async move {
            let user = load_session_user(&db, &session, user_id)
                .await?
                .ok_or_else(AppError::need_login)?;
            Ok(CurrentUser(user))
        })
    }
}

impl FromRequest for OptionalCurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req.get_session();
        let user_id = match session_user_id(&session) {
            Some(id) => id,
            None => return Box::pin(async { Ok(OptionalCurrentUser(None)) }),
        };
        let db = match req.app_data::<web::Data<DatabaseConnection>>() {
            Some(db) => db.clone(),
            None => {
                return Box::pin(async { Ok(OptionalCurrentUser(None)) });
            }
        };

        Box::pin(async move {
            let user = load_session_user(&db, &session, user_id).await?;
            Ok(OptionalCurrentUser(user))
        })
    }
}

fn session_user_id(session: &Session) -> Option<i32> {
    session.get::<i32>(CURR_USER_KEY).unwrap_or_else(|e| {
        warn!("ignoring unreadable session user: {}", e);
        None
    })
}

/// A session pointing at a deleted user is treated as logged out.
async fn load_session_user(
    db: &DatabaseConnection,
    session: &Session,
    user_id: i32,
) -> Result<Option<user::Model>, AppError> {
    let found = user::Entity::find_by_id(user_id).one(db).await.map_err(|e| {
        error!("session user lookup failed: {}", e);
        AppError::system_exception()
    })?;
    if found.is_none() {
        warn!("session refers to missing user {}", user_id);
        session.remove(CURR_USER_KEY);
    }
    Ok(found)
}

pub fn do_login(session: &Session, user: &user::Model) -> Result<(), AppError> {
    session.renew();
    session.insert(CURR_USER_KEY, user.id).map_err(|e| {
        error!("failed to store session user: {}", e);
        AppError::system_exception()
    })?;
    info!("user {} logged in", user.username);
    Ok(())
}

pub fn do_logout(session: &Session) {
    session.remove(CURR_USER_KEY);
}

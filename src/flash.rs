use actix_session::{Session, SessionExt};
use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    Error,
};
use log::warn;

const FLASHES_KEY: &str = "_flashes";
/// Pending notices kept in the cookie; older ones are dropped first.
pub const MAX_PENDING: usize = 5;

/// One-shot notice attached to a response; `flash_handler` moves it into the
/// session so the next rendered page shows it.
#[derive(Clone, Debug)]
pub struct Flash(pub String);

pub fn push(session: &Session, msg: String) {
    let mut pending = pending(session);
    pending.push(msg);
    if pending.len() > MAX_PENDING {
        pending.drain(..pending.len() - MAX_PENDING);
    }
    if let Err(e) = session.insert(FLASHES_KEY, pending) {
        warn!("failed to store flash message: {}", e);
    }
}

pub fn take(session: &Session) -> Vec<String> {
    let pending = pending(session);
    if !pending.is_empty() {
        session.remove(FLASHES_KEY);
    }
    pending
}

fn pending(session: &Session) -> Vec<String> {
    session
        .get::<Vec<String>>(FLASHES_KEY)
        .unwrap_or_else(|e| {
            warn!("dropping unreadable flash messages: {}", e);
            None
        })
        .unwrap_or_default()
}

pub async fn flash_handler<B>(req: ServiceRequest, next: Next<B>) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody,
{
    let res = next.call(req).await?;
    let flash = res.response().extensions().get::<Flash>().cloned();
    if let Some(Flash(msg)) = flash {
        if !msg.is_empty() {
            push(&res.request().get_session(), msg);
        }
    }
    Ok(res)
}

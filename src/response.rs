use actix_session::Session;
use actix_web::{error::UrlencodedError, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::error::AppError;
use crate::flash::{self, Flash};

#[derive(Serialize)]
pub struct ResponseDto<T: Serialize> {
    pub data: Option<T>,
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flashes: Vec<String>,
}

impl<T: Serialize> ResponseDto<T> {
    pub fn page(page: &'static str, data: Option<T>, flashes: Vec<String>) -> Self {
        Self {
            data,
            code: 0,
            msg: "".to_string(),
            page: Some(page),
            redirect: None,
            flashes,
        }
    }
}

/// Renders a page, draining any pending flash messages into it.
pub fn render<T: Serialize>(page: &'static str, data: Option<T>, session: &Session) -> HttpResponse {
    HttpResponse::Ok().json(ResponseDto::page(page, data, flash::take(session)))
}

/// Successful outcome that sends the client on to `to` with a notice.
pub fn redirect(to: impl Into<String>, notice: impl Into<String>) -> HttpResponse {
    let notice = notice.into();
    redirect_response(0, to.into(), notice)
}

fn redirect_response(code: i32, to: String, notice: String) -> HttpResponse {
    let mut res = HttpResponse::Ok().json(ResponseDto::<()> {
        data: None,
        code,
        msg: notice.clone(),
        page: None,
        redirect: Some(to),
        flashes: Vec::new(),
    });
    res.extensions_mut().insert(Flash(notice));
    res
}

pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = match err {
        UrlencodedError::ContentType => AppError::param_error("Invalid form submission."),
        UrlencodedError::Overflow { .. } | UrlencodedError::UnknownLength => AppError::param_error("Form is too large."),
        _ => AppError::param_error("Invalid form submission."),
    };
    app_err.into()
}

pub fn response_from_error(err: &AppError) -> HttpResponse {
    match err.redirect() {
        Some(to) => redirect_response(err.code(), to.to_string(), err.msg().to_string()),
        None => HttpResponse::Unauthorized().json(ResponseDto::<()> {
            data: None,
            code: err.code(),
            msg: err.msg().to_string(),
            page: Some("unauthorized"),
            redirect: None,
            flashes: Vec::new(),
        }),
    }
}

use actix_web::{http::StatusCode, web, HttpResponse};
use serde::{Deserialize, Serialize};

mod auth;
mod payroll;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(web::scope("/auth")
            .configure(auth::config))
        .service(web::scope("/payroll")
            .configure(payroll::config));
}

/// Body of every successful answer; failures are rendered by the error types
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Envelope<T> {
    pub(crate) success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub(crate) fn data(data: T) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    pub(crate) fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// `status` when every item succeeded, 207 otherwise
    pub(crate) fn batch(status: StatusCode, all_succeeded: bool, message: impl Into<String>, data: T) -> HttpResponse {
        let status = if all_succeeded { status } else { StatusCode::MULTI_STATUS };

        HttpResponse::build(status).json(Self {
            success: all_succeeded,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

impl Envelope<()> {
    pub(crate) fn done(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()), data: None }
    }
}

use actix_web::{get, post, web, HttpResponse, Responder};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{auth::Authority, entity::{prelude::*, user}, payroll::PayrollError};

use super::Envelope;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(login)
        .service(whoami);
}

#[derive(Debug, Serialize, Deserialize)]
struct Login {
    email: String,
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Session {
    token: String,
    user: user::Model,
}

/// Stored password hash of a login
fn password_hash(password: &str, email: &str) -> Vec<u8> {
    Sha256::digest(format!("{password}:{email}")).to_vec()
}

#[post("/login")]
async fn login(db: web::Data<DatabaseConnection>, authority: web::Data<Authority>, credentials: web::Json<Login>) -> actix_web::Result<HttpResponse> {
    let email = credentials.email.trim().to_lowercase();

    let Some(user) = User::find()
        .filter(user::Column::Email.eq(&email))
        .filter(user::Column::Password.eq(password_hash(&credentials.password, &email)))
        .one(db.get_ref()).await
        .map_err(PayrollError::from)?
    else {
        return Err(PayrollError::forbidden("Invalid credentials").into());
    };

    let token = authority.issue_for(&user)?;

    info!(user = %user.id, role = ?user.role, "logged in");

    Ok(HttpResponse::Ok().json(Envelope::data(Session { token, user })))
}

#[get("")]
async fn whoami(user: user::Model) -> impl Responder {
    web::Json(Envelope::data(user))
}

use std::ops::Deref;

use actix_web::{body, dev, http::{self, StatusCode}, web, FromRequest, HttpRequest, HttpResponse};
use chrono::{Duration, Local};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::entity::{sea_orm_active_enums::RoleType, user};

/// Issues and checks the bearer tokens of the payroll API
pub struct Authority {
    jwt_key: (EncodingKey, DecodingKey),
}

impl Authority {
    pub fn new(jwt_key: &[u8]) -> Self {
        Self {
            jwt_key: (EncodingKey::from_secret(jwt_key), DecodingKey::from_secret(jwt_key))
        }
    }

    /// Issue a token for specified user with 1 week of expiration time
    pub fn issue_for(&self, user: &user::Model) -> Result<String, AuthError> {
        let claims = Claims {
            exp: (Local::now() + Duration::weeks(1)).timestamp(),
            data: user
        };

        Ok(encode(&Header::default(), &claims, &self.jwt_key.0)?)
    }

    pub fn authorize(&self, token: impl AsRef<str>) -> Result<user::Model, AuthError> {
        let payload = decode::<Claims<user::Model>>(token.as_ref(), &self.jwt_key.1, &Validation::default())?;

        Ok(payload.claims.data)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims<T> {
    exp: i64,
    data: T,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,
    #[error("Invalid or expired token")]
    AuthorityError(#[from] jsonwebtoken::errors::Error),
    #[error("Access denied: {0} privileges required")]
    InsufficientRole(&'static str),
    #[error("Authentication is not configured")]
    Unconfigured,
}

impl actix_web::error::ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        HttpResponse::build(self.status_code())
            .json(json!({ "success": false, "message": self.to_string() }))
    }

    fn status_code(&self) -> http::StatusCode {
        match self {
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::AuthorityError(_) => StatusCode::FORBIDDEN,
            AuthError::InsufficientRole(_) => StatusCode::FORBIDDEN,
            AuthError::Unconfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl user::Model {
    /// Admins and managers see and manage every payroll
    pub fn is_privileged(&self) -> bool {
        matches!(self.role, RoleType::Admin | RoleType::Manager)
    }
}

impl FromRequest for user::Model {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            // Basically grabs the value after space ( ) from `Authorization` header
            // Example: Bearer sometoken
            //                 ^ grabs this value
            let Some(Ok(Some((_, token)))) = req.headers()
                .get("Authorization")
                .map(|v|
                    v.to_str()
                        .map(|str| str.split_once(" "))
                )
            else {
                return Err(AuthError::MissingToken.into())
            };

            let Some(authority) = req.app_data::<web::Data<Authority>>() else {
                return Err(AuthError::Unconfigured.into())
            };

            let user = authority.authorize(token)?;

            Ok(user)
        })
    }
}

/// Declares an extractor admitting only the users `$allowed` accepts
macro_rules! role_gate {
    ($(#[$meta:meta])* $name:ident, $label:literal, $allowed:expr) => {
        $(#[$meta])*
        pub struct $name(pub user::Model);

        impl Deref for $name {
            type Target = user::Model;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl FromRequest for $name {
            type Error = actix_web::Error;
            type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

            fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
                let req = req.clone();

                Box::pin(async move {
                    let user = user::Model::from_request(&req, &mut dev::Payload::None).await?;

                    let allowed: fn(&user::Model) -> bool = $allowed;
                    if !allowed(&user) {
                        return Err(AuthError::InsufficientRole($label).into())
                    }

                    Ok(Self(user))
                })
            }
        }
    };
}

role_gate!(Admin, "Admin", |user| user.role == RoleType::Admin);

role_gate!(
    /// Admin or manager
    Privileged, "Admin or manager", user::Model::is_privileged
);

#[cfg(test)]
mod tests {
    use actix_web::{body::MessageBody, get, test, web, App, Responder};

    use crate::testing::user_fixture;

    use super::*;

    #[actix_web::test]
    async fn test_authority() {
        let authority = Authority::new(b"secret");

        let user = user_fixture("bob@factory.local", RoleType::User);

        let token = authority.issue_for(&user).unwrap();

        let authorized_user = authority.authorize(token).expect("Unable to authorize user from token");

        // The password hash never leaves the server
        assert_eq!(authorized_user.id, user.id);
        assert_eq!(authorized_user.email, user.email);
        assert!(authorized_user.password.is_empty());
    }

    #[actix_web::test]
    async fn test_extractor() {
        let secret = b"secret";

        #[get("/")]
        async fn test_handler(user: user::Model) -> impl Responder {
            user.id.to_string()
        }

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .service(test_handler)
        ).await;

        {
            let forbidden_req = test::TestRequest::default()
                .uri("/")
                .insert_header(("Authorization", "Bearer wrong"))
                .to_request();

            let response = test::call_service(&app, forbidden_req).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }

        {
            let unauthorized_req = test::TestRequest::default()
                .uri("/")
                .to_request();

            let response = test::call_service(&app, unauthorized_req).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        {
            let user = user_fixture("bob@factory.local", RoleType::User);

            let token = Authority::new(secret).issue_for(&user).unwrap();

            let authorized_req = test::TestRequest::default()
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request();

            let response = test::call_service(&app, authorized_req).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.into_body().try_into_bytes().unwrap(), user.id.to_string().as_bytes());
        }
    }

    #[actix_web::test]
    async fn test_role_extractors() {
        let secret = b"secret";

        #[get("/admin")]
        async fn admin_handler(user: Admin) -> impl Responder {
            assert_eq!(user.role, RoleType::Admin);

            ""
        }

        #[get("/privileged")]
        async fn privileged_handler(user: Privileged) -> impl Responder {
            assert!(user.is_privileged());

            ""
        }

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .service(admin_handler)
                .service(privileged_handler)
        ).await;

        let cases = [
            (RoleType::Admin, "/admin", StatusCode::OK),
            (RoleType::Manager, "/admin", StatusCode::FORBIDDEN),
            (RoleType::User, "/admin", StatusCode::FORBIDDEN),
            (RoleType::Admin, "/privileged", StatusCode::OK),
            (RoleType::Manager, "/privileged", StatusCode::OK),
            (RoleType::User, "/privileged", StatusCode::FORBIDDEN),
        ];

        for (role, uri, status) in cases {
            let user = user_fixture("someone@factory.local", role);
            let token = Authority::new(secret).issue_for(&user).unwrap();

            let req = test::TestRequest::default()
                .uri(uri)
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request();

            let response = test::call_service(&app, req).await;
            assert_eq!(response.status(), status, "{role:?} on {uri}");
        }
    }
}

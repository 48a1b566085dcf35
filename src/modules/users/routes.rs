use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

use shelf_http::{ApiJson, AppError};

use super::models::{LoginRequest, LoginResponse, SignupRequest, SignupResponse};
use super::service::UserService;

pub fn router(service: Arc<UserService>) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .with_state(service)
}

async fn signup(
    State(service): State<Arc<UserService>>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let email = service.signup(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created",
            user: email,
        }),
    ))
}

async fn login(
    State(service): State<Arc<UserService>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let token = service.login(request).await?;
    Ok(Json(LoginResponse {
        message: "Login Successful",
        token,
    }))
}

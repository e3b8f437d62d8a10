use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug)]
pub enum AppError {
    Validation { field: &'static str, message: String },
    Conflict { field: &'static str, message: String },
    AuthFailed,
    Unauthorized,
    NotFound(&'static str),
    Database(sqlx::Error),
    Cache(redis::RedisError),
    Token(jsonwebtoken::errors::Error),
    Hash(bcrypt::BcryptError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                error_codes::VALIDATION_ERROR,
                format!("{}: {}", field, message),
            ),
            AppError::Conflict { field, message } => {
                let code = if field == "email" {
                    error_codes::EMAIL_EXISTS
                } else {
                    error_codes::USER_EXISTS
                };
                (StatusCode::CONFLICT, code, format!("{}: {}", field, message))
            }
            // 不区分用户名错误还是密码错误
            AppError::AuthFailed => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "用户名或密码无效".to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_codes::PERMISSION_DENIED,
                "未授权访问".to_string(),
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                error_codes::NOT_FOUND,
                format!("{}不存在", what),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "内部服务器错误".to_string(),
                )
            }
            AppError::Cache(e) => {
                tracing::error!("Session store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "内部服务器错误".to_string(),
                )
            }
            AppError::Token(e) => {
                tracing::error!("Session token error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "内部服务器错误".to_string(),
                )
            }
            AppError::Hash(e) => {
                tracing::error!("Password hash error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "内部服务器错误".to_string(),
                )
            }
        };

        (status, error_to_api_response::<()>(code, message)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            // 唯一约束冲突按字段上报，由约束名区分
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                if db.constraint().is_some_and(|c| c.contains("email")) {
                    AppError::Conflict {
                        field: "email",
                        message: "邮箱已被注册".into(),
                    }
                } else {
                    AppError::Conflict {
                        field: "username",
                        message: "用户名已被占用".into(),
                    }
                }
            }
            sqlx::Error::RowNotFound => AppError::NotFound("记录"),
            other => AppError::Database(other),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Cache(e)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::Token(e)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Hash(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_422() {
        let resp = AppError::Validation {
            field: "username",
            message: "必填".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn conflict_maps_to_409() {
        let resp = AppError::Conflict {
            field: "email",
            message: "邮箱已被注册".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn auth_failures_map_to_401() {
        assert_eq!(
            AppError::AuthFailed.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            AppError::NotFound("用户").into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}

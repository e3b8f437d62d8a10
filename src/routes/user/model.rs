use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;
use crate::utils::{hash_password, verify_password};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub feedbacks: Vec<crate::routes::feedback::Feedback>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.username.is_empty() {
            return Err(AppError::Validation {
                field: "username",
                message: "用户名必填".into(),
            });
        }
        if self.username.chars().count() > 20 {
            return Err(AppError::Validation {
                field: "username",
                message: "用户名不能超过20个字符".into(),
            });
        }
        if self.password.len() < 6 {
            return Err(AppError::Validation {
                field: "password",
                message: "密码长度至少6个字符".into(),
            });
        }
        if self.email.is_empty() || !self.email.contains('@') {
            return Err(AppError::Validation {
                field: "email",
                message: "邮箱格式无效".into(),
            });
        }
        if self.email.chars().count() > 50 {
            return Err(AppError::Validation {
                field: "email",
                message: "邮箱不能超过50个字符".into(),
            });
        }
        if self.first_name.is_empty() || self.first_name.chars().count() > 30 {
            return Err(AppError::Validation {
                field: "first_name",
                message: "名字必填且不能超过30个字符".into(),
            });
        }
        if self.last_name.is_empty() || self.last_name.chars().count() > 30 {
            return Err(AppError::Validation {
                field: "last_name",
                message: "姓氏必填且不能超过30个字符".into(),
            });
        }
        Ok(())
    }
}

impl User {
    pub async fn register(pool: &PgPool, req: RegisterRequest) -> Result<Self, AppError> {
        // 只存散列，绝不存明文
        let password_hash = hash_password(&req.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, email, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING username, password, email, first_name, last_name
            "#,
        )
        .bind(&req.username)
        .bind(&password_hash)
        .bind(&req.email)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT username, password, email, first_name, last_name
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// 校验用户名与密码；用户不存在和密码错误一律返回 None
    pub async fn authenticate(
        pool: &PgPool,
        username: &str,
        password: &str,
    ) -> Result<Option<Self>, AppError> {
        let Some(user) = Self::find_by_username(pool, username).await? else {
            return Ok(None);
        };

        if verify_password(password, &user.password)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// 删除用户，留言由外键级联一并删除
    pub async fn delete(pool: &PgPool, username: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("用户"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> RegisterRequest {
        RegisterRequest {
            username: "alice".into(),
            password: "pw1234".into(),
            email: "a@x.com".into(),
            first_name: "Alice".into(),
            last_name: "A".into(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn empty_username_is_rejected() {
        let mut req = valid_request();
        req.username = String::new();
        assert!(matches!(
            req.validate().unwrap_err(),
            AppError::Validation { field: "username", .. }
        ));
    }

    #[test]
    fn overlong_username_is_rejected() {
        let mut req = valid_request();
        req.username = "a".repeat(21);
        assert!(req.validate().is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        let mut req = valid_request();
        req.password = "pw123".into();
        assert!(matches!(
            req.validate().unwrap_err(),
            AppError::Validation { field: "password", .. }
        ));
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut req = valid_request();
        req.email = "not-an-email".into();
        assert!(matches!(
            req.validate().unwrap_err(),
            AppError::Validation { field: "email", .. }
        ));
    }

    #[test]
    fn overlong_email_is_rejected() {
        let mut req = valid_request();
        req.email = format!("{}@x.com", "a".repeat(50));
        assert!(req.validate().is_err());
    }

    #[test]
    fn missing_names_are_rejected() {
        let mut req = valid_request();
        req.first_name = String::new();
        assert!(req.validate().is_err());

        let mut req = valid_request();
        req.last_name = "a".repeat(31);
        assert!(req.validate().is_err());
    }
}

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub title: String,
    pub content: String,
}

impl FeedbackRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.is_empty() {
            return Err(AppError::Validation {
                field: "title",
                message: "标题必填".into(),
            });
        }
        if self.title.chars().count() > 100 {
            return Err(AppError::Validation {
                field: "title",
                message: "标题不能超过100个字符".into(),
            });
        }
        if self.content.is_empty() {
            return Err(AppError::Validation {
                field: "content",
                message: "内容必填".into(),
            });
        }
        Ok(())
    }
}

impl Feedback {
    pub async fn create(
        pool: &PgPool,
        username: &str,
        req: FeedbackRequest,
    ) -> Result<Self, AppError> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedbacks (title, content, username)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, username
            "#,
        )
        .bind(&req.title)
        .bind(&req.content)
        .bind(username)
        .fetch_one(pool)
        .await?;

        Ok(feedback)
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, AppError> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT id, title, content, username
            FROM feedbacks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(feedback)
    }

    pub async fn find_for_user(pool: &PgPool, username: &str) -> Result<Vec<Self>, AppError> {
        let feedbacks = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT id, title, content, username
            FROM feedbacks
            WHERE username = $1
            ORDER BY id
            "#,
        )
        .bind(username)
        .fetch_all(pool)
        .await?;

        Ok(feedbacks)
    }

    /// 覆盖标题与内容，属主检查由调用方完成
    pub async fn update(pool: &PgPool, id: i32, req: FeedbackRequest) -> Result<Self, AppError> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            UPDATE feedbacks
            SET title = $1, content = $2
            WHERE id = $3
            RETURNING id, title, content, username
            "#,
        )
        .bind(&req.title)
        .bind(&req.content)
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(feedback)
    }

    pub async fn delete(pool: &PgPool, id: i32) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM feedbacks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("留言"));
        }

        Ok(())
    }
}

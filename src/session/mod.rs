use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::utils::{generate_session_token, verify_session_token};

pub const SESSION_COOKIE: &str = "session_token";

/// 会话缓存键前缀
const SESSION_PREFIX: &str = "session:";

/// 生成会话缓存键
pub fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, session_id)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoredSession {
    pub session_id: String,
    pub username: String,
    pub created_at: i64, // Unix timestamp
    pub expires_at: i64, // Unix timestamp
}

/// 会话存储操作，键值保存在 Redis
pub struct SessionStore;

impl SessionStore {
    pub async fn create(
        redis: &Arc<RedisClient>,
        username: &str,
        ttl: u64,
    ) -> Result<String, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let session_id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        let session = StoredSession {
            session_id: session_id.clone(),
            username: username.to_string(),
            created_at: now,
            expires_at: now + ttl as i64,
        };

        let json = serde_json::to_string(&session).map_err(|e| {
            redis::RedisError::from((redis::ErrorKind::IoError, "序列化错误", e.to_string()))
        })?;

        let _: () = conn.set_ex(session_key(&session_id), json, ttl).await?;

        Ok(session_id)
    }

    pub async fn get(
        redis: &Arc<RedisClient>,
        session_id: &str,
    ) -> Result<Option<StoredSession>, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let result: Option<String> = conn.get(session_key(session_id)).await?;

        match result {
            Some(json) => {
                let session = serde_json::from_str(&json).map_err(|e| {
                    redis::RedisError::from((
                        redis::ErrorKind::IoError,
                        "反序列化错误",
                        e.to_string(),
                    ))
                })?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// 删除会话，键不存在时 DEL 本身就是空操作
    pub async fn remove(
        redis: &Arc<RedisClient>,
        session_id: &str,
    ) -> Result<(), redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let _: () = conn.del(session_key(session_id)).await?;

        Ok(())
    }
}

/// 建立会话：写入 Redis 并把签名后的令牌放进 Cookie
pub async fn establish(
    state: &AppState,
    jar: CookieJar,
    username: &str,
) -> Result<CookieJar, AppError> {
    let ttl = state.config.session_expiration().as_secs();
    let session_id = SessionStore::create(&state.redis, username, ttl).await?;
    let token = generate_session_token(&session_id, &state.config)?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok(jar.add(cookie))
}

/// 解析当前请求的登录用户；无效、过期或未知令牌一律视为未登录
pub async fn current_user(state: &AppState, jar: &CookieJar) -> Result<Option<String>, AppError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let Ok(claims) = verify_session_token(cookie.value(), &state.config) else {
        return Ok(None);
    };

    let session = SessionStore::get(&state.redis, &claims.sub).await?;
    Ok(session.map(|s| s.username))
}

/// 注销会话并移除 Cookie；没有会话时同样成功
pub async fn clear(state: &AppState, jar: CookieJar) -> Result<CookieJar, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(claims) = verify_session_token(cookie.value(), &state.config) {
            SessionStore::remove(&state.redis, &claims.sub).await?;
        }
    }

    Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/").build()))
}

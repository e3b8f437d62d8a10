//! 端到端流程测试，需要可用的 Postgres 和 Redis：
//! DATABASE_URL=... REDIS_URL=... cargo test -- --ignored

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use feedback_backend::{AppState, config::Config, middleware::RateLimiter, router::build_router};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

async fn test_app() -> (Router, PgPool) {
    let config = Config {
        database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        redis_url: std::env::var("REDIS_URL").expect("REDIS_URL must be set"),
        session_secret: "integration-test-secret".into(),
        session_expiration_secs: 3600,
        rate_limit_window_secs: 60,
        rate_limit_requests: 10_000,
        server_host: "127.0.0.1".into(),
        server_port: 0,
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .expect("connect to Postgres");
    sqlx::migrate!().run(&pool).await.expect("run migrations");

    let redis_client = redis::Client::open(config.redis_url.clone()).expect("open Redis client");
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        redis: Arc::new(redis_client.clone()),
    };
    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config));

    (build_router(state, rate_limiter), pool)
}

fn unique(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &id[..8])
}

fn register_form(username: &str) -> String {
    format!(
        "username={u}&password=pw1234&email={u}%40x.com&first_name=Alice&last_name=A",
        u = username
    )
}

fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn form_post(path: &str, body: String, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("response should set a session cookie")
        .to_string()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("response should redirect")
}

async fn register(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(form_post("/register", register_form(username), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/users/{}", username));
    session_cookie(&response)
}

#[tokio::test]
#[ignore = "requires running Postgres and Redis"]
async fn register_feedback_and_failed_login_scenario() {
    let (app, pool) = test_app().await;
    let alice = unique("al");

    // 注册成功，会话建立，跳转到主页
    let cookie = register(&app, &alice).await;

    let response = app
        .clone()
        .oneshot(get(&format!("/users/{}", alice), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 以自己的名义留言
    let response = app
        .clone()
        .oneshot(form_post(
            &format!("/users/{}/feedback/add", alice),
            "title=Hi&content=Hello".into(),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/users/{}", alice));

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM feedbacks WHERE username = $1")
            .bind(&alice)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);

    // 不存在的用户登录，只给出笼统的失败信息
    let response = app
        .clone()
        .oneshot(form_post(
            "/login",
            "username=bob&password=whatever".into(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires running Postgres and Redis"]
async fn duplicate_username_is_rejected_and_first_row_survives() {
    let (app, _pool) = test_app().await;
    let alice = unique("al");
    let cookie = register(&app, &alice).await;

    let body = format!(
        "username={u}&password=pw1234&email=other_{u}%40x.com&first_name=Alice&last_name=A",
        u = alice
    );
    let response = app
        .clone()
        .oneshot(form_post("/register", body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // 第一条记录不受影响
    let response = app
        .clone()
        .oneshot(get(&format!("/users/{}", alice), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires running Postgres and Redis"]
async fn duplicate_email_is_rejected() {
    let (app, _pool) = test_app().await;
    let alice = unique("al");
    register(&app, &alice).await;

    let body = format!(
        "username={}&password=pw1234&email={}%40x.com&first_name=Bob&last_name=B",
        unique("bo"),
        alice
    );
    let response = app
        .clone()
        .oneshot(form_post("/register", body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires running Postgres and Redis"]
async fn deleting_a_user_cascades_to_feedback() {
    let (app, pool) = test_app().await;
    let alice = unique("al");
    let cookie = register(&app, &alice).await;

    for i in 0..2 {
        let response = app
            .clone()
            .oneshot(form_post(
                &format!("/users/{}/feedback/add", alice),
                format!("title=Note+{}&content=Hello", i),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let response = app
        .clone()
        .oneshot(form_post(
            &format!("/users/{}/delete", alice),
            String::new(),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM feedbacks WHERE username = $1")
            .bind(&alice)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore = "requires running Postgres and Redis"]
async fn owner_scoped_routes_reject_anonymous_and_other_users() {
    let (app, _pool) = test_app().await;

    // 未登录访问，无论用户存在与否都是 401
    let response = app
        .clone()
        .oneshot(get("/users/alice", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let alice = unique("al");
    let bob = unique("bo");
    register(&app, &alice).await;
    let bob_cookie = register(&app, &bob).await;

    // 登录用户访问别人的主页同样是 401
    let response = app
        .clone()
        .oneshot(get(&format!("/users/{}", alice), Some(&bob_cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires running Postgres and Redis"]
async fn cross_user_feedback_mutation_is_rejected() {
    let (app, pool) = test_app().await;
    let alice = unique("al");
    let bob = unique("bo");
    let alice_cookie = register(&app, &alice).await;
    let bob_cookie = register(&app, &bob).await;

    let response = app
        .clone()
        .oneshot(form_post(
            &format!("/users/{}/feedback/add", alice),
            "title=Hi&content=Hello".into(),
            Some(&alice_cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let id: i32 = sqlx::query_scalar("SELECT id FROM feedbacks WHERE username = $1")
        .bind(&alice)
        .fetch_one(&pool)
        .await
        .unwrap();

    // bob 不能改或删 alice 的留言，也不能以她的名义新增
    let response = app
        .clone()
        .oneshot(form_post(
            &format!("/feedback/{}/update", id),
            "title=Hacked&content=Nope".into(),
            Some(&bob_cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(form_post(
            &format!("/feedback/{}/delete", id),
            String::new(),
            Some(&bob_cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(form_post(
            &format!("/users/{}/feedback/add", alice),
            "title=Fake&content=Nope".into(),
            Some(&bob_cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires running Postgres and Redis"]
async fn logout_clears_the_session_and_is_a_noop_without_one() {
    let (app, _pool) = test_app().await;
    let alice = unique("al");
    let cookie = register(&app, &alice).await;

    let response = app
        .clone()
        .oneshot(get("/logout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // 会话已失效
    let response = app
        .clone()
        .oneshot(get(&format!("/users/{}", alice), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // 没有会话时注销同样成功
    let response = app.clone().oneshot(get("/logout", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
#[ignore = "requires running Postgres and Redis"]
async fn authenticated_users_are_redirected_away_from_forms() {
    let (app, _pool) = test_app().await;
    let alice = unique("al");
    let cookie = register(&app, &alice).await;

    for path in ["/register", "/login"] {
        let response = app.clone().oneshot(get(path, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/users/{}", alice));
    }

    let response = app.clone().oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");
}

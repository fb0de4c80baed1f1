//! HTTP-level tests for saving and listing detection logs.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_json_auth, user_token};
use crowdcount_db::repositories::ActivityRepo;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn save_detection_stores_log_and_activity(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = user_token(&pool, &app, "saver", "user").await;

    let body = json!({
        "type": "video",
        "people_count": 4,
        "crossed_count": 2,
        "zone_counts": { "door": 1, "hall": 3 },
    });
    let response = post_json_auth(app, "/api/v1/detections", &token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["detection_type"], "video");
    assert_eq!(data["total_count"], 4);
    assert_eq!(data["crossed_count"], 2);
    assert_eq!(
        data["zone_counts"],
        json!({ "type": "video", "crossed": 2, "zones": { "door": 1, "hall": 3 } })
    );

    let activity = ActivityRepo::list_recent_with_users(&pool, 10).await.unwrap();
    assert_eq!(activity[0].activity_type, "detection");
    assert_eq!(
        activity[0].activity_details.as_deref(),
        Some("Saved video detection with 4 people")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn save_detection_defaults_to_webcam(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = user_token(&pool, &app, "saver", "user").await;

    let json = body_json(post_json_auth(app, "/api/v1/detections", &token, json!({})).await).await;

    assert_eq!(json["data"]["detection_type"], "webcam");
    assert_eq!(json["data"]["total_count"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn negative_counts_are_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = user_token(&pool, &app, "saver", "user").await;

    let body = json!({ "people_count": -1 });
    let response = post_json_auth(app, "/api/v1/detections", &token, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn users_see_their_own_logs_and_admins_see_all(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = user_token(&pool, &app, "root", "admin").await;
    let alice = user_token(&pool, &app, "alice", "user").await;
    let bob = user_token(&pool, &app, "bob", "user").await;

    for (token, people) in [(&alice, 1), (&alice, 2), (&bob, 3)] {
        let body = json!({ "people_count": people });
        post_json_auth(app.clone(), "/api/v1/detections", token, body).await;
    }

    let json = body_json(get_auth(app.clone(), "/api/v1/detections", &alice).await).await;
    let logs = json["data"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["total_count"], 2, "newest first");

    let json = body_json(get_auth(app.clone(), "/api/v1/detections", &bob).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let json = body_json(get_auth(app, "/api/v1/detections", &admin).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
}

//! HTTP-level tests for the admin panel endpoints and RBAC enforcement.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, body_text, create_user, delete_auth, get_auth, post_auth, post_json_auth,
    put_json_auth, user_token,
};
use crowdcount_db::models::detection_log::CreateDetectionLog;
use crowdcount_db::repositories::{DetectionLogRepo, UserRepo};
use serde_json::json;
use sqlx::PgPool;

fn square(x: f64, y: f64, size: f64) -> serde_json::Value {
    json!([
        { "x": x, "y": y },
        { "x": x + size, "y": y },
        { "x": x + size, "y": y + size },
        { "x": x, "y": y + size }
    ])
}

// ---------------------------------------------------------------------------
// RBAC
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_admins_are_forbidden(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = user_token(&pool, &app, "plain", "user").await;

    for uri in [
        "/api/v1/admin/users",
        "/api/v1/admin/activity",
        "/api/v1/admin/zones",
        "/api/v1/admin/settings/thresholds",
        "/api/v1/admin/stats",
    ] {
        let response = get_auth(app.clone(), uri, &token).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }

    let response = post_auth(app, "/api/v1/admin/export/csv", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_manages_users(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = user_token(&pool, &app, "root", "admin").await;
    let target = create_user(&pool, "target", "user").await;

    let json = body_json(get_auth(app.clone(), "/api/v1/admin/users", &admin).await).await;
    let users = json["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));

    let uri = format!("/api/v1/admin/users/{}/role", target.id);
    let response = put_json_auth(app.clone(), &uri, &admin, json!({ "role": "admin" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["role"], "admin");

    let response = put_json_auth(app.clone(), &uri, &admin, json!({ "role": "superuser" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri = format!("/api/v1/admin/users/{}", target.id);
    let response = delete_auth(app.clone(), &uri, &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(UserRepo::find_by_id(&pool, target.id).await.unwrap().is_none());

    let response = delete_auth(app, &uri, &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_cannot_delete_self(pool: PgPool) {
    let admin = create_user(&pool, "root", "admin").await;
    let app = common::build_test_app(pool.clone());
    let token = common::login(&app, &admin.email).await;

    let uri = format!("/api/v1/admin/users/{}", admin.id);
    let response = delete_auth(app, &uri, &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn role_change_on_unknown_user_is_404(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = user_token(&pool, &app, "root", "admin").await;

    let response = put_json_auth(
        app,
        "/api/v1/admin/users/999999/role",
        &admin,
        json!({ "role": "user" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn activity_lists_logins_with_user_details(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = user_token(&pool, &app, "root", "admin").await;
    user_token(&pool, &app, "visitor", "user").await;

    let json = body_json(get_auth(app, "/api/v1/admin/activity", &admin).await).await;
    let rows = json["data"].as_array().unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["username"], "visitor");
    assert_eq!(rows[0]["email"], "visitor@test.com");
    assert_eq!(rows[0]["activity_type"], "login");
    assert_eq!(rows[0]["activity_details"], "User logged in");
}

// ---------------------------------------------------------------------------
// Zones and thresholds
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_zone_lifecycle(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = user_token(&pool, &app, "root", "admin").await;

    let body = json!({ "zone_name": "entrance", "zone_points": square(0.0, 0.0, 100.0) });
    let response = post_json_auth(app.clone(), "/api/v1/admin/zones", &admin, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json!({
        "zone_name": "stage",
        "zone_points": square(200.0, 0.0, 50.0),
        "threshold": 3,
    });
    post_json_auth(app.clone(), "/api/v1/admin/zones", &admin, body).await;

    let json = body_json(get_auth(app.clone(), "/api/v1/admin/zones", &admin).await).await;
    let zones = json["data"]["zones"].as_array().unwrap();
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0]["name"], "entrance");
    assert_eq!(zones[0]["points"].as_array().unwrap().len(), 4);
    assert_eq!(json["data"]["thresholds"], json!({ "entrance": 10, "stage": 3 }));

    let response = delete_auth(app.clone(), "/api/v1/admin/zones/entrance", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    // Idempotent.
    let response = delete_auth(app.clone(), "/api/v1/admin/zones/entrance", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get_auth(app, "/api/v1/admin/zones", &admin).await).await;
    assert_eq!(json["data"]["zones"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["thresholds"], json!({ "stage": 3 }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn zone_creation_is_validated(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = user_token(&pool, &app, "root", "admin").await;
    let uri = "/api/v1/admin/zones";

    let two_points = json!({
        "zone_name": "line",
        "zone_points": [{ "x": 0, "y": 0 }, { "x": 10, "y": 10 }],
    });
    let response = post_json_auth(app.clone(), uri, &admin, two_points).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let unnamed = json!({ "zone_name": "  ", "zone_points": square(0.0, 0.0, 10.0) });
    let response = post_json_auth(app.clone(), uri, &admin, unnamed).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let negative = json!({
        "zone_name": "z",
        "zone_points": square(0.0, 0.0, 10.0),
        "threshold": -1,
    });
    let response = post_json_auth(app, uri, &admin, negative).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn thresholds_merge_and_are_shared_with_users(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = user_token(&pool, &app, "root", "admin").await;
    let user = user_token(&pool, &app, "viewer", "user").await;
    let uri = "/api/v1/admin/settings/thresholds";

    let body = json!({ "thresholds": { "a": 5, "b": 7 } });
    let response = put_json_auth(app.clone(), uri, &admin, body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json!({ "thresholds": { "b": 2 } });
    let json = body_json(put_json_auth(app.clone(), uri, &admin, body).await).await;
    assert_eq!(json["data"], json!({ "a": 5, "b": 2 }));

    let json = body_json(get_auth(app.clone(), uri, &admin).await).await;
    assert_eq!(json["data"], json!({ "a": 5, "b": 2 }));

    let json = body_json(get_auth(app.clone(), "/api/v1/zones/thresholds", &user).await).await;
    assert_eq!(json["data"], json!({ "a": 5, "b": 2 }));

    let body = json!({ "thresholds": { "c": -4 } });
    let response = put_json_auth(app, uri, &admin, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Stats and export
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn stats_summarise_usage(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = user_token(&pool, &app, "root", "admin").await;
    let user = user_token(&pool, &app, "viewer", "user").await;

    for people in [3, 4] {
        let body = json!({ "type": "image", "people_count": people, "crossed_count": 0 });
        let response = post_json_auth(app.clone(), "/api/v1/detections", &user, body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let body = json!({ "zone_name": "hall", "zone_points": square(0.0, 0.0, 10.0) });
    post_json_auth(app.clone(), "/api/v1/admin/zones", &admin, body).await;

    let json = body_json(get_auth(app, "/api/v1/admin/stats", &admin).await).await;
    let data = &json["data"];
    assert_eq!(data["total_users"], 2);
    assert_eq!(data["total_detections"], 2);
    assert_eq!(data["today_detections"], 2);
    assert_eq!(data["total_people"], 7);
    assert_eq!(data["active_zones"], 1);
    assert_eq!(
        data["activity_summary"],
        json!([
            { "activity_type": "detection", "count": 2 },
            { "activity_type": "login", "count": 2 }
        ])
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn csv_export_returns_attachment(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = user_token(&pool, &app, "root", "admin").await;
    let owner = create_user(&pool, "owner", "user").await;

    DetectionLogRepo::create(
        &pool,
        &CreateDetectionLog {
            user_id: owner.id,
            detection_type: "video".to_string(),
            total_count: 5,
            crossed_count: 1,
            zone_counts: json!({ "type": "video", "crossed": 1, "zones": { "a": 2 } }),
        },
    )
    .await
    .unwrap();

    let response = post_auth(app.clone(), "/api/v1/admin/export/csv", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert!(headers["content-type"].to_str().unwrap().starts_with("text/csv"));
    let disposition = headers["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"detection_logs_"));
    assert!(disposition.ends_with(".csv\""));

    let csv = body_text(response).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "id,username,email,people_count,crossed_count,detection_type,zone_data,timestamp"
    );
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains(",owner,owner@test.com,5,1,video,"));

    // A window in the past excludes everything.
    let body = json!({ "start_date": "2001-01-01", "end_date": "2001-12-31" });
    let response = post_json_auth(app.clone(), "/api/v1/admin/export/csv", &admin, body).await;
    assert_eq!(body_text(response).await.lines().count(), 1);

    let body = json!({ "start_date": "not a date" });
    let response = post_json_auth(app, "/api/v1/admin/export/csv", &admin, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

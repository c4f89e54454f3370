use std::sync::Mutex;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use student_portal::backend::portal::Portal;
use student_portal::backend::rest_api;

fn shared_portal(dir: &tempfile::TempDir) -> web::Data<Mutex<Portal>> {
    web::Data::new(Mutex::new(Portal::open(dir.path()).unwrap()))
}

#[actix_rt::test]
async fn index_answers() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(shared_portal(&dir))
            .configure(rest_api::configure),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn overlapping_lecture_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(shared_portal(&dir))
            .configure(rest_api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/timetable/lectures")
        .set_json(json!({"day": "Wed", "start": "9", "end": "10:30", "title": "Maths"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let entry: Value = test::read_body_json(resp).await;
    assert_eq!(entry["id"], 1);
    assert_eq!(entry["start"], "09:00");
    assert_eq!(entry["end"], "10:30");

    let req = test::TestRequest::post()
        .uri("/api/timetable/lectures")
        .set_json(json!({"day": "Wed", "start": "10:00", "end": "11:00"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("overlaps"));

    let req = test::TestRequest::get()
        .uri("/api/timetable?kind=lecture")
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn register_and_login() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(shared_portal(&dir))
            .configure(rest_api::configure),
    )
    .await;

    let register = json!({"kind": "student", "id": "S1", "password": "pw", "confirm": "pw"});
    let req = test::TestRequest::post().uri("/api/register").set_json(&register).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post().uri("/api/register").set_json(&register).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({"kind": "student", "id": "S1", "password": "pw"}))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(session["kind"], "student");

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({"kind": "student", "id": "S1", "password": "wrong"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn errors_come_back_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(shared_portal(&dir))
            .configure(rest_api::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/fees/nobody").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/events")
        .set_json(json!({"title": "Fest", "body": "Music", "date": "2025-13-01"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());

    let req = test::TestRequest::post()
        .uri("/api/complaints")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_rt::test]
async fn announcements_can_be_posted_read_and_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(shared_portal(&dir))
            .configure(rest_api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/announcements")
        .set_json(json!({"title": "Exams", "body": "Schedule is out"}))
        .to_request();
    let posted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(posted["id"], 1);

    let req = test::TestRequest::get().uri("/api/announcements/1").to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["title"], "Exams");

    let req = test::TestRequest::delete().uri("/api/announcements/1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/announcements/1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn complaints_are_resolved_by_position() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(shared_portal(&dir))
            .configure(rest_api::configure),
    )
    .await;

    for message in ["wifi down", "fan broken"] {
        let req = test::TestRequest::post()
            .uri("/api/complaints")
            .set_json(json!({"student_id": "S1", "message": message}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let req = test::TestRequest::delete()
        .uri("/api/complaints/0?student_id=S2")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri("/api/complaints/0?student_id=S1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let removed: Value = test::read_body_json(resp).await;
    assert_eq!(removed["message"], "wifi down");

    let req = test::TestRequest::get().uri("/api/complaints").to_request();
    let left: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(left.as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn results_summary_and_attendance_removal() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(shared_portal(&dir))
            .configure(rest_api::configure),
    )
    .await;

    for (subject, earned, spi, grade) in [("Maths", 0, 0.0, "F"), ("Physics", 4, 9.0, "A")] {
        let req = test::TestRequest::post()
            .uri("/api/results")
            .set_json(json!({
                "student_id": "S1",
                "subject": subject,
                "total_credits": 4,
                "credits_earned": earned,
                "spi": spi,
                "grade": grade,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let saved: Value = test::read_body_json(resp).await;
        assert_eq!(saved["passed"], grade != "F");
    }

    let req = test::TestRequest::get().uri("/api/results/S1/summary").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let summary: Value = test::read_body_json(resp).await;
    assert_eq!(summary["total_credits"], 8);
    assert_eq!(summary["credits_earned"], 4);
    assert_eq!(summary["average_spi"], 9.0);

    let req = test::TestRequest::post()
        .uri("/api/attendance")
        .set_json(json!({"subject": "Maths", "total_lectures": 10, "attended": 7}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete().uri("/api/attendance/Maths").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete().uri("/api/attendance/Maths").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

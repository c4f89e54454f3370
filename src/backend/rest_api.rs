use std::sync::Mutex;

use actix_web::http::StatusCode;
use actix_web::error::InternalError;
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use serde::Serialize;
use serde_derive::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::accounts::{FacultyProfile, StudentProfile, UserKind};
use super::errors::{StoreError, ValidationError};
use super::portal::*;
use super::table_models::{AssignStatus, EventKind, ResultRecord, SemesterInfo, SessionKind};

pub type SharedPortal = web::Data<Mutex<Portal>>;

/// Mounts every route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let body = json!({"error": err.to_string()});
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    });

    cfg.app_data(json_config).service(
        web::scope("/api")
            .service(index)
            .service(reload)
            .service(timetable)
            .service(add_lecture)
            .service(add_lab)
            .service(delete_timetable_entry)
            .service(assignments)
            .service(add_assignment)
            .service(set_assignment_status)
            .service(delete_assignment)
            .service(result_summary)
            .service(results_for)
            .service(record_result)
            .service(delete_result)
            .service(attendance)
            .service(record_attendance)
            .service(delete_attendance)
            .service(semester)
            .service(set_semester)
            .service(calendar_events)
            .service(add_calendar_event)
            .service(delete_calendar_event)
            .service(fees)
            .service(fee_for)
            .service(save_fee)
            .service(complaints)
            .service(submit_complaint)
            .service(resolve_complaint)
            .service(register)
            .service(login)
            .service(students)
            .service(student)
            .service(save_student)
            .service(delete_student)
            .service(faculties)
            .service(faculty)
            .service(save_faculty)
            .service(delete_faculty)
            .service(announcements)
            .service(announcement)
            .service(post_announcement)
            .service(delete_announcement)
            .service(events)
            .service(event)
            .service(post_event)
            .service(delete_event),
    );
}

fn status_for(e: &anyhow::Error) -> StatusCode {
    if e.downcast_ref::<AuthError>().is_some() {
        return StatusCode::UNAUTHORIZED;
    }

    match e.downcast_ref::<StoreError>() {
        Some(StoreError::Validation(ValidationError::Overlap { .. })) => StatusCode::CONFLICT,
        Some(StoreError::Validation(_)) => StatusCode::BAD_REQUEST,
        Some(StoreError::DuplicateKey(_)) => StatusCode::CONFLICT,
        Some(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        Some(StoreError::CapacityExceeded { .. }) | Some(StoreError::IdsExhausted) => {
            StatusCode::INSUFFICIENT_STORAGE
        }
        Some(StoreError::Io { .. }) | None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: anyhow::Error) -> HttpResponse {
    let status = status_for(&e);
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %e, "request failed");
    } else {
        debug!(status = status.as_u16(), error = %e, "request refused");
    }

    HttpResponse::build(status).json(json!({"error": e.to_string()}))
}

/// Runs one portal operation under the lock and turns its outcome into a
/// response.
fn with_portal<T, F>(portal: &SharedPortal, op: F) -> HttpResponse
where
    T: Serialize,
    F: FnOnce(&mut Portal) -> anyhow::Result<T>,
{
    let mut guard = match portal.lock() {
        Ok(guard) => guard,
        Err(_) => {
            error!("portal lock poisoned");
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Portal is unavailable."}));
        }
    };

    match op(&mut *guard) {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(e),
    }
}

fn found<T>(value: Option<T>, what: String) -> anyhow::Result<T> {
    value.ok_or_else(|| StoreError::NotFound(what).into())
}

fn message(text: &str) -> serde_json::Value {
    json!({"message": text})
}

#[derive(Deserialize)]
pub struct KindQuery<K> {
    pub kind: Option<K>,
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: AssignStatus,
}

#[derive(Deserialize)]
pub struct AttendanceBody {
    pub subject: String,
    pub total_lectures: u32,
    pub attended: u32,
}

#[derive(Deserialize)]
pub struct StudentQuery {
    pub student_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ComplaintBody {
    pub student_id: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct RegisterBody {
    pub kind: UserKind,
    pub id: String,
    pub password: String,
    pub confirm: String,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub kind: UserKind,
    pub id: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PostBody {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub date: String,
}

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({"success": true}))
}

#[post("/reload")]
pub async fn reload(portal: SharedPortal) -> impl Responder {
    with_portal(&portal, |p| p.reload().map(|_| message("Reloaded.")))
}

// timetable

#[get("/timetable")]
pub async fn timetable(portal: SharedPortal, query: web::Query<KindQuery<SessionKind>>) -> impl Responder {
    with_portal(&portal, |p| Ok(p.timetable(query.kind)))
}

#[post("/timetable/lectures")]
pub async fn add_lecture(portal: SharedPortal, form: web::Json<SessionForm>) -> impl Responder {
    with_portal(&portal, |p| p.add_lecture(&form))
}

#[post("/timetable/labs")]
pub async fn add_lab(portal: SharedPortal, form: web::Json<SessionForm>) -> impl Responder {
    with_portal(&portal, |p| p.add_lab(&form))
}

#[delete("/timetable/{id}")]
pub async fn delete_timetable_entry(portal: SharedPortal, id: web::Path<u32>) -> impl Responder {
    with_portal(&portal, |p| p.delete_timetable_entry(*id))
}

// assignments

#[get("/assignments")]
pub async fn assignments(portal: SharedPortal) -> impl Responder {
    with_portal(&portal, |p| Ok(p.assignments()))
}

#[post("/assignments")]
pub async fn add_assignment(portal: SharedPortal, form: web::Json<AssignmentForm>) -> impl Responder {
    with_portal(&portal, |p| p.add_assignment(&form))
}

#[patch("/assignments/{id}")]
pub async fn set_assignment_status(
    portal: SharedPortal,
    id: web::Path<u32>,
    body: web::Json<StatusBody>,
) -> impl Responder {
    with_portal(&portal, |p| p.set_assignment_status(*id, body.status))
}

#[delete("/assignments/{id}")]
pub async fn delete_assignment(portal: SharedPortal, id: web::Path<u32>) -> impl Responder {
    with_portal(&portal, |p| p.delete_assignment(*id))
}

// results and attendance

#[get("/results/{student_id}")]
pub async fn results_for(portal: SharedPortal, student_id: web::Path<String>) -> impl Responder {
    with_portal(&portal, |p| Ok(p.results_for(&student_id)))
}

#[get("/results/{student_id}/summary")]
pub async fn result_summary(portal: SharedPortal, student_id: web::Path<String>) -> impl Responder {
    with_portal(&portal, |p| Ok(p.result_summary(&student_id)))
}

#[post("/results")]
pub async fn record_result(portal: SharedPortal, body: web::Json<ResultRecord>) -> impl Responder {
    with_portal(&portal, |p| p.record_result(body.into_inner()))
}

#[delete("/results/{student_id}/{subject}")]
pub async fn delete_result(portal: SharedPortal, path: web::Path<(String, String)>) -> impl Responder {
    let (student_id, subject) = path.into_inner();
    with_portal(&portal, |p| p.delete_result(&student_id, &subject))
}

#[get("/attendance")]
pub async fn attendance(portal: SharedPortal) -> impl Responder {
    with_portal(&portal, |p| Ok(p.attendance()))
}

#[post("/attendance")]
pub async fn record_attendance(portal: SharedPortal, body: web::Json<AttendanceBody>) -> impl Responder {
    with_portal(&portal, |p| {
        p.record_attendance(&body.subject, body.total_lectures, body.attended)
    })
}

#[delete("/attendance/{subject}")]
pub async fn delete_attendance(portal: SharedPortal, subject: web::Path<String>) -> impl Responder {
    with_portal(&portal, |p| p.delete_attendance(&subject))
}

// semester and calendar

#[get("/semester")]
pub async fn semester(portal: SharedPortal) -> impl Responder {
    with_portal(&portal, |p| Ok(p.semester()))
}

#[put("/semester")]
pub async fn set_semester(portal: SharedPortal, body: web::Json<SemesterInfo>) -> impl Responder {
    with_portal(&portal, |p| p.set_semester(body.into_inner()))
}

#[get("/calendar")]
pub async fn calendar_events(portal: SharedPortal, query: web::Query<KindQuery<EventKind>>) -> impl Responder {
    with_portal(&portal, |p| Ok(p.calendar_events(query.kind)))
}

#[post("/calendar")]
pub async fn add_calendar_event(portal: SharedPortal, form: web::Json<CalendarForm>) -> impl Responder {
    with_portal(&portal, |p| p.add_calendar_event(&form))
}

#[delete("/calendar/{id}")]
pub async fn delete_calendar_event(portal: SharedPortal, id: web::Path<u32>) -> impl Responder {
    with_portal(&portal, |p| p.delete_calendar_event(*id))
}

// fees and complaints

#[get("/fees")]
pub async fn fees(portal: SharedPortal) -> impl Responder {
    with_portal(&portal, |p| Ok(p.fees()))
}

#[get("/fees/{student_id}")]
pub async fn fee_for(portal: SharedPortal, student_id: web::Path<String>) -> impl Responder {
    with_portal(&portal, |p| {
        found(p.fee_for(&student_id), format!("fees for {}", student_id))
    })
}

#[post("/fees")]
pub async fn save_fee(portal: SharedPortal, form: web::Json<FeeForm>) -> impl Responder {
    with_portal(&portal, |p| p.save_fee(&form))
}

#[get("/complaints")]
pub async fn complaints(portal: SharedPortal, query: web::Query<StudentQuery>) -> impl Responder {
    with_portal(&portal, |p| {
        Ok(match &query.student_id {
            Some(student_id) => p.complaints_for(student_id),
            None => p.complaints(),
        })
    })
}

#[post("/complaints")]
pub async fn submit_complaint(portal: SharedPortal, body: web::Json<ComplaintBody>) -> impl Responder {
    with_portal(&portal, |p| p.submit_complaint(&body.student_id, &body.message))
}

#[delete("/complaints/{position}")]
pub async fn resolve_complaint(
    portal: SharedPortal,
    position: web::Path<usize>,
    query: web::Query<StudentQuery>,
) -> impl Responder {
    with_portal(&portal, |p| {
        p.resolve_complaint(*position, query.student_id.as_deref())
    })
}

// accounts

#[post("/register")]
pub async fn register(portal: SharedPortal, body: web::Json<RegisterBody>) -> impl Responder {
    with_portal(&portal, |p| {
        p.register(body.kind, &body.id, &body.password, &body.confirm)
            .map(|_| message("Registration successful."))
    })
}

#[post("/login")]
pub async fn login(portal: SharedPortal, body: web::Json<LoginBody>) -> impl Responder {
    with_portal(&portal, |p| p.login(body.kind, &body.id, &body.password))
}

#[get("/students")]
pub async fn students(portal: SharedPortal) -> impl Responder {
    with_portal(&portal, |p| Ok(p.students()))
}

#[get("/students/{id}")]
pub async fn student(portal: SharedPortal, id: web::Path<String>) -> impl Responder {
    with_portal(&portal, |p| found(p.student_profile(&id), format!("student {}", id)))
}

#[put("/students")]
pub async fn save_student(portal: SharedPortal, body: web::Json<StudentProfile>) -> impl Responder {
    with_portal(&portal, |p| p.save_student_profile(body.into_inner()))
}

#[delete("/students/{id}")]
pub async fn delete_student(portal: SharedPortal, id: web::Path<String>) -> impl Responder {
    with_portal(&portal, |p| {
        p.delete_student(&id).map(|_| message("Student deleted."))
    })
}

#[get("/faculties")]
pub async fn faculties(portal: SharedPortal) -> impl Responder {
    with_portal(&portal, |p| Ok(p.faculties()))
}

#[get("/faculties/{id}")]
pub async fn faculty(portal: SharedPortal, id: web::Path<String>) -> impl Responder {
    with_portal(&portal, |p| found(p.faculty_profile(&id), format!("faculty {}", id)))
}

#[put("/faculties")]
pub async fn save_faculty(portal: SharedPortal, body: web::Json<FacultyProfile>) -> impl Responder {
    with_portal(&portal, |p| p.save_faculty_profile(body.into_inner()))
}

#[delete("/faculties/{id}")]
pub async fn delete_faculty(portal: SharedPortal, id: web::Path<String>) -> impl Responder {
    with_portal(&portal, |p| {
        p.delete_faculty(&id).map(|_| message("Faculty deleted."))
    })
}

// bulletin

#[get("/announcements")]
pub async fn announcements(portal: SharedPortal) -> impl Responder {
    with_portal(&portal, |p| Ok(p.announcements()))
}

#[get("/announcements/{id}")]
pub async fn announcement(portal: SharedPortal, id: web::Path<u32>) -> impl Responder {
    with_portal(&portal, |p| found(p.announcement(*id), format!("announcement {}", id)))
}

#[post("/announcements")]
pub async fn post_announcement(portal: SharedPortal, body: web::Json<PostBody>) -> impl Responder {
    with_portal(&portal, |p| p.post_announcement(&body.title, &body.body))
}

#[delete("/announcements/{id}")]
pub async fn delete_announcement(portal: SharedPortal, id: web::Path<u32>) -> impl Responder {
    with_portal(&portal, |p| p.delete_announcement(*id))
}

#[get("/events")]
pub async fn events(portal: SharedPortal) -> impl Responder {
    with_portal(&portal, |p| Ok(p.events()))
}

#[get("/events/{id}")]
pub async fn event(portal: SharedPortal, id: web::Path<u32>) -> impl Responder {
    with_portal(&portal, |p| found(p.event(*id), format!("event {}", id)))
}

#[post("/events")]
pub async fn post_event(portal: SharedPortal, body: web::Json<PostBody>) -> impl Responder {
    with_portal(&portal, |p| p.post_event(&body.title, &body.body, &body.date))
}

#[delete("/events/{id}")]
pub async fn delete_event(portal: SharedPortal, id: web::Path<u32>) -> impl Responder {
    with_portal(&portal, |p| p.delete_event(*id))
}

//! Everything the portal screens do, on top of one store per record file.
//!
//! A `Portal` is opened over a data directory and owns every store for the
//! lifetime of the process. Each method is one complete operation: it
//! validates, mutates the in-memory records and persists them before it
//! returns.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use tracing::info;

use super::accounts::{Credential, FacultyProfile, ShortText, StudentProfile, UserKind};
use super::bulletin::{Announcement, Body, Created, Event, EventDate, Title};
use super::codec::{int_or, BlockCodec, Codec, DelimitedCodec, FixedCodec};
use super::errors::{StoreError, ValidationError};
use super::finance::{Complaint, ComplaintText, FeeEntry, StudentId};
use super::password;
use super::schedule::{timestamp, today, validate_date, Window, LAB_HOURS, LECTURE_HOURS};
use super::store::{Record, RecordKey, Store, WriteMode};
use super::table_models::*;

pub const TIMETABLE_FILE: &str = "tt_entries.txt";
pub const ASSIGNMENTS_FILE: &str = "assignments.txt";
pub const RESULTS_FILE: &str = "results.txt";
pub const ATTENDANCE_FILE: &str = "attendance.txt";
pub const CALENDAR_FILE: &str = "events.txt";
pub const SEMESTER_FILE: &str = "semester.txt";
pub const FEES_FILE: &str = "fees.dat";
pub const COMPLAINTS_FILE: &str = "complaints.dat";
pub const STUDENT_LOGINS_FILE: &str = "students.dat";
pub const FACULTY_LOGINS_FILE: &str = "faculties.dat";
pub const STUDENT_INFO_FILE: &str = "student_info.txt";
pub const FACULTY_INFO_FILE: &str = "faculty_info.txt";
pub const ANNOUNCEMENTS_FILE: &str = "announcements.dat";
pub const EVENTS_FILE: &str = "events.dat";

const ACADEMIC_CAPACITY: usize = 512;
const FINANCE_CAPACITY: usize = 100;
const LOGIN_CAPACITY: usize = 10_000;
const STUDENT_INFO_CAPACITY: usize = 100;
const FACULTY_INFO_CAPACITY: usize = 50;
const BULLETIN_CAPACITY: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid ID or Password.")]
    InvalidCredentials,
}

/// Who logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: String,
    pub kind: UserKind,
}

/// Raw timetable form input. Times are free text and get clamped into the
/// session's booking window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionForm {
    pub day: Option<Weekday>,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub professor: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentForm {
    #[serde(default)]
    pub title: String,
    pub due_date: String,
    #[serde(default)]
    pub issued_by: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarForm {
    pub kind: EventKind,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub description: String,
}

/// Fee amounts as typed into the form; anything that is not a number counts
/// as 0.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeForm {
    pub student_id: String,
    #[serde(default)]
    pub tuition_total: String,
    #[serde(default)]
    pub tuition_paid: String,
    #[serde(default)]
    pub hostel_total: String,
    #[serde(default)]
    pub hostel_paid: String,
}

/// A complaint together with the index used to resolve it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiledComplaint {
    pub index: usize,
    #[serde(flatten)]
    pub complaint: Complaint,
}

fn invalid(e: ValidationError) -> anyhow::Error {
    StoreError::Validation(e).into()
}

fn not_found(what: impl Into<String>) -> anyhow::Error {
    StoreError::NotFound(what.into()).into()
}

fn required(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(ValidationError::Empty(field)));
    }
    Ok(())
}

pub struct Portal {
    data_dir: PathBuf,
    timetable: Store<TimetableEntry, DelimitedCodec>,
    assignments: Store<Assignment, DelimitedCodec>,
    results: Store<ResultRecord, DelimitedCodec>,
    attendance: Store<AttendanceRecord, DelimitedCodec>,
    calendar: Store<CalendarEvent, DelimitedCodec>,
    semester: Store<SemesterInfo, DelimitedCodec>,
    fees: Store<FeeEntry, DelimitedCodec>,
    complaints: Store<Complaint, DelimitedCodec>,
    student_logins: Store<Credential, DelimitedCodec>,
    faculty_logins: Store<Credential, DelimitedCodec>,
    students: Store<StudentProfile, BlockCodec>,
    faculties: Store<FacultyProfile, BlockCodec>,
    announcements: Store<Announcement, FixedCodec>,
    events: Store<Event, FixedCodec>,
}

impl Portal {
    /// Opens every store under `data_dir`, creating the directory if needed.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| anyhow!("Could not create data directory {}: {}", dir.display(), e))?;

        let portal = Self {
            data_dir: dir.to_path_buf(),
            timetable: Store::open(dir.join(TIMETABLE_FILE), ACADEMIC_CAPACITY, DelimitedCodec)?,
            assignments: Store::open(dir.join(ASSIGNMENTS_FILE), ACADEMIC_CAPACITY, DelimitedCodec)?,
            results: Store::open(dir.join(RESULTS_FILE), ACADEMIC_CAPACITY, DelimitedCodec)?,
            attendance: Store::open(dir.join(ATTENDANCE_FILE), ACADEMIC_CAPACITY, DelimitedCodec)?,
            calendar: Store::open(dir.join(CALENDAR_FILE), ACADEMIC_CAPACITY, DelimitedCodec)?,
            semester: Store::open(dir.join(SEMESTER_FILE), 1, DelimitedCodec)?,
            fees: Store::open(dir.join(FEES_FILE), FINANCE_CAPACITY, DelimitedCodec)?,
            complaints: Store::open(dir.join(COMPLAINTS_FILE), FINANCE_CAPACITY, DelimitedCodec)?
                .with_mode(WriteMode::Append),
            student_logins: Store::open(dir.join(STUDENT_LOGINS_FILE), LOGIN_CAPACITY, DelimitedCodec)?,
            faculty_logins: Store::open(dir.join(FACULTY_LOGINS_FILE), LOGIN_CAPACITY, DelimitedCodec)?,
            students: Store::open(dir.join(STUDENT_INFO_FILE), STUDENT_INFO_CAPACITY, BlockCodec)?,
            faculties: Store::open(dir.join(FACULTY_INFO_FILE), FACULTY_INFO_CAPACITY, BlockCodec)?,
            announcements: Store::open(dir.join(ANNOUNCEMENTS_FILE), BULLETIN_CAPACITY, FixedCodec)?,
            events: Store::open(dir.join(EVENTS_FILE), BULLETIN_CAPACITY, FixedCodec)?,
        };

        info!(data_dir = %dir.display(), "portal opened");
        Ok(portal)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Re-reads every file, picking up edits made outside this process.
    pub fn reload(&mut self) -> Result<()> {
        self.timetable.load()?;
        self.assignments.load()?;
        self.results.load()?;
        self.attendance.load()?;
        self.calendar.load()?;
        self.semester.load()?;
        self.fees.load()?;
        self.complaints.load()?;
        self.student_logins.load()?;
        self.faculty_logins.load()?;
        self.students.load()?;
        self.faculties.load()?;
        self.announcements.load()?;
        self.events.load()?;
        Ok(())
    }

    // --- timetable ---

    pub fn add_lecture(&mut self, form: &SessionForm) -> Result<TimetableEntry> {
        self.add_session(SessionKind::Lecture, LECTURE_HOURS, "Untitled Lecture", form)
    }

    pub fn add_lab(&mut self, form: &SessionForm) -> Result<TimetableEntry> {
        self.add_session(SessionKind::Lab, LAB_HOURS, "Untitled Lab", form)
    }

    fn add_session(
        &mut self,
        kind: SessionKind,
        window: Window,
        default_title: &str,
        form: &SessionForm,
    ) -> Result<TimetableEntry> {
        let (start, end) = window.slot(&form.start, &form.end);

        let entry = TimetableEntry {
            id: 0,
            day: form.day.unwrap_or(Weekday::Mon),
            start,
            end,
            kind,
            title: Text::or_default_text(&form.title, default_title),
            room: Text::or_default_text(&form.room, "Room"),
            professor: Text::or_default_text(&form.professor, "Prof"),
        };

        self.timetable.add_exclusive(entry)?;
        let added = last(&self.timetable)?;

        info!(id = added.id, day = %added.day, start = %added.start, end = %added.end, ?kind, "session added");
        Ok(added)
    }

    pub fn timetable(&self, kind: Option<SessionKind>) -> Vec<TimetableEntry> {
        self.timetable
            .list()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .cloned()
            .collect()
    }

    pub fn delete_timetable_entry(&mut self, id: u32) -> Result<TimetableEntry> {
        let removed = self.timetable.delete_by_key(&RecordKey::Id(id))?;
        info!(id, "session deleted");
        Ok(removed)
    }

    // --- assignments ---

    pub fn add_assignment(&mut self, form: &AssignmentForm) -> Result<Assignment> {
        validate_date(&form.due_date).map_err(invalid)?;

        let assignment = Assignment {
            id: 0,
            title: Text::or_default_text(&form.title, "Untitled"),
            due_date: Text::new(&form.due_date),
            status: AssignStatus::Assigned,
            submitted_date: Text::default(),
            issued_by: Text::new(&form.issued_by),
            description: Text::new(&form.description),
        };

        self.assignments.add(assignment)?;
        let added = last(&self.assignments)?;

        info!(id = added.id, due = %added.due_date, "assignment added");
        Ok(added)
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        self.assignments.list().cloned().collect()
    }

    /// Moving to `Submitted` stamps today's date; any other status clears it.
    pub fn set_assignment_status(&mut self, id: u32, status: AssignStatus) -> Result<Assignment> {
        let key = RecordKey::Id(id);
        let mut assignment = self
            .assignments
            .find(&key)
            .cloned()
            .ok_or_else(|| not_found(format!("assignment {}", id)))?;

        assignment.status = status;
        assignment.submitted_date = match status {
            AssignStatus::Submitted => Text::new(today()),
            _ => Text::default(),
        };

        self.assignments.update_by_key(&key, assignment.clone())?;
        info!(id, ?status, "assignment status changed");
        Ok(assignment)
    }

    pub fn delete_assignment(&mut self, id: u32) -> Result<Assignment> {
        let removed = self.assignments.delete_by_key(&RecordKey::Id(id))?;
        info!(id, "assignment deleted");
        Ok(removed)
    }

    // --- results and attendance ---

    /// Replaces the student's result for the subject, or adds it. The pass
    /// flag is worked out from the grade and SPI.
    pub fn record_result(&mut self, mut result: ResultRecord) -> Result<ResultRecord> {
        let key_regex = Regex::new(r"^[^|/]+$")?;

        required(&result.student_id, "student id")?;
        required(&result.subject, "subject")?;

        for part in [&result.student_id, &result.subject] {
            if !key_regex.is_match(part) {
                return Err(invalid(ValidationError::InvalidId(part.to_string())));
            }
        }

        result.derive_passed();
        self.results.upsert(result.clone())?;
        info!(student = %result.student_id, subject = %result.subject, "result recorded");
        Ok(result)
    }

    pub fn results_for(&self, student_id: &str) -> Vec<ResultRecord> {
        self.results
            .list()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect()
    }

    pub fn result_summary(&self, student_id: &str) -> ResultSummary {
        ResultSummary::of(self.results.list().filter(|r| r.student_id == student_id))
    }

    pub fn delete_result(&mut self, student_id: &str, subject: &str) -> Result<ResultRecord> {
        let key = ResultRecord::key_for(student_id, subject);
        let removed = self.results.delete_by_key(&key)?;
        info!(student = student_id, subject, "result deleted");
        Ok(removed)
    }

    pub fn record_attendance(
        &mut self,
        subject: &str,
        total_lectures: u32,
        attended: u32,
    ) -> Result<AttendanceRecord> {
        required(subject, "subject")?;

        let record = AttendanceRecord {
            subject: Text::new(subject.trim()),
            total_lectures,
            attended: attended.min(total_lectures),
        };

        self.attendance.upsert(record.clone())?;
        info!(subject = %record.subject, total_lectures, attended = record.attended, "attendance recorded");
        Ok(record)
    }

    pub fn attendance(&self) -> Vec<AttendanceRecord> {
        self.attendance.list().cloned().collect()
    }

    pub fn delete_attendance(&mut self, subject: &str) -> Result<AttendanceRecord> {
        let key = RecordKey::Natural(subject.trim().to_owned());
        let removed = self.attendance.delete_by_key(&key)?;
        info!(subject, "attendance deleted");
        Ok(removed)
    }

    // --- semester and calendar ---

    pub fn semester(&self) -> SemesterInfo {
        self.semester.get(0).cloned().unwrap_or_default()
    }

    pub fn set_semester(&mut self, info: SemesterInfo) -> Result<SemesterInfo> {
        required(&info.name, "semester name")?;
        let start = validate_date(&info.start_date).map_err(invalid)?;
        let end = validate_date(&info.end_date).map_err(invalid)?;
        if end < start {
            return Err(invalid(ValidationError::InvalidDate(info.end_date.to_string())));
        }

        if self.semester.is_empty() {
            self.semester.add(info.clone())?;
        } else {
            self.semester.update(0, info.clone())?;
        }

        info!(name = %info.name, "semester updated");
        Ok(info)
    }

    pub fn add_calendar_event(&mut self, form: &CalendarForm) -> Result<CalendarEvent> {
        required(&form.title, "title")?;
        validate_date(&form.date).map_err(invalid)?;

        let event = CalendarEvent {
            id: 0,
            kind: form.kind,
            title: Text::new(form.title.trim()),
            date: Text::new(&form.date),
            description: Text::new(&form.description),
        };

        self.calendar.add(event)?;
        let added = last(&self.calendar)?;

        info!(id = added.id, date = %added.date, "calendar event added");
        Ok(added)
    }

    pub fn calendar_events(&self, kind: Option<EventKind>) -> Vec<CalendarEvent> {
        self.calendar
            .list()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .cloned()
            .collect()
    }

    pub fn delete_calendar_event(&mut self, id: u32) -> Result<CalendarEvent> {
        let removed = self.calendar.delete_by_key(&RecordKey::Id(id))?;
        info!(id, "calendar event deleted");
        Ok(removed)
    }

    // --- fees and complaints ---

    pub fn save_fee(&mut self, form: &FeeForm) -> Result<FeeEntry> {
        required(&form.student_id, "student id")?;

        let entry = FeeEntry {
            student_id: StudentId::new(form.student_id.trim()),
            tuition_total: int_or(&form.tuition_total, 0),
            tuition_paid: int_or(&form.tuition_paid, 0),
            hostel_total: int_or(&form.hostel_total, 0),
            hostel_paid: int_or(&form.hostel_paid, 0),
        };

        self.fees.upsert(entry.clone())?;
        info!(student = %entry.student_id, due = entry.total_due(), "fee entry saved");
        Ok(entry)
    }

    pub fn fee_for(&self, student_id: &str) -> Option<FeeEntry> {
        self.fees
            .find(&RecordKey::Natural(student_id.to_owned()))
            .cloned()
    }

    pub fn fees(&self) -> Vec<FeeEntry> {
        self.fees.list().cloned().collect()
    }

    pub fn submit_complaint(&mut self, student_id: &str, message: &str) -> Result<FiledComplaint> {
        required(student_id, "student id")?;
        required(message, "complaint")?;

        let complaint = Complaint {
            student_id: StudentId::new(student_id.trim()),
            message: ComplaintText::new(message.trim().replace(['\r', '\n'], " ")),
        };

        self.complaints.add(complaint.clone())?;
        info!(student = %complaint.student_id, "complaint filed");

        Ok(FiledComplaint {
            index: self.complaints.len() - 1,
            complaint,
        })
    }

    pub fn complaints(&self) -> Vec<FiledComplaint> {
        self.filed(|_| true)
    }

    pub fn complaints_for(&self, student_id: &str) -> Vec<FiledComplaint> {
        self.filed(|c| c.student_id == student_id)
    }

    fn filed(&self, keep: impl Fn(&Complaint) -> bool) -> Vec<FiledComplaint> {
        self.complaints
            .list()
            .enumerate()
            .filter(|(_, c)| keep(c))
            .map(|(index, c)| FiledComplaint {
                index,
                complaint: c.clone(),
            })
            .collect()
    }

    /// Removes the complaint at `index`. With an `owner`, only that student's
    /// complaints can be resolved. Later complaints move down by one.
    pub fn resolve_complaint(&mut self, index: usize, owner: Option<&str>) -> Result<Complaint> {
        let complaint = self
            .complaints
            .get(index)
            .ok_or_else(|| not_found(format!("complaint #{}", index)))?;

        if let Some(owner) = owner {
            if complaint.student_id != owner {
                return Err(not_found(format!("complaint #{}", index)));
            }
        }

        let removed = self.complaints.delete(index)?;
        info!(index, student = %removed.student_id, "complaint resolved");
        Ok(removed)
    }

    // --- accounts ---

    pub fn register(&mut self, kind: UserKind, id: &str, password: &str, confirm: &str) -> Result<()> {
        // ids end up as path segments and as lines of the profile files
        let id_regex = Regex::new(r"^[A-Za-z0-9][^\s|/]*$")?;

        required(id, "id")?;
        required(password, "password")?;

        if !id_regex.is_match(id) {
            return Err(invalid(ValidationError::InvalidId(id.to_owned())));
        }

        if password != confirm {
            return Err(invalid(ValidationError::PasswordMismatch));
        }

        let credential = Credential {
            id: ShortText::try_new(id).map_err(invalid)?,
            password_hash: password::hash(password)?,
        };

        self.logins_mut(kind).add(credential)?;
        info!(%kind, id, "account registered");
        Ok(())
    }

    pub fn login(&self, kind: UserKind, id: &str, password: &str) -> Result<Session> {
        let credential = self
            .logins(kind)
            .find(&RecordKey::Natural(id.to_owned()))
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify(&credential.password_hash, password) {
            info!(%kind, id, "login refused");
            return Err(AuthError::InvalidCredentials.into());
        }

        info!(%kind, id, "login");
        Ok(Session {
            id: id.to_owned(),
            kind,
        })
    }

    fn logins(&self, kind: UserKind) -> &Store<Credential, DelimitedCodec> {
        match kind {
            UserKind::Student => &self.student_logins,
            UserKind::Faculty => &self.faculty_logins,
        }
    }

    fn logins_mut(&mut self, kind: UserKind) -> &mut Store<Credential, DelimitedCodec> {
        match kind {
            UserKind::Student => &mut self.student_logins,
            UserKind::Faculty => &mut self.faculty_logins,
        }
    }

    fn password_hash(&self, kind: UserKind, id: &str) -> Result<String> {
        self.logins(kind)
            .find(&RecordKey::Natural(id.to_owned()))
            .map(|c| c.password_hash.clone())
            .ok_or_else(|| not_found(format!("{} account {}", kind, id)))
    }

    /// Saves the profile of a registered student. The stored password line
    /// always mirrors the account's hash.
    pub fn save_student_profile(&mut self, mut profile: StudentProfile) -> Result<StudentProfile> {
        profile.password_hash = self.password_hash(UserKind::Student, &profile.id)?;
        self.students.upsert(profile.clone())?;
        info!(id = %profile.id, "student profile saved");
        Ok(profile)
    }

    pub fn save_faculty_profile(&mut self, mut profile: FacultyProfile) -> Result<FacultyProfile> {
        profile.password_hash = self.password_hash(UserKind::Faculty, &profile.id)?;
        self.faculties.upsert(profile.clone())?;
        info!(id = %profile.id, "faculty profile saved");
        Ok(profile)
    }

    pub fn student_profile(&self, id: &str) -> Option<StudentProfile> {
        self.students.find(&RecordKey::Natural(id.to_owned())).cloned()
    }

    pub fn faculty_profile(&self, id: &str) -> Option<FacultyProfile> {
        self.faculties.find(&RecordKey::Natural(id.to_owned())).cloned()
    }

    pub fn students(&self) -> Vec<StudentProfile> {
        self.students.list().cloned().collect()
    }

    pub fn faculties(&self) -> Vec<FacultyProfile> {
        self.faculties.list().cloned().collect()
    }

    /// Removes the student's profile and login.
    pub fn delete_student(&mut self, id: &str) -> Result<()> {
        let key = RecordKey::Natural(id.to_owned());
        let had_profile = remove_if_present(&mut self.students, &key)?;
        let had_login = remove_if_present(&mut self.student_logins, &key)?;

        if !had_profile && !had_login {
            return Err(not_found(format!("student {}", id)));
        }

        info!(id, "student deleted");
        Ok(())
    }

    pub fn delete_faculty(&mut self, id: &str) -> Result<()> {
        let key = RecordKey::Natural(id.to_owned());
        let had_profile = remove_if_present(&mut self.faculties, &key)?;
        let had_login = remove_if_present(&mut self.faculty_logins, &key)?;

        if !had_profile && !had_login {
            return Err(not_found(format!("faculty {}", id)));
        }

        info!(id, "faculty deleted");
        Ok(())
    }

    // --- bulletin ---

    pub fn post_announcement(&mut self, title: &str, body: &str) -> Result<Announcement> {
        required(title, "title")?;
        required(body, "body")?;

        let announcement = Announcement {
            id: 0,
            title: Title::new(title.trim()),
            body: Body::new(body),
            created: Created::new(timestamp()),
        };

        self.announcements.add(announcement)?;
        let added = last(&self.announcements)?;

        info!(id = added.id, "announcement posted");
        Ok(added)
    }

    pub fn post_event(&mut self, title: &str, body: &str, date: &str) -> Result<Event> {
        required(title, "title")?;
        required(body, "body")?;
        validate_date(date).map_err(invalid)?;

        let event = Event {
            id: 0,
            title: Title::new(title.trim()),
            body: Body::new(body),
            date: EventDate::new(date),
        };

        self.events.add(event)?;
        let added = last(&self.events)?;

        info!(id = added.id, date = %added.date, "event posted");
        Ok(added)
    }

    pub fn announcements(&self) -> Vec<Announcement> {
        self.announcements.list().cloned().collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.list().cloned().collect()
    }

    pub fn announcement(&self, id: u32) -> Option<Announcement> {
        self.announcements.find(&RecordKey::Id(id)).cloned()
    }

    pub fn event(&self, id: u32) -> Option<Event> {
        self.events.find(&RecordKey::Id(id)).cloned()
    }

    pub fn delete_announcement(&mut self, id: u32) -> Result<Announcement> {
        let removed = self.announcements.delete_by_key(&RecordKey::Id(id))?;
        info!(id, "announcement deleted");
        Ok(removed)
    }

    pub fn delete_event(&mut self, id: u32) -> Result<Event> {
        let removed = self.events.delete_by_key(&RecordKey::Id(id))?;
        info!(id, "event deleted");
        Ok(removed)
    }
}

// the record a successful add just pushed
fn last<R: Record, C: Codec<R>>(store: &Store<R, C>) -> Result<R> {
    store
        .records()
        .last()
        .cloned()
        .ok_or_else(|| anyhow!("Record vanished after insert."))
}

fn remove_if_present<R: Record, C: Codec<R>>(
    store: &mut Store<R, C>,
    key: &RecordKey,
) -> Result<bool> {
    match store.position(key) {
        Some(index) => {
            store.delete(index)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portal() -> (tempfile::TempDir, Portal) {
        let dir = tempfile::tempdir().unwrap();
        let portal = Portal::open(dir.path()).unwrap();
        (dir, portal)
    }

    fn store_error(err: &anyhow::Error) -> &StoreError {
        err.downcast_ref::<StoreError>().expect("a store error")
    }

    fn lecture(day: Weekday, start: &str, end: &str) -> SessionForm {
        SessionForm {
            day: Some(day),
            start: start.into(),
            end: end.into(),
            ..Default::default()
        }
    }

    #[test]
    fn blank_session_fields_get_defaults() {
        let (_dir, mut portal) = portal();

        let entry = portal.add_lecture(&lecture(Weekday::Tue, "", "")).unwrap();
        assert_eq!(entry.id, 1);
        assert_eq!(entry.title, "Untitled Lecture");
        assert_eq!(entry.room, "Room");
        assert_eq!(entry.professor, "Prof");
        assert_eq!(entry.start.to_string(), "08:00");
        assert_eq!(entry.end.to_string(), "09:00");
    }

    #[test]
    fn overlapping_lectures_are_refused_but_labs_are_separate() {
        let (_dir, mut portal) = portal();

        portal.add_lecture(&lecture(Weekday::Mon, "09:00", "10:00")).unwrap();
        let err = portal
            .add_lecture(&lecture(Weekday::Mon, "09:30", "10:30"))
            .unwrap_err();
        assert!(matches!(
            store_error(&err),
            StoreError::Validation(ValidationError::Overlap { existing_id: 1, .. })
        ));

        portal.add_lecture(&lecture(Weekday::Mon, "10:00", "11:00")).unwrap();
        portal.add_lab(&lecture(Weekday::Mon, "14:00", "16:00")).unwrap();

        assert_eq!(portal.timetable(Some(SessionKind::Lecture)).len(), 2);
        assert_eq!(portal.timetable(None).len(), 3);
    }

    #[test]
    fn submitting_an_assignment_stamps_the_date() {
        let (_dir, mut portal) = portal();

        let form = AssignmentForm {
            due_date: "2025-04-01".into(),
            issued_by: "F1".into(),
            ..Default::default()
        };
        let added = portal.add_assignment(&form).unwrap();
        assert_eq!(added.title, "Untitled");

        let submitted = portal
            .set_assignment_status(added.id, AssignStatus::Submitted)
            .unwrap();
        assert_eq!(submitted.submitted_date, today().as_str());

        let reopened = portal
            .set_assignment_status(added.id, AssignStatus::Pending)
            .unwrap();
        assert!(reopened.submitted_date.is_empty());
    }

    #[test]
    fn assignment_due_dates_are_checked() {
        let (_dir, mut portal) = portal();

        let form = AssignmentForm {
            due_date: "2025-02-30".into(),
            ..Default::default()
        };
        let err = portal.add_assignment(&form).unwrap_err();
        assert!(store_error(&err).is_validation());
        assert!(portal.assignments().is_empty());
    }

    #[test]
    fn attended_never_exceeds_total() {
        let (_dir, mut portal) = portal();

        portal.record_attendance("Maths", 10, 4).unwrap();
        let record = portal.record_attendance("Maths", 10, 14).unwrap();

        assert_eq!(record.attended, 10);
        assert_eq!(portal.attendance().len(), 1);
    }

    fn result(student_id: &str, subject: &str, earned: i32, spi: f32, grade: &str) -> ResultRecord {
        ResultRecord {
            student_id: student_id.into(),
            subject: subject.into(),
            total_credits: 4,
            credits_earned: earned,
            spi,
            grade: grade.into(),
            remarks: Text::default(),
            passed: true,
        }
    }

    #[test]
    fn recorded_results_carry_a_derived_pass_flag_and_summary() {
        let (_dir, mut portal) = portal();

        let failed = portal.record_result(result("S1", "Maths", 0, 0.0, "F")).unwrap();
        assert!(!failed.passed);
        portal.record_result(result("S1", "Physics", 4, 8.0, "A")).unwrap();
        portal.record_result(result("S2", "Physics", 4, 6.0, "B")).unwrap();

        let summary = portal.result_summary("S1");
        assert_eq!(summary.total_credits, 8);
        assert_eq!(summary.credits_earned, 4);
        assert_eq!(summary.average_spi, 8.0);
        assert_eq!(portal.result_summary("S9"), ResultSummary::default());
    }

    #[test]
    fn result_keys_cannot_contain_a_slash() {
        let (_dir, mut portal) = portal();

        let err = portal.record_result(result("S1", "CAD/CAM", 4, 7.0, "B")).unwrap_err();
        assert!(matches!(
            store_error(&err),
            StoreError::Validation(ValidationError::InvalidId(_))
        ));

        portal.record_result(result("S1", "CAD", 4, 7.0, "B")).unwrap();
        portal.delete_result("S1", "CAD").unwrap();
        assert!(portal.results_for("S1").is_empty());
    }

    #[test]
    fn attendance_can_be_deleted_by_subject() {
        let (_dir, mut portal) = portal();

        portal.record_attendance("Maths", 10, 4).unwrap();
        portal.record_attendance("Physics", 8, 8).unwrap();

        let removed = portal.delete_attendance("Maths").unwrap();
        assert_eq!(removed.attended, 4);
        assert_eq!(portal.attendance().len(), 1);

        let err = portal.delete_attendance("Maths").unwrap_err();
        assert!(matches!(store_error(&err), StoreError::NotFound(_)));
    }

    #[test]
    fn semester_defaults_until_set() {
        let (_dir, mut portal) = portal();
        assert_eq!(portal.semester(), SemesterInfo::default());

        let info = SemesterInfo {
            name: "Semester 2".into(),
            start_date: "2025-07-01".into(),
            end_date: "2025-11-30".into(),
            total_credits: 22,
        };
        portal.set_semester(info.clone()).unwrap();
        portal
            .set_semester(SemesterInfo {
                total_credits: 24,
                ..info
            })
            .unwrap();

        assert_eq!(portal.semester().total_credits, 24);
    }

    #[test]
    fn semester_cannot_end_before_it_starts() {
        let (_dir, mut portal) = portal();

        let info = SemesterInfo {
            start_date: "2025-07-01".into(),
            end_date: "2025-06-01".into(),
            ..Default::default()
        };
        assert!(portal.set_semester(info).is_err());
    }

    #[test]
    fn fee_amounts_that_are_not_numbers_count_as_zero() {
        let (_dir, mut portal) = portal();

        let form = FeeForm {
            student_id: "S1".into(),
            tuition_total: "50000".into(),
            tuition_paid: "a lot".into(),
            hostel_total: "".into(),
            hostel_paid: "0".into(),
        };
        let entry = portal.save_fee(&form).unwrap();

        assert_eq!(entry.tuition_paid, 0);
        assert_eq!(entry.total_due(), 50000);
        assert_eq!(portal.fee_for("S1"), Some(entry));
        assert_eq!(portal.fee_for("S2"), None);
    }

    #[test]
    fn huge_fee_totals_are_logged_and_saved() {
        let (_dir, mut portal) = portal();

        let form = FeeForm {
            student_id: "S1".into(),
            tuition_total: "2000000000".into(),
            tuition_paid: "0".into(),
            hostel_total: "2000000000".into(),
            hostel_paid: "0".into(),
        };
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        let entry = tracing::subscriber::with_default(subscriber, || portal.save_fee(&form)).unwrap();

        assert_eq!(entry.total_due(), 4_000_000_000);
        assert_eq!(portal.fee_for("S1"), Some(entry));
    }

    #[test]
    fn students_can_only_resolve_their_own_complaints() {
        let (_dir, mut portal) = portal();

        portal.submit_complaint("S1", "wifi down").unwrap();
        portal.submit_complaint("S2", "no water").unwrap();
        portal.submit_complaint("S1", "fan broken").unwrap();

        let mine = portal.complaints_for("S1");
        assert_eq!(mine.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 2]);

        let err = portal.resolve_complaint(1, Some("S1")).unwrap_err();
        assert!(matches!(store_error(&err), StoreError::NotFound(_)));

        portal.resolve_complaint(0, Some("S1")).unwrap();
        let left = portal.complaints();
        assert_eq!(left.len(), 2);
        assert_eq!(left[1].complaint.message, "fan broken");
        assert_eq!(left[1].index, 1);
    }

    #[test]
    fn empty_complaints_are_refused() {
        let (_dir, mut portal) = portal();
        assert!(portal.submit_complaint("S1", "   ").is_err());
        assert!(portal.complaints().is_empty());
    }

    #[test]
    fn register_then_login() {
        let (_dir, mut portal) = portal();

        portal.register(UserKind::Student, "S100", "pw", "pw").unwrap();

        let session = portal.login(UserKind::Student, "S100", "pw").unwrap();
        assert_eq!(session.kind, UserKind::Student);

        let err = portal.login(UserKind::Student, "S100", "nope").unwrap_err();
        assert!(err.downcast_ref::<AuthError>().is_some());
        assert!(portal.login(UserKind::Faculty, "S100", "pw").is_err());
    }

    #[test]
    fn registration_rules() {
        let (_dir, mut portal) = portal();

        let err = portal.register(UserKind::Student, "", "pw", "pw").unwrap_err();
        assert!(matches!(
            store_error(&err),
            StoreError::Validation(ValidationError::Empty("id"))
        ));

        let err = portal.register(UserKind::Student, "S 1", "pw", "pw").unwrap_err();
        assert!(matches!(
            store_error(&err),
            StoreError::Validation(ValidationError::InvalidId(_))
        ));

        for id in ["--END--", "S/1"] {
            let err = portal.register(UserKind::Student, id, "pw", "pw").unwrap_err();
            assert!(matches!(
                store_error(&err),
                StoreError::Validation(ValidationError::InvalidId(_))
            ));
        }

        let err = portal.register(UserKind::Student, "S1", "pw", "wp").unwrap_err();
        assert!(matches!(
            store_error(&err),
            StoreError::Validation(ValidationError::PasswordMismatch)
        ));

        portal.register(UserKind::Student, "S1", "pw", "pw").unwrap();
        let err = portal.register(UserKind::Student, "S1", "x", "x").unwrap_err();
        assert!(matches!(store_error(&err), StoreError::DuplicateKey(_)));
    }

    #[test]
    fn profiles_need_an_account_and_carry_its_hash() {
        let (_dir, mut portal) = portal();

        let profile = StudentProfile {
            id: "S1".into(),
            name: "Asha".into(),
            ..Default::default()
        };
        assert!(portal.save_student_profile(profile.clone()).is_err());

        portal.register(UserKind::Student, "S1", "pw", "pw").unwrap();
        let saved = portal.save_student_profile(profile).unwrap();
        assert!(saved.password_hash.starts_with("$argon2"));
        assert_eq!(portal.students().len(), 1);

        portal.delete_student("S1").unwrap();
        assert!(portal.student_profile("S1").is_none());
        assert!(portal.login(UserKind::Student, "S1", "pw").is_err());
        assert!(portal.delete_student("S1").is_err());
    }

    #[test]
    fn profile_lines_that_look_like_the_terminator_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut portal = Portal::open(dir.path()).unwrap();
            for id in ["S1", "S2"] {
                portal.register(UserKind::Student, id, "pw", "pw").unwrap();
            }
            portal
                .save_student_profile(StudentProfile {
                    id: "S1".into(),
                    name: "Asha".into(),
                    address: "--END--".into(),
                    ..Default::default()
                })
                .unwrap();
            portal
                .save_student_profile(StudentProfile {
                    id: "S2".into(),
                    name: "Ravi".into(),
                    ..Default::default()
                })
                .unwrap();
        }

        let portal = Portal::open(dir.path()).unwrap();
        assert_eq!(portal.students().len(), 2);
        let first = portal.student_profile("S1").unwrap();
        assert_eq!(first.address, "--END--");
        assert_eq!(portal.student_profile("S2").unwrap().name, "Ravi");
    }

    #[test]
    fn events_need_a_valid_date() {
        let (_dir, mut portal) = portal();

        assert!(portal.post_event("Fest", "Music", "14-03-2025").is_err());
        let event = portal.post_event("Fest", "Music", "2025-03-14").unwrap();

        assert_eq!(portal.event(event.id), Some(event));
        assert_eq!(portal.events().len(), 1);
    }

    #[test]
    fn announcements_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let posted = {
            let mut portal = Portal::open(dir.path()).unwrap();
            portal.post_announcement("Exams", "Timetable is out").unwrap()
        };
        assert!(!posted.created.is_empty());

        let mut portal = Portal::open(dir.path()).unwrap();
        assert_eq!(portal.announcements(), vec![posted.clone()]);

        let next = portal.post_announcement("Results", "Soon").unwrap();
        assert_eq!(next.id, posted.id + 1);

        portal.delete_announcement(posted.id).unwrap();
        assert!(portal.announcement(posted.id).is_none());
    }
}

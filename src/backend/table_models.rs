use std::fmt::{Display, Formatter};

use serde_derive::{Deserialize, Serialize};

use super::bounded::BoundedString;
use super::codec::{int_field, TextFields};
use super::schedule::{ClockTime, Interval, Span};
use super::store::{Record, RecordKey};

/// General text field of the academic records.
pub type Text = BoundedString<255>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }
}

impl Display for Weekday {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Lecture,
    Lab,
}

impl SessionKind {
    fn code(&self) -> u8 {
        match self {
            SessionKind::Lecture => 0,
            SessionKind::Lab => 1,
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SessionKind::Lecture),
            1 => Some(SessionKind::Lab),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    #[serde(default)]
    pub id: u32,
    pub day: Weekday,
    pub start: ClockTime,
    pub end: ClockTime,
    pub kind: SessionKind,
    pub title: Text,
    pub room: Text,
    pub professor: Text,
}

impl Record for TimetableEntry {
    const KIND: &'static str = "timetable";

    fn key(&self) -> RecordKey {
        RecordKey::Id(self.id)
    }

    fn assign_id(&mut self, id: u32) {
        self.id = id;
    }
}

// day|start|end|kind|title|room|professor|id
impl TextFields for TimetableEntry {
    const FIELD_COUNT: usize = 8;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.day.index().to_string(),
            self.start.to_string(),
            self.end.to_string(),
            self.kind.code().to_string(),
            self.title.to_string(),
            self.room.to_string(),
            self.professor.to_string(),
            self.id.to_string(),
        ]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        Some(TimetableEntry {
            day: Weekday::from_index(int_field(f[0])?)?,
            start: f[1].parse().ok()?,
            end: f[2].parse().ok()?,
            kind: SessionKind::from_code(int_field(f[3])?)?,
            title: Text::new(f[4]),
            room: Text::new(f[5]),
            professor: Text::new(f[6]),
            id: int_field(f[7])?,
        })
    }
}

impl Interval for TimetableEntry {
    type Partition = (Weekday, SessionKind);

    fn partition(&self) -> Self::Partition {
        (self.day, self.kind)
    }

    fn span(&self) -> Span {
        Span::between(self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignStatus {
    Assigned,
    Pending,
    Submitted,
}

impl AssignStatus {
    fn code(&self) -> u8 {
        match self {
            AssignStatus::Assigned => 0,
            AssignStatus::Pending => 1,
            AssignStatus::Submitted => 2,
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(AssignStatus::Assigned),
            1 => Some(AssignStatus::Pending),
            2 => Some(AssignStatus::Submitted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(default)]
    pub id: u32,
    pub title: Text,
    pub due_date: Text,
    pub status: AssignStatus,
    #[serde(default)]
    pub submitted_date: Text,
    pub issued_by: Text,
    #[serde(default)]
    pub description: Text,
}

impl Record for Assignment {
    const KIND: &'static str = "assignment";

    fn key(&self) -> RecordKey {
        RecordKey::Id(self.id)
    }

    fn assign_id(&mut self, id: u32) {
        self.id = id;
    }
}

// id|title|due_date|status|submitted_date|issued_by|description
impl TextFields for Assignment {
    const FIELD_COUNT: usize = 7;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.to_string(),
            self.due_date.to_string(),
            self.status.code().to_string(),
            self.submitted_date.to_string(),
            self.issued_by.to_string(),
            self.description.to_string(),
        ]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        Some(Assignment {
            id: int_field(f[0])?,
            title: Text::new(f[1]),
            due_date: Text::new(f[2]),
            status: AssignStatus::from_code(int_field(f[3])?)?,
            submitted_date: Text::new(f[4]),
            issued_by: Text::new(f[5]),
            description: Text::new(f[6]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub student_id: Text,
    pub subject: Text,
    pub total_credits: i32,
    pub credits_earned: i32,
    pub spi: f32,
    pub grade: Text,
    #[serde(default)]
    pub remarks: Text,
    #[serde(default)]
    pub passed: bool,
}

impl ResultRecord {
    /// `|` never survives in a stored field, so it cannot make two keys equal.
    pub fn key_for(student_id: &str, subject: &str) -> RecordKey {
        RecordKey::Natural(format!("{}|{}", student_id, subject))
    }

    /// A grade of `F` or an SPI of zero is a fail.
    pub fn derive_passed(&mut self) {
        self.passed = self.grade.trim() != "F" && self.spi > 0.0;
    }
}

impl Record for ResultRecord {
    const KIND: &'static str = "result";

    fn key(&self) -> RecordKey {
        Self::key_for(&self.student_id, &self.subject)
    }
}

/// Totals shown under a list of results. The SPI average only counts
/// subjects with a positive SPI.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResultSummary {
    pub total_credits: i64,
    pub credits_earned: i64,
    pub average_spi: f32,
}

impl ResultSummary {
    pub fn of<'a>(results: impl IntoIterator<Item = &'a ResultRecord>) -> Self {
        let mut summary = Self::default();
        let (mut spi_total, mut spi_count) = (0.0f32, 0u32);

        for r in results {
            summary.total_credits += i64::from(r.total_credits);
            summary.credits_earned += i64::from(r.credits_earned);
            if r.spi > 0.0 {
                spi_total += r.spi;
                spi_count += 1;
            }
        }

        if spi_count > 0 {
            summary.average_spi = spi_total / spi_count as f32;
        }
        summary
    }
}

// student_id|subject|total_credits|credits_earned|spi|grade|remarks|passed
impl TextFields for ResultRecord {
    const FIELD_COUNT: usize = 8;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.student_id.to_string(),
            self.subject.to_string(),
            self.total_credits.to_string(),
            self.credits_earned.to_string(),
            format!("{:.2}", self.spi),
            self.grade.to_string(),
            self.remarks.to_string(),
            (self.passed as u8).to_string(),
        ]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        Some(ResultRecord {
            student_id: Text::new(f[0]),
            subject: Text::new(f[1]),
            total_credits: int_field(f[2])?,
            credits_earned: int_field(f[3])?,
            spi: f[4].trim().parse().ok()?,
            grade: Text::new(f[5]),
            remarks: Text::new(f[6]),
            passed: int_field::<i32>(f[7])? != 0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub subject: Text,
    pub total_lectures: u32,
    pub attended: u32,
}

impl AttendanceRecord {
    pub fn percentage(&self) -> f32 {
        if self.total_lectures == 0 {
            return 0.0;
        }
        self.attended as f32 * 100.0 / self.total_lectures as f32
    }
}

impl Record for AttendanceRecord {
    const KIND: &'static str = "attendance";

    fn key(&self) -> RecordKey {
        RecordKey::Natural(self.subject.to_string())
    }
}

impl TextFields for AttendanceRecord {
    const FIELD_COUNT: usize = 3;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.subject.to_string(),
            self.total_lectures.to_string(),
            self.attended.to_string(),
        ]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        Some(AttendanceRecord {
            subject: Text::new(f[0]),
            total_lectures: int_field(f[1])?,
            attended: int_field(f[2])?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Holiday,
    Exam,
    Test,
    Orientation,
    Deadline,
}

impl EventKind {
    const ALL: [EventKind; 5] = [
        EventKind::Holiday,
        EventKind::Exam,
        EventKind::Test,
        EventKind::Orientation,
        EventKind::Deadline,
    ];

    fn code(&self) -> u8 {
        *self as u8
    }

    fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

/// A dated entry on the semester calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: u32,
    pub kind: EventKind,
    pub title: Text,
    pub date: Text,
    #[serde(default)]
    pub description: Text,
}

impl Record for CalendarEvent {
    const KIND: &'static str = "calendar";

    fn key(&self) -> RecordKey {
        RecordKey::Id(self.id)
    }

    fn assign_id(&mut self, id: u32) {
        self.id = id;
    }
}

// id|kind|title|date|description
impl TextFields for CalendarEvent {
    const FIELD_COUNT: usize = 5;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.kind.code().to_string(),
            self.title.to_string(),
            self.date.to_string(),
            self.description.to_string(),
        ]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        Some(CalendarEvent {
            id: int_field(f[0])?,
            kind: EventKind::from_code(int_field(f[1])?)?,
            title: Text::new(f[2]),
            date: Text::new(f[3]),
            description: Text::new(f[4]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterInfo {
    pub name: Text,
    pub start_date: Text,
    pub end_date: Text,
    pub total_credits: i32,
}

impl Default for SemesterInfo {
    fn default() -> Self {
        Self {
            name: Text::new("Semester 1"),
            start_date: Text::new("2025-01-10"),
            end_date: Text::new("2025-05-30"),
            total_credits: 20,
        }
    }
}

impl Record for SemesterInfo {
    const KIND: &'static str = "semester";

    // there is only ever one
    fn key(&self) -> RecordKey {
        RecordKey::Positional
    }
}

impl TextFields for SemesterInfo {
    const FIELD_COUNT: usize = 4;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.name.to_string(),
            self.start_date.to_string(),
            self.end_date.to_string(),
            self.total_credits.to_string(),
        ]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        Some(SemesterInfo {
            name: Text::new(f[0]),
            start_date: Text::new(f[1]),
            end_date: Text::new(f[2]),
            total_credits: int_field(f[3])?,
        })
    }
}

use serde_derive::{Deserialize, Serialize};

use super::bounded::BoundedString;
use super::codec::{int_field, TextFields};
use super::store::{Record, RecordKey};

pub type StudentId = BoundedString<49>;
pub type ComplaintText = BoundedString<255>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeEntry {
    pub student_id: StudentId,
    pub tuition_total: i32,
    pub tuition_paid: i32,
    pub hostel_total: i32,
    pub hostel_paid: i32,
}

// Balances are widened so that any pair of stored amounts fits.
impl FeeEntry {
    pub fn tuition_due(&self) -> i64 {
        i64::from(self.tuition_total) - i64::from(self.tuition_paid)
    }

    pub fn hostel_due(&self) -> i64 {
        i64::from(self.hostel_total) - i64::from(self.hostel_paid)
    }

    pub fn total_due(&self) -> i64 {
        self.tuition_due() + self.hostel_due()
    }
}

impl Record for FeeEntry {
    const KIND: &'static str = "fee";

    fn key(&self) -> RecordKey {
        RecordKey::Natural(self.student_id.to_string())
    }
}

// student_id|tuition_total|tuition_paid|hostel_total|hostel_paid
impl TextFields for FeeEntry {
    const FIELD_COUNT: usize = 5;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.student_id.to_string(),
            self.tuition_total.to_string(),
            self.tuition_paid.to_string(),
            self.hostel_total.to_string(),
            self.hostel_paid.to_string(),
        ]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        if f[0].is_empty() {
            return None;
        }

        Some(FeeEntry {
            student_id: StudentId::new(f[0]),
            tuition_total: int_field(f[1])?,
            tuition_paid: int_field(f[2])?,
            hostel_total: int_field(f[3])?,
            hostel_paid: int_field(f[4])?,
        })
    }
}

/// One line of the complaints log. Complaints have no id; they are addressed
/// by their position in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub student_id: StudentId,
    pub message: ComplaintText,
}

impl Record for Complaint {
    const KIND: &'static str = "complaint";

    fn key(&self) -> RecordKey {
        RecordKey::Positional
    }
}

impl TextFields for Complaint {
    const FIELD_COUNT: usize = 2;

    fn to_fields(&self) -> Vec<String> {
        vec![self.student_id.to_string(), self.message.to_string()]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        if f[0].is_empty() {
            return None;
        }

        Some(Complaint {
            student_id: StudentId::new(f[0]),
            message: ComplaintText::new(f[1]),
        })
    }
}

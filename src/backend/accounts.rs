use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use super::bounded::BoundedString;
use super::codec::TextFields;
use super::store::{Record, RecordKey};

pub type ShortText = BoundedString<50>;
pub type Address = BoundedString<100>;
pub type Email = BoundedString<64>;
pub type BloodGroup = BoundedString<4>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Student,
    Faculty,
}

impl Display for UserKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UserKind::Student => write!(f, "student"),
            UserKind::Faculty => write!(f, "faculty"),
        }
    }
}

impl FromStr for UserKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(UserKind::Student),
            "faculty" => Ok(UserKind::Faculty),
            _ => Err(anyhow::anyhow!("Unknown user type '{}'.", s)),
        }
    }
}

/// Login record: an id and the argon2 hash of its password.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub id: ShortText,
    pub password_hash: String,
}

impl Record for Credential {
    const KIND: &'static str = "credential";

    fn key(&self) -> RecordKey {
        RecordKey::Natural(self.id.to_string())
    }
}

impl TextFields for Credential {
    const FIELD_COUNT: usize = 2;

    fn to_fields(&self) -> Vec<String> {
        vec![self.id.to_string(), self.password_hash.clone()]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        if f[0].is_empty() || f[1].is_empty() {
            return None;
        }

        Some(Credential {
            id: ShortText::new(f[0]),
            password_hash: f[1].to_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: ShortText,
    #[serde(skip)]
    pub password_hash: String,
    pub name: ShortText,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub phone: ShortText,
    #[serde(default)]
    pub email: Email,
    #[serde(default)]
    pub course: ShortText,
    #[serde(default)]
    pub semester: ShortText,
    #[serde(default)]
    pub height: ShortText,
    #[serde(default)]
    pub blood_group: BloodGroup,
}

impl Record for StudentProfile {
    const KIND: &'static str = "student_profile";

    fn key(&self) -> RecordKey {
        RecordKey::Natural(self.id.to_string())
    }
}

impl TextFields for StudentProfile {
    const FIELD_COUNT: usize = 10;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.password_hash.clone(),
            self.name.to_string(),
            self.address.to_string(),
            self.phone.to_string(),
            self.email.to_string(),
            self.course.to_string(),
            self.semester.to_string(),
            self.height.to_string(),
            self.blood_group.to_string(),
        ]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        Some(StudentProfile {
            id: ShortText::new(f[0]),
            password_hash: f[1].to_owned(),
            name: ShortText::new(f[2]),
            address: Address::new(f[3]),
            phone: ShortText::new(f[4]),
            email: Email::new(f[5]),
            course: ShortText::new(f[6]),
            semester: ShortText::new(f[7]),
            height: ShortText::new(f[8]),
            blood_group: BloodGroup::new(f[9]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FacultyProfile {
    pub id: ShortText,
    #[serde(skip)]
    pub password_hash: String,
    pub name: ShortText,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub phone: ShortText,
    #[serde(default)]
    pub email: Email,
    #[serde(default)]
    pub department: ShortText,
    #[serde(default)]
    pub designation: ShortText,
}

impl Record for FacultyProfile {
    const KIND: &'static str = "faculty_profile";

    fn key(&self) -> RecordKey {
        RecordKey::Natural(self.id.to_string())
    }
}

impl TextFields for FacultyProfile {
    const FIELD_COUNT: usize = 8;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.password_hash.clone(),
            self.name.to_string(),
            self.address.to_string(),
            self.phone.to_string(),
            self.email.to_string(),
            self.department.to_string(),
            self.designation.to_string(),
        ]
    }

    fn from_fields(f: &[&str]) -> Option<Self> {
        Some(FacultyProfile {
            id: ShortText::new(f[0]),
            password_hash: f[1].to_owned(),
            name: ShortText::new(f[2]),
            address: Address::new(f[3]),
            phone: ShortText::new(f[4]),
            email: Email::new(f[5]),
            department: ShortText::new(f[6]),
            designation: ShortText::new(f[7]),
        })
    }
}

//! Announcements and events, stored as raw fixed-size slots.
//!
//! The slot layouts match the C structs the data files were first written
//! with: a little-endian `i32` id followed by NUL-padded character arrays,
//! padded to a 4 byte boundary.

use serde_derive::{Deserialize, Serialize};

use super::bounded::BoundedString;
use super::codec::{FixedLayout, SlotReader, SlotWriter};
use super::store::{Record, RecordKey};

const TITLE_LEN: usize = 80;
const BODY_LEN: usize = 2048;
const CREATED_LEN: usize = 26;
const DATE_LEN: usize = 11;

pub type Title = BoundedString<{ TITLE_LEN - 1 }>;
pub type Body = BoundedString<{ BODY_LEN - 1 }>;
pub type Created = BoundedString<{ CREATED_LEN - 1 }>;
pub type EventDate = BoundedString<{ DATE_LEN - 1 }>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(default)]
    pub id: u32,
    pub title: Title,
    pub body: Body,
    #[serde(default)]
    pub created: Created,
}

impl Record for Announcement {
    const KIND: &'static str = "announcement";

    fn key(&self) -> RecordKey {
        RecordKey::Id(self.id)
    }

    fn assign_id(&mut self, id: u32) {
        self.id = id;
    }
}

impl FixedLayout for Announcement {
    const SIZE: usize = 2160;

    fn write_slot(&self, slot: &mut SlotWriter) {
        slot.i32(self.id as i32)
            .str(&self.title, TITLE_LEN)
            .str(&self.body, BODY_LEN)
            .str(&self.created, CREATED_LEN)
            .pad(2);
    }

    fn read_slot(slot: &mut SlotReader<'_>) -> Option<Self> {
        let id = u32::try_from(slot.i32()?).ok()?;
        let title = slot.str(TITLE_LEN)?;
        let body = slot.str(BODY_LEN)?;
        let created = slot.str(CREATED_LEN)?;

        Some(Announcement {
            id,
            title: Title::new(title),
            body: Body::new(body),
            created: Created::new(created),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: u32,
    pub title: Title,
    pub body: Body,
    pub date: EventDate,
}

impl Record for Event {
    const KIND: &'static str = "event";

    fn key(&self) -> RecordKey {
        RecordKey::Id(self.id)
    }

    fn assign_id(&mut self, id: u32) {
        self.id = id;
    }
}

impl FixedLayout for Event {
    const SIZE: usize = 2144;

    fn write_slot(&self, slot: &mut SlotWriter) {
        slot.i32(self.id as i32)
            .str(&self.title, TITLE_LEN)
            .str(&self.body, BODY_LEN)
            .str(&self.date, DATE_LEN)
            .pad(1);
    }

    fn read_slot(slot: &mut SlotReader<'_>) -> Option<Self> {
        let id = u32::try_from(slot.i32()?).ok()?;
        let title = slot.str(TITLE_LEN)?;
        let body = slot.str(BODY_LEN)?;
        let date = slot.str(DATE_LEN)?;

        Some(Event {
            id,
            title: Title::new(title),
            body: Body::new(body),
            date: EventDate::new(date),
        })
    }
}

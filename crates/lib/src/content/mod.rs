//! Club content: events and announcements.
//!
//! Read models decode rows from the data store; the `New*` types are what the
//! publisher inserts. Neither is ever updated or deleted from this client.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    Result, clubs, constants,
    store::{self, DataStore, Direction, Select},
};

mod timestamp;
pub use timestamp::Timestamp;

/// Primary key of a content row. Projects use either identity integers or UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(id) => write!(f, "{id}"),
            RowId::Text(id) => f.write_str(id),
        }
    }
}

/// A club event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: RowId,
    pub club_id: String,
    pub title: String,
    pub event_date: Timestamp,
    pub venue: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

/// A club announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: RowId,
    pub club_id: String,
    pub title: String,
    pub description: String,
    pub created_at: Timestamp,
}

impl Announcement {
    /// Club name for the attribution line, "General" for unknown clubs.
    pub fn club_name(&self) -> &'static str {
        clubs::display_name(&self.club_id)
    }
}

/// Event as submitted by the publisher.
///
/// A missing registration link is left out of the row entirely; the store
/// treats an absent column differently from an empty string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    pub club_id: String,
    pub title: String,
    /// Local date and time as entered, without an offset.
    pub event_date: NaiveDateTime,
    pub venue: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_link: Option<String>,
}

/// Announcement as submitted by the publisher. The store stamps `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAnnouncement {
    pub club_id: String,
    pub title: String,
    pub description: String,
}

/// Events of one club, newest event date first.
pub fn events_query(club_id: &str) -> Select {
    Select::from(constants::EVENTS)
        .eq(constants::CLUB_ID, club_id)
        .order(constants::EVENT_DATE, Direction::Descending)
}

/// The most recent announcements across all clubs.
pub fn announcements_query() -> Select {
    Select::from(constants::ANNOUNCEMENTS)
        .order(constants::CREATED_AT, Direction::Descending)
        .limit(constants::ANNOUNCEMENT_LIMIT)
}

pub async fn fetch_events(store: &dyn DataStore, club_id: &str) -> Result<Vec<Event>> {
    store::select_rows(store, &events_query(club_id)).await
}

pub async fn fetch_announcements(store: &dyn DataStore) -> Result<Vec<Announcement>> {
    store::select_rows(store, &announcements_query()).await
}

pub async fn create_event(store: &dyn DataStore, event: &NewEvent) -> Result<()> {
    store::insert_row(store, constants::EVENTS, event).await
}

pub async fn create_announcement(store: &dyn DataStore, announcement: &NewAnnouncement) -> Result<()> {
    store::insert_row(store, constants::ANNOUNCEMENTS, announcement).await
}

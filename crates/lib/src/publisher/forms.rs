//! Raw form input and its validation.
//!
//! Fields hold exactly what the user typed. `validate` applies the same rules
//! a browser applies to `required`, `type="url"` and `type="datetime-local"`
//! inputs, then builds the row to insert.

use chrono::NaiveDateTime;
use url::Url;

use super::FormError;
use crate::content::{NewAnnouncement, NewEvent};

/// Input format of a `datetime-local` field.
pub const DATETIME_LOCAL: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventForm {
    pub title: String,
    /// `YYYY-MM-DDTHH:MM`, local time.
    pub event_date: String,
    pub venue: String,
    pub description: String,
    /// Optional. Left out of the inserted row when blank.
    pub registration_link: String,
}

impl EventForm {
    /// Check every field and build the row for `club_id`.
    pub fn validate(&self, club_id: &str) -> Result<NewEvent, FormError> {
        let title = required("title", &self.title)?;
        let event_date = parse_datetime_local("event_date", &self.event_date)?;
        let venue = required("venue", &self.venue)?;
        let description = required("description", &self.description)?;
        let registration_link = optional_url("registration_link", &self.registration_link)?;

        Ok(NewEvent {
            club_id: club_id.to_string(),
            title,
            event_date,
            venue,
            description,
            registration_link,
        })
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementForm {
    pub title: String,
    pub description: String,
}

impl AnnouncementForm {
    pub fn validate(&self, club_id: &str) -> Result<NewAnnouncement, FormError> {
        Ok(NewAnnouncement {
            club_id: club_id.to_string(),
            title: required("title", &self.title)?,
            description: required("description", &self.description)?,
        })
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

/// Only an empty value is missing; whitespace counts as input.
fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    if value.is_empty() {
        return Err(FormError::MissingField { field });
    }
    Ok(value.to_string())
}

fn parse_datetime_local(field: &'static str, value: &str) -> Result<NaiveDateTime, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FormError::MissingField { field });
    }
    NaiveDateTime::parse_from_str(value, DATETIME_LOCAL)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| FormError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

fn optional_url(field: &'static str, value: &str) -> Result<Option<String>, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Url::parse(value)
        .map(|_| Some(value.to_string()))
        .map_err(|e| FormError::InvalidUrl {
            field,
            reason: e.to_string(),
        })
}

//! Constants used throughout the Clubhub library.
//!
//! This module provides central definitions for remote table names, column names
//! and the fixed timings of transient UI state.

use std::time::Duration;

/// Remote table holding one profile row per account.
pub const PROFILES: &str = "profiles";

/// Remote table holding club events.
pub const EVENTS: &str = "events";

/// Remote table holding club announcements.
pub const ANNOUNCEMENTS: &str = "announcements";

/// Column every content table uses to reference its club.
pub const CLUB_ID: &str = "club_id";

/// Column events are ordered by.
pub const EVENT_DATE: &str = "event_date";

/// Column announcements are ordered by.
pub const CREATED_AT: &str = "created_at";

/// Number of announcements shown on the dashboard.
pub const ANNOUNCEMENT_LIMIT: usize = 5;

/// How long a publisher feedback banner stays visible.
pub const FEEDBACK_DURATION: Duration = Duration::from_secs(3);

/// How long the dashboard shows its welcome panel before switching to the clubs view.
pub const WELCOME_DURATION: Duration = Duration::from_secs(3);

/// Sessions expiring within this margin are refreshed before use.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Upper bound on chained guard redirects when resolving a navigation.
pub const MAX_REDIRECTS: usize = 4;

//! Member dashboard view state.
//!
//! Two independently loaded lists: the selected club's events and the latest
//! announcements across all clubs. Each has its own loading flag. A failed
//! fetch is logged and shows as an empty list.
//!
//! [`DashboardView`] is a cheap-to-clone handle, so a front end can run a
//! fetch on a spawned task while it keeps drawing the loading state.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::{
    Clock,
    clubs::{self, Club},
    constants::WELCOME_DURATION,
    content::{self, Announcement, Event},
    store::DataStore,
};

/// Shown when the selected club has no events.
pub const NO_EVENTS: &str = "No events found for this club.";

/// Shown when there are no announcements.
pub const NO_ANNOUNCEMENTS: &str = "No announcements yet.";

/// Which half of the dashboard is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// Greeting plus the latest announcements.
    Welcome,
    /// Club list plus the selected club's events.
    Clubs,
}

/// A remotely loaded list and its loading flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub loading: bool,
}

impl<T> ListState<T> {
    fn pending() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
        }
    }

    /// True once loading finished with nothing to show.
    pub fn is_empty(&self) -> bool {
        !self.loading && self.items.is_empty()
    }
}

/// Point-in-time copy of the dashboard for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub panel: Panel,
    pub selected_club: &'static Club,
    pub events: ListState<Event>,
    pub announcements: ListState<Announcement>,
}

#[derive(Debug)]
struct DashboardState {
    selected_club: &'static Club,
    events: ListState<Event>,
    announcements: ListState<Announcement>,
    opened_at: u64,
    welcome_dismissed: bool,
}

/// Dashboard state plus the data store it loads from.
#[derive(Clone)]
pub struct DashboardView {
    store: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<DashboardState>>,
}

impl DashboardView {
    /// A dashboard opened now on the default club. Nothing is fetched until [`load`](Self::load).
    pub fn new(store: Arc<dyn DataStore>, clock: Arc<dyn Clock>) -> Self {
        let selected_club = clubs::find(clubs::DEFAULT_CLUB).unwrap_or(&clubs::CLUBS[0]);
        let opened_at = clock.now_millis();
        Self {
            store,
            clock,
            state: Arc::new(Mutex::new(DashboardState {
                selected_club,
                events: ListState::pending(),
                announcements: ListState::pending(),
                opened_at,
                welcome_dismissed: false,
            })),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let state = self.lock();
        DashboardSnapshot {
            panel: self.panel_of(&state),
            selected_club: state.selected_club,
            events: state.events.clone(),
            announcements: state.announcements.clone(),
        }
    }

    /// The welcome panel shows for a few seconds after opening, or until dismissed.
    pub fn panel(&self) -> Panel {
        let state = self.lock();
        self.panel_of(&state)
    }

    pub fn dismiss_welcome(&self) {
        self.lock().welcome_dismissed = true;
    }

    pub fn selected_club(&self) -> &'static Club {
        self.lock().selected_club
    }

    /// Fetch announcements and the selected club's events.
    pub async fn load(&self) {
        tokio::join!(self.refresh_announcements(), self.refresh_events());
    }

    /// Switch clubs and re-fetch events only.
    ///
    /// Returns `false` without fetching if `club_id` is unknown or already selected.
    pub async fn select_club(&self, club_id: &str) -> bool {
        let Some(club) = clubs::find(club_id) else {
            debug!(club_id, "ignoring unknown club");
            return false;
        };
        {
            let mut state = self.lock();
            if state.selected_club.id == club.id {
                return false;
            }
            state.selected_club = club;
        }
        self.refresh_events().await;
        true
    }

    /// Re-fetch the selected club's events.
    pub async fn refresh_events(&self) {
        let club = {
            let mut state = self.lock();
            state.events.loading = true;
            state.selected_club
        };

        let events = match content::fetch_events(self.store.as_ref(), club.id).await {
            Ok(events) => events,
            Err(e) => {
                warn!(club_id = club.id, error = %e, "failed to fetch events");
                Vec::new()
            }
        };

        let mut state = self.lock();
        // A newer selection owns the list now; its own fetch will fill it.
        if state.selected_club.id != club.id {
            debug!(club_id = club.id, "discarding events for a deselected club");
            return;
        }
        state.events = ListState {
            items: events,
            loading: false,
        };
    }

    /// Re-fetch the latest announcements.
    pub async fn refresh_announcements(&self) {
        self.lock().announcements.loading = true;

        let announcements = match content::fetch_announcements(self.store.as_ref()).await {
            Ok(announcements) => announcements,
            Err(e) => {
                warn!(error = %e, "failed to fetch announcements");
                Vec::new()
            }
        };

        self.lock().announcements = ListState {
            items: announcements,
            loading: false,
        };
    }

    fn panel_of(&self, state: &DashboardState) -> Panel {
        if state.welcome_dismissed || self.clock.has_elapsed(state.opened_at, WELCOME_DURATION) {
            Panel::Clubs
        } else {
            Panel::Welcome
        }
    }

    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for DashboardView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardView")
            .field("state", &*self.lock())
            .finish()
    }
}

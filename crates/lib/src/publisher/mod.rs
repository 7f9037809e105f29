//! Admin content publisher.
//!
//! One club selection shared by two independent forms. Each form has its own
//! pending flag; a submission while that form is pending is refused. Every
//! completed submission replaces the single feedback banner, which stays
//! visible for [`FEEDBACK_DURATION`] from the moment it was shown.
//!
//! The state lock is never held across an await point, so a front end can read
//! [`ContentPublisher::snapshot`] while a submission is in flight.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::{
    Clock,
    clubs::{self, Club},
    constants::FEEDBACK_DURATION,
    content,
    store::DataStore,
};

mod errors;
mod forms;

pub use errors::FormError;
pub use forms::{AnnouncementForm, DATETIME_LOCAL, EventForm};

pub const EVENT_PUBLISHED: &str = "Event published successfully!";
pub const ANNOUNCEMENT_PUBLISHED: &str = "Announcement published successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Success,
    Error,
}

/// The transient banner shown after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub message: String,
    pub kind: FeedbackKind,
}

/// Result of a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Row inserted; the form was cleared.
    Published,
    /// The insert failed; the form was kept. Carries the banner message.
    Failed(String),
    /// Validation failed; nothing was sent.
    Invalid(FormError),
    /// No club is selected.
    NoClub,
    /// The same form is already being submitted.
    Busy,
}

impl SubmitOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, SubmitOutcome::Published)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormKind {
    Event,
    Announcement,
}

impl FormKind {
    fn noun(&self) -> &'static str {
        match self {
            FormKind::Event => "event",
            FormKind::Announcement => "announcement",
        }
    }
}

#[derive(Debug)]
struct Banner {
    feedback: Feedback,
    shown_at: u64,
}

#[derive(Debug, Default)]
struct PublisherState {
    selected_club: Option<&'static Club>,
    event: EventForm,
    announcement: AnnouncementForm,
    event_pending: bool,
    announcement_pending: bool,
    banner: Option<Banner>,
}

impl PublisherState {
    fn pending_mut(&mut self, kind: FormKind) -> &mut bool {
        match kind {
            FormKind::Event => &mut self.event_pending,
            FormKind::Announcement => &mut self.announcement_pending,
        }
    }
}

/// Point-in-time copy of the publisher for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherSnapshot {
    pub selected_club: Option<&'static Club>,
    pub event: EventForm,
    pub announcement: AnnouncementForm,
    pub event_pending: bool,
    pub announcement_pending: bool,
    pub feedback: Option<Feedback>,
}

/// The admin publishing flow. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ContentPublisher {
    store: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<PublisherState>>,
}

impl ContentPublisher {
    pub fn new(store: Arc<dyn DataStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            state: Arc::new(Mutex::new(PublisherState::default())),
        }
    }

    pub fn snapshot(&self) -> PublisherSnapshot {
        let state = self.lock();
        PublisherSnapshot {
            selected_club: state.selected_club,
            event: state.event.clone(),
            announcement: state.announcement.clone(),
            event_pending: state.event_pending,
            announcement_pending: state.announcement_pending,
            feedback: self.visible_feedback(&state),
        }
    }

    pub fn selected_club(&self) -> Option<&'static Club> {
        self.lock().selected_club
    }

    /// Select the club both forms publish to. Unknown ids are ignored.
    pub fn select_club(&self, club_id: &str) -> bool {
        match clubs::find(club_id) {
            Some(club) => {
                self.lock().selected_club = Some(club);
                true
            }
            None => {
                debug!(club_id, "ignoring unknown club");
                false
            }
        }
    }

    pub fn edit_event(&self, edit: impl FnOnce(&mut EventForm)) {
        edit(&mut self.lock().event);
    }

    pub fn edit_announcement(&self, edit: impl FnOnce(&mut AnnouncementForm)) {
        edit(&mut self.lock().announcement);
    }

    /// The banner, if one was shown less than [`FEEDBACK_DURATION`] ago.
    pub fn feedback(&self) -> Option<Feedback> {
        let state = self.lock();
        self.visible_feedback(&state)
    }

    pub fn is_event_pending(&self) -> bool {
        self.lock().event_pending
    }

    pub fn is_announcement_pending(&self) -> bool {
        self.lock().announcement_pending
    }

    /// Validate and insert the event form.
    pub async fn publish_event(&self) -> SubmitOutcome {
        let event = match self.begin(FormKind::Event, |state, club| state.event.validate(club.id)) {
            Ok(event) => event,
            Err(outcome) => return outcome,
        };
        let result = content::create_event(self.store.as_ref(), &event).await;
        self.finish(FormKind::Event, &event.club_id, result)
    }

    /// Validate and insert the announcement form.
    pub async fn publish_announcement(&self) -> SubmitOutcome {
        let announcement = match self.begin(FormKind::Announcement, |state, club| {
            state.announcement.validate(club.id)
        }) {
            Ok(announcement) => announcement,
            Err(outcome) => return outcome,
        };
        let result = content::create_announcement(self.store.as_ref(), &announcement).await;
        self.finish(FormKind::Announcement, &announcement.club_id, result)
    }

    /// Claim the form's pending flag and build its row, all under one lock.
    fn begin<T>(
        &self,
        kind: FormKind,
        validate: impl FnOnce(&PublisherState, &Club) -> Result<T, FormError>,
    ) -> Result<T, SubmitOutcome> {
        let mut state = self.lock();
        let Some(club) = state.selected_club else {
            return Err(SubmitOutcome::NoClub);
        };
        if *state.pending_mut(kind) {
            debug!(form = kind.noun(), "submission already pending");
            return Err(SubmitOutcome::Busy);
        }
        let row = validate(&state, club).map_err(|e| {
            debug!(form = kind.noun(), error = %e, "form rejected");
            SubmitOutcome::Invalid(e)
        })?;
        *state.pending_mut(kind) = true;
        Ok(row)
    }

    fn finish(&self, kind: FormKind, club_id: &str, result: crate::Result<()>) -> SubmitOutcome {
        let now = self.clock.now_millis();
        let mut state = self.lock();
        *state.pending_mut(kind) = false;

        let (feedback, outcome) = match result {
            Ok(()) => {
                info!(form = kind.noun(), club_id, "content published");
                match kind {
                    FormKind::Event => state.event = EventForm::default(),
                    FormKind::Announcement => state.announcement = AnnouncementForm::default(),
                }
                let message = match kind {
                    FormKind::Event => EVENT_PUBLISHED,
                    FormKind::Announcement => ANNOUNCEMENT_PUBLISHED,
                };
                (
                    Feedback {
                        message: message.to_string(),
                        kind: FeedbackKind::Success,
                    },
                    SubmitOutcome::Published,
                )
            }
            Err(e) => {
                warn!(form = kind.noun(), club_id, error = %e, "failed to publish content");
                let message = format!("Error creating {}: {e}", kind.noun());
                (
                    Feedback {
                        message: message.clone(),
                        kind: FeedbackKind::Error,
                    },
                    SubmitOutcome::Failed(message),
                )
            }
        };

        // A newer banner restarts the window, so an older one never cuts it short.
        state.banner = Some(Banner {
            feedback,
            shown_at: now,
        });
        outcome
    }

    fn visible_feedback(&self, state: &PublisherState) -> Option<Feedback> {
        state
            .banner
            .as_ref()
            .filter(|banner| !self.clock.has_elapsed(banner.shown_at, FEEDBACK_DURATION))
            .map(|banner| banner.feedback.clone())
    }

    fn lock(&self) -> MutexGuard<'_, PublisherState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ContentPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentPublisher")
            .field("state", &*self.lock())
            .finish()
    }
}

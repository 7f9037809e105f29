use std::sync::Arc;

use clubhub::{
    AuthState, Clock, SessionResolver, SystemClock,
    auth::OAuthProvider,
    clubs::{self, CLUBS},
    dashboard::DashboardView,
    publisher::{ContentPublisher, SubmitOutcome},
    routes::{Guard, History, Route},
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{backend::Services, oauth::Callback};

/// Text inputs of the sign-in page.
#[derive(Debug, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    pub field: usize,
}

impl SignInForm {
    pub const FIELDS: usize = 2;

    pub fn input_mut(&mut self) -> &mut String {
        match self.field {
            0 => &mut self.email,
            _ => &mut self.password,
        }
    }
}

/// Text inputs of the sign-up page.
#[derive(Debug, Default)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub field: usize,
}

impl SignUpForm {
    pub const FIELDS: usize = 3;

    pub fn input_mut(&mut self) -> &mut String {
        match self.field {
            0 => &mut self.full_name,
            1 => &mut self.email,
            _ => &mut self.password,
        }
    }
}

/// Focusable controls on the admin publisher page, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherField {
    Club,
    EventTitle,
    EventDate,
    EventVenue,
    EventLink,
    EventDescription,
    AnnouncementTitle,
    AnnouncementDescription,
}

impl PublisherField {
    pub const ORDER: [PublisherField; 8] = [
        PublisherField::Club,
        PublisherField::EventTitle,
        PublisherField::EventDate,
        PublisherField::EventVenue,
        PublisherField::EventLink,
        PublisherField::EventDescription,
        PublisherField::AnnouncementTitle,
        PublisherField::AnnouncementDescription,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PublisherField::Club => "Select club to create content for",
            PublisherField::EventTitle | PublisherField::AnnouncementTitle => "Title",
            PublisherField::EventDate => "Date (YYYY-MM-DDTHH:MM)",
            PublisherField::EventVenue => "Venue",
            PublisherField::EventLink => "Link for Registration (Optional)",
            PublisherField::EventDescription | PublisherField::AnnouncementDescription => {
                "Description"
            }
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(
            self,
            PublisherField::EventTitle
                | PublisherField::EventDate
                | PublisherField::EventVenue
                | PublisherField::EventLink
                | PublisherField::EventDescription
        )
    }
}

pub struct App {
    pub resolver: SessionResolver,
    pub auth: AuthState,
    auth_updates: watch::Receiver<AuthState>,
    pub history: History,
    /// Guard decision for the current route.
    pub guard: Guard,

    services: Arc<Services>,
    clock: Arc<dyn Clock>,

    // Page state, recreated whenever the page is entered
    pub dashboard: Option<DashboardView>,
    pub club_cursor: usize,
    pub publisher: Option<ContentPublisher>,
    pub publisher_field: usize,
    pub sign_in: SignInForm,
    pub sign_up: SignUpForm,

    callbacks: mpsc::UnboundedReceiver<Callback>,
    notices: mpsc::UnboundedSender<String>,
    notice_rx: mpsc::UnboundedReceiver<String>,

    pub status_message: Option<String>,

    pub should_quit: bool,
}

impl App {
    pub fn new(
        resolver: SessionResolver,
        services: Arc<Services>,
        start: Route,
        callbacks: mpsc::UnboundedReceiver<Callback>,
    ) -> Self {
        let auth_updates = resolver.subscribe();
        let auth = resolver.state();
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let mut app = Self {
            resolver,
            auth,
            auth_updates,
            history: History::new(start),
            guard: Guard::Loading,
            services,
            clock: Arc::new(SystemClock),
            dashboard: None,
            club_cursor: 0,
            publisher: None,
            publisher_field: 0,
            sign_in: SignInForm::default(),
            sign_up: SignUpForm::default(),
            callbacks,
            notices,
            notice_rx,
            status_message: None,
            should_quit: false,
        };
        app.resolve_route();
        app
    }

    pub fn current_route(&self) -> Route {
        self.history.current()
    }

    /// Pull in auth changes and background notices. Returns whether anything changed.
    pub async fn poll_updates(&mut self) -> bool {
        let mut changed = false;
        if self.auth_updates.has_changed().unwrap_or(false) {
            self.auth = self.auth_updates.borrow_and_update().clone();
            debug!(
                loading = self.auth.loading,
                signed_in = self.auth.is_authenticated(),
                role = %self.auth.role(),
                "auth state changed"
            );
            self.resolve_route();
            changed = true;
        }
        while let Ok(notice) = self.notice_rx.try_recv() {
            self.status_message = Some(notice);
            changed = true;
        }
        while let Ok(callback) = self.callbacks.try_recv() {
            self.finish_oauth(callback).await;
            changed = true;
        }
        changed
    }

    pub fn navigate(&mut self, to: Route) {
        let before = self.current_route();
        self.guard = self.history.navigate(to, &self.auth);
        self.after_route_change(before);
    }

    pub fn back(&mut self) {
        let before = self.current_route();
        if self.history.back().is_none() {
            self.should_quit = true;
            return;
        }
        self.guard = self.history.resolve(&self.auth);
        self.after_route_change(before);
    }

    fn resolve_route(&mut self) {
        let before = self.current_route();
        self.guard = self.history.resolve(&self.auth);
        // Page state is set up on first render, which may come after a loading placeholder.
        let entering = match self.current_route() {
            Route::Dashboard => self.dashboard.is_none(),
            Route::AdminDashboard => self.publisher.is_none(),
            _ => false,
        };
        if entering || before != self.current_route() {
            self.enter_page();
        }
    }

    fn after_route_change(&mut self, before: Route) {
        if before != self.current_route() {
            self.status_message = None;
            self.enter_page();
        }
    }

    /// Set up the state of the page now showing.
    fn enter_page(&mut self) {
        if self.guard != Guard::Render {
            return;
        }
        match self.current_route() {
            Route::Dashboard => {
                let view = DashboardView::new(self.services.store(), self.clock.clone());
                self.club_cursor = clubs::position(view.selected_club().id).unwrap_or(0);
                tokio::spawn({
                    let view = view.clone();
                    async move { view.load().await }
                });
                self.dashboard = Some(view);
            }
            Route::AdminDashboard => {
                self.publisher = Some(ContentPublisher::new(
                    self.services.store(),
                    self.clock.clone(),
                ));
                self.publisher_field = 0;
            }
            Route::SignIn => self.sign_in = SignInForm::default(),
            Route::SignUp => self.sign_up = SignUpForm::default(),
            Route::Landing | Route::Profile => {}
        }
        if self.current_route() != Route::Dashboard {
            self.dashboard = None;
        }
        if self.current_route() != Route::AdminDashboard {
            self.publisher = None;
        }
    }

    pub async fn submit_sign_in(&mut self) {
        let email = self.sign_in.email.trim().to_string();
        match self.resolver.sign_in(&email, &self.sign_in.password).await {
            Ok(_) => self.status_message = None,
            Err(e) => {
                self.sign_in.password.clear();
                self.status_message = Some(e.to_string());
            }
        }
    }

    pub async fn submit_sign_up(&mut self) {
        let form = &self.sign_up;
        if form.full_name.trim().is_empty() || form.email.trim().is_empty() || form.password.is_empty() {
            self.status_message = Some("Name, email and password are required.".to_string());
            return;
        }
        match self
            .resolver
            .sign_up(form.full_name.trim(), form.email.trim(), &form.password)
            .await
        {
            Ok(response) if response.needs_confirmation() => {
                self.status_message = Some(
                    "Check your email for a confirmation link, then sign in.".to_string(),
                );
                self.sign_up = SignUpForm::default();
            }
            Ok(_) => self.status_message = None,
            Err(e) => self.status_message = Some(e.to_string()),
        }
    }

    pub async fn start_oauth(&mut self, provider: OAuthProvider) {
        let redirect = match self.resolver.sign_in_with_oauth(provider).await {
            Ok(redirect) => redirect,
            Err(e) => {
                self.status_message = Some(e.to_string());
                return;
            }
        };
        if let Some(code) = self
            .services
            .local_oauth_code(provider, &self.sign_in.email)
        {
            self.finish_oauth(Callback::Code(code)).await;
            return;
        }
        info!(%provider, url = %redirect.url, "open this URL to continue signing in");
        self.status_message = Some(format!("Open in your browser: {}", redirect.url));
    }

    async fn finish_oauth(&mut self, callback: Callback) {
        match callback {
            Callback::Code(code) => {
                if let Err(e) = self.resolver.exchange_code(&code).await {
                    warn!(error = %e, "authorization code exchange failed");
                    self.status_message = Some(e.to_string());
                } else {
                    self.status_message = None;
                }
            }
            Callback::Denied(reason) => self.status_message = Some(reason),
        }
    }

    pub async fn sign_out(&mut self) {
        if let Err(e) = self.resolver.sign_out().await {
            self.status_message = Some(e.to_string());
        }
    }

    /// Move the dashboard's club cursor and load that club's events.
    pub fn move_club_cursor(&mut self, step: isize) {
        let Some(view) = self.dashboard.clone() else {
            return;
        };
        self.club_cursor = (self.club_cursor as isize + step).rem_euclid(CLUBS.len() as isize) as usize;
        let club_id = CLUBS[self.club_cursor].id;
        view.dismiss_welcome();
        tokio::spawn(async move { view.select_club(club_id).await });
    }

    pub fn focused_publisher_field(&self) -> PublisherField {
        PublisherField::ORDER[self.publisher_field % PublisherField::ORDER.len()]
    }

    /// Cycle the publisher's club selector.
    pub fn cycle_publisher_club(&mut self, step: isize) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        let next = match publisher.selected_club() {
            Some(club) => {
                let current = clubs::position(club.id).unwrap_or(0) as isize;
                (current + step).rem_euclid(CLUBS.len() as isize) as usize
            }
            None => 0,
        };
        publisher.select_club(CLUBS[next].id);
    }

    /// Apply `edit` to the text of the focused publisher input.
    pub fn edit_publisher_input(&mut self, edit: impl FnOnce(&mut String)) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        match self.focused_publisher_field() {
            PublisherField::Club => {}
            PublisherField::EventTitle => publisher.edit_event(|f| edit(&mut f.title)),
            PublisherField::EventDate => publisher.edit_event(|f| edit(&mut f.event_date)),
            PublisherField::EventVenue => publisher.edit_event(|f| edit(&mut f.venue)),
            PublisherField::EventLink => publisher.edit_event(|f| edit(&mut f.registration_link)),
            PublisherField::EventDescription => publisher.edit_event(|f| edit(&mut f.description)),
            PublisherField::AnnouncementTitle => {
                publisher.edit_announcement(|f| edit(&mut f.title))
            }
            PublisherField::AnnouncementDescription => {
                publisher.edit_announcement(|f| edit(&mut f.description))
            }
        }
    }

    /// Submit the form the focused input belongs to.
    ///
    /// The insert runs in the background; validation problems come back as a notice.
    pub fn submit_publisher_form(&mut self) {
        let Some(publisher) = self.publisher.clone() else {
            return;
        };
        let field = self.focused_publisher_field();
        if field == PublisherField::Club {
            return;
        }
        let notices = self.notices.clone();
        tokio::spawn(async move {
            let outcome = if field.is_event() {
                publisher.publish_event().await
            } else {
                publisher.publish_announcement().await
            };
            let notice = match outcome {
                SubmitOutcome::Invalid(e) => Some(e.to_string()),
                SubmitOutcome::NoClub => Some("Select a club first.".to_string()),
                SubmitOutcome::Busy => Some("Still publishing, please wait.".to_string()),
                // The banner reports these.
                SubmitOutcome::Published | SubmitOutcome::Failed(_) => None,
            };
            if let Some(notice) = notice {
                let _ = notices.send(notice);
            }
        });
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }
}

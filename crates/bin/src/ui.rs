use clubhub::{
    clubs::CLUBS,
    dashboard::{DashboardSnapshot, NO_ANNOUNCEMENTS, NO_EVENTS, Panel},
    publisher::{FeedbackKind, PublisherSnapshot},
    routes::{Guard, Route},
};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, PublisherField};

const ACCENT: Color = Color::Magenta;

pub fn ui(f: &mut Frame, app: &App) {
    let mut constraints = vec![
        Constraint::Length(3), // Header
        Constraint::Min(0),    // Page
        Constraint::Length(1), // Key help
    ];

    // Add space for status message if present
    if app.status_message.is_some() {
        constraints.insert(2, Constraint::Length(2));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    render_header(f, app, chunks[0]);

    let body = chunks[1];
    match app.guard {
        Guard::Loading => render_loading(f, body),
        _ => match app.current_route() {
            Route::Landing => render_landing(f, body),
            Route::SignIn => render_sign_in(f, app, body),
            Route::SignUp => render_sign_up(f, app, body),
            Route::Dashboard => match &app.dashboard {
                Some(view) => render_dashboard(f, &view.snapshot(), app.club_cursor, body),
                None => render_loading(f, body),
            },
            Route::Profile => render_profile(f, app, body),
            Route::AdminDashboard => match &app.publisher {
                Some(publisher) => render_publisher(f, app, &publisher.snapshot(), body),
                None => render_loading(f, body),
            },
        },
    }

    let mut help_index = 2;
    if let Some(status_msg) = &app.status_message {
        let status = Paragraph::new(status_msg.as_str())
            .style(Style::default().fg(Color::Cyan))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(status, chunks[2]);
        help_index = 3;
    }

    let help = Paragraph::new(key_help(app))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[help_index]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let who = if app.auth.loading {
        "…".to_string()
    } else if app.auth.is_authenticated() {
        format!("{} ({})", app.auth.display_name(), app.auth.role())
    } else {
        "not signed in".to_string()
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "CLUBHUB",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(app.current_route().path(), Style::default().fg(Color::Yellow)),
        Span::raw("  |  "),
        Span::raw(who),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn key_help(app: &App) -> &'static str {
    if app.guard != Guard::Render {
        return "Esc back | q quit";
    }
    match app.current_route() {
        Route::Landing => "s sign up | i sign in | d dashboard | q quit",
        Route::SignIn => "Tab next field | Enter sign in | F2 Google | F3 GitHub | F4 sign up | Esc back",
        Route::SignUp => "Tab next field | Enter create account | F4 sign in | Esc back",
        Route::Dashboard => "←/→ club | Enter clubs view | p profile | a admin | o sign out | q quit",
        Route::Profile => "d dashboard | a admin | o sign out | Esc back | q quit",
        Route::AdminDashboard => "Tab next field | ←/→ club | Enter publish | Ctrl-D dashboard | Ctrl-P profile | Esc back",
    }
}

fn render_loading(f: &mut Frame, area: Rect) {
    let loading = Paragraph::new("Loading…")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(loading, area);
}

fn render_landing(f: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Every club. Every event. One place.",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::raw("Follow your university's clubs, catch their events and never miss an announcement."),
        Line::raw(""),
    ];
    lines.extend(CLUBS.iter().map(|club| {
        Line::from(vec![
            Span::styled(format!("{:>4} ", club.icon.glyph()), Style::default().fg(Color::Yellow)),
            Span::raw(club.name),
        ])
    }));
    let landing = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Welcome"));
    f.render_widget(landing, area);
}

/// One labelled input row. Secret values are masked.
fn input_line<'a>(label: &'a str, value: &'a str, focused: bool, secret: bool) -> Line<'a> {
    let shown = if secret {
        "•".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let marker = if focused { "> " } else { "  " };
    Line::from(vec![
        Span::styled(format!("{marker}{label:<10}"), style),
        Span::raw(shown),
    ])
}

fn render_sign_in(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.sign_in;
    let lines = vec![
        input_line("Email", &form.email, form.field == 0, false),
        input_line("Password", &form.password, form.field == 1, true),
        Line::raw(""),
        Line::styled(
            "Or continue with Google (F2) or GitHub (F3)",
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let page = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Sign in"));
    f.render_widget(page, area);
}

fn render_sign_up(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.sign_up;
    let lines = vec![
        input_line("Full name", &form.full_name, form.field == 0, false),
        input_line("Email", &form.email, form.field == 1, false),
        input_line("Password", &form.password, form.field == 2, true),
    ];
    let page = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Create account"));
    f.render_widget(page, area);
}

fn render_dashboard(f: &mut Frame, snapshot: &DashboardSnapshot, cursor: usize, area: Rect) {
    match snapshot.panel {
        Panel::Welcome => render_welcome(f, snapshot, area),
        Panel::Clubs => {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(26), Constraint::Min(0)])
                .split(area);
            render_club_list(f, cursor, chunks[0]);
            render_events(f, snapshot, chunks[1]);
        }
    }
}

fn render_welcome(f: &mut Frame, snapshot: &DashboardSnapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("WELCOME BACK | Here's what's happening in your clubs today!");
    let announcements = &snapshot.announcements;
    if announcements.loading {
        f.render_widget(Paragraph::new("Loading…").block(block), area);
        return;
    }
    if announcements.items.is_empty() {
        let empty = Paragraph::new(NO_ANNOUNCEMENTS)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }
    let items: Vec<ListItem> = announcements
        .items
        .iter()
        .map(|a| {
            ListItem::new(vec![
                Line::styled(a.title.as_str(), Style::default().add_modifier(Modifier::BOLD)),
                Line::raw(a.description.as_str()),
                Line::styled(
                    format!("{} - {}", a.club_name(), a.created_at.date_label()),
                    Style::default().fg(Color::DarkGray),
                ),
                Line::raw(""),
            ])
        })
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

fn render_club_list(f: &mut Frame, cursor: usize, area: Rect) {
    let items: Vec<ListItem> = CLUBS
        .iter()
        .enumerate()
        .map(|(i, club)| {
            let style = if i == cursor {
                Style::default().fg(Color::Black).bg(ACCENT)
            } else {
                Style::default()
            };
            ListItem::new(Line::styled(
                format!("{:>4} {}", club.icon.glyph(), club.name),
                style,
            ))
        })
        .collect();
    f.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title("CLUBS")),
        area,
    );
}

fn render_events(f: &mut Frame, snapshot: &DashboardSnapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("EVENTS | {}", snapshot.selected_club.name));
    let events = &snapshot.events;
    if events.loading {
        f.render_widget(Paragraph::new("Loading…").block(block), area);
        return;
    }
    if events.items.is_empty() {
        let empty = Paragraph::new(NO_EVENTS)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }
    let items: Vec<ListItem> = events
        .items
        .iter()
        .map(|event| {
            let mut lines = vec![
                Line::styled(
                    event.title.as_str(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Line::raw(event.description.as_str()),
                Line::raw(format!("Date: {}", event.event_date)),
                Line::raw(format!("Venue: {}", event.venue)),
            ];
            if let Some(link) = &event.registration_link {
                lines.push(Line::styled(
                    format!("Register: {link}"),
                    Style::default().fg(Color::Cyan),
                ));
            }
            lines.push(Line::raw(""));
            ListItem::new(lines)
        })
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

fn render_profile(f: &mut Frame, app: &App, area: Rect) {
    let auth = &app.auth;
    let email = auth
        .user
        .as_ref()
        .and_then(|u| u.email.as_deref())
        .unwrap_or("");
    let mut lines = vec![
        Line::styled(
            format!("WELCOME BACK, {}", auth.display_name().to_uppercase()),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Line::raw(""),
        Line::raw(auth.display_name()),
        Line::raw(email.to_string()),
        Line::raw(""),
        Line::from(vec![
            Span::styled("ROLE  ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                auth.role().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
    ];
    if auth.is_admin() {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            "Press a to go to the Admin Dashboard",
            Style::default().fg(Color::Green),
        ));
    }
    let page = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Profile"));
    f.render_widget(page, area);
}

fn render_publisher(f: &mut Frame, app: &App, snapshot: &PublisherSnapshot, area: Rect) {
    let mut constraints = vec![Constraint::Length(2), Constraint::Length(3), Constraint::Min(0)];
    if snapshot.feedback.is_some() {
        constraints.insert(1, Constraint::Length(1));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let greeting = Paragraph::new(format!("WELCOME BACK, {}", app.auth.admin_name().to_uppercase()))
        .alignment(Alignment::Center)
        .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    f.render_widget(greeting, chunks[0]);

    let mut next = 1;
    if let Some(feedback) = &snapshot.feedback {
        let color = match feedback.kind {
            FeedbackKind::Success => Color::Green,
            FeedbackKind::Error => Color::Red,
        };
        let banner = Paragraph::new(feedback.message.as_str())
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Black).bg(color));
        f.render_widget(banner, chunks[next]);
        next += 1;
    }

    let focused = app.focused_publisher_field();
    let club = snapshot
        .selected_club
        .map(|club| club.name)
        .unwrap_or("-- Select a Club --");
    let selector = Paragraph::new(input_line(
        PublisherField::Club.label(),
        club,
        focused == PublisherField::Club,
        false,
    ))
    .block(Block::default().borders(Borders::ALL).title("Content Publisher"));
    f.render_widget(selector, chunks[next]);

    // Nothing else shows until a club is chosen.
    if snapshot.selected_club.is_none() {
        return;
    }

    let forms = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[next + 1]);

    let event = &snapshot.event;
    let event_inputs = [
        (PublisherField::EventTitle, event.title.as_str()),
        (PublisherField::EventDate, event.event_date.as_str()),
        (PublisherField::EventVenue, event.venue.as_str()),
        (PublisherField::EventLink, event.registration_link.as_str()),
        (PublisherField::EventDescription, event.description.as_str()),
    ];
    render_form(
        f,
        "Create New Event",
        &event_inputs,
        focused,
        snapshot.event_pending,
        forms[0],
    );

    let announcement = &snapshot.announcement;
    let announcement_inputs = [
        (PublisherField::AnnouncementTitle, announcement.title.as_str()),
        (
            PublisherField::AnnouncementDescription,
            announcement.description.as_str(),
        ),
    ];
    render_form(
        f,
        "Post Announcement",
        &announcement_inputs,
        focused,
        snapshot.announcement_pending,
        forms[1],
    );
}

fn render_form(
    f: &mut Frame,
    title: &str,
    inputs: &[(PublisherField, &str)],
    focused: PublisherField,
    pending: bool,
    area: Rect,
) {
    let mut lines: Vec<Line> = inputs
        .iter()
        .flat_map(|(field, value)| {
            [
                input_line(field.label(), "", *field == focused, false),
                Line::raw(format!("    {value}")),
            ]
        })
        .collect();
    lines.push(Line::raw(""));
    lines.push(if pending {
        Line::styled("  publishing…", Style::default().fg(Color::DarkGray))
    } else {
        Line::styled("  [ PUBLISH ]", Style::default().add_modifier(Modifier::BOLD))
    });
    let form = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(form, area);
}

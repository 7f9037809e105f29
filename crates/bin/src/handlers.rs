use clubhub::{
    auth::OAuthProvider,
    routes::{Guard, Route},
};
use crossterm::event::{KeyCode, KeyModifiers};

use crate::app::{App, PublisherField, SignInForm, SignUpForm};

/// Step a focus index forward or back through `count` fields.
fn step(index: &mut usize, count: usize, forward: bool) {
    *index = if forward {
        (*index + 1) % count
    } else {
        (*index + count - 1) % count
    };
}

pub async fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
    if modifiers.contains(KeyModifiers::CONTROL) && key == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }
    if key == KeyCode::Esc {
        app.back();
        return;
    }
    if app.guard != Guard::Render {
        if key == KeyCode::Char('q') {
            app.should_quit = true;
        }
        return;
    }

    match app.current_route() {
        Route::Landing => handle_landing(app, key),
        Route::SignIn => handle_sign_in(app, key).await,
        Route::SignUp => handle_sign_up(app, key).await,
        Route::Dashboard => handle_dashboard(app, key).await,
        Route::Profile => handle_profile(app, key).await,
        Route::AdminDashboard => handle_publisher(app, key, modifiers),
    }
}

fn handle_landing(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('s') => app.navigate(Route::SignUp),
        KeyCode::Char('i') => app.navigate(Route::SignIn),
        KeyCode::Char('d') | KeyCode::Enter => app.navigate(Route::Dashboard),
        _ => {}
    }
}

async fn handle_sign_in(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Tab | KeyCode::Down => step(&mut app.sign_in.field, SignInForm::FIELDS, true),
        KeyCode::BackTab | KeyCode::Up => step(&mut app.sign_in.field, SignInForm::FIELDS, false),
        KeyCode::Enter => app.submit_sign_in().await,
        KeyCode::F(2) => app.start_oauth(OAuthProvider::Google).await,
        KeyCode::F(3) => app.start_oauth(OAuthProvider::Github).await,
        KeyCode::F(4) => app.navigate(Route::SignUp),
        KeyCode::Backspace => {
            app.sign_in.input_mut().pop();
        }
        KeyCode::Char(c) => {
            if app.status_message.is_some() {
                app.clear_status_message();
            }
            app.sign_in.input_mut().push(c);
        }
        _ => {}
    }
}

async fn handle_sign_up(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Tab | KeyCode::Down => step(&mut app.sign_up.field, SignUpForm::FIELDS, true),
        KeyCode::BackTab | KeyCode::Up => step(&mut app.sign_up.field, SignUpForm::FIELDS, false),
        KeyCode::Enter => app.submit_sign_up().await,
        KeyCode::F(4) => app.navigate(Route::SignIn),
        KeyCode::Backspace => {
            app.sign_up.input_mut().pop();
        }
        KeyCode::Char(c) => {
            if app.status_message.is_some() {
                app.clear_status_message();
            }
            app.sign_up.input_mut().push(c);
        }
        _ => {}
    }
}

async fn handle_dashboard(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Left | KeyCode::Up | KeyCode::Char('k') => app.move_club_cursor(-1),
        KeyCode::Right | KeyCode::Down | KeyCode::Char('j') => app.move_club_cursor(1),
        KeyCode::Enter | KeyCode::Char(' ') => {
            if let Some(view) = &app.dashboard {
                view.dismiss_welcome();
            }
        }
        KeyCode::Char('h') => app.navigate(Route::Landing),
        KeyCode::Char('p') => app.navigate(Route::Profile),
        KeyCode::Char('a') => app.navigate(Route::AdminDashboard),
        KeyCode::Char('o') => app.sign_out().await,
        _ => {}
    }
}

async fn handle_profile(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('d') => app.navigate(Route::Dashboard),
        KeyCode::Char('a') if app.auth.is_admin() => app.navigate(Route::AdminDashboard),
        KeyCode::Char('o') => app.sign_out().await,
        _ => {}
    }
}

fn handle_publisher(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
    let fields = PublisherField::ORDER.len();
    match key {
        KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.navigate(Route::Dashboard)
        }
        KeyCode::Char('p') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.navigate(Route::Profile)
        }
        KeyCode::Tab | KeyCode::Down => step(&mut app.publisher_field, fields, true),
        KeyCode::BackTab | KeyCode::Up => step(&mut app.publisher_field, fields, false),
        KeyCode::Left if app.focused_publisher_field() == PublisherField::Club => {
            app.cycle_publisher_club(-1)
        }
        KeyCode::Right | KeyCode::Char(' ')
            if app.focused_publisher_field() == PublisherField::Club =>
        {
            app.cycle_publisher_club(1)
        }
        KeyCode::Enter => app.submit_publisher_form(),
        KeyCode::Backspace => app.edit_publisher_input(|input| {
            input.pop();
        }),
        KeyCode::Char(c) => app.edit_publisher_input(|input| input.push(c)),
        _ => {}
    }
}

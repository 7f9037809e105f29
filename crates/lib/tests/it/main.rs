/*! Integration tests for Clubhub.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - auth: Session resolver behaviour against the in-memory identity provider
 * - routes: Guard scenarios driven by resolved auth state
 * - dashboard: Events/announcements views and the queries they issue
 * - publisher: Admin form submission, busy refusal and feedback banners
 * - backend: In-memory persistence and the hosted REST clients against a stub server
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("clubhub=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod auth;
mod backend;
mod publisher;
mod routes;

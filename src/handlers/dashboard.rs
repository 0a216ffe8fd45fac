use crate::app::{App, Request, Response, SERVER_ERROR_MESSAGE};
use crate::db::query;
use crate::models::Work;
use crate::pages;
use crate::session::Session;

/// Lists the signed-in user's works.
pub fn dashboard(app: &App, _request: &Request, session: &mut Session) -> Response {
    let works = app.read(|conn| query(conn, &Work::for_user(session.user_email())));
    match works {
        Ok(works) => {
            let page = pages::dashboard_page(session, works);
            app.render(session, &page)
        }
        Err(e) => {
            tracing::error!("Failed to list works: {:#}", e);
            session.add_flash(SERVER_ERROR_MESSAGE);
            app.redirect_to("home")
        }
    }
}

//! Shared create/view/edit/delete flows.
//!
//! Each entity type implements [`Resource`]; the functions here do the
//! loading, ownership checks, form handling and transactions the same way
//! for all of them.

use anyhow::Result;
use rusqlite::Transaction;

use crate::app::{App, NOT_ALLOWED_MESSAGE, Request, Response, SERVER_ERROR_MESSAGE};
use crate::db::{Query, Table, delete_by_id, query_one};
use crate::forms::{Form, delete_form};
use crate::models::Owned;
use crate::pages::WebPage;
use crate::session::Session;

pub const BAD_ID_MESSAGE: &str = "Something went terribly wrong with this request, sorry.";
pub const NOT_FOUND_MESSAGE: &str = "Sorry, we couldn't find that.";

/// What the CRUD flows need to know about one entity type.
pub trait Resource {
    type Entity: Owned;

    fn load(&self, id: i64) -> Query<Self::Entity>;
    fn table(&self) -> Table;
    fn id(&self, entity: &Self::Entity) -> i64;

    /// The entity's form, with select options built for `entity` (or for a
    /// brand new one).
    fn form(&self, app: &App, session: &Session, entity: Option<&Self::Entity>) -> Result<Form>;

    /// Copies stored values into a freshly built form. Only used when
    /// showing the form; a submission replaces them wholesale.
    fn prefill(&self, form: &mut Form, entity: &Self::Entity);

    fn view_page(&self, app: &App, session: &mut Session, entity: Self::Entity) -> Result<WebPage>;

    fn edit_page(
        &self,
        session: &mut Session,
        entity: Self::Entity,
        form: Form,
        delete_form: Form,
    ) -> WebPage;

    fn new_page(&self, request: &Request, session: &mut Session, form: Form) -> WebPage;

    /// Inserts a new entity from a validated form and returns where to go.
    fn create(
        &self,
        app: &App,
        tx: &Transaction<'_>,
        request: &Request,
        form: &Form,
        email: &str,
    ) -> Result<String>;

    /// Saves a validated form over `entity` and returns where to go.
    fn update(
        &self,
        app: &App,
        tx: &Transaction<'_>,
        request: &Request,
        form: &Form,
        entity: Self::Entity,
    ) -> Result<String>;

    /// Where an invalid or failed delete goes back to.
    fn view_url(&self, app: &App, entity: &Self::Entity) -> String;

    /// Flash message and destination after a delete. May update the session.
    fn deleted(&self, app: &App, session: &mut Session, entity: &Self::Entity) -> (&'static str, String);
}

/// Loads the entity named by the path parameter and checks that the
/// signed-in user owns it.
///
/// On failure a flash is queued and the redirect to the dashboard is
/// returned as the error.
pub fn load_owned<R: Resource>(
    app: &App,
    request: &Request,
    session: &mut Session,
    resource: &R,
) -> Result<R::Entity, Response> {
    let Some(id) = request.param_id() else {
        tracing::error!("Bad object ID: {:?}", request.param);
        session.add_flash(BAD_ID_MESSAGE);
        return Err(app.redirect_to("dashboard"));
    };

    let loaded = app.read(|conn| query_one(conn, &resource.load(id)));
    let entity = match loaded {
        Ok(Some(entity)) => entity,
        Ok(None) => {
            session.add_flash(NOT_FOUND_MESSAGE);
            return Err(app.redirect_to("dashboard"));
        }
        Err(e) => {
            tracing::error!("Failed to load {} {}: {:#}", resource.table().name(), id, e);
            session.add_flash(NOT_FOUND_MESSAGE);
            return Err(app.redirect_to("dashboard"));
        }
    };

    if !entity.is_owned_by(session.user_email()) {
        tracing::warn!(
            "{:?} tried to access {} {}",
            session.user_email(),
            resource.table().name(),
            id
        );
        session.add_flash(NOT_ALLOWED_MESSAGE);
        return Err(app.redirect_to("dashboard"));
    }
    Ok(entity)
}

/// Logs an error, apologizes, and sends the user to the dashboard.
pub fn server_error(app: &App, session: &mut Session, context: &str, e: &anyhow::Error) -> Response {
    tracing::error!("{}: {:#}", context, e);
    session.add_flash(SERVER_ERROR_MESSAGE);
    app.redirect_to("dashboard")
}

pub fn crud_view<R: Resource>(
    app: &App,
    request: &Request,
    session: &mut Session,
    resource: &R,
) -> Response {
    let entity = match load_owned(app, request, session, resource) {
        Ok(entity) => entity,
        Err(response) => return response,
    };
    match resource.view_page(app, session, entity) {
        Ok(page) => app.render(session, &page),
        Err(e) => server_error(app, session, "Failed to build view page", &e),
    }
}

pub fn crud_create<R: Resource>(
    app: &App,
    request: &Request,
    session: &mut Session,
    resource: &R,
) -> Response {
    let mut form = match resource.form(app, session, None) {
        Ok(form) => form,
        Err(e) => return server_error(app, session, "Failed to build create form", &e),
    };

    if request.is_post() {
        form.populate(&request.form);
        if form.validate(&app.csrf_context(session)) {
            let email = session.user_email().to_string();
            let created = app
                .db()
                .transaction(|tx| resource.create(app, tx, request, &form, &email));
            match created {
                Ok(next) => return Response::redirect(&next),
                Err(e) => {
                    return server_error(
                        app,
                        session,
                        &format!("Failed to create {}", resource.table().name()),
                        &e,
                    );
                }
            }
        }
    }

    let page = resource.new_page(request, session, form);
    app.render(session, &page)
}

pub fn crud_edit<R: Resource>(
    app: &App,
    request: &Request,
    session: &mut Session,
    resource: &R,
) -> Response {
    let entity = match load_owned(app, request, session, resource) {
        Ok(entity) => entity,
        Err(response) => return response,
    };
    let mut form = match resource.form(app, session, Some(&entity)) {
        Ok(form) => form,
        Err(e) => return server_error(app, session, "Failed to build edit form", &e),
    };

    if !request.is_post() {
        resource.prefill(&mut form, &entity);
    } else {
        form.populate(&request.form);
        if form.validate(&app.csrf_context(session)) {
            let id = resource.id(&entity);
            let saved = app
                .db()
                .transaction(|tx| resource.update(app, tx, request, &form, entity));
            match saved {
                Ok(next) => return Response::redirect(&next),
                Err(e) => {
                    return server_error(
                        app,
                        session,
                        &format!("Failed to update {} {}", resource.table().name(), id),
                        &e,
                    );
                }
            }
        }
    }

    let delete = delete_form(resource.id(&entity), &app.csrf_token(session));
    let page = resource.edit_page(session, entity, form, delete);
    app.render(session, &page)
}

pub fn crud_delete<R: Resource>(
    app: &App,
    request: &Request,
    session: &mut Session,
    resource: &R,
) -> Response {
    let entity = match load_owned(app, request, session, resource) {
        Ok(entity) => entity,
        Err(response) => return response,
    };
    let id = resource.id(&entity);

    let mut form = delete_form(id, "");
    form.populate(&request.form);
    let valid = form.validate(&app.csrf_context(session)) && form.value("object_id") == id.to_string();
    if !valid {
        tracing::warn!("Rejected delete of {} {}", resource.table().name(), id);
        return Response::redirect(&resource.view_url(app, &entity));
    }

    match delete_by_id(app.db(), resource.table(), id) {
        Ok(true) => {
            let (flash, next) = resource.deleted(app, session, &entity);
            session.add_flash(flash);
            Response::redirect(&next)
        }
        Ok(false) => {
            tracing::error!("{} {} vanished before delete", resource.table().name(), id);
            Response::redirect(&resource.view_url(app, &entity))
        }
        Err(e) => {
            tracing::error!("Failed to delete {} {}: {:#}", resource.table().name(), id, e);
            Response::redirect(&resource.view_url(app, &entity))
        }
    }
}

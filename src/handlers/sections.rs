//! Section pages, plus reordering a work's sections.

use anyhow::Result;
use rusqlite::Transaction;

use super::crud::{self, NOT_FOUND_MESSAGE, Resource, load_owned, server_error};
use super::works::WorkResource;
use super::{apply_relation_edits, element_select, propagate_to_work};
use crate::app::{App, NOT_ALLOWED_MESSAGE, Request, Response};
use crate::db::{Query, Table, insert, query, query_one, update};
use crate::forms::{Form, section_form};
use crate::models::{
    Element, ElementKind, Owned, Relation, Section, SectionId, Work, WorkId, reorder_sections,
};
use crate::pages::{self, WebPage};
use crate::session::Session;

pub const BAD_LINK_MESSAGE: &str = "Sorry, that link must have been bad.";
pub const REORDERED_MESSAGE: &str = "OK, that's been reordered.";
pub const REORDER_FAILED_MESSAGE: &str = "Sorry, something went wrong :(";

pub struct SectionResource;

/// The `workId` query parameter, if it is a number.
fn work_id_param(request: &Request) -> Option<WorkId> {
    request.query.get("workId")?.parse().ok().map(WorkId::new)
}

impl Resource for SectionResource {
    type Entity = Section;

    fn load(&self, id: i64) -> Query<Section> {
        Section::by_id(SectionId::new(id))
    }

    fn table(&self) -> Table {
        Table::Section
    }

    fn id(&self, section: &Section) -> i64 {
        section.id.get()
    }

    fn form(&self, app: &App, session: &Session, section: Option<&Section>) -> Result<Form> {
        let email = session.user_email();
        let (characters, settings) = app.read(|conn| {
            let characters = element_select(
                conn,
                email,
                ElementKind::Character,
                section.map(|s| Element::for_section(ElementKind::Character, s.id)),
            )?;
            let settings = element_select(
                conn,
                email,
                ElementKind::Setting,
                section.map(|s| Element::for_section(ElementKind::Setting, s.id)),
            )?;
            Ok((characters, settings))
        })?;
        Ok(section_form(characters, settings, &app.csrf_token(session)))
    }

    fn prefill(&self, form: &mut Form, section: &Section) {
        form.set_value("title", &section.title);
        form.set_value("blurb", &section.blurb);
        form.set_value("body", &section.body);
        if section.is_snippet {
            form.set_value("snippet", "on");
        }
    }

    fn view_page(&self, app: &App, session: &mut Session, section: Section) -> Result<WebPage> {
        let (characters, settings) = app.read(|conn| {
            let characters = query(conn, &Element::for_section(ElementKind::Character, section.id))?;
            let settings = query(conn, &Element::for_section(ElementKind::Setting, section.id))?;
            Ok((characters, settings))
        })?;
        Ok(pages::section_view_page(session, section, characters, settings))
    }

    fn edit_page(
        &self,
        session: &mut Session,
        section: Section,
        form: Form,
        delete_form: Form,
    ) -> WebPage {
        pages::section_edit_page(session, section, form, delete_form)
    }

    fn new_page(&self, request: &Request, session: &mut Session, form: Form) -> WebPage {
        let work_id = work_id_param(request).unwrap_or_default();
        pages::section_new_page(session, work_id, form)
    }

    fn create(
        &self,
        app: &App,
        tx: &Transaction<'_>,
        request: &Request,
        form: &Form,
        email: &str,
    ) -> Result<String> {
        let work_id = work_id_param(request)
            .ok_or_else(|| anyhow::anyhow!("New section without a work id"))?;
        let section = Section::new(
            form.value("title"),
            form.value("blurb"),
            form.value("body"),
            work_id,
            email,
            form.checked("snippet"),
        );
        let id = insert(tx, &section)?;
        apply_relation_edits(tx, &request.form, email, id, Relation::for_section)?;
        propagate_to_work(tx, &request.form, email, work_id.get())?;
        Ok(format!("{}{}", app.url_for("work_view"), work_id))
    }

    fn update(
        &self,
        app: &App,
        tx: &Transaction<'_>,
        request: &Request,
        form: &Form,
        mut section: Section,
    ) -> Result<String> {
        section.title = form.value("title").to_string();
        section.blurb = form.value("blurb").to_string();
        section.set_body(form.value("body"));
        section.is_snippet = form.checked("snippet");
        update(tx, &section)?;
        let email = section.user_email.as_str();
        apply_relation_edits(tx, &request.form, email, section.id.get(), Relation::for_section)?;
        propagate_to_work(tx, &request.form, email, section.work_id.get())?;
        Ok(self.view_url(app, &section))
    }

    fn view_url(&self, app: &App, section: &Section) -> String {
        format!("{}{}", app.url_for("section_view"), section.id)
    }

    fn deleted(&self, app: &App, _session: &mut Session, section: &Section) -> (&'static str, String) {
        (
            "Alright, I got rid of that section for you.",
            format!("{}{}", app.url_for("work_view"), section.work_id),
        )
    }
}

pub fn view(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_view(app, request, session, &SectionResource)
}

/// `/section/new?workId=`. The work must exist and belong to the user.
pub fn new(app: &App, request: &Request, session: &mut Session) -> Response {
    let Some(work_id) = work_id_param(request) else {
        session.add_flash(BAD_LINK_MESSAGE);
        return app.redirect_to("dashboard");
    };

    let work = app.read(|conn| query_one(conn, &Work::by_id(work_id)));
    match work {
        Ok(Some(work)) if work.is_owned_by(session.user_email()) => {
            crud::crud_create(app, request, session, &SectionResource)
        }
        Ok(Some(_)) => {
            session.add_flash(NOT_ALLOWED_MESSAGE);
            app.redirect_to("dashboard")
        }
        Ok(None) => {
            session.add_flash(NOT_FOUND_MESSAGE);
            app.redirect_to("dashboard")
        }
        Err(e) => server_error(app, session, "Failed to load work for new section", &e),
    }
}

pub fn edit(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_edit(app, request, session, &SectionResource)
}

pub fn delete(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_delete(app, request, session, &SectionResource)
}

/// `/work/reorder/{id}`: applies a `section-order` submission.
pub fn reorder(app: &App, request: &Request, session: &mut Session) -> Response {
    let work = match load_owned(app, request, session, &WorkResource) {
        Ok(work) => work,
        Err(response) => return response,
    };

    let raw_order = request.form.value("section-order");
    if request.is_post() && raw_order.is_empty() {
        tracing::warn!("Empty reorder submitted for work {}", work.id);
        session.add_flash(REORDER_FAILED_MESSAGE);
    } else if request.is_post() {
        let reordered = app
            .db()
            .transaction(|tx| Ok(reorder_sections(tx, raw_order, work.id)?));
        match reordered {
            Ok(count) => {
                tracing::info!("Reordered {} sections of work {}", count, work.id);
                session.add_flash(REORDERED_MESSAGE);
                return Response::redirect(&format!("{}{}", app.url_for("work_view"), work.id));
            }
            Err(e) => {
                tracing::error!("Failed to reorder work {}: {:#}", work.id, e);
                session.add_flash(REORDER_FAILED_MESSAGE);
            }
        }
    }

    match app.read(|conn| query(conn, &Section::for_work(work.id))) {
        Ok(sections) => {
            let page = pages::work_reorder_page(session, work, sections);
            app.render(session, &page)
        }
        Err(e) => server_error(app, session, "Failed to load sections for reorder", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_id_param_requires_a_number() {
        assert_eq!(work_id_param(&Request::get("/section/new?workId=7")), Some(WorkId::new(7)));
        assert_eq!(work_id_param(&Request::get("/section/new?workId=seven")), None);
        assert_eq!(work_id_param(&Request::get("/section/new")), None);
    }
}

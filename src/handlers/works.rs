//! Work pages: view, create, edit, delete and export.

use anyhow::Result;
use rusqlite::Transaction;

use super::crud::{self, Resource, load_owned, server_error};
use super::{apply_relation_edits, element_select};
use crate::app::{App, Request, Response};
use crate::db::{Query, Table, insert, query, update};
use crate::forms::{Form, work_form};
use crate::models::{Element, ElementKind, Relation, Section, Work, WorkId};
use crate::pages::{self, WebPage, WorkDetail};
use crate::session::Session;

pub struct WorkResource;

impl Resource for WorkResource {
    type Entity = Work;

    fn load(&self, id: i64) -> Query<Work> {
        Work::by_id(WorkId::new(id))
    }

    fn table(&self) -> Table {
        Table::Work
    }

    fn id(&self, work: &Work) -> i64 {
        work.id.get()
    }

    fn form(&self, app: &App, session: &Session, work: Option<&Work>) -> Result<Form> {
        let email = session.user_email();
        let (characters, settings) = app.read(|conn| {
            let characters = element_select(
                conn,
                email,
                ElementKind::Character,
                work.map(|w| Element::for_work(ElementKind::Character, w.id)),
            )?;
            let settings = element_select(
                conn,
                email,
                ElementKind::Setting,
                work.map(|w| Element::for_work(ElementKind::Setting, w.id)),
            )?;
            Ok((characters, settings))
        })?;
        Ok(work_form(characters, settings, &app.csrf_token(session)))
    }

    fn prefill(&self, form: &mut Form, work: &Work) {
        form.set_value("title", &work.title);
        form.set_value("blurb", &work.blurb);
    }

    fn view_page(&self, app: &App, session: &mut Session, work: Work) -> Result<WebPage> {
        let detail = app.read(|conn| {
            let sections = query(conn, &Section::for_work(work.id))?;
            let characters = query(conn, &Element::for_work(ElementKind::Character, work.id))?;
            let settings = query(conn, &Element::for_work(ElementKind::Setting, work.id))?;
            Ok(WorkDetail::new(work, sections, characters, settings))
        })?;
        Ok(pages::work_view_page(session, detail))
    }

    fn edit_page(&self, session: &mut Session, work: Work, form: Form, delete_form: Form) -> WebPage {
        pages::work_edit_page(session, work, form, delete_form)
    }

    fn new_page(&self, _request: &Request, session: &mut Session, form: Form) -> WebPage {
        pages::work_new_page(session, form)
    }

    fn create(
        &self,
        app: &App,
        tx: &Transaction<'_>,
        request: &Request,
        form: &Form,
        email: &str,
    ) -> Result<String> {
        let work = Work::new(form.value("title"), form.value("blurb"), email);
        let id = insert(tx, &work)?;
        apply_relation_edits(tx, &request.form, email, id, Relation::for_work)?;
        tracing::info!("Created work {} for {}", id, email);
        Ok(format!("{}{}", app.url_for("work_view"), id))
    }

    fn update(
        &self,
        app: &App,
        tx: &Transaction<'_>,
        request: &Request,
        form: &Form,
        mut work: Work,
    ) -> Result<String> {
        work.title = form.value("title").to_string();
        work.blurb = form.value("blurb").to_string();
        update(tx, &work)?;
        apply_relation_edits(
            tx,
            &request.form,
            &work.user_email,
            work.id.get(),
            Relation::for_work,
        )?;
        Ok(self.view_url(app, &work))
    }

    fn view_url(&self, app: &App, work: &Work) -> String {
        format!("{}{}", app.url_for("work_view"), work.id)
    }

    fn deleted(&self, app: &App, session: &mut Session, _work: &Work) -> (&'static str, String) {
        session.unset_current_work();
        ("That work is no more.", app.url_for("dashboard").to_string())
    }
}

pub fn view(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_view(app, request, session, &WorkResource)
}

pub fn new(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_create(app, request, session, &WorkResource)
}

pub fn edit(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_edit(app, request, session, &WorkResource)
}

pub fn delete(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_delete(app, request, session, &WorkResource)
}

/// The whole work on one printable page.
pub fn export(app: &App, request: &Request, session: &mut Session) -> Response {
    let work = match load_owned(app, request, session, &WorkResource) {
        Ok(work) => work,
        Err(response) => return response,
    };

    let detail = app.read(|conn| {
        let sections = query(conn, &Section::for_work_export(work.id))?;
        let characters = query(conn, &Element::for_work_export(ElementKind::Character, work.id))?;
        let settings = query(conn, &Element::for_work_export(ElementKind::Setting, work.id))?;
        Ok(WorkDetail::new(work, sections, characters, settings))
    });
    match detail {
        Ok(detail) => {
            let page = pages::work_export_page(session, detail);
            app.render(session, &page)
        }
        Err(e) => server_error(app, session, "Failed to export work", &e),
    }
}

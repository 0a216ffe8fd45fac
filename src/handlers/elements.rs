//! Character and setting pages. Both kinds share one implementation.

use anyhow::{Result, bail};
use rusqlite::Transaction;

use super::crud::{self, Resource, server_error};
use crate::app::{App, Request, Response};
use crate::db::{Query, Table, insert, query, query_one, update};
use crate::forms::{Form, element_form};
use crate::models::{
    Element, ElementId, ElementKind, Owned, Relation, RelationUpdate, Section, Work, WorkId,
    update_relations,
};
use crate::pages::{self, WebPage};
use crate::session::Session;

pub const DELETED_MESSAGE: &str = "OK, that guy won't bother you any more.";

pub struct ElementResource {
    kind: ElementKind,
}

impl ElementResource {
    pub fn new(kind: ElementKind) -> Self {
        Self { kind }
    }

    fn url(&self, app: &App, action: &str) -> &'static str {
        app.url_for(&format!("{}_{}", self.kind.name(), action))
    }
}

/// `workId` from the query string; zero when absent or not a number.
fn work_id_param(request: &Request) -> WorkId {
    request
        .query
        .get("workId")
        .and_then(|id| id.parse().ok())
        .map(WorkId::new)
        .unwrap_or_default()
}

impl Resource for ElementResource {
    type Entity = Element;

    fn load(&self, id: i64) -> Query<Element> {
        Element::by_id(self.kind, ElementId::new(id))
    }

    fn table(&self) -> Table {
        self.kind.table()
    }

    fn id(&self, element: &Element) -> i64 {
        element.id.get()
    }

    fn form(&self, app: &App, session: &Session, _element: Option<&Element>) -> Result<Form> {
        Ok(element_form(self.kind, &app.csrf_token(session)))
    }

    fn prefill(&self, form: &mut Form, element: &Element) {
        form.set_value("name", &element.name);
        form.set_value("blurb", &element.blurb);
        form.set_value("body", &element.body);
    }

    fn view_page(&self, app: &App, session: &mut Session, element: Element) -> Result<WebPage> {
        let (works, sections) = app.read(|conn| {
            let works = query(conn, &Work::for_element(self.kind, element.id))?;
            let sections = query(conn, &Section::for_element(self.kind, element.id))?;
            Ok((works, sections))
        })?;
        Ok(pages::element_view_page(session, element, works, sections))
    }

    fn edit_page(
        &self,
        session: &mut Session,
        element: Element,
        form: Form,
        delete_form: Form,
    ) -> WebPage {
        pages::element_edit_page(session, element, form, delete_form)
    }

    fn new_page(&self, request: &Request, session: &mut Session, form: Form) -> WebPage {
        pages::element_new_page(session, self.kind, work_id_param(request), form)
    }

    /// Inserts the element and, when created from a work page, links it to
    /// that work.
    fn create(
        &self,
        app: &App,
        tx: &Transaction<'_>,
        request: &Request,
        form: &Form,
        email: &str,
    ) -> Result<String> {
        let element = Element::new(
            self.kind,
            form.value("name"),
            form.value("blurb"),
            form.value("body"),
            email,
        );
        let id = insert(tx, &element)?;
        tracing::info!("Created {} {} for {}", self.kind, id, email);

        let work_id = work_id_param(request);
        if work_id.get() == 0 {
            return Ok(self.url(app, "index").to_string());
        }

        match query_one(tx, &Work::by_id(work_id))? {
            Some(work) if work.is_owned_by(email) => {}
            _ => bail!("{} may not link a {} to work {}", email, self.kind, work_id),
        }
        update_relations(
            tx,
            &RelationUpdate::additions_only(Relation::for_work(self.kind), work_id.get(), vec![id]),
        )?;
        Ok(format!("{}{}", app.url_for("work_view"), work_id))
    }

    fn update(
        &self,
        app: &App,
        tx: &Transaction<'_>,
        _request: &Request,
        form: &Form,
        mut element: Element,
    ) -> Result<String> {
        element.name = form.value("name").to_string();
        element.blurb = form.value("blurb").to_string();
        element.body = form.value("body").to_string();
        update(tx, &element)?;
        Ok(self.view_url(app, &element))
    }

    fn view_url(&self, app: &App, element: &Element) -> String {
        format!("{}{}", self.url(app, "view"), element.id)
    }

    fn deleted(&self, app: &App, _session: &mut Session, _element: &Element) -> (&'static str, String) {
        (DELETED_MESSAGE, self.url(app, "index").to_string())
    }
}

/// Every element of one kind the user has written.
fn index(app: &App, session: &mut Session, kind: ElementKind) -> Response {
    let email = session.user_email().to_string();
    match app.read(|conn| query(conn, &Element::for_user(kind, &email))) {
        Ok(elements) => {
            let page = pages::element_index_page(session, kind, elements);
            app.render(session, &page)
        }
        Err(e) => server_error(app, session, &format!("Failed to list {}s", kind), &e),
    }
}

pub fn character_new(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_create(app, request, session, &ElementResource::new(ElementKind::Character))
}

pub fn character_view(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_view(app, request, session, &ElementResource::new(ElementKind::Character))
}

pub fn character_edit(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_edit(app, request, session, &ElementResource::new(ElementKind::Character))
}

pub fn character_index(app: &App, _request: &Request, session: &mut Session) -> Response {
    index(app, session, ElementKind::Character)
}

pub fn character_delete(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_delete(app, request, session, &ElementResource::new(ElementKind::Character))
}

pub fn setting_new(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_create(app, request, session, &ElementResource::new(ElementKind::Setting))
}

pub fn setting_view(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_view(app, request, session, &ElementResource::new(ElementKind::Setting))
}

pub fn setting_edit(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_edit(app, request, session, &ElementResource::new(ElementKind::Setting))
}

pub fn setting_index(app: &App, _request: &Request, session: &mut Session) -> Response {
    index(app, session, ElementKind::Setting)
}

pub fn setting_delete(app: &App, request: &Request, session: &mut Session) -> Response {
    crud::crud_delete(app, request, session, &ElementResource::new(ElementKind::Setting))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_work_id_means_no_work() {
        assert_eq!(work_id_param(&Request::get("/setting/new")), WorkId::new(0));
        assert_eq!(work_id_param(&Request::get("/setting/new?workId=x")), WorkId::new(0));
        assert_eq!(work_id_param(&Request::get("/setting/new?workId=3")), WorkId::new(3));
    }
}

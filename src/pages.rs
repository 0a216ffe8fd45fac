//! View-models for every page.
//!
//! Builders here take already-loaded entities, arrange them for display
//! (sorting, grouping, splitting snippets out), and drain the session's
//! flash messages into the page. Turning a [`WebPage`] into HTML is the job
//! of [`crate::render`].

use crate::forms::Form;
use crate::models::{Element, ElementKind, Section, Work, WorkId, split_sections};
use crate::session::Session;

/// Everything a page template needs.
#[derive(Debug, Clone)]
pub struct WebPage {
    pub title: String,
    pub headline: String,
    pub flashes: Vec<String>,
    /// Signed-in user's email, empty when anonymous.
    pub user_email: String,
    pub current_work: Option<(WorkId, String)>,
    pub form: Option<Form>,
    pub delete_form: Option<Form>,
    pub content: PageContent,
}

/// The page-specific payload.
#[derive(Debug, Clone)]
pub enum PageContent {
    Home,
    About,
    Contact,
    RequestReset,
    ResetPassword {
        token: String,
    },
    Dashboard {
        works: Vec<Work>,
    },
    WorkView(WorkDetail),
    WorkEdit {
        /// `None` while creating.
        work: Option<Work>,
    },
    WorkExport(WorkDetail),
    WorkReorder {
        work: Work,
        sections: Vec<Section>,
    },
    SectionView {
        section: Section,
        characters: Vec<Element>,
        settings: Vec<Element>,
    },
    SectionEdit {
        /// `None` while creating.
        section: Option<Section>,
        work_id: WorkId,
    },
    ElementView {
        element: Element,
        sections_by_work: Vec<(Work, Vec<Section>)>,
    },
    ElementEdit {
        kind: ElementKind,
        /// `None` while creating.
        element: Option<Element>,
        work_id: WorkId,
    },
    ElementIndex {
        kind: ElementKind,
        elements: Vec<Element>,
    },
}

/// A work with its sections split from its snippets and its elements sorted
/// by name.
#[derive(Debug, Clone)]
pub struct WorkDetail {
    pub work: Work,
    pub sections: Vec<Section>,
    pub snippets: Vec<Section>,
    pub characters: Vec<Element>,
    pub settings: Vec<Element>,
}

impl WorkDetail {
    pub fn new(
        work: Work,
        sections: Vec<Section>,
        mut characters: Vec<Element>,
        mut settings: Vec<Element>,
    ) -> Self {
        let (sections, snippets) = split_sections(sections);
        sort_by_name(&mut characters);
        sort_by_name(&mut settings);
        Self {
            work,
            sections,
            snippets,
            characters,
            settings,
        }
    }

    /// Total words across ordered sections.
    pub fn word_count(&self) -> i64 {
        self.sections.iter().map(|section| section.word_count).sum()
    }
}

impl WebPage {
    fn new(session: &mut Session, title: impl Into<String>, content: PageContent) -> Self {
        let (work_id, work_title) = session.current_work();
        let current_work = (work_id.get() != 0).then(|| (work_id, work_title.to_string()));
        Self {
            title: title.into(),
            headline: String::new(),
            flashes: session.take_flashes(),
            user_email: session.user_email().to_string(),
            current_work,
            form: None,
            delete_form: None,
            content,
        }
    }

    fn with_headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = headline.into();
        self
    }

    fn with_form(mut self, form: Form) -> Self {
        self.form = Some(form);
        self
    }

    fn with_delete_form(mut self, form: Form) -> Self {
        self.delete_form = Some(form);
        self
    }
}

fn sort_by_name(elements: &mut [Element]) {
    elements.sort_by(|a, b| a.name.cmp(&b.name));
}

pub fn home_page(session: &mut Session, signup: Form) -> WebPage {
    WebPage::new(session, "Home", PageContent::Home).with_form(signup)
}

pub fn about_page(session: &mut Session) -> WebPage {
    WebPage::new(session, "About", PageContent::About)
}

pub fn contact_page(session: &mut Session, form: Form) -> WebPage {
    WebPage::new(session, "Contact", PageContent::Contact).with_form(form)
}

pub fn request_reset_page(session: &mut Session, form: Form) -> WebPage {
    WebPage::new(session, "Reset password", PageContent::RequestReset).with_form(form)
}

pub fn reset_password_page(session: &mut Session, form: Form, token: &str) -> WebPage {
    WebPage::new(
        session,
        "Choose a new password",
        PageContent::ResetPassword {
            token: token.to_string(),
        },
    )
    .with_form(form)
}

pub fn dashboard_page(session: &mut Session, works: Vec<Work>) -> WebPage {
    WebPage::new(session, "Dashboard", PageContent::Dashboard { works })
}

/// Viewing a work also makes it the session's current work.
pub fn work_view_page(session: &mut Session, detail: WorkDetail) -> WebPage {
    session.set_current_work(detail.work.id, &detail.work.title);
    let title = format!("View work: {}", detail.work.title);
    WebPage::new(session, title, PageContent::WorkView(detail))
}

pub fn work_edit_page(session: &mut Session, work: Work, form: Form, delete_form: Form) -> WebPage {
    let title = format!("Edit work: {}", work.title);
    let headline = work.title.clone();
    WebPage::new(session, title, PageContent::WorkEdit { work: Some(work) })
        .with_headline(headline)
        .with_form(form)
        .with_delete_form(delete_form)
}

pub fn work_new_page(session: &mut Session, form: Form) -> WebPage {
    WebPage::new(session, "Add a work", PageContent::WorkEdit { work: None })
        .with_headline("How exciting! You're starting a new work.")
        .with_form(form)
}

pub fn work_export_page(session: &mut Session, detail: WorkDetail) -> WebPage {
    let title = detail.work.title.clone();
    WebPage::new(session, title.clone(), PageContent::WorkExport(detail)).with_headline(title)
}

pub fn work_reorder_page(session: &mut Session, work: Work, sections: Vec<Section>) -> WebPage {
    let (sections, _) = split_sections(sections);
    let title = format!("Reorder sections for {}", work.title);
    WebPage::new(session, title, PageContent::WorkReorder { work, sections })
}

pub fn section_view_page(
    session: &mut Session,
    section: Section,
    mut characters: Vec<Element>,
    mut settings: Vec<Element>,
) -> WebPage {
    sort_by_name(&mut characters);
    sort_by_name(&mut settings);
    let title = format!("View section: {}", section.title);
    WebPage::new(
        session,
        title,
        PageContent::SectionView {
            section,
            characters,
            settings,
        },
    )
}

pub fn section_edit_page(
    session: &mut Session,
    section: Section,
    form: Form,
    delete_form: Form,
) -> WebPage {
    let title = format!("Edit section: {}", section.title);
    let work_id = section.work_id;
    WebPage::new(
        session,
        title,
        PageContent::SectionEdit {
            section: Some(section),
            work_id,
        },
    )
    .with_form(form)
    .with_delete_form(delete_form)
}

pub fn section_new_page(session: &mut Session, work_id: WorkId, form: Form) -> WebPage {
    WebPage::new(
        session,
        "New section",
        PageContent::SectionEdit {
            section: None,
            work_id,
        },
    )
    .with_form(form)
}

/// Groups the element's sections under the works they belong to. Works with
/// no tagged section still appear, with an empty list.
pub fn element_view_page(
    session: &mut Session,
    element: Element,
    works: Vec<Work>,
    sections: Vec<Section>,
) -> WebPage {
    let sections_by_work = works
        .into_iter()
        .map(|work| {
            let mut in_work: Vec<Section> = sections
                .iter()
                .filter(|section| section.work_id == work.id)
                .cloned()
                .collect();
            in_work.sort_by_key(|section| section.order.unwrap_or(0));
            (work, in_work)
        })
        .collect();
    let name = element.name.clone();
    WebPage::new(
        session,
        name.clone(),
        PageContent::ElementView {
            element,
            sections_by_work,
        },
    )
    .with_headline(name)
}

pub fn element_edit_page(
    session: &mut Session,
    element: Element,
    form: Form,
    delete_form: Form,
) -> WebPage {
    let name = element.name.clone();
    let kind = element.kind;
    WebPage::new(
        session,
        name.clone(),
        PageContent::ElementEdit {
            kind,
            element: Some(element),
            work_id: WorkId::default(),
        },
    )
    .with_headline(name)
    .with_form(form)
    .with_delete_form(delete_form)
}

pub fn element_new_page(
    session: &mut Session,
    kind: ElementKind,
    work_id: WorkId,
    form: Form,
) -> WebPage {
    let (title, headline) = match kind {
        ElementKind::Character => ("Add a character", "You must be the new guy."),
        ElementKind::Setting => ("Add a setting", "So tell me about this place."),
    };
    WebPage::new(
        session,
        title,
        PageContent::ElementEdit {
            kind,
            element: None,
            work_id,
        },
    )
    .with_headline(headline)
    .with_form(form)
}

pub fn element_index_page(
    session: &mut Session,
    kind: ElementKind,
    mut elements: Vec<Element>,
) -> WebPage {
    sort_by_name(&mut elements);
    let (title, headline) = match kind {
        ElementKind::Character => ("Characters index", "Here are some folks you wrote"),
        ElementKind::Setting => ("Settings index", "Oh the places your stories will go!"),
    };
    WebPage::new(session, title, PageContent::ElementIndex { kind, elements })
        .with_headline(headline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementId, SectionId};

    fn section(id: i64, work: i64, order: Option<i64>, snippet: bool) -> Section {
        Section {
            id: SectionId::new(id),
            work_id: WorkId::new(work),
            order,
            is_snippet: snippet,
            word_count: 10,
            title: format!("s{id}"),
            ..Section::default()
        }
    }

    fn work(id: i64, title: &str) -> Work {
        Work {
            id: WorkId::new(id),
            title: title.to_string(),
            ..Work::default()
        }
    }

    fn character(id: i64, name: &str) -> Element {
        let mut element = Element::new(ElementKind::Character, name, "", "", "a@b.com");
        element.id = ElementId::new(id);
        element
    }

    #[test]
    fn pages_drain_flashes() {
        let mut session = Session::new();
        session.add_flash("hello");

        let page = about_page(&mut session);
        assert_eq!(page.flashes, vec!["hello"]);
        assert!(about_page(&mut session).flashes.is_empty());
    }

    #[test]
    fn work_view_sets_current_work_and_splits_sections() {
        let mut session = Session::new();
        let detail = WorkDetail::new(
            work(3, "Dune"),
            vec![
                section(1, 3, Some(2), false),
                section(2, 3, None, true),
                section(3, 3, Some(1), false),
            ],
            vec![character(1, "Paul"), character(2, "Chani")],
            vec![],
        );

        let page = work_view_page(&mut session, detail);
        assert_eq!(page.title, "View work: Dune");
        assert_eq!(page.current_work, Some((WorkId::new(3), "Dune".to_string())));

        let PageContent::WorkView(detail) = page.content else {
            panic!("expected a work view");
        };
        let ids: Vec<i64> = detail.sections.iter().map(|s| s.id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(detail.snippets.len(), 1);
        assert_eq!(detail.characters[0].name, "Chani");
        assert_eq!(detail.word_count(), 20);
    }

    #[test]
    fn element_view_groups_sections_by_work() {
        let mut session = Session::new();
        let page = element_view_page(
            &mut session,
            character(1, "Paul"),
            vec![work(1, "Dune"), work(2, "Messiah")],
            vec![
                section(10, 2, Some(1), false),
                section(11, 1, Some(5), false),
                section(12, 1, Some(2), false),
            ],
        );

        let PageContent::ElementView { sections_by_work, .. } = page.content else {
            panic!("expected an element view");
        };
        assert_eq!(sections_by_work[0].0.title, "Dune");
        let ids: Vec<i64> = sections_by_work[0].1.iter().map(|s| s.id.get()).collect();
        assert_eq!(ids, vec![12, 11]);
        assert_eq!(sections_by_work[1].1.len(), 1);
    }

    #[test]
    fn new_element_pages_use_kind_wording() {
        let mut session = Session::new();
        let page = element_new_page(
            &mut session,
            ElementKind::Character,
            WorkId::default(),
            Form::default(),
        );

        assert_eq!(page.title, "Add a character");
        assert_eq!(page.headline, "You must be the new guy.");
    }
}

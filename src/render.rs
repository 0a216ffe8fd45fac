//! HTML output for [`WebPage`]s.
//!
//! Pages are written straight into a `String` through `fmt::Write`. Every
//! piece of user-supplied text goes through [`escape`].

use std::fmt::{self, Write};

use thiserror::Error;

use crate::forms::Form;
use crate::models::{Element, ElementKind, Section, Work, WorkId};
use crate::pages::{PageContent, WebPage, WorkDetail};
use crate::routes::Routes;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Formatting failed: {0}")]
    Format(#[from] fmt::Error),

    #[error("Form has no field {0:?}")]
    MissingField(String),

    #[error("Page {0:?} was built without its form")]
    MissingForm(String),

    #[error("No route named {0:?}")]
    UnknownRoute(String),
}

/// Escapes text for use in element content and quoted attributes.
///
/// # Examples
///
/// ```
/// use pathfork::render::escape;
///
/// assert_eq!(escape(r#"<b>"Tom" & 'Jerry'</b>"#),
///     "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
/// ```
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders pages, resolving links through the route table.
pub struct Renderer<'a> {
    routes: &'a Routes,
}

impl<'a> Renderer<'a> {
    pub fn new(routes: &'a Routes) -> Self {
        Self { routes }
    }

    pub fn render(&self, page: &WebPage) -> Result<String, RenderError> {
        let mut body = String::new();
        match &page.content {
            PageContent::Home => self.home(&mut body, page)?,
            PageContent::About => about(&mut body)?,
            PageContent::Contact => {
                let action = self.url("contact")?;
                self.simple_form(&mut body, page, action, &["email"], Some("message"), "Send")?;
            }
            PageContent::RequestReset => {
                let action = format!("{}?action=request-reset", self.url("reset")?);
                self.simple_form(&mut body, page, &action, &["email"], None, "Send reset link")?;
            }
            PageContent::ResetPassword { token } => {
                let action = format!("{}?action=reset&token={}", self.url("reset")?, token);
                self.simple_form(
                    &mut body,
                    page,
                    &action,
                    &["newPassword", "repeatPassword"],
                    None,
                    "Reset password",
                )?;
            }
            PageContent::Dashboard { works } => self.dashboard(&mut body, works)?,
            PageContent::WorkView(detail) => self.work_view(&mut body, detail)?,
            PageContent::WorkEdit { work } => self.work_edit(&mut body, page, work.as_ref())?,
            PageContent::WorkExport(detail) => return self.work_export(page, detail),
            PageContent::WorkReorder { work, sections } => {
                self.work_reorder(&mut body, work, sections)?
            }
            PageContent::SectionView {
                section,
                characters,
                settings,
            } => self.section_view(&mut body, section, characters, settings)?,
            PageContent::SectionEdit { section, work_id } => {
                self.section_edit(&mut body, page, section.as_ref(), *work_id)?
            }
            PageContent::ElementView {
                element,
                sections_by_work,
            } => self.element_view(&mut body, element, sections_by_work)?,
            PageContent::ElementEdit {
                kind,
                element,
                work_id,
            } => self.element_edit(&mut body, page, *kind, element.as_ref(), *work_id)?,
            PageContent::ElementIndex { kind, elements } => {
                self.element_index(&mut body, *kind, elements)?
            }
        }
        self.layout(page, &body)
    }

    fn url(&self, name: &str) -> Result<&'static str, RenderError> {
        self.routes
            .url_for(name)
            .ok_or_else(|| RenderError::UnknownRoute(name.to_string()))
    }

    fn layout(&self, page: &WebPage, body: &str) -> Result<String, RenderError> {
        let mut out = String::new();
        write!(
            out,
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{} | Pathfork</title>
<link rel="stylesheet" href="/static/css/bootstrap.min.css">
<link rel="stylesheet" href="/static/css/chosen.min.css">
<link rel="stylesheet" href="/static/css/pathfork.css">
</head>
<body>
"#,
            escape(&page.title)
        )?;
        self.nav(&mut out, page)?;
        out.push_str(r#"<div class="container">"#);
        for flash in &page.flashes {
            write!(out, r#"<div class="alert alert-info">{}</div>"#, escape(flash))?;
        }
        if !page.headline.is_empty() {
            write!(out, "<h1>{}</h1>", escape(&page.headline))?;
        }
        out.push_str(body);
        out.push_str(
            r#"</div>
<footer class="footer"><div class="container"><a href="/about">About</a> &middot; <a href="/contact">Contact</a></div></footer>
<script src="/static/js/jquery.min.js"></script>
<script src="/static/js/chosen.jquery.min.js"></script>
<script src="/static/js/pathfork.js"></script>
</body>
</html>
"#,
        );
        Ok(out)
    }

    fn nav(&self, out: &mut String, page: &WebPage) -> Result<(), RenderError> {
        write!(
            out,
            r#"<nav class="navbar navbar-default"><div class="container"><a class="navbar-brand" href="{}">Pathfork</a><ul class="nav navbar-nav">"#,
            self.url("home")?
        )?;
        if page.user_email.is_empty() {
            out.push_str("</ul>");
            write!(
                out,
                r#"<form class="navbar-form navbar-right" method="post" action="{}?action=login"><input class="form-control" type="email" name="email" placeholder="Email"> <input class="form-control" type="password" name="password" placeholder="Password"> <button class="btn btn-default" type="submit">Log in</button> <a href="{}?action=request-reset">Forgot password?</a></form>"#,
                self.url("auth")?,
                self.url("reset")?
            )?;
        } else {
            write!(
                out,
                r#"<li><a href="{}">Dashboard</a></li><li><a href="{}">Characters</a></li><li><a href="{}">Settings</a></li>"#,
                self.url("dashboard")?,
                self.url("character_index")?,
                self.url("setting_index")?
            )?;
            if let Some((id, title)) = &page.current_work {
                write!(
                    out,
                    r#"<li><a href="{}{}">{}</a></li>"#,
                    self.url("work_view")?,
                    id,
                    escape(title)
                )?;
            }
            write!(
                out,
                r#"</ul><ul class="nav navbar-nav navbar-right"><li><a href="{}?action=logout">Log out</a></li></ul>"#,
                self.url("auth")?
            )?;
        }
        out.push_str("</div></nav>");
        Ok(())
    }

    fn home(&self, out: &mut String, page: &WebPage) -> Result<(), RenderError> {
        out.push_str(
            "<p class=\"lead\">Pathfork keeps your works, their sections and snippets, and the \
             characters and settings that move through them in one place.</p>",
        );
        if !page.user_email.is_empty() {
            write!(
                out,
                r#"<p><a class="btn btn-primary" href="{}">Go to your dashboard</a></p>"#,
                self.url("dashboard")?
            )?;
            return Ok(());
        }
        out.push_str("<h2>Sign up</h2>");
        let action = self.url("home")?;
        self.simple_form(
            out,
            page,
            action,
            &["email", "password", "repeatPassword"],
            None,
            "Sign up",
        )
    }

    /// A form of plain fields, plus an optional text area, and a submit button.
    fn simple_form(
        &self,
        out: &mut String,
        page: &WebPage,
        action: &str,
        fields: &[&str],
        text_area: Option<&str>,
        submit: &str,
    ) -> Result<(), RenderError> {
        let form = page_form(page)?;
        open_form(out, action, form)?;
        for name in fields {
            wrap_field(out, form, name)?;
        }
        if let Some(name) = text_area {
            wrap_text_area(out, form, name, 10, 80)?;
        }
        close_form(out, submit)
    }

    fn dashboard(&self, out: &mut String, works: &[Work]) -> Result<(), RenderError> {
        out.push_str("<h2>Your works</h2>");
        if works.is_empty() {
            out.push_str("<p>Nothing here yet.</p>");
        } else {
            out.push_str(r#"<ul class="works">"#);
            for work in works {
                self.work_item(out, work)?;
            }
            out.push_str("</ul>");
        }
        write!(
            out,
            r#"<p><a class="btn btn-primary" href="{}">Start a new work</a></p>"#,
            self.url("work_new")?
        )?;
        Ok(())
    }

    fn work_item(&self, out: &mut String, work: &Work) -> Result<(), RenderError> {
        write!(
            out,
            r#"<li><a href="{}{}">{}</a>"#,
            self.url("work_view")?,
            work.id,
            escape(&work.title)
        )?;
        if !work.blurb.is_empty() {
            write!(out, r#" <span class="blurb">{}</span>"#, escape(&work.blurb))?;
        }
        out.push_str("</li>");
        Ok(())
    }

    fn work_view(&self, out: &mut String, detail: &WorkDetail) -> Result<(), RenderError> {
        let work = &detail.work;
        write!(out, "<h1>{}</h1>", escape(&work.title))?;
        if !work.blurb.is_empty() {
            write!(out, r#"<p class="blurb">{}</p>"#, escape(&work.blurb))?;
        }
        write!(
            out,
            r#"<p class="actions"><a href="{edit}{id}">Edit</a> &middot; <a href="{reorder}{id}">Reorder sections</a> &middot; <a href="{export}{id}">Export</a> &middot; <a href="{new}?workId={id}">New section</a></p>"#,
            edit = self.url("work_edit")?,
            reorder = self.url("work_reorder")?,
            export = self.url("work_export")?,
            new = self.url("section_new")?,
            id = work.id
        )?;
        write!(out, "<p>{} words</p>", detail.word_count())?;

        out.push_str("<h2>Sections</h2>");
        self.section_list(out, &detail.sections, true)?;
        out.push_str("<h2>Snippets</h2>");
        self.section_list(out, &detail.snippets, false)?;

        for (kind, elements) in [
            (ElementKind::Character, &detail.characters),
            (ElementKind::Setting, &detail.settings),
        ] {
            write!(out, "<h2>{}</h2>", kind.plural_label())?;
            self.element_list(out, kind, elements)?;
            write!(
                out,
                r#"<p><a href="{}?workId={}">Add a {}</a></p>"#,
                self.url(&format!("{}_new", kind.name()))?,
                work.id,
                kind.name()
            )?;
        }
        Ok(())
    }

    fn section_list(
        &self,
        out: &mut String,
        sections: &[Section],
        counts: bool,
    ) -> Result<(), RenderError> {
        if sections.is_empty() {
            out.push_str("<p>None yet.</p>");
            return Ok(());
        }
        out.push_str(r#"<ul class="sections">"#);
        for section in sections {
            write!(
                out,
                r#"<li><a href="{}{}">{}</a>"#,
                self.url("section_view")?,
                section.id,
                escape(&section.title)
            )?;
            if counts {
                write!(out, r#" <span class="word-count">({} words)</span>"#, section.word_count)?;
            }
            if !section.blurb.is_empty() {
                write!(out, r#" <span class="blurb">{}</span>"#, escape(&section.blurb))?;
            }
            out.push_str("</li>");
        }
        out.push_str("</ul>");
        Ok(())
    }

    fn element_list(
        &self,
        out: &mut String,
        kind: ElementKind,
        elements: &[Element],
    ) -> Result<(), RenderError> {
        if elements.is_empty() {
            out.push_str("<p>None yet.</p>");
            return Ok(());
        }
        let view = self.url(&format!("{}_view", kind.name()))?;
        out.push_str(r#"<ul class="elements">"#);
        for element in elements {
            write!(
                out,
                r#"<li><a href="{}{}">{}</a>"#,
                view,
                element.id,
                escape(&element.name)
            )?;
            if !element.blurb.is_empty() {
                write!(out, r#" <span class="blurb">{}</span>"#, escape(&element.blurb))?;
            }
            out.push_str("</li>");
        }
        out.push_str("</ul>");
        Ok(())
    }

    fn work_edit(
        &self,
        out: &mut String,
        page: &WebPage,
        work: Option<&Work>,
    ) -> Result<(), RenderError> {
        let form = page_form(page)?;
        let action = match work {
            Some(work) => format!("{}{}", self.url("work_edit")?, work.id),
            None => self.url("work_new")?.to_string(),
        };
        open_form(out, &action, form)?;
        wrap_field(out, form, "title")?;
        wrap_text_area(out, form, "blurb", 5, 80)?;
        wrap_field(out, form, "characters")?;
        wrap_field(out, form, "settings")?;
        hidden_fields(out, form, &["currentCharIds", "currentSettingIds", "csrf"])?;
        close_form(out, "Save")?;

        if let Some(work) = work {
            self.delete_form(out, page, &format!("{}{}", self.url("work_delete")?, work.id))?;
        }
        Ok(())
    }

    fn delete_form(&self, out: &mut String, page: &WebPage, action: &str) -> Result<(), RenderError> {
        let Some(form) = &page.delete_form else {
            return Ok(());
        };
        write!(out, r#"<form class="delete-form" method="post" action="{}">"#, escape(action))?;
        hidden_fields(out, form, &["object_id", "csrf"])?;
        out.push_str(r#"<button class="btn btn-danger" type="submit">Delete</button></form>"#);
        Ok(())
    }

    fn work_export(&self, page: &WebPage, detail: &WorkDetail) -> Result<String, RenderError> {
        let mut out = String::new();
        let work = &detail.work;
        write!(
            out,
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{}</title></head>
<body>
<h1>{}</h1>
"#,
            escape(&page.title),
            escape(&work.title)
        )?;
        if !work.blurb.is_empty() {
            write!(out, "<p><em>{}</em></p>", escape(&work.blurb))?;
        }
        for (index, section) in detail.sections.iter().enumerate() {
            write!(out, "<h2>{}. {}</h2>", index + 1, escape(&section.title))?;
            paragraphs(&mut out, &section.body)?;
        }
        if !detail.snippets.is_empty() {
            out.push_str("<h2>Snippets</h2>");
            for snippet in &detail.snippets {
                write!(out, "<h3>{}</h3>", escape(&snippet.title))?;
                paragraphs(&mut out, &snippet.body)?;
            }
        }
        for (label, elements) in [("Characters", &detail.characters), ("Settings", &detail.settings)] {
            if elements.is_empty() {
                continue;
            }
            write!(out, "<h2>{label}</h2>")?;
            for element in elements {
                write!(out, "<h3>{}</h3>", escape(&element.name))?;
                if !element.blurb.is_empty() {
                    write!(out, "<p><em>{}</em></p>", escape(&element.blurb))?;
                }
                paragraphs(&mut out, &element.body)?;
            }
        }
        out.push_str("</body>\n</html>\n");
        Ok(out)
    }

    fn work_reorder(
        &self,
        out: &mut String,
        work: &Work,
        sections: &[Section],
    ) -> Result<(), RenderError> {
        let current = sections
            .iter()
            .enumerate()
            .map(|(index, section)| format!("{}-{}", section.id, index + 1))
            .collect::<Vec<_>>()
            .join(",");
        write!(
            out,
            r#"<form method="post" action="{}{}"><ol class="reorder-list">"#,
            self.url("work_reorder")?,
            work.id
        )?;
        for section in sections {
            write!(
                out,
                r#"<li data-section-id="{}">{}</li>"#,
                section.id,
                escape(&section.title)
            )?;
        }
        write!(
            out,
            r#"</ol><input type="hidden" name="section-order" value="{}"><button class="btn btn-primary" type="submit">Save order</button></form>"#,
            escape(&current)
        )?;
        Ok(())
    }

    fn section_view(
        &self,
        out: &mut String,
        section: &Section,
        characters: &[Element],
        settings: &[Element],
    ) -> Result<(), RenderError> {
        write!(out, "<h1>{}</h1>", escape(&section.title))?;
        if section.is_snippet {
            out.push_str(r#"<p class="label label-default">Snippet</p>"#);
        }
        if !section.blurb.is_empty() {
            write!(out, r#"<p class="blurb">{}</p>"#, escape(&section.blurb))?;
        }
        write!(
            out,
            r#"<p class="actions"><a href="{}{}">Edit</a> &middot; <a href="{}{}">Back to work</a> &middot; {} words</p>"#,
            self.url("section_edit")?,
            section.id,
            self.url("work_view")?,
            section.work_id,
            section.word_count
        )?;
        out.push_str(r#"<div class="section-body">"#);
        paragraphs(out, &section.body)?;
        out.push_str("</div>");
        for (kind, elements) in [
            (ElementKind::Character, characters),
            (ElementKind::Setting, settings),
        ] {
            write!(out, "<h2>{}</h2>", kind.plural_label())?;
            self.element_list(out, kind, elements)?;
        }
        Ok(())
    }

    fn section_edit(
        &self,
        out: &mut String,
        page: &WebPage,
        section: Option<&Section>,
        work_id: WorkId,
    ) -> Result<(), RenderError> {
        let form = page_form(page)?;
        let action = match section {
            Some(section) => format!("{}{}", self.url("section_edit")?, section.id),
            None => format!("{}?workId={}", self.url("section_new")?, work_id),
        };
        open_form(out, &action, form)?;
        wrap_field(out, form, "title")?;
        wrap_text_area(out, form, "blurb", 3, 80)?;
        wrap_text_area(out, form, "body", 25, 80)?;
        wrap_field(out, form, "snippet")?;
        wrap_field(out, form, "characters")?;
        wrap_field(out, form, "settings")?;
        hidden_fields(out, form, &["currentCharIds", "currentSettingIds", "csrf"])?;
        close_form(out, "Save")?;

        if let Some(section) = section {
            self.delete_form(out, page, &format!("{}{}", self.url("section_delete")?, section.id))?;
        }
        Ok(())
    }

    fn element_view(
        &self,
        out: &mut String,
        element: &Element,
        sections_by_work: &[(Work, Vec<Section>)],
    ) -> Result<(), RenderError> {
        if !element.blurb.is_empty() {
            write!(out, r#"<p class="blurb">{}</p>"#, escape(&element.blurb))?;
        }
        write!(
            out,
            r#"<p class="actions"><a href="{}{}">Edit</a></p>"#,
            self.url(&format!("{}_edit", element.kind.name()))?,
            element.id
        )?;
        paragraphs(out, &element.body)?;

        out.push_str("<h2>Appears in</h2>");
        if sections_by_work.is_empty() {
            out.push_str("<p>No works yet.</p>");
        }
        for (work, sections) in sections_by_work {
            write!(
                out,
                r#"<h3><a href="{}{}">{}</a></h3>"#,
                self.url("work_view")?,
                work.id,
                escape(&work.title)
            )?;
            self.section_list(out, sections, false)?;
        }
        Ok(())
    }

    fn element_edit(
        &self,
        out: &mut String,
        page: &WebPage,
        kind: ElementKind,
        element: Option<&Element>,
        work_id: WorkId,
    ) -> Result<(), RenderError> {
        let form = page_form(page)?;
        let action = match element {
            Some(element) => format!("{}{}", self.url(&format!("{}_edit", kind.name()))?, element.id),
            None if work_id.get() != 0 => format!(
                "{}?workId={}",
                self.url(&format!("{}_new", kind.name()))?,
                work_id
            ),
            None => self.url(&format!("{}_new", kind.name()))?.to_string(),
        };
        open_form(out, &action, form)?;
        wrap_field(out, form, "name")?;
        wrap_text_area(out, form, "blurb", 3, 80)?;
        wrap_text_area(out, form, "body", 15, 80)?;
        hidden_fields(out, form, &["csrf"])?;
        close_form(out, "Save")?;

        if let Some(element) = element {
            let delete = self.url(&format!("{}_delete", kind.name()))?;
            self.delete_form(out, page, &format!("{}{}", delete, element.id))?;
        }
        Ok(())
    }

    fn element_index(
        &self,
        out: &mut String,
        kind: ElementKind,
        elements: &[Element],
    ) -> Result<(), RenderError> {
        self.element_list(out, kind, elements)?;
        write!(
            out,
            r#"<p><a class="btn btn-primary" href="{}">Add a {}</a></p>"#,
            self.url(&format!("{}_new", kind.name()))?,
            kind.name()
        )?;
        Ok(())
    }
}

fn about(out: &mut String) -> fmt::Result {
    out.push_str(
        "<p>Pathfork is a place to plan and draft long-form writing. Break a work into \
         sections, keep stray snippets nearby, and track which characters and settings \
         show up where.</p>",
    );
    Ok(())
}

fn page_form(page: &WebPage) -> Result<&Form, RenderError> {
    page.form
        .as_ref()
        .ok_or_else(|| RenderError::MissingForm(page.title.clone()))
}

fn open_form(out: &mut String, action: &str, form: &Form) -> fmt::Result {
    write!(out, r#"<form method="post" action="{}">"#, escape(action))?;
    for error in form.errors() {
        write!(out, r#"<p class="form-error">{}</p>"#, escape(error))?;
    }
    Ok(())
}

fn close_form(out: &mut String, submit: &str) -> Result<(), RenderError> {
    write!(
        out,
        r#"<button class="btn btn-primary" type="submit">{}</button></form>"#,
        escape(submit)
    )?;
    Ok(())
}

fn wrap_field(out: &mut String, form: &Form, name: &str) -> Result<(), RenderError> {
    write!(
        out,
        r#"<div class="row"><div class="col-md-9">{}</div></div>"#,
        form.render_field(name)?
    )?;
    Ok(())
}

fn wrap_text_area(
    out: &mut String,
    form: &Form,
    name: &str,
    rows: u32,
    cols: u32,
) -> Result<(), RenderError> {
    write!(
        out,
        r#"<div class="row"><div class="col-md-12">{}</div></div>"#,
        form.render_field_sized(name, rows, cols)?
    )?;
    Ok(())
}

fn hidden_fields(out: &mut String, form: &Form, names: &[&str]) -> Result<(), RenderError> {
    for name in names {
        out.push_str(&form.render_field(name)?);
    }
    Ok(())
}

/// Splits text on blank lines into escaped paragraphs.
fn paragraphs(out: &mut String, text: &str) -> fmt::Result {
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        write!(out, "<p>{}</p>", escape(paragraph).replace('\n', "<br>"))?;
    }
    Ok(())
}

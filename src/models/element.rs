use std::fmt;

use rusqlite::{Row, types::Value};

use super::{ElementId, Owned, Relation, SectionId, WorkId, text_or_null};
use crate::db::{Insertable, Query, Table, Updatable};

/// Which of the two cross-cutting element tables a row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Character,
    Setting,
}

impl ElementKind {
    /// Lowercase singular name, as used in URLs and column names.
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Character => "character",
            ElementKind::Setting => "setting",
        }
    }

    /// Capitalized plural, for headings.
    pub fn plural_label(self) -> &'static str {
        match self {
            ElementKind::Character => "Characters",
            ElementKind::Setting => "Settings",
        }
    }

    pub fn table(self) -> Table {
        match self {
            ElementKind::Character => Table::Character,
            ElementKind::Setting => Table::Setting,
        }
    }

    fn columns(self, detail: bool) -> String {
        let table = self.table().name();
        let key = self.table().key();
        let body = if detail {
            format!("{table}.body")
        } else {
            "NULL".to_string()
        };
        format!(
            "SELECT {table}.{key}, {table}.name, {table}.blurb, {body}, {table}.user_email FROM {table}"
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A character or a setting.
///
/// Both kinds share the same shape; `kind` decides which table the row
/// belongs to. List queries leave `body` empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub name: String,
    pub blurb: String,
    pub body: String,
    pub user_email: String,
}

impl Element {
    pub fn new(
        kind: ElementKind,
        name: impl Into<String>,
        blurb: impl Into<String>,
        body: impl Into<String>,
        user_email: impl Into<String>,
    ) -> Self {
        Self {
            id: ElementId::default(),
            kind,
            name: name.into(),
            blurb: blurb.into(),
            body: body.into(),
            user_email: user_email.into(),
        }
    }

    pub fn by_id(kind: ElementKind, id: ElementId) -> Query<Element> {
        let table = kind.table();
        Query::new(
            format!(
                "{} WHERE {}.{} = ?1",
                kind.columns(true),
                table.name(),
                table.key()
            ),
            vec![Value::Integer(id.get())],
            move |row| element_from_row(kind, row),
        )
    }

    /// All of a user's elements of one kind, sorted by name.
    pub fn for_user(kind: ElementKind, email: &str) -> Query<Element> {
        let table = kind.table().name();
        Query::new(
            format!(
                "{} WHERE {table}.user_email = ?1 ORDER BY {table}.name",
                kind.columns(false)
            ),
            vec![Value::Text(email.to_string())],
            move |row| element_from_row(kind, row),
        )
    }

    /// Elements linked to a work, sorted by name.
    pub fn for_work(kind: ElementKind, work_id: WorkId) -> Query<Element> {
        let sql = format!(
            "{} ORDER BY {}.name",
            Relation::for_work(kind).right_for_left(&kind.columns(false)),
            kind.table().name()
        );
        Query::new(sql, vec![Value::Integer(work_id.get())], move |row| {
            element_from_row(kind, row)
        })
    }

    /// Elements linked to a work, with bodies, for export.
    pub fn for_work_export(kind: ElementKind, work_id: WorkId) -> Query<Element> {
        let sql = format!(
            "{} ORDER BY {}.name",
            Relation::for_work(kind).right_for_left(&kind.columns(true)),
            kind.table().name()
        );
        Query::new(sql, vec![Value::Integer(work_id.get())], move |row| {
            element_from_row(kind, row)
        })
    }

    /// Elements linked to a section.
    pub fn for_section(kind: ElementKind, section_id: SectionId) -> Query<Element> {
        Query::new(
            Relation::for_section(kind).right_for_left(&kind.columns(false)),
            vec![Value::Integer(section_id.get())],
            move |row| element_from_row(kind, row),
        )
    }
}

impl Owned for Element {
    fn owner_email(&self) -> &str {
        &self.user_email
    }
}

impl Insertable for Element {
    fn insert_sql(&self) -> &str {
        match self.kind {
            ElementKind::Character => {
                "INSERT INTO tbl_character (name, blurb, body, user_email) \
                 VALUES (?1, ?2, ?3, ?4) RETURNING character_id"
            }
            ElementKind::Setting => {
                "INSERT INTO tbl_setting (name, blurb, body, user_email) \
                 VALUES (?1, ?2, ?3, ?4) RETURNING setting_id"
            }
        }
    }

    fn insert_args(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            text_or_null(&self.blurb),
            text_or_null(&self.body),
            Value::Text(self.user_email.clone()),
        ]
    }
}

impl Updatable for Element {
    fn update_sql(&self) -> &str {
        match self.kind {
            ElementKind::Character => {
                "UPDATE tbl_character SET name = ?1, blurb = ?2, body = ?3 WHERE character_id = ?4"
            }
            ElementKind::Setting => {
                "UPDATE tbl_setting SET name = ?1, blurb = ?2, body = ?3 WHERE setting_id = ?4"
            }
        }
    }

    fn update_args(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            text_or_null(&self.blurb),
            text_or_null(&self.body),
            Value::Integer(self.id.get()),
        ]
    }
}

fn element_from_row(kind: ElementKind, row: &Row<'_>) -> rusqlite::Result<Element> {
    Ok(Element {
        id: ElementId::new(row.get(0)?),
        kind,
        name: row.get(1)?,
        blurb: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        body: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        user_email: row.get(4)?,
    })
}

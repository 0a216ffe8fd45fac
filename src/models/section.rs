use rusqlite::{Row, Transaction, params_from_iter, types::Value};

use super::{ElementId, ElementKind, ModelError, Owned, Relation, SectionId, WorkId, text_or_null};
use crate::db::{Insertable, Query, Updatable};

/// Order given to new sections so they sort after everything already placed.
pub const DEFAULT_SECTION_ORDER: i64 = 10000;

const SECTION_LIST_COLUMNS: &str = "SELECT tbl_section.section_id, tbl_section.title, \
     tbl_section.blurb, NULL, tbl_section.user_email, tbl_section.work_id, \
     tbl_section.section_order, tbl_section.is_snippet, tbl_section.word_count FROM tbl_section";

const SECTION_DETAIL_COLUMNS: &str = "SELECT tbl_section.section_id, tbl_section.title, \
     tbl_section.blurb, tbl_section.body, tbl_section.user_email, tbl_section.work_id, \
     tbl_section.section_order, tbl_section.is_snippet, tbl_section.word_count FROM tbl_section";

/// A chapter-like section of a work, or an unordered snippet.
///
/// List queries leave `body` empty; detail and export queries fill it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub blurb: String,
    pub body: String,
    pub user_email: String,
    pub work_id: WorkId,
    pub order: Option<i64>,
    pub is_snippet: bool,
    pub word_count: i64,
}

impl Section {
    /// Creates an unsaved section at the end of the work's ordering.
    pub fn new(
        title: impl Into<String>,
        blurb: impl Into<String>,
        body: impl Into<String>,
        work_id: WorkId,
        user_email: impl Into<String>,
        is_snippet: bool,
    ) -> Self {
        let mut section = Self {
            id: SectionId::default(),
            title: title.into(),
            blurb: blurb.into(),
            body: String::new(),
            user_email: user_email.into(),
            work_id,
            order: Some(DEFAULT_SECTION_ORDER),
            is_snippet,
            word_count: 0,
        };
        section.set_body(body);
        section
    }

    /// Replaces the body and recomputes the word count.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.word_count = word_count(&self.body);
    }

    pub fn by_id(id: SectionId) -> Query<Section> {
        Query::new(
            format!("{SECTION_DETAIL_COLUMNS} WHERE tbl_section.section_id = ?1"),
            vec![Value::Integer(id.get())],
            section_from_row,
        )
    }

    /// Every section and snippet of a work, without bodies.
    pub fn for_work(work_id: WorkId) -> Query<Section> {
        Query::new(
            format!("{SECTION_LIST_COLUMNS} WHERE tbl_section.work_id = ?1"),
            vec![Value::Integer(work_id.get())],
            section_from_row,
        )
    }

    /// Every section and snippet of a work, with bodies.
    pub fn for_work_export(work_id: WorkId) -> Query<Section> {
        Query::new(
            format!("{SECTION_DETAIL_COLUMNS} WHERE tbl_section.work_id = ?1"),
            vec![Value::Integer(work_id.get())],
            section_from_row,
        )
    }

    /// Sections a character or setting appears in.
    pub fn for_element(kind: ElementKind, id: ElementId) -> Query<Section> {
        Query::new(
            Relation::for_section(kind).left_for_right(SECTION_LIST_COLUMNS),
            vec![Value::Integer(id.get())],
            section_from_row,
        )
    }
}

impl Owned for Section {
    fn owner_email(&self) -> &str {
        &self.user_email
    }
}

impl Insertable for Section {
    fn insert_sql(&self) -> &str {
        "INSERT INTO tbl_section \
         (title, blurb, body, work_id, section_order, user_email, is_snippet, word_count) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING section_id"
    }

    fn insert_args(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            text_or_null(&self.blurb),
            text_or_null(&self.body),
            Value::Integer(self.work_id.get()),
            Value::from(self.order),
            Value::Text(self.user_email.clone()),
            Value::from(self.is_snippet),
            Value::Integer(self.word_count),
        ]
    }
}

impl Updatable for Section {
    fn update_sql(&self) -> &str {
        "UPDATE tbl_section \
         SET title = ?1, blurb = ?2, body = ?3, section_order = ?4, is_snippet = ?5, word_count = ?6 \
         WHERE section_id = ?7"
    }

    fn update_args(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            text_or_null(&self.blurb),
            text_or_null(&self.body),
            Value::from(self.order),
            Value::from(self.is_snippet),
            Value::Integer(self.word_count),
            Value::Integer(self.id.get()),
        ]
    }
}

fn section_from_row(row: &Row<'_>) -> rusqlite::Result<Section> {
    Ok(Section {
        id: SectionId::new(row.get(0)?),
        title: row.get(1)?,
        blurb: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        body: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        user_email: row.get(4)?,
        work_id: WorkId::new(row.get(5)?),
        order: row.get(6)?,
        is_snippet: row.get(7)?,
        word_count: row.get(8)?,
    })
}

/// Counts whitespace-separated words.
pub fn word_count(body: &str) -> i64 {
    body.split_whitespace().count() as i64
}

/// Splits a work's rows into ordered sections and snippets.
///
/// Sections are sorted by their order (unset orders first); snippets keep
/// the order they came in.
pub fn split_sections(all: Vec<Section>) -> (Vec<Section>, Vec<Section>) {
    let (mut sections, snippets): (Vec<_>, Vec<_>) =
        all.into_iter().partition(|section| !section.is_snippet);
    sections.sort_by_key(|section| section.order.unwrap_or(0));
    (sections, snippets)
}

/// Applies a `"{sectionId}-{order},..."` submission to the sections of
/// `work_id` in one statement.
///
/// Ids that do not belong to the work are ignored. Returns the number of
/// sections updated.
pub fn reorder_sections(
    tx: &Transaction<'_>,
    raw_order: &str,
    work_id: WorkId,
) -> Result<usize, ModelError> {
    let pairs = parse_order(raw_order)?;

    let values: Vec<String> = (0..pairs.len())
        .map(|i| format!("(?{}, ?{})", i * 2 + 1, i * 2 + 2))
        .collect();
    let sql = format!(
        "WITH mt(section_id, section_order) AS (VALUES {}) \
         UPDATE tbl_section SET section_order = mt.section_order FROM mt \
         WHERE mt.section_id = tbl_section.section_id AND tbl_section.work_id = ?{}",
        values.join(", "),
        pairs.len() * 2 + 1
    );

    let mut args: Vec<i64> = pairs.iter().flat_map(|&(id, order)| [id, order]).collect();
    args.push(work_id.get());

    let updated = tx.execute(&sql, params_from_iter(args)).map_err(|e| {
        tracing::error!("Reorder database error, rollback: {}", e);
        e
    })?;
    Ok(updated)
}

fn parse_order(raw_order: &str) -> Result<Vec<(i64, i64)>, ModelError> {
    raw_order
        .split(',')
        .map(|entry| {
            let malformed = || ModelError::MalformedOrder(entry.to_string());
            let (id, order) = entry.trim().split_once('-').ok_or_else(malformed)?;
            let id = id.parse::<i64>().map_err(|_| malformed())?;
            let order = order.parse::<i64>().map_err(|_| malformed())?;
            Ok((id, order))
        })
        .collect()
}

use rusqlite::{Row, types::Value};

use super::{ElementId, ElementKind, Owned, Relation, WorkId, text_or_null};
use crate::db::{Insertable, Query, Updatable};

const WORK_COLUMNS: &str =
    "SELECT tbl_work.work_id, tbl_work.title, tbl_work.blurb, tbl_work.user_email FROM tbl_work";

/// A creative work: the top of the hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Work {
    pub id: WorkId,
    pub title: String,
    pub blurb: String,
    pub user_email: String,
}

impl Work {
    /// Creates an unsaved work owned by `user_email`.
    pub fn new(title: impl Into<String>, blurb: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            id: WorkId::default(),
            title: title.into(),
            blurb: blurb.into(),
            user_email: user_email.into(),
        }
    }

    pub fn by_id(id: WorkId) -> Query<Work> {
        Query::new(
            format!("{WORK_COLUMNS} WHERE tbl_work.work_id = ?1"),
            vec![Value::Integer(id.get())],
            work_from_row,
        )
    }

    pub fn for_user(email: &str) -> Query<Work> {
        Query::new(
            format!("{WORK_COLUMNS} WHERE tbl_work.user_email = ?1 ORDER BY tbl_work.work_id"),
            vec![Value::Text(email.to_string())],
            work_from_row,
        )
    }

    /// Works a character or setting appears in.
    pub fn for_element(kind: ElementKind, id: ElementId) -> Query<Work> {
        Query::new(
            Relation::for_work(kind).left_for_right(WORK_COLUMNS),
            vec![Value::Integer(id.get())],
            work_from_row,
        )
    }
}

impl Owned for Work {
    fn owner_email(&self) -> &str {
        &self.user_email
    }
}

impl Insertable for Work {
    fn insert_sql(&self) -> &str {
        "INSERT INTO tbl_work (title, blurb, user_email) VALUES (?1, ?2, ?3) RETURNING work_id"
    }

    fn insert_args(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            text_or_null(&self.blurb),
            Value::Text(self.user_email.clone()),
        ]
    }
}

impl Updatable for Work {
    fn update_sql(&self) -> &str {
        "UPDATE tbl_work SET title = ?1, blurb = ?2 WHERE work_id = ?3"
    }

    fn update_args(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            text_or_null(&self.blurb),
            Value::Integer(self.id.get()),
        ]
    }
}

fn work_from_row(row: &Row<'_>) -> rusqlite::Result<Work> {
    Ok(Work {
        id: WorkId::new(row.get(0)?),
        title: row.get(1)?,
        blurb: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        user_email: row.get(3)?,
    })
}

//! Route handlers.
//!
//! Every handler has the [`Handler`](crate::app::Handler) signature and is
//! registered in [`Routes::site`](crate::routes::Routes::site).

pub mod crud;
pub mod dashboard;
pub mod elements;
pub mod public;
pub mod sections;
pub mod works;

use anyhow::{Result, anyhow, bail};
use rusqlite::{Connection, Transaction};

use crate::db::{Query, query};
use crate::forms::{FormData, SelectOption, element_options, relation_update_ids, strings_to_ids};
use crate::models::{Element, ElementKind, Relation, RelationUpdate, update_relations};

/// Hidden "before" field and multi-select "after" field for each kind.
const RELATION_FIELDS: [(ElementKind, &str, &str); 2] = [
    (ElementKind::Character, "currentCharIds", "characters"),
    (ElementKind::Setting, "currentSettingIds", "settings"),
];

/// Select options for all of the user's elements of `kind`, marking those
/// returned by `attached`.
fn element_select(
    conn: &Connection,
    email: &str,
    kind: ElementKind,
    attached: Option<Query<Element>>,
) -> Result<Vec<SelectOption>> {
    let all = query(conn, &Element::for_user(kind, email))?;
    let attached = match attached {
        Some(q) => query(conn, &q)?,
        None => Vec::new(),
    };
    Ok(element_options(&all, &attached))
}

/// Fails unless every id names an element of `kind` owned by `email`.
fn ensure_owned(conn: &Connection, kind: ElementKind, email: &str, ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let owned: Vec<i64> = query(conn, &Element::for_user(kind, email))?
        .iter()
        .map(|element| element.id.get())
        .collect();
    if let Some(id) = ids.iter().find(|&&id| !owned.contains(&id)) {
        bail!("{} {} is not owned by {}", kind, id, email);
    }
    Ok(())
}

/// Applies the submitted character and setting changes to one work or
/// section owned by `email`.
fn apply_relation_edits(
    tx: &Transaction<'_>,
    data: &FormData,
    email: &str,
    left_id: i64,
    relation_for: fn(ElementKind) -> Relation,
) -> Result<()> {
    for (kind, old_field, new_field) in RELATION_FIELDS {
        let (insert, delete) = relation_update_ids(data, old_field, new_field)
            .ok_or_else(|| anyhow!("Malformed {} ids in submission", kind))?;
        ensure_owned(tx, kind, email, &insert)?;
        update_relations(
            tx,
            &RelationUpdate::new(relation_for(kind), left_id, insert, delete),
        )?;
    }
    Ok(())
}

/// Links every selected character and setting to the parent work as well.
/// Existing links are kept; nothing is removed.
fn propagate_to_work(
    tx: &Transaction<'_>,
    data: &FormData,
    email: &str,
    work_id: i64,
) -> Result<()> {
    for (kind, _, new_field) in RELATION_FIELDS {
        let ids = strings_to_ids(data.get_all(new_field))
            .ok_or_else(|| anyhow!("Malformed {} ids in submission", kind))?;
        ensure_owned(tx, kind, email, &ids)?;
        update_relations(
            tx,
            &RelationUpdate::additions_only(Relation::for_work(kind), work_id, ids),
        )?;
    }
    Ok(())
}

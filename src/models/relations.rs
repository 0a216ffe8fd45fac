//! Many-to-many associations between works/sections and characters/settings.

use anyhow::Result;
use rusqlite::{Transaction, types::Value};

use super::ElementKind;
use crate::db::{self, Deletable, Insertable};

/// One of the four join tables.
///
/// The "left" side is the work or section, the "right" side the character or
/// setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    WorkCharacters,
    WorkSettings,
    SectionCharacters,
    SectionSettings,
}

impl Relation {
    pub fn for_work(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Character => Relation::WorkCharacters,
            ElementKind::Setting => Relation::WorkSettings,
        }
    }

    pub fn for_section(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Character => Relation::SectionCharacters,
            ElementKind::Setting => Relation::SectionSettings,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Relation::WorkCharacters => "r_works_characters",
            Relation::WorkSettings => "r_works_settings",
            Relation::SectionCharacters => "r_sections_characters",
            Relation::SectionSettings => "r_sections_settings",
        }
    }

    fn left(self) -> (&'static str, &'static str) {
        match self {
            Relation::WorkCharacters | Relation::WorkSettings => ("tbl_work", "work_id"),
            Relation::SectionCharacters | Relation::SectionSettings => {
                ("tbl_section", "section_id")
            }
        }
    }

    fn right(self) -> (&'static str, &'static str) {
        match self {
            Relation::WorkCharacters | Relation::SectionCharacters => {
                ("tbl_character", "character_id")
            }
            Relation::WorkSettings | Relation::SectionSettings => ("tbl_setting", "setting_id"),
        }
    }

    /// Appends the join that selects right-side rows linked to the left id
    /// bound as `?1`.
    pub(crate) fn right_for_left(self, select: &str) -> String {
        let join = self.table();
        let (_, left_key) = self.left();
        let (right_table, right_key) = self.right();
        format!(
            "{select} JOIN {join} ON {right_table}.{right_key} = {join}.{right_key} \
             WHERE {join}.{left_key} = ?1"
        )
    }

    /// Appends the join that selects left-side rows linked to the right id
    /// bound as `?1`.
    pub(crate) fn left_for_right(self, select: &str) -> String {
        let join = self.table();
        let (left_table, left_key) = self.left();
        let (_, right_key) = self.right();
        format!(
            "{select} JOIN {join} ON {left_table}.{left_key} = {join}.{left_key} \
             WHERE {join}.{right_key} = ?1 ORDER BY {left_table}.{left_key}"
        )
    }
}

/// Associations to add and remove for one left-side row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationUpdate {
    pub relation: Relation,
    pub left_id: i64,
    pub insert_ids: Vec<i64>,
    pub delete_ids: Vec<i64>,
    /// Skip pairs that already exist instead of failing.
    pub ignore_conflicts: bool,
}

impl RelationUpdate {
    pub fn new(relation: Relation, left_id: i64, insert_ids: Vec<i64>, delete_ids: Vec<i64>) -> Self {
        Self {
            relation,
            left_id,
            insert_ids,
            delete_ids,
            ignore_conflicts: false,
        }
    }

    /// Adds associations, leaving existing ones alone and removing nothing.
    pub fn additions_only(relation: Relation, left_id: i64, insert_ids: Vec<i64>) -> Self {
        Self {
            relation,
            left_id,
            insert_ids,
            delete_ids: Vec::new(),
            ignore_conflicts: true,
        }
    }
}

/// A prepared statement for the gateway: SQL plus positional arguments.
struct Statement {
    sql: String,
    args: Vec<Value>,
}

impl Insertable for Statement {
    fn insert_sql(&self) -> &str {
        &self.sql
    }

    fn insert_args(&self) -> Vec<Value> {
        self.args.clone()
    }
}

impl Deletable for Statement {
    fn delete_sql(&self) -> &str {
        &self.sql
    }

    fn delete_args(&self) -> Vec<Value> {
        self.args.clone()
    }
}

impl RelationUpdate {
    /// One multi-row insert of every `(left_id, insert_id)` pair.
    fn insert_statement(&self) -> Statement {
        let (_, left_key) = self.relation.left();
        let (_, right_key) = self.relation.right();

        let rows: Vec<String> = (0..self.insert_ids.len())
            .map(|i| format!("(?{}, ?{})", i * 2 + 1, i * 2 + 2))
            .collect();
        let conflict = if self.ignore_conflicts {
            " ON CONFLICT DO NOTHING"
        } else {
            ""
        };

        Statement {
            sql: format!(
                "INSERT INTO {} ({left_key}, {right_key}) VALUES {}{conflict} RETURNING 0",
                self.relation.table(),
                rows.join(", ")
            ),
            args: self
                .insert_ids
                .iter()
                .flat_map(|&right_id| [Value::Integer(self.left_id), Value::Integer(right_id)])
                .collect(),
        }
    }

    /// One delete of every listed right id for `left_id`.
    fn delete_statement(&self) -> Statement {
        let (_, left_key) = self.relation.left();
        let (_, right_key) = self.relation.right();

        let placeholders: Vec<String> = (0..self.delete_ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect();

        let mut args = vec![Value::Integer(self.left_id)];
        args.extend(self.delete_ids.iter().map(|&id| Value::Integer(id)));

        Statement {
            sql: format!(
                "DELETE FROM {} WHERE {left_key} = ?1 AND {right_key} IN ({})",
                self.relation.table(),
                placeholders.join(", ")
            ),
            args,
        }
    }
}

/// Applies a [`RelationUpdate`] inside the caller's transaction.
///
/// The insert runs only when there is something to insert and the delete
/// only when there is something to delete. Either failing fails the call,
/// which rolls the caller's transaction back.
pub fn update_relations(tx: &Transaction<'_>, update: &RelationUpdate) -> Result<()> {
    if !update.insert_ids.is_empty() {
        db::insert(tx, &update.insert_statement())?;
    }
    if !update.delete_ids.is_empty() {
        db::delete(tx, &update.delete_statement())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_statement_binds_pairs_in_order() {
        let update = RelationUpdate::new(Relation::WorkCharacters, 3, vec![7, 8], vec![]);
        let statement = update.insert_statement();

        assert_eq!(
            statement.sql,
            "INSERT INTO r_works_characters (work_id, character_id) VALUES (?1, ?2), (?3, ?4) RETURNING 0"
        );
        assert_eq!(
            statement.args,
            vec![
                Value::Integer(3),
                Value::Integer(7),
                Value::Integer(3),
                Value::Integer(8)
            ]
        );
    }

    #[test]
    fn additions_only_ignores_conflicts() {
        let update = RelationUpdate::additions_only(Relation::WorkSettings, 1, vec![2]);

        assert!(update.delete_ids.is_empty());
        assert!(update.insert_statement().sql.contains("ON CONFLICT DO NOTHING"));
    }

    #[test]
    fn delete_statement_scopes_to_left_id() {
        let update = RelationUpdate::new(Relation::SectionSettings, 4, vec![], vec![5, 6]);
        let statement = update.delete_statement();

        assert_eq!(
            statement.sql,
            "DELETE FROM r_sections_settings WHERE section_id = ?1 AND setting_id IN (?2, ?3)"
        );
        assert_eq!(statement.args.len(), 3);
    }

    #[test]
    fn joins_name_both_sides() {
        let sql = Relation::SectionCharacters.right_for_left("SELECT 1 FROM tbl_character");
        assert!(sql.contains("JOIN r_sections_characters ON tbl_character.character_id"));
        assert!(sql.ends_with("r_sections_characters.section_id = ?1"));

        let sql = Relation::WorkSettings.left_for_right("SELECT 1 FROM tbl_work");
        assert!(sql.contains("tbl_work.work_id = r_works_settings.work_id"));
        assert!(sql.contains("r_works_settings.setting_id = ?1"));
    }
}

use super::*;
use rusqlite::types::Value;
use tempfile::tempdir;

struct NewUser<'a> {
    email: &'a str,
}

impl Insertable for NewUser<'_> {
    fn insert_sql(&self) -> &str {
        "INSERT INTO tbl_user (email, pw) VALUES (?1, 'hash') RETURNING user_id"
    }

    fn insert_args(&self) -> Vec<Value> {
        vec![self.email.to_string().into()]
    }
}

struct IgnoredUser<'a> {
    email: &'a str,
}

impl Insertable for IgnoredUser<'_> {
    fn insert_sql(&self) -> &str {
        "INSERT INTO tbl_user (email, pw) VALUES (?1, 'hash') ON CONFLICT DO NOTHING RETURNING user_id"
    }

    fn insert_args(&self) -> Vec<Value> {
        vec![self.email.to_string().into()]
    }
}

struct NewWork<'a> {
    title: &'a str,
    email: &'a str,
}

impl Insertable for NewWork<'_> {
    fn insert_sql(&self) -> &str {
        "INSERT INTO tbl_work (title, user_email) VALUES (?1, ?2) RETURNING work_id"
    }

    fn insert_args(&self) -> Vec<Value> {
        vec![self.title.to_string().into(), self.email.to_string().into()]
    }
}

fn table_names(db: &Database) -> Vec<String> {
    db.connection()
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .filter_map(|r| r.ok())
        .collect()
}

fn count(db: &Database, table: &str) -> i64 {
    db.connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn in_memory_opens_successfully() {
    let result = Database::in_memory();
    assert!(result.is_ok());
}

#[test]
fn schema_tables_exist() {
    let db = Database::in_memory().unwrap();
    let tables = table_names(&db);

    for expected in [
        "tbl_user",
        "tbl_work",
        "tbl_section",
        "tbl_character",
        "tbl_setting",
        "r_works_characters",
        "r_works_settings",
        "r_sections_characters",
        "r_sections_settings",
    ] {
        assert!(tables.contains(&expected.to_string()), "missing {expected}");
    }
}

#[test]
fn foreign_keys_enabled() {
    let db = Database::in_memory().unwrap();

    let fk_enabled: i32 = db
        .connection()
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();

    assert_eq!(fk_enabled, 1);
}

#[test]
fn open_creates_database_file_and_directory() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("nested").join("pathfork.db");

    let result = Database::open(&db_path);
    assert!(result.is_ok());
    assert!(db_path.exists());
}

#[test]
fn reopen_is_idempotent() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("pathfork.db");

    {
        let db = Database::open(&db_path).unwrap();
        db.transaction(|tx| insert(tx, &NewUser { email: "a@b.com" }))
            .unwrap();
    }

    let db = Database::open(&db_path).unwrap();
    assert_eq!(count(&db, "tbl_user"), 1);
}

#[test]
fn insert_returns_generated_id() {
    let db = Database::in_memory().unwrap();

    let first = db
        .transaction(|tx| insert(tx, &NewUser { email: "a@b.com" }))
        .unwrap();
    let second = db
        .transaction(|tx| insert(tx, &NewUser { email: "c@d.com" }))
        .unwrap();

    assert!(first > 0);
    assert!(second > first);
}

#[test]
fn insert_without_returned_row_yields_zero() {
    let db = Database::in_memory().unwrap();

    let id = db
        .transaction(|tx| {
            insert(tx, &NewUser { email: "a@b.com" })?;
            insert(tx, &IgnoredUser { email: "a@b.com" })
        })
        .unwrap();

    assert_eq!(id, 0);
    assert_eq!(count(&db, "tbl_user"), 1);
}

#[test]
fn failed_insert_rolls_back_the_whole_transaction() {
    let db = Database::in_memory().unwrap();

    let result = db.transaction(|tx| {
        insert(tx, &NewUser { email: "a@b.com" })?;
        insert(tx, &NewUser { email: "a@b.com" })
    });

    assert!(result.is_err());
    assert_eq!(count(&db, "tbl_user"), 0);
}

#[test]
fn duplicate_insert_is_a_constraint_violation() {
    let db = Database::in_memory().unwrap();

    let error = db
        .transaction(|tx| {
            insert(tx, &NewUser { email: "a@b.com" })?;
            insert(tx, &NewUser { email: "a@b.com" })
        })
        .unwrap_err();
    assert!(is_constraint_violation(&error));
    assert!(!is_constraint_violation(&anyhow::anyhow!("something else")));
}

#[test]
fn closure_error_rolls_back() {
    let db = Database::in_memory().unwrap();

    let result: anyhow::Result<()> = db.transaction(|tx| {
        insert(tx, &NewUser { email: "a@b.com" })?;
        anyhow::bail!("downstream failure")
    });

    assert!(result.is_err());
    assert_eq!(count(&db, "tbl_user"), 0);
}

#[test]
fn query_decodes_every_row() {
    let db = Database::in_memory().unwrap();
    db.transaction(|tx| {
        insert(tx, &NewUser { email: "a@b.com" })?;
        insert(tx, &NewUser { email: "c@d.com" })
    })
    .unwrap();

    let emails = Query::new(
        "SELECT email FROM tbl_user ORDER BY email",
        vec![],
        |row| row.get::<_, String>(0),
    );

    assert_eq!(
        query(&db.connection(), &emails).unwrap(),
        vec!["a@b.com".to_string(), "c@d.com".to_string()]
    );
}

#[test]
fn one_bad_row_fails_the_whole_query() {
    let db = Database::in_memory().unwrap();
    db.transaction(|tx| {
        insert(tx, &NewUser { email: "a@b.com" })?;
        insert(tx, &NewUser { email: "c@d.com" })
    })
    .unwrap();

    let picky = Query::new("SELECT email FROM tbl_user", vec![], |row| {
        let email: String = row.get(0)?;
        if email.starts_with('c') {
            Err(rusqlite::Error::InvalidQuery)
        } else {
            Ok(email)
        }
    });

    assert!(query(&db.connection(), &picky).is_err());
}

#[test]
fn query_one_returns_none_for_empty_result() {
    let db = Database::in_memory().unwrap();
    let missing = Query::new(
        "SELECT email FROM tbl_user WHERE user_id = ?1",
        vec![Value::Integer(42)],
        |row| row.get::<_, String>(0),
    );

    assert_eq!(query_one(&db.connection(), &missing).unwrap(), None);
}

#[test]
fn delete_by_id_cascades_to_children() {
    let db = Database::in_memory().unwrap();
    let work_id = db
        .transaction(|tx| {
            insert(tx, &NewUser { email: "a@b.com" })?;
            let work_id = insert(
                tx,
                &NewWork {
                    title: "Novel",
                    email: "a@b.com",
                },
            )?;
            tx.execute(
                "INSERT INTO tbl_section (title, user_email, work_id) VALUES ('One', 'a@b.com', ?1)",
                [work_id],
            )?;
            Ok(work_id)
        })
        .unwrap();

    assert!(delete_by_id(&db, Table::Work, work_id).unwrap());
    assert_eq!(count(&db, "tbl_work"), 0);
    assert_eq!(count(&db, "tbl_section"), 0);
}

#[test]
fn delete_by_id_reports_missing_rows() {
    let db = Database::in_memory().unwrap();

    assert!(!delete_by_id(&db, Table::Character, 999).unwrap());
}

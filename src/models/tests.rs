use super::*;
use crate::Database;
use crate::db::{insert, query, query_one, update};

fn seed_user(db: &Database, email: &str) {
    let user = User::new(email, "password").unwrap();
    db.transaction(|tx| insert(tx, &user)).unwrap();
}

fn seed_work(db: &Database, title: &str, email: &str) -> WorkId {
    let work = Work::new(title, "", email);
    WorkId::new(db.transaction(|tx| insert(tx, &work)).unwrap())
}

fn seed_section(db: &Database, work_id: WorkId, title: &str, email: &str) -> SectionId {
    let section = Section::new(title, "", "some words here", work_id, email, false);
    SectionId::new(db.transaction(|tx| insert(tx, &section)).unwrap())
}

fn seed_element(db: &Database, kind: ElementKind, name: &str, email: &str) -> ElementId {
    let element = Element::new(kind, name, "", "", email);
    ElementId::new(db.transaction(|tx| insert(tx, &element)).unwrap())
}

fn linked_ids(db: &Database, kind: ElementKind, work_id: WorkId) -> Vec<i64> {
    query(&db.connection(), &Element::for_work(kind, work_id))
        .unwrap()
        .into_iter()
        .map(|element| element.id.get())
        .collect()
}

#[test]
fn user_lookup_normalizes_email() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "Writer@Example.com");

    let user = query_one(&db.connection(), &User::by_email(" WRITER@example.com "))
        .unwrap()
        .expect("user should exist");

    assert_eq!(user.email, "writer@example.com");
    assert!(!user.verified);
    assert!(user.check_password("password"));
    assert!(!user.check_password("Password"));
}

#[test]
fn user_verification_and_password_reset_persist() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");

    db.transaction(|tx| {
        User::mark_verified(tx, "a@b.com")?;
        User::update_password(tx, "a@b.com", "new-password")
    })
    .unwrap();

    let user = query_one(&db.connection(), &User::by_email("a@b.com"))
        .unwrap()
        .unwrap();
    assert!(user.verified);
    assert!(user.check_password("new-password"));
    assert!(!user.check_password("password"));
}

#[test]
fn delete_unverified_spares_verified_accounts() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "new@b.com");
    seed_user(&db, "old@b.com");
    db.transaction(|tx| User::mark_verified(tx, "old@b.com")).unwrap();

    db.transaction(|tx| {
        User::delete_unverified(tx, "new@b.com")?;
        User::delete_unverified(tx, "old@b.com")
    })
    .unwrap();

    let conn = db.connection();
    assert!(query_one(&conn, &User::by_email("new@b.com")).unwrap().is_none());
    assert!(query_one(&conn, &User::by_email("old@b.com")).unwrap().is_some());
}

#[test]
fn work_round_trips_and_blurb_may_be_empty() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let id = seed_work(&db, "Novel", "a@b.com");

    let work = query_one(&db.connection(), &Work::by_id(id)).unwrap().unwrap();
    assert_eq!(work.title, "Novel");
    assert_eq!(work.blurb, "");
    assert!(work.is_owned_by("a@b.com"));
    assert!(!work.is_owned_by("other@b.com"));
    assert!(!work.is_owned_by(""));
}

#[test]
fn work_update_changes_title_and_blurb() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let id = seed_work(&db, "Draft", "a@b.com");

    let mut work = query_one(&db.connection(), &Work::by_id(id)).unwrap().unwrap();
    work.title = "Final".to_string();
    work.blurb = "A story".to_string();
    db.transaction(|tx| update(tx, &work)).unwrap();

    let saved = query_one(&db.connection(), &Work::by_id(id)).unwrap().unwrap();
    assert_eq!(saved.title, "Final");
    assert_eq!(saved.blurb, "A story");
}

#[test]
fn clearing_optional_text_on_update_stores_null() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let work_id = seed_work(&db, "Draft", "a@b.com");
    let section_id = seed_section(&db, work_id, "One", "a@b.com");
    let element_id = seed_element(&db, ElementKind::Character, "Ann", "a@b.com");

    let mut work = query_one(&db.connection(), &Work::by_id(work_id)).unwrap().unwrap();
    work.blurb = "Something".to_string();
    db.transaction(|tx| update(tx, &work)).unwrap();
    work.blurb = String::new();
    db.transaction(|tx| update(tx, &work)).unwrap();

    let mut section = query_one(&db.connection(), &Section::by_id(section_id)).unwrap().unwrap();
    section.body = String::new();
    db.transaction(|tx| update(tx, &section)).unwrap();

    let mut element = query_one(&db.connection(), &Element::by_id(ElementKind::Character, element_id)).unwrap().unwrap();
    element.blurb = "Tall".to_string();
    db.transaction(|tx| update(tx, &element)).unwrap();
    element.blurb = String::new();
    db.transaction(|tx| update(tx, &element)).unwrap();

    let conn = db.connection();
    let stored = |sql: &str, id: i64| -> Option<String> {
        conn.query_row(sql, [id], |row| row.get(0)).unwrap()
    };
    assert_eq!(stored("SELECT blurb FROM tbl_work WHERE work_id = ?1", work_id.get()), None);
    assert_eq!(stored("SELECT body FROM tbl_section WHERE section_id = ?1", section_id.get()), None);
    assert_eq!(stored("SELECT blurb FROM tbl_character WHERE character_id = ?1", element_id.get()), None);
}

#[test]
fn works_for_user_only_lists_own_works() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    seed_user(&db, "c@d.com");
    seed_work(&db, "Mine", "a@b.com");
    seed_work(&db, "Theirs", "c@d.com");

    let works = query(&db.connection(), &Work::for_user("a@b.com")).unwrap();
    assert_eq!(works.len(), 1);
    assert_eq!(works[0].title, "Mine");
}

#[test]
fn section_detail_includes_body_and_list_does_not() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let work_id = seed_work(&db, "Novel", "a@b.com");
    let section_id = seed_section(&db, work_id, "One", "a@b.com");

    let detail = query_one(&db.connection(), &Section::by_id(section_id))
        .unwrap()
        .unwrap();
    assert_eq!(detail.body, "some words here");
    assert_eq!(detail.word_count, 3);
    assert_eq!(detail.order, Some(DEFAULT_SECTION_ORDER));

    let list = query(&db.connection(), &Section::for_work(work_id)).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].body, "");
}

#[test]
fn relation_insert_then_delete_leaves_nothing() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let work_id = seed_work(&db, "Novel", "a@b.com");
    let alice = seed_element(&db, ElementKind::Character, "Alice", "a@b.com");
    let bob = seed_element(&db, ElementKind::Character, "Bob", "a@b.com");
    let ids = vec![alice.get(), bob.get()];

    db.transaction(|tx| {
        update_relations(
            tx,
            &RelationUpdate::new(Relation::WorkCharacters, work_id.get(), ids.clone(), vec![]),
        )
    })
    .unwrap();
    assert_eq!(linked_ids(&db, ElementKind::Character, work_id), ids);

    db.transaction(|tx| {
        update_relations(
            tx,
            &RelationUpdate::new(Relation::WorkCharacters, work_id.get(), vec![], ids.clone()),
        )
    })
    .unwrap();
    assert!(linked_ids(&db, ElementKind::Character, work_id).is_empty());
}

#[test]
fn conflicting_insert_without_ignore_fails_and_rolls_back() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let work_id = seed_work(&db, "Novel", "a@b.com");
    let alice = seed_element(&db, ElementKind::Character, "Alice", "a@b.com");
    let bob = seed_element(&db, ElementKind::Character, "Bob", "a@b.com");

    db.transaction(|tx| {
        update_relations(
            tx,
            &RelationUpdate::new(Relation::WorkCharacters, work_id.get(), vec![alice.get()], vec![]),
        )
    })
    .unwrap();

    let result = db.transaction(|tx| {
        update_relations(
            tx,
            &RelationUpdate::new(
                Relation::WorkCharacters,
                work_id.get(),
                vec![bob.get(), alice.get()],
                vec![],
            ),
        )
    });

    assert!(result.is_err());
    assert_eq!(linked_ids(&db, ElementKind::Character, work_id), vec![alice.get()]);
}

#[test]
fn additions_only_ignores_existing_pairs() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let work_id = seed_work(&db, "Novel", "a@b.com");
    let moor = seed_element(&db, ElementKind::Setting, "Moor", "a@b.com");

    for _ in 0..2 {
        db.transaction(|tx| {
            update_relations(
                tx,
                &RelationUpdate::additions_only(Relation::WorkSettings, work_id.get(), vec![moor.get()]),
            )
        })
        .unwrap();
    }

    assert_eq!(linked_ids(&db, ElementKind::Setting, work_id), vec![moor.get()]);
}

#[test]
fn empty_update_is_a_no_op() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let work_id = seed_work(&db, "Novel", "a@b.com");

    db.transaction(|tx| {
        update_relations(
            tx,
            &RelationUpdate::new(Relation::WorkCharacters, work_id.get(), vec![], vec![]),
        )
    })
    .unwrap();

    assert!(linked_ids(&db, ElementKind::Character, work_id).is_empty());
}

#[test]
fn left_for_right_finds_works_and_sections() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let work_id = seed_work(&db, "Novel", "a@b.com");
    let section_id = seed_section(&db, work_id, "One", "a@b.com");
    let alice = seed_element(&db, ElementKind::Character, "Alice", "a@b.com");

    db.transaction(|tx| {
        update_relations(
            tx,
            &RelationUpdate::new(Relation::SectionCharacters, section_id.get(), vec![alice.get()], vec![]),
        )?;
        update_relations(
            tx,
            &RelationUpdate::additions_only(Relation::WorkCharacters, work_id.get(), vec![alice.get()]),
        )
    })
    .unwrap();

    let conn = db.connection();
    let works = query(&conn, &Work::for_element(ElementKind::Character, alice)).unwrap();
    let sections = query(&conn, &Section::for_element(ElementKind::Character, alice)).unwrap();
    let characters = query(&conn, &Element::for_section(ElementKind::Character, section_id)).unwrap();

    assert_eq!(works.len(), 1);
    assert_eq!(works[0].id, work_id);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].id, section_id);
    assert_eq!(characters.len(), 1);
    assert_eq!(characters[0].name, "Alice");
}

#[test]
fn elements_for_user_are_sorted_by_name() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    seed_element(&db, ElementKind::Character, "Zed", "a@b.com");
    seed_element(&db, ElementKind::Character, "Amy", "a@b.com");
    seed_element(&db, ElementKind::Setting, "Castle", "a@b.com");

    let names: Vec<String> = query(
        &db.connection(),
        &Element::for_user(ElementKind::Character, "a@b.com"),
    )
    .unwrap()
    .into_iter()
    .map(|element| element.name)
    .collect();

    assert_eq!(names, vec!["Amy", "Zed"]);
}

#[test]
fn reorder_is_scoped_to_its_work() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let work_a = seed_work(&db, "A", "a@b.com");
    let work_b = seed_work(&db, "B", "a@b.com");
    let first = seed_section(&db, work_a, "First", "a@b.com");
    let second = seed_section(&db, work_a, "Second", "a@b.com");
    let foreign = seed_section(&db, work_b, "Foreign", "a@b.com");

    let raw = format!("{}-2,{}-1,{}-5", first, second, foreign);
    let updated = db
        .transaction(|tx| Ok(reorder_sections(tx, &raw, work_a)?))
        .unwrap();
    assert_eq!(updated, 2);

    let conn = db.connection();
    let order_of = |id| {
        query_one(&conn, &Section::by_id(id))
            .unwrap()
            .unwrap()
            .order
    };
    assert_eq!(order_of(first), Some(2));
    assert_eq!(order_of(second), Some(1));
    assert_eq!(order_of(foreign), Some(DEFAULT_SECTION_ORDER));
}

#[test]
fn malformed_reorder_changes_nothing() {
    let db = Database::in_memory().unwrap();
    seed_user(&db, "a@b.com");
    let work_id = seed_work(&db, "A", "a@b.com");
    let section_id = seed_section(&db, work_id, "First", "a@b.com");

    let raw = format!("{}-1,nonsense", section_id);
    let result = db.transaction(|tx| Ok(reorder_sections(tx, &raw, work_id)?));

    assert!(result.is_err());
    let section = query_one(&db.connection(), &Section::by_id(section_id))
        .unwrap()
        .unwrap();
    assert_eq!(section.order, Some(DEFAULT_SECTION_ORDER));
}

/// Complete database schema for Pathfork.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// Join tables cascade on both sides so deleting a work, section,
/// character or setting never leaves dangling association rows.
pub const INITIAL_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tbl_user (
    user_id INTEGER PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    pw TEXT NOT NULL,
    verified INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tbl_work (
    work_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    blurb TEXT,
    user_email TEXT NOT NULL REFERENCES tbl_user(email)
);

CREATE TABLE IF NOT EXISTS tbl_section (
    section_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    blurb TEXT,
    body TEXT,
    user_email TEXT NOT NULL REFERENCES tbl_user(email),
    work_id INTEGER NOT NULL REFERENCES tbl_work(work_id) ON DELETE CASCADE,
    section_order INTEGER,
    is_snippet INTEGER NOT NULL DEFAULT 0,
    word_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tbl_character (
    character_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    blurb TEXT,
    body TEXT,
    user_email TEXT NOT NULL REFERENCES tbl_user(email)
);

CREATE TABLE IF NOT EXISTS tbl_setting (
    setting_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    blurb TEXT,
    body TEXT,
    user_email TEXT NOT NULL REFERENCES tbl_user(email)
);

CREATE TABLE IF NOT EXISTS r_works_characters (
    work_id INTEGER NOT NULL REFERENCES tbl_work(work_id) ON DELETE CASCADE,
    character_id INTEGER NOT NULL REFERENCES tbl_character(character_id) ON DELETE CASCADE,
    PRIMARY KEY (work_id, character_id)
);

CREATE TABLE IF NOT EXISTS r_works_settings (
    work_id INTEGER NOT NULL REFERENCES tbl_work(work_id) ON DELETE CASCADE,
    setting_id INTEGER NOT NULL REFERENCES tbl_setting(setting_id) ON DELETE CASCADE,
    PRIMARY KEY (work_id, setting_id)
);

CREATE TABLE IF NOT EXISTS r_sections_characters (
    section_id INTEGER NOT NULL REFERENCES tbl_section(section_id) ON DELETE CASCADE,
    character_id INTEGER NOT NULL REFERENCES tbl_character(character_id) ON DELETE CASCADE,
    PRIMARY KEY (section_id, character_id)
);

CREATE TABLE IF NOT EXISTS r_sections_settings (
    section_id INTEGER NOT NULL REFERENCES tbl_section(section_id) ON DELETE CASCADE,
    setting_id INTEGER NOT NULL REFERENCES tbl_setting(setting_id) ON DELETE CASCADE,
    PRIMARY KEY (section_id, setting_id)
);

CREATE INDEX IF NOT EXISTS idx_work_user ON tbl_work(user_email);
CREATE INDEX IF NOT EXISTS idx_section_work ON tbl_section(work_id);
CREATE INDEX IF NOT EXISTS idx_character_user ON tbl_character(user_email);
CREATE INDEX IF NOT EXISTS idx_setting_user ON tbl_setting(user_email);
CREATE INDEX IF NOT EXISTS idx_works_characters_right ON r_works_characters(character_id);
CREATE INDEX IF NOT EXISTS idx_works_settings_right ON r_works_settings(setting_id);
CREATE INDEX IF NOT EXISTS idx_sections_characters_right ON r_sections_characters(character_id);
CREATE INDEX IF NOT EXISTS idx_sections_settings_right ON r_sections_settings(setting_id);
"#;

/// Entity tables that can be removed through the generic delete helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Work,
    Section,
    Character,
    Setting,
}

impl Table {
    /// Returns the SQL table name.
    pub fn name(self) -> &'static str {
        match self {
            Table::Work => "tbl_work",
            Table::Section => "tbl_section",
            Table::Character => "tbl_character",
            Table::Setting => "tbl_setting",
        }
    }

    /// Returns the primary key column.
    pub fn key(self) -> &'static str {
        match self {
            Table::Work => "work_id",
            Table::Section => "section_id",
            Table::Character => "character_id",
            Table::Setting => "setting_id",
        }
    }
}

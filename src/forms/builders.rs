//! Constructors for every form the site renders.

use super::{Field, Form, SelectOption, current_ids};
use crate::models::ElementKind;

pub fn contact_form() -> Form {
    Form::new([
        Field::email("Email", "email", true),
        Field::text_area("Message", "message", true),
    ])
}

pub fn signup_form() -> Form {
    Form::new([
        Field::email("Email", "email", true),
        Field::password("Password", "password"),
        Field::password("Repeat Password", "repeatPassword"),
    ])
}

pub fn signin_form() -> Form {
    Form::new([
        Field::email("Email", "email", true),
        Field::password("Password", "password"),
    ])
}

pub fn request_reset_form() -> Form {
    Form::new([Field::email("Email address", "email", true)])
}

pub fn reset_password_form() -> Form {
    Form::new([
        Field::password("New Password", "newPassword"),
        Field::password("Repeat Password", "repeatPassword"),
    ])
}

/// Work form. The hidden current-id fields carry the pre-edit selection so
/// a submission can be diffed against it.
pub fn work_form(
    characters: Vec<SelectOption>,
    settings: Vec<SelectOption>,
    csrf_token: &str,
) -> Form {
    Form::new([
        Field::text("Title", "title", true),
        Field::text_area("Blurb", "blurb", false),
        Field::hidden("currentCharIds", current_ids(&characters)),
        Field::hidden("currentSettingIds", current_ids(&settings)),
        Field::multi_select("Characters", "characters", false, characters),
        Field::multi_select("Settings", "settings", false, settings),
        Field::csrf(csrf_token),
    ])
}

pub fn section_form(
    characters: Vec<SelectOption>,
    settings: Vec<SelectOption>,
    csrf_token: &str,
) -> Form {
    Form::new([
        Field::text("Section Title", "title", true),
        Field::text_area("Blurb", "blurb", false),
        Field::text_area("Body", "body", false),
        Field::checkbox("This is a snippet", "snippet"),
        Field::hidden("currentCharIds", current_ids(&characters)),
        Field::hidden("currentSettingIds", current_ids(&settings)),
        Field::multi_select("Characters", "characters", false, characters),
        Field::multi_select("Settings", "settings", false, settings),
        Field::csrf(csrf_token),
    ])
}

/// Character and setting forms are identical.
pub fn element_form(_kind: ElementKind, csrf_token: &str) -> Form {
    Form::new([
        Field::text("Name", "name", true),
        Field::text_area("Blurb", "blurb", false),
        Field::text_area("Body", "body", false),
        Field::csrf(csrf_token),
    ])
}

pub fn delete_form(object_id: i64, csrf_token: &str) -> Form {
    Form::new([
        Field::hidden("object_id", object_id.to_string()),
        Field::csrf(csrf_token),
    ])
}

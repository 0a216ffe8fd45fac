//! HTML forms: fields, population from submitted data, validation, and
//! rendering.
//!
//! A [`Form`] is a set of named [`Field`]s plus form-level errors. Handlers
//! build one with the functions in [`builders`], copy the request's values in
//! with [`Form::populate`], and check it with [`Form::validate`].

pub mod builders;
mod data;
mod fields;
mod options;

use std::collections::BTreeMap;

use crate::render::RenderError;

pub use builders::{
    contact_form, delete_form, element_form, request_reset_form, reset_password_form,
    section_form, signin_form, signup_form, work_form,
};
pub use data::FormData;
pub use fields::{
    CSRF_EXPIRED_MESSAGE, CsrfContext, Field, InputType, REQUIRED_MESSAGE, SELECT_ONE_MESSAGE,
};
pub use options::{SelectOption, current_ids, element_options, relation_update_ids, strings_to_ids};

/// Rows and columns for text areas rendered without an explicit size.
const DEFAULT_TEXT_AREA_SIZE: (u32, u32) = (5, 80);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: BTreeMap<&'static str, Field>,
    errors: Vec<String>,
}

impl Form {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().map(|field| (field.name(), field)).collect(),
            errors: Vec::new(),
        }
    }

    /// Copies submitted values into the fields whose names are present.
    /// Fields absent from `data` keep what they had.
    pub fn populate(&mut self, data: &FormData) {
        for (name, field) in &mut self.fields {
            if data.contains(name) {
                field.set_data(&data.get_all(name));
            }
        }
    }

    /// Validates every field, recording errors on each, and returns whether
    /// all passed. Form-level errors added earlier also fail the form.
    pub fn validate(&mut self, csrf: &CsrfContext<'_>) -> bool {
        let mut valid = self.errors.is_empty();
        for field in self.fields.values_mut() {
            valid &= field.validate(csrf);
        }
        valid
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// First value of `name`, or `""` when the field is unknown or empty.
    pub fn value(&self, name: &str) -> &str {
        self.fields.get(name).map(Field::value).unwrap_or("")
    }

    pub fn checked(&self, name: &str) -> bool {
        self.value(name) == "on"
    }

    /// Prefills a field, typically from a stored entity.
    pub fn set_value(&mut self, name: &str, value: &str) {
        if let Some(field) = self.fields.get_mut(name) {
            field.set_data(&[value]);
        }
    }

    pub fn clear(&mut self, name: &str) {
        if let Some(field) = self.fields.get_mut(name) {
            field.set_data(&[]);
        }
    }

    pub fn field_error(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Field::error)
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn render_field(&self, name: &str) -> Result<String, RenderError> {
        self.render_field_sized(name, DEFAULT_TEXT_AREA_SIZE.0, DEFAULT_TEXT_AREA_SIZE.1)
    }

    /// Renders one field; `rows` and `cols` only apply to text areas.
    pub fn render_field_sized(&self, name: &str, rows: u32, cols: u32) -> Result<String, RenderError> {
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| RenderError::MissingField(name.to_string()))?;
        let mut out = String::new();
        field.render(&mut out, (rows, cols))?;
        Ok(out)
    }
}

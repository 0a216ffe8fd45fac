use std::fmt::Write;

use super::SelectOption;
use crate::auth::{KIND_CSRF, TokenSigner};
use crate::render::escape;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const SELECT_ONE_MESSAGE: &str = "Please only select one.";
pub const CSRF_EXPIRED_MESSAGE: &str = "Sorry, this form expired. Please submit it again.";

/// What a CSRF field checks its submitted token against.
pub struct CsrfContext<'a> {
    pub signer: &'a TokenSigner,
    /// The signed-in user's email; tokens are bound to it.
    pub email: &'a str,
    pub max_age_minutes: u64,
}

/// `type` attribute of a single-line input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Text,
    Email,
    Password,
}

impl InputType {
    fn as_str(self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Email => "email",
            InputType::Password => "password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub label: String,
    pub name: &'static str,
    pub required: bool,
    pub input_type: InputType,
    pub value: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxField {
    pub label: String,
    pub name: &'static str,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenField {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectField {
    pub label: String,
    pub name: &'static str,
    pub required: bool,
    pub multiple: bool,
    pub options: Vec<SelectOption>,
    pub selected: Vec<String>,
    pub error: Option<String>,
}

/// Hidden CSRF token.
///
/// `token` is the fresh token rendered into the page; `submitted` is what
/// came back with the request. A form missing its token never validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfField {
    pub token: String,
    pub submitted: Option<String>,
    pub expired: bool,
}

/// One form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Text(TextField),
    TextArea(TextField),
    Checkbox(CheckboxField),
    Hidden(HiddenField),
    Select(SelectField),
    Csrf(CsrfField),
}

impl Field {
    pub fn text(label: impl Into<String>, name: &'static str, required: bool) -> Self {
        Field::Text(TextField {
            label: label.into(),
            name,
            required,
            input_type: InputType::Text,
            value: None,
            error: None,
        })
    }

    pub fn email(label: impl Into<String>, name: &'static str, required: bool) -> Self {
        Field::Text(TextField {
            input_type: InputType::Email,
            ..Self::text_field(label, name, required)
        })
    }

    pub fn password(label: impl Into<String>, name: &'static str) -> Self {
        Field::Text(TextField {
            input_type: InputType::Password,
            ..Self::text_field(label, name, true)
        })
    }

    pub fn text_area(label: impl Into<String>, name: &'static str, required: bool) -> Self {
        Field::TextArea(Self::text_field(label, name, required))
    }

    pub fn checkbox(label: impl Into<String>, name: &'static str) -> Self {
        Field::Checkbox(CheckboxField {
            label: label.into(),
            name,
            checked: false,
        })
    }

    pub fn hidden(name: &'static str, value: impl Into<String>) -> Self {
        Field::Hidden(HiddenField {
            name,
            value: value.into(),
        })
    }

    /// A multi-select; the initially selected values come from the options.
    pub fn multi_select(
        label: impl Into<String>,
        name: &'static str,
        required: bool,
        options: Vec<SelectOption>,
    ) -> Self {
        let selected = options
            .iter()
            .filter(|option| option.selected)
            .map(|option| option.value.clone())
            .collect();
        Field::Select(SelectField {
            label: label.into(),
            name,
            required,
            multiple: true,
            options,
            selected,
            error: None,
        })
    }

    pub fn csrf(token: impl Into<String>) -> Self {
        Field::Csrf(CsrfField {
            token: token.into(),
            submitted: None,
            expired: false,
        })
    }

    fn text_field(label: impl Into<String>, name: &'static str, required: bool) -> TextField {
        TextField {
            label: label.into(),
            name,
            required,
            input_type: InputType::Text,
            value: None,
            error: None,
        }
    }

    /// Name the field is submitted under.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Text(f) | Field::TextArea(f) => f.name,
            Field::Checkbox(f) => f.name,
            Field::Hidden(f) => f.name,
            Field::Select(f) => f.name,
            Field::Csrf(_) => "csrf",
        }
    }

    /// Stores submitted (or prefilled) values.
    pub fn set_data(&mut self, values: &[&str]) {
        match self {
            Field::Text(f) | Field::TextArea(f) => {
                f.value = values.first().map(|v| v.to_string());
            }
            Field::Checkbox(f) => f.checked = values.first() == Some(&"on"),
            Field::Hidden(f) => f.value = values.first().map(|v| v.to_string()).unwrap_or_default(),
            Field::Select(f) => {
                f.selected = values.iter().map(|v| v.to_string()).collect();
                for option in &mut f.options {
                    option.selected = f.selected.contains(&option.value);
                }
            }
            Field::Csrf(f) => f.submitted = values.first().map(|v| v.to_string()),
        }
    }

    /// First value, or `""`.
    pub fn value(&self) -> &str {
        match self {
            Field::Text(f) | Field::TextArea(f) => f.value.as_deref().unwrap_or(""),
            Field::Checkbox(f) => {
                if f.checked {
                    "on"
                } else {
                    ""
                }
            }
            Field::Hidden(f) => &f.value,
            Field::Select(f) => f.selected.first().map(String::as_str).unwrap_or(""),
            Field::Csrf(f) => f.submitted.as_deref().unwrap_or(&f.token),
        }
    }

    /// Runs this field's checks, recording any error on the field.
    pub fn validate(&mut self, csrf: &CsrfContext<'_>) -> bool {
        match self {
            Field::Text(f) | Field::TextArea(f) => {
                let empty = f.value.as_deref().is_none_or(str::is_empty);
                if f.required && empty {
                    f.error = Some(REQUIRED_MESSAGE.to_string());
                    return false;
                }
                f.error = None;
                true
            }
            Field::Checkbox(_) | Field::Hidden(_) => true,
            Field::Select(f) => {
                if f.required && f.selected.is_empty() {
                    f.error = Some(REQUIRED_MESSAGE.to_string());
                    return false;
                }
                if !f.multiple && f.selected.len() > 1 {
                    f.error = Some(SELECT_ONE_MESSAGE.to_string());
                    return false;
                }
                f.error = None;
                true
            }
            Field::Csrf(f) => {
                let verified = f.submitted.as_deref().and_then(|token| {
                    csrf.signer
                        .verify_timestamped(KIND_CSRF, token, csrf.max_age_minutes)
                        .ok()
                });
                let valid = !csrf.email.is_empty() && verified.as_deref() == Some(csrf.email);
                if !valid {
                    tracing::info!("Rejected CSRF token for {:?}", csrf.email);
                }
                f.expired = !valid;
                valid
            }
        }
    }

    /// The error message currently attached to the field, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Field::Text(f) | Field::TextArea(f) => f.error.as_deref(),
            Field::Select(f) => f.error.as_deref(),
            Field::Csrf(f) if f.expired => Some(CSRF_EXPIRED_MESSAGE),
            _ => None,
        }
    }

    /// Renders the field as HTML. `size` gives `(rows, cols)` for text areas.
    pub fn render(&self, out: &mut String, size: (u32, u32)) -> std::fmt::Result {
        match self {
            Field::Text(f) => {
                let required = if f.required { " required" } else { "" };
                write!(
                    out,
                    r#"<label>{}</label> <input class="form-control" type="{}" name="{}""#,
                    escape(&f.label),
                    f.input_type.as_str(),
                    f.name
                )?;
                if f.input_type != InputType::Password
                    && let Some(value) = &f.value
                {
                    write!(out, r#" value="{}""#, escape(value))?;
                }
                write!(out, "{required}>")?;
            }
            Field::TextArea(f) => {
                let required = if f.required { " required" } else { "" };
                write!(
                    out,
                    r#"<label>{}</label> <textarea rows="{}" cols="{}" class="form-control" name="{}"{required}>{}</textarea>"#,
                    escape(&f.label),
                    size.0,
                    size.1,
                    f.name,
                    escape(f.value.as_deref().unwrap_or(""))
                )?;
            }
            Field::Checkbox(f) => {
                let checked = if f.checked { " checked" } else { "" };
                write!(
                    out,
                    r#"<label><input type="checkbox" name="{}"{checked}> {}</label>"#,
                    f.name,
                    escape(&f.label)
                )?;
            }
            Field::Hidden(f) => {
                write!(
                    out,
                    r#"<input type="hidden" name="{}" value="{}">"#,
                    f.name,
                    escape(&f.value)
                )?;
            }
            Field::Select(f) => {
                let multiple = if f.multiple { " multiple" } else { "" };
                let required = if f.required { " required" } else { "" };
                write!(
                    out,
                    r#"<label>{}</label><select class="chosen-select form-control" name="{}"{multiple}{required}>"#,
                    escape(&f.label),
                    f.name
                )?;
                for option in &f.options {
                    let selected = if option.selected { " selected" } else { "" };
                    write!(
                        out,
                        r#"<option value="{}"{selected}>{}</option>"#,
                        escape(&option.value),
                        escape(&option.text)
                    )?;
                }
                out.push_str("</select>");
            }
            Field::Csrf(f) => {
                write!(
                    out,
                    r#"<input type="hidden" name="csrf" value="{}">"#,
                    escape(&f.token)
                )?;
            }
        }

        if let Some(error) = self.error() {
            write!(out, r#"<br /><span class="form-error">{}</span>"#, escape(error))?;
        }
        Ok(())
    }
}

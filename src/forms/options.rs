use super::FormData;
use crate::models::Element;

/// One `<option>` of a select field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
            selected,
        }
    }
}

/// Turns the user's characters or settings into select options, marking
/// the ones already attached.
pub fn element_options(all: &[Element], attached: &[Element]) -> Vec<SelectOption> {
    all.iter()
        .map(|element| {
            let selected = attached.iter().any(|a| a.id == element.id);
            SelectOption::new(element.id.to_string(), element.name.clone(), selected)
        })
        .collect()
}

/// Comma-joined values of the selected options, for the hidden
/// "current ids" field.
pub fn current_ids(options: &[SelectOption]) -> String {
    options
        .iter()
        .filter(|option| option.selected)
        .map(|option| option.value.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses id strings, skipping empty entries.
///
/// Returns `None` when any non-empty entry is not an integer.
pub fn strings_to_ids<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<Vec<i64>> {
    values
        .into_iter()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.parse().ok())
        .collect()
}

/// Diffs the pre-edit id list in `old_field` against the ids now selected in
/// `new_field`, returning `(insert, delete)`.
///
/// # Examples
///
/// ```
/// use pathfork::forms::{FormData, relation_update_ids};
///
/// let data = FormData::from_pairs([
///     ("currentCharIds", "1,2"),
///     ("characters", "2"),
///     ("characters", "3"),
/// ]);
/// let (insert, delete) = relation_update_ids(&data, "currentCharIds", "characters").unwrap();
/// assert_eq!(insert, vec![3]);
/// assert_eq!(delete, vec![1]);
/// ```
pub fn relation_update_ids(
    data: &FormData,
    old_field: &str,
    new_field: &str,
) -> Option<(Vec<i64>, Vec<i64>)> {
    let old = strings_to_ids(data.value(old_field).split(','))?;
    let new = strings_to_ids(data.get_all(new_field))?;

    let insert = new.iter().filter(|id| !old.contains(id)).copied().collect();
    let delete = old.iter().filter(|id| !new.contains(id)).copied().collect();
    Some((insert, delete))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementId, ElementKind};

    fn element(id: i64, name: &str) -> Element {
        let mut element = Element::new(ElementKind::Character, name, "", "", "a@b.com");
        element.id = ElementId::new(id);
        element
    }

    #[test]
    fn options_mark_attached_elements() {
        let all = vec![element(1, "Alice"), element(2, "Bob"), element(3, "Carol")];
        let attached = vec![element(3, "Carol"), element(1, "Alice")];

        let options = element_options(&all, &attached);
        assert_eq!(options[0], SelectOption::new("1", "Alice", true));
        assert!(!options[1].selected);
        assert_eq!(current_ids(&options), "1,3");
    }

    #[test]
    fn ids_skip_empty_and_reject_garbage() {
        assert_eq!(strings_to_ids(["", "4", " 5 "]), Some(vec![4, 5]));
        assert_eq!(strings_to_ids(["4", "five"]), None);
        assert_eq!(strings_to_ids([""]), Some(vec![]));
    }

    #[test]
    fn diff_with_nothing_before() {
        let data = FormData::from_pairs([("currentSettingIds", ""), ("settings", "7")]);

        assert_eq!(
            relation_update_ids(&data, "currentSettingIds", "settings"),
            Some((vec![7], vec![]))
        );
    }

    #[test]
    fn diff_removes_everything_when_nothing_selected() {
        let data = FormData::from_pairs([("currentCharIds", "1,2")]);

        assert_eq!(
            relation_update_ids(&data, "currentCharIds", "characters"),
            Some((vec![], vec![1, 2]))
        );
    }

    #[test]
    fn diff_rejects_tampered_ids() {
        let data = FormData::from_pairs([("currentCharIds", "1"), ("characters", "x")]);

        assert_eq!(relation_update_ids(&data, "currentCharIds", "characters"), None);
    }
}

// ABOUTME: Display-field derivation for models authored without displayFields
// ABOUTME: Priority-ordered predicate list; the first rule with a matching field wins

use foundry_core::{Field, Model};

/// Name fragments that mark a text field as descriptive
const DESCRIPTIVE_FRAGMENTS: &[&str] = &["title", "label", "description", "category", "type", "species"];

/// One predicate in the display-field priority list
pub struct DisplayRule {
    pub name: &'static str,
    pub matches: fn(&Field) -> bool,
}

fn is_name_like(field: &Field) -> bool {
    let name = field.name.to_lowercase();
    name.contains("name") || name.contains("title")
}

fn is_descriptive_text(field: &Field) -> bool {
    let name = field.name.to_lowercase();
    field.is_text() && DESCRIPTIVE_FRAGMENTS.iter().any(|f| name.contains(f))
}

pub const DISPLAY_RULES: &[DisplayRule] = &[
    DisplayRule {
        name: "name_or_title",
        matches: is_name_like,
    },
    DisplayRule {
        name: "descriptive_text",
        matches: is_descriptive_text,
    },
    DisplayRule {
        name: "first_text",
        matches: Field::is_text,
    },
];

/// Pick the field used to render a record of `model` in relationship contexts.
/// Falls back to the first field; `None` only for a model without fields.
pub fn derive_display_field(model: &Model) -> Option<&Field> {
    DISPLAY_RULES
        .iter()
        .find_map(|rule| model.fields.iter().find(|f| (rule.matches)(f)))
        .or_else(|| model.fields.first())
}

/// Fill in displayFields when absent. Returns true when the model changed.
pub fn apply_display_fields(model: &mut Model) -> bool {
    if model.display_fields.is_some() {
        return false;
    }
    match derive_display_field(model).map(|f| f.name.clone()) {
        Some(name) => {
            model.display_fields = Some(vec![name]);
            true
        }
        None => false,
    }
}

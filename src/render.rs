//! Plain-text description of what a model exposes.

use crate::models::Model;

const DEFAULT: char = '●';
const VALUE: char = '○';

/// Render a model's enumerable attributes with their generated members.
///
/// Example output:
/// ```text
/// Build (builds)
/// └── status: all_status
///     ├── ● completed  completed! completed?  scope completed
///     └── ○ failed  failed! failed?  scope failed
/// ```
pub fn render_model(model: &Model) -> String {
    let mut output = String::new();
    output.push_str(model.name());
    output.push_str(&format!(" ({})", model.collection()));
    if let Some(parent) = model.parent() {
        output.push_str(&format!(" < {parent}"));
    }
    output.push('\n');

    let fields: Vec<_> = model.enum_fields().collect();
    for (i, field) in fields.iter().enumerate() {
        let is_last_field = i == fields.len() - 1;
        let branch = if is_last_field { "└── " } else { "├── " };
        output.push_str(branch);
        output.push_str(&format!("{}: all_{}\n", field.field(), field.field()));

        let prefix = if is_last_field { "    " } else { "│   " };
        let values = field.all_values();
        for (j, value) in values.iter().enumerate() {
            let branch = if j == values.len() - 1 { "└── " } else { "├── " };
            let symbol = if value == field.default_value() {
                DEFAULT
            } else {
                VALUE
            };
            output.push_str(prefix);
            output.push_str(branch);
            output.push_str(&format!(
                "{symbol} {value}  {} {}  scope {}\n",
                field.mutator_name(value),
                field.predicate_name(value),
                field.scope_name(value)
            ));
        }
    }

    output
}

//! Built-in field kinds
//!
//! One module per kind, the way a form library keeps one module per field.
//! All kinds reject settings keys they do not understand, so a typo in a
//! domain definition surfaces as a configuration violation instead of being
//! silently ignored.

pub mod boolean;
pub mod choice;
pub mod embedded;
pub mod integer;
pub mod reference;
pub mod text;

pub use boolean::BooleanType;
pub use choice::ChoiceType;
pub use embedded::EmbeddedType;
pub use integer::IntegerType;
pub use reference::ReferenceType;
pub use text::TextType;

use crate::content::FieldData;
use crate::contenttypes::ContentTypeField;
use crate::validation::ValidationContext;
use serde_json::Value as JsonValue;

// Emits one violation per settings key the kind does not understand.
pub(crate) fn reject_unknown_settings(
	field: &ContentTypeField,
	allowed: &[&str],
	type_tag: &str,
	ctx: &mut ValidationContext,
) {
	for key in field.settings.keys() {
		if !allowed.contains(&key.as_str()) {
			ctx.build_violation("Unknown setting \"{{ setting }}\" for field of type \"{{ type }}\".")
				.parameter("setting", key.as_str())
				.parameter("type", type_tag)
				.at(format!("settings.{key}"))
				.emit();
		}
	}
}

// Shared scalar data check: every non-null row must satisfy `accepts`.
// Null rows are left alone; required-ness is the shape check's concern.
pub(crate) fn validate_scalar_rows(
	data: &FieldData,
	expected: &str,
	accepts: fn(&JsonValue) -> bool,
	ctx: &mut ValidationContext,
) {
	for value in data.rows() {
		if !value.is_null() && !accepts(value) {
			ctx.build_violation("This value should be of type {{ type }}.")
				.parameter("type", expected)
				.emit();
		}
	}
}

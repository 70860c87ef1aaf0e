//! The field-type plugin contract and its dispatch table
//!
//! Every field kind (text, reference, ...) implements [`FieldType`].
//! Dispatch is a table lookup by type tag, so new kinds plug in without
//! touching the registry or the pipeline.

use crate::content::{Content, FieldData};
use crate::contenttypes::{ContentTypeField, ContentTypeManager};
use crate::domain::Domain;
use crate::error::CmsResult;
use crate::validation::ValidationContext;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// The externally-consumable value(s) a field resolves to.
pub enum ResolvedField {
	/// No stored data, or a soft-failed single reference
	Null,
	/// One scalar value
	Value(JsonValue),
	/// Ordered scalar values of a list-valued field
	Values(Vec<JsonValue>),
	/// One referenced entity
	Content(Arc<dyn Content>),
	/// Referenced entities in input row order; dangling references are `None`
	ContentList(Vec<Option<Arc<dyn Content>>>),
}

impl ResolvedField {
	/// Identity resolution: mirrors the raw data shape.
	pub fn from_data(data: &FieldData) -> Self {
		match data {
			FieldData::Single(value) if value.is_null() => ResolvedField::Null,
			FieldData::Single(value) => ResolvedField::Value(value.clone()),
			FieldData::List(rows) => ResolvedField::Values(rows.clone()),
		}
	}
}

impl fmt::Debug for ResolvedField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResolvedField::Null => write!(f, "Null"),
			ResolvedField::Value(value) => f.debug_tuple("Value").field(value).finish(),
			ResolvedField::Values(values) => f.debug_tuple("Values").field(values).finish(),
			ResolvedField::Content(content) => {
				f.debug_tuple("Content").field(&content.id()).finish()
			}
			ResolvedField::ContentList(entries) => {
				let ids: Vec<Option<&str>> = entries
					.iter()
					.map(|entry| entry.as_ref().map(|content| content.id()))
					.collect();
				f.debug_tuple("ContentList").field(&ids).finish()
			}
		}
	}
}

/// Checks that stored data agrees with the field's declared shape.
///
/// Emits violations for a required field without data, a list-valued field
/// holding a single value, and vice versa. Returns `false` when resolution
/// of the data would be meaningless.
pub(crate) fn data_shape_ok(
	field: &ContentTypeField,
	data: Option<&FieldData>,
	ctx: &mut ValidationContext,
) -> bool {
	let Some(data) = data else {
		if field.required {
			ctx.build_violation("This field is required.").emit();
		}
		return false;
	};
	if field.required && matches!(data, FieldData::Single(JsonValue::Null)) {
		ctx.build_violation("This field is required.").emit();
		return false;
	}
	if field.list_of && !data.is_list() {
		ctx.build_violation("This field expects a list of values.")
			.emit();
		return false;
	}
	if !field.list_of && data.is_list() {
		ctx.build_violation("This field does not accept a list of values.")
			.emit();
		return false;
	}
	true
}

/// Capability set implemented by every field kind.
///
/// `validate` and `validate_data` are pure apart from violation
/// accumulation; `resolve` may call out through the domain's content manager
/// but must not mutate the content instance or the field metadata.
#[async_trait]
pub trait FieldType: Send + Sync {
	/// The tag this kind registers under, e.g. `"reference"`.
	fn type_tag(&self) -> &'static str;

	/// Validates a field *declaration*: settings and return-type soundness.
	/// Violations accumulate; nothing is raised.
	fn validate(
		&self,
		field: &ContentTypeField,
		types: &ContentTypeManager,
		ctx: &mut ValidationContext,
	);

	/// Validates stored *data* against the declaration. The default checks
	/// required-ness and list-shape agreement only.
	fn validate_data(
		&self,
		field: &ContentTypeField,
		data: Option<&FieldData>,
		ctx: &mut ValidationContext,
	) {
		data_shape_ok(field, data, ctx);
	}

	/// Maps raw stored data to the externally-consumable value(s).
	async fn resolve(
		&self,
		domain: &Domain,
		content: &dyn Content,
		field: &ContentTypeField,
		data: &FieldData,
	) -> CmsResult<ResolvedField>;
}

/// Type-tag → plugin table.
///
/// Populated once at startup and read concurrently by every request, hence
/// the concurrent map.
#[derive(Default)]
pub struct FieldTypeRegistry {
	types: DashMap<String, Arc<dyn FieldType>>,
}

impl FieldTypeRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a registry with every built-in field kind registered.
	pub fn with_defaults() -> Self {
		let registry = Self::new();
		registry.register(Arc::new(crate::fields::TextType));
		registry.register(Arc::new(crate::fields::IntegerType));
		registry.register(Arc::new(crate::fields::BooleanType));
		registry.register(Arc::new(crate::fields::ChoiceType));
		registry.register(Arc::new(crate::fields::EmbeddedType));
		registry.register(Arc::new(crate::fields::ReferenceType));
		registry
	}

	/// Registers a field kind under its type tag, replacing any previous
	/// registration.
	pub fn register(&self, field_type: Arc<dyn FieldType>) {
		self.types
			.insert(field_type.type_tag().to_string(), field_type);
	}

	/// Looks up the plugin for a type tag.
	pub fn get(&self, type_tag: &str) -> Option<Arc<dyn FieldType>> {
		self.types.get(type_tag).map(|entry| Arc::clone(&entry))
	}

	/// The registered type tags, sorted.
	pub fn type_tags(&self) -> Vec<String> {
		let mut tags: Vec<String> = self.types.iter().map(|entry| entry.key().clone()).collect();
		tags.sort();
		tags
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn defaults_cover_the_built_in_kinds() {
		let registry = FieldTypeRegistry::with_defaults();

		assert_eq!(
			registry.type_tags(),
			vec!["boolean", "choice", "embedded", "integer", "reference", "text"]
		);
		assert!(registry.get("reference").is_some());
		assert!(registry.get("geolocation").is_none());
	}

	#[rstest]
	fn required_field_without_data_is_a_violation() {
		let field = ContentTypeField::new("title", "text").required();
		let mut ctx = ValidationContext::new();

		assert!(!data_shape_ok(&field, None, &mut ctx));
		assert_eq!(ctx.violations().len(), 1);
	}

	#[rstest]
	fn list_shape_must_match_the_declaration() {
		let list_field = ContentTypeField::new("tags", "text").list_of();
		let single_field = ContentTypeField::new("title", "text");
		let mut ctx = ValidationContext::new();

		assert!(!data_shape_ok(
			&list_field,
			Some(&FieldData::single("one")),
			&mut ctx
		));
		assert!(!data_shape_ok(
			&single_field,
			Some(&FieldData::list(vec!["one".into()])),
			&mut ctx
		));
		assert_eq!(ctx.violations().len(), 2);
	}
}

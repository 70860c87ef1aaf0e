//! Choice field: a value picked from a fixed list declared in settings

use super::reject_unknown_settings;
use crate::content::{Content, FieldData};
use crate::contenttypes::{ContentTypeField, ContentTypeManager};
use crate::domain::Domain;
use crate::error::CmsResult;
use crate::field::{FieldType, ResolvedField, data_shape_ok};
use crate::validation::ValidationContext;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Stores one of the strings declared in the `choices` setting.
pub struct ChoiceType;

impl ChoiceType {
	/// Registry type tag.
	pub const TYPE: &'static str = "choice";

	fn choices(field: &ContentTypeField) -> Option<Vec<&str>> {
		field
			.settings
			.get("choices")?
			.as_array()?
			.iter()
			.map(JsonValue::as_str)
			.collect()
	}
}

#[async_trait]
impl FieldType for ChoiceType {
	fn type_tag(&self) -> &'static str {
		Self::TYPE
	}

	fn validate(
		&self,
		field: &ContentTypeField,
		_types: &ContentTypeManager,
		ctx: &mut ValidationContext,
	) {
		reject_unknown_settings(field, &["choices"], Self::TYPE, ctx);

		match Self::choices(field) {
			Some(choices) if !choices.is_empty() => {}
			_ => {
				ctx.build_violation(
					"A field of type \"{{ type }}\" requires a non-empty \"choices\" setting listing its string options.",
				)
				.parameter("type", Self::TYPE)
				.at("settings.choices")
				.emit();
			}
		}
	}

	fn validate_data(
		&self,
		field: &ContentTypeField,
		data: Option<&FieldData>,
		ctx: &mut ValidationContext,
	) {
		if !data_shape_ok(field, data, ctx) {
			return;
		}
		let (Some(data), Some(choices)) = (data, Self::choices(field)) else {
			return;
		};
		for value in data.rows() {
			if value.is_null() {
				continue;
			}
			match value.as_str() {
				Some(choice) if choices.contains(&choice) => {}
				_ => {
					ctx.build_violation("The value {{ value }} is not one of the declared choices.")
						.parameter("value", value.to_string())
						.emit();
				}
			}
		}
	}

	async fn resolve(
		&self,
		_domain: &Domain,
		_content: &dyn Content,
		_field: &ContentTypeField,
		data: &FieldData,
	) -> CmsResult<ResolvedField> {
		Ok(ResolvedField::from_data(data))
	}
}

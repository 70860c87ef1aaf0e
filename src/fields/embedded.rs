//! Embedded field: a nested object typed by an embedded content type

use super::{reject_unknown_settings, validate_scalar_rows};
use crate::content::{Content, FieldData};
use crate::contenttypes::{ContentTypeField, ContentTypeManager};
use crate::domain::Domain;
use crate::error::CmsResult;
use crate::field::{FieldType, ResolvedField, data_shape_ok};
use crate::validation::ValidationContext;
use async_trait::async_trait;

/// Stores a nested object whose schema is an embedded content type.
///
/// Embedded types are never independently queryable, so resolution hands the
/// nested value through unchanged; it is the transport layer that descends
/// into it with the embedded type's schema.
pub struct EmbeddedType;

impl EmbeddedType {
	/// Registry type tag.
	pub const TYPE: &'static str = "embedded";
}

#[async_trait]
impl FieldType for EmbeddedType {
	fn type_tag(&self) -> &'static str {
		Self::TYPE
	}

	fn validate(
		&self,
		field: &ContentTypeField,
		types: &ContentTypeManager,
		ctx: &mut ValidationContext,
	) {
		reject_unknown_settings(field, &[], Self::TYPE, ctx);

		if types
			.get_embedded_content_type(&field.return_type)
			.is_none()
		{
			ctx.build_violation(
				"Invalid return type \"{{ return_type }}\" for field of type \"{{ type }}\". The return type must name a registered embedded content type.",
			)
			.parameter("return_type", field.return_type.as_str())
			.parameter("type", Self::TYPE)
			.at("return_type")
			.emit();
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
		if let Some(data) = data {
			validate_scalar_rows(data, "object", serde_json::Value::is_object, ctx);
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

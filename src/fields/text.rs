//! Plain text field

use super::{reject_unknown_settings, validate_scalar_rows};
use crate::content::{Content, FieldData};
use crate::contenttypes::{ContentTypeField, ContentTypeManager};
use crate::domain::Domain;
use crate::error::CmsResult;
use crate::field::{FieldType, ResolvedField, data_shape_ok};
use crate::validation::ValidationContext;
use async_trait::async_trait;

/// Stores a string per value; resolves to the stored value unchanged.
pub struct TextType;

impl TextType {
	/// Registry type tag.
	pub const TYPE: &'static str = "text";
}

#[async_trait]
impl FieldType for TextType {
	fn type_tag(&self) -> &'static str {
		Self::TYPE
	}

	fn validate(
		&self,
		field: &ContentTypeField,
		_types: &ContentTypeManager,
		ctx: &mut ValidationContext,
	) {
		reject_unknown_settings(field, &[], Self::TYPE, ctx);
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
			validate_scalar_rows(data, "string", serde_json::Value::is_string, ctx);
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

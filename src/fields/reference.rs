//! Reference field: cross-entity resolution through the content manager
//!
//! The list-valued case is the one place in the core where "many small
//! calls" could occur, so it batches: collect every referenced id, drop
//! duplicates, issue a single filtered lookup, then re-expand the result in
//! original row order. A dangling reference resolves to null instead of
//! failing the whole selection.

use super::reject_unknown_settings;
use crate::content::{Content, ContentFilter, FieldData};
use crate::contenttypes::{ContentTypeField, ContentTypeManager};
use crate::domain::Domain;
use crate::error::CmsResult;
use crate::field::{FieldType, ResolvedField, data_shape_ok};
use crate::validation::ValidationContext;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Stores entity ids; resolves them to the referenced entities.
pub struct ReferenceType;

impl ReferenceType {
	/// Registry type tag.
	pub const TYPE: &'static str = "reference";
}

#[async_trait]
impl FieldType for ReferenceType {
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

		// A plain reference must name one declared type; a union reference
		// must name only declared types among its members.
		let return_types: Vec<&str> = if field.union_types.is_empty() {
			vec![field.return_type.as_str()]
		} else {
			field.union_types.keys().map(String::as_str).collect()
		};
		for return_type in return_types {
			if types.get_content_type(return_type).is_none() {
				ctx.build_violation(
					"Invalid return type \"{{ return_type }}\" for field of type \"{{ type }}\". The return type must name a registered content type.",
				)
				.parameter("return_type", return_type)
				.parameter("type", Self::TYPE)
				.at("return_type")
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
		let Some(data) = data else { return };
		for value in data.rows() {
			if value.is_null() {
				continue;
			}
			match value.as_str() {
				Some(id) if !id.is_empty() => {}
				_ => {
					ctx.build_violation("A reference value must be a non-empty entity id.")
						.emit();
				}
			}
		}
	}

	async fn resolve(
		&self,
		domain: &Domain,
		_content: &dyn Content,
		field: &ContentTypeField,
		data: &FieldData,
	) -> CmsResult<ResolvedField> {
		let manager = domain.content_manager()?;

		let rows = match data {
			FieldData::List(rows) => rows,
			FieldData::Single(value) => {
				let Some(id) = value.as_str() else {
					return Ok(ResolvedField::Null);
				};
				return match manager.get(domain, &field.return_type, id).await? {
					Some(content) => Ok(ResolvedField::Content(content)),
					None => Ok(ResolvedField::Null),
				};
			}
		};

		// One batched lookup over the distinct ids, first-seen order.
		let mut seen = HashSet::new();
		let mut unique = Vec::new();
		for id in rows.iter().filter_map(|value| value.as_str()) {
			if seen.insert(id) {
				unique.push(id.to_string());
			}
		}
		if unique.is_empty() {
			return Ok(ResolvedField::ContentList(vec![None; rows.len()]));
		}

		let found = manager
			.find(domain, &field.return_type, &ContentFilter::by_ids(unique))
			.await?;

		// The result set carries no duplicates and may omit ids that no
		// longer resolve; index it and re-expand in original row order so
		// output positions mirror input positions exactly.
		let mut by_id: HashMap<&str, Arc<dyn Content>> = HashMap::new();
		for content in &found.result {
			by_id.insert(content.id(), Arc::clone(content));
		}
		let resolved = rows
			.iter()
			.map(|value| value.as_str().and_then(|id| by_id.get(id).cloned()))
			.collect();
		Ok(ResolvedField::ContentList(resolved))
	}
}

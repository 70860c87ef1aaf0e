//! Field-resolution pipeline and mutation gating
//!
//! Queries flow: content type looked up in the current domain's registry,
//! field looked up on the type, plugin dispatched by type tag. Mutations are
//! gated first by the workflow state machine, then by access control, then
//! by field-level validation, all pure in-memory checks, so a denial
//! short-circuits before anything touches storage.

use crate::content::{Content, FieldData};
use crate::contenttypes::{ContentType, ContentTypeManager};
use crate::domain::DomainManager;
use crate::error::{CmsError, CmsResult};
use crate::field::{FieldTypeRegistry, ResolvedField};
use crate::permissions::{AccessEvaluator, AccessScope, Action, Caller};
use crate::validation::ValidationContext;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Runs a content type's fields through their plugins' declaration checks.
///
/// A field whose type tag is not registered yields its own violation; the
/// remaining fields are still checked, so the caller sees every problem at
/// once.
pub fn validate_content_type(
	field_types: &FieldTypeRegistry,
	content_type: &ContentType,
	types: &ContentTypeManager,
	ctx: &mut ValidationContext,
) {
	for field in content_type.fields() {
		ctx.enter(format!("fields.{}", field.id));
		match field_types.get(&field.field_type) {
			Some(plugin) => plugin.validate(field, types, ctx),
			None => {
				ctx.build_violation("Unknown field type \"{{ type }}\".")
					.parameter("type", field.field_type.as_str())
					.at("type")
					.emit();
			}
		}
		ctx.leave();
	}
}

/// Validates one content instance's input data against a content type.
///
/// Every declared field is checked through its plugin; input keys that match
/// no declared field are violations of their own. The full violation set is
/// accumulated, never just the first.
pub fn validate_input(
	field_types: &FieldTypeRegistry,
	content_type: &ContentType,
	input: &HashMap<String, FieldData>,
	ctx: &mut ValidationContext,
) {
	for field in content_type.fields() {
		ctx.enter(field.id.clone());
		if let Some(plugin) = field_types.get(&field.field_type) {
			plugin.validate_data(field, input.get(&field.id), ctx);
		}
		ctx.leave();
	}
	for key in input.keys() {
		if content_type.field(key).is_none() {
			ctx.build_violation("Unknown field \"{{ field }}\".")
				.parameter("field", key.as_str())
				.at(key.as_str())
				.emit();
		}
	}
}

/// The pipeline facade handed to the transport layer.
pub struct ContentResolver {
	domains: Arc<DomainManager>,
	field_types: Arc<FieldTypeRegistry>,
	access: AccessEvaluator,
}

impl ContentResolver {
	/// Creates a resolver over the given domain context and plugin table.
	pub fn new(domains: Arc<DomainManager>, field_types: Arc<FieldTypeRegistry>) -> Self {
		Self {
			domains,
			field_types,
			access: AccessEvaluator::new(),
		}
	}

	/// Resolves one field of one content instance.
	pub async fn resolve_field(
		&self,
		content: &dyn Content,
		field_id: &str,
	) -> CmsResult<ResolvedField> {
		let domain = self.domains.current()?;
		let content_type = domain
			.content_types()
			.get_any_type(content.content_type())
			.ok_or_else(|| CmsError::UnknownContentType(content.content_type().to_string()))?;
		let field = content_type
			.field(field_id)
			.ok_or_else(|| CmsError::UnknownField {
				content_type: content_type.id().to_string(),
				field: field_id.to_string(),
			})?;
		let plugin = self
			.field_types
			.get(&field.field_type)
			.ok_or_else(|| CmsError::UnknownFieldType(field.field_type.clone()))?;

		match content.field_data(field_id) {
			None => Ok(ResolvedField::Null),
			Some(data) => plugin.resolve(&domain, content, field, data).await,
		}
	}

	/// Resolves a field selection. Fields are independent; only list-valued
	/// reference output order is guaranteed, inside each field.
	pub async fn resolve_selection(
		&self,
		content: &dyn Content,
		selection: &[&str],
	) -> CmsResult<BTreeMap<String, ResolvedField>> {
		let mut resolved = BTreeMap::new();
		for field_id in selection {
			let value = self.resolve_field(content, field_id).await?;
			resolved.insert(field_id.to_string(), value);
		}
		Ok(resolved)
	}

	/// Validates input data for the named declared content type in the
	/// current domain.
	pub fn validate_input(
		&self,
		content_type: &str,
		input: &HashMap<String, FieldData>,
		ctx: &mut ValidationContext,
	) -> CmsResult<()> {
		let domain = self.domains.current()?;
		let content_type = domain
			.content_types()
			.get_content_type(content_type)
			.ok_or_else(|| CmsError::UnknownContentType(content_type.to_string()))?;
		validate_input(&self.field_types, content_type, input, ctx);
		Ok(())
	}

	/// Gates a state-changing mutation and returns the state to persist.
	///
	/// Checks run in order: workflow legality, then authorization. Both are
	/// pure and happen before any storage call. An authorization failure is
	/// reported as [`CmsError::NotFound`]: a caller must not be able to
	/// tell "exists but forbidden" from "does not exist".
	pub fn plan_transition(
		&self,
		content: &dyn Content,
		current_state: &str,
		transition: &str,
		caller: &Caller,
	) -> CmsResult<String> {
		let domain = self.domains.current()?;
		let content_type = domain
			.content_types()
			.get_content_type(content.content_type())
			.ok_or_else(|| CmsError::UnknownContentType(content.content_type().to_string()))?;
		let workflow = content_type
			.workflow()
			.ok_or_else(|| CmsError::TransitionRejected {
				transition: transition.to_string(),
				state: current_state.to_string(),
			})?;
		let next_state = workflow.apply(current_state, transition)?.to_string();

		let action = Action::Transition(transition.to_string());
		let scope = AccessScope {
			domain: domain.as_ref(),
			content_type: Some(content_type),
			entity: Some(content),
		};
		if !self.access.authorize(&action, caller, &scope) {
			debug!(
				transition,
				content_type = content_type.id(),
				"transition denied"
			);
			return Err(CmsError::NotFound);
		}
		Ok(next_state)
	}

	/// Authorizes an action against a declared content type in the current
	/// domain, exposing the raw outcome for the transport layer's voters.
	pub fn authorize(
		&self,
		action: &Action,
		caller: &Caller,
		content_type: Option<&str>,
		entity: Option<&dyn Content>,
	) -> CmsResult<bool> {
		let domain = self.domains.current()?;
		let content_type = match content_type {
			Some(id) => Some(
				domain
					.content_types()
					.get_content_type(id)
					.ok_or_else(|| CmsError::UnknownContentType(id.to_string()))?,
			),
			None => None,
		};
		let scope = AccessScope {
			domain: domain.as_ref(),
			content_type,
			entity,
		};
		Ok(self.access.authorize(action, caller, &scope))
	}
}

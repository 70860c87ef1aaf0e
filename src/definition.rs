//! Domain definition parsing
//!
//! A whole tenant (content types, fields, workflows, permission tables) is
//! authored as one JSON document and loaded in a single pass. Every problem
//! in the document is collected before the load fails, and any problem fails
//! the load as a whole: there is no partially-loaded domain.

use crate::contenttypes::{ContentType, ContentTypeField, ContentTypeManager};
use crate::domain::Domain;
use crate::error::{CmsError, CmsResult};
use crate::field::FieldTypeRegistry;
use crate::permissions::{Action, PermissionRule};
use crate::resolver::validate_content_type;
use crate::validation::{ValidationContext, Violation, is_valid_identifier};
use crate::workflow::{StateTransition, Workflow};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

// Conventional state for new content of a workflow-bearing type that does
// not name one itself.
const DEFAULT_INITIAL_STATE: &str = "draft";

/// Top-level shape of a domain definition document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainDefinition {
	/// Human-readable domain title
	pub title: String,
	/// Domain identifier
	pub identifier: String,
	/// Domain-level permission table: action → expression source
	#[serde(default)]
	pub permissions: BTreeMap<String, String>,
	/// Declared content types
	#[serde(default)]
	pub content_types: Vec<ContentTypeDefinition>,
	/// Embedded content types
	#[serde(default)]
	pub embedded_content_types: Vec<ContentTypeDefinition>,
}

/// One content type inside a definition document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentTypeDefinition {
	/// Content type identifier
	pub identifier: String,
	/// Human-readable title
	pub title: String,
	/// Field declarations, in order
	#[serde(default)]
	pub fields: Vec<FieldDefinition>,
	/// Workflow transitions; an empty list means no workflow
	#[serde(default)]
	pub workflow: Vec<TransitionDefinition>,
	/// Conventional state for newly created content
	#[serde(default)]
	pub initial_state: Option<String>,
	/// Type-level permission table, overriding the domain table
	#[serde(default)]
	pub permissions: BTreeMap<String, String>,
}

/// One field declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
	/// Field identifier
	pub identifier: String,
	/// Field-type tag, e.g. `"reference"`
	#[serde(rename = "type")]
	pub field_type: String,
	/// Declared return type for entity-valued fields
	#[serde(default)]
	pub return_type: Option<String>,
	/// Union member types: member name → discriminator
	#[serde(default)]
	pub union_types: BTreeMap<String, String>,
	/// Whether the field holds a list of values
	#[serde(default)]
	pub list_of: bool,
	/// Whether content must supply a value
	#[serde(default)]
	pub required: bool,
	/// Type-specific settings bag
	#[serde(default)]
	pub settings: serde_json::Map<String, JsonValue>,
}

/// One workflow transition declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionDefinition {
	/// Transition identifier
	pub identifier: String,
	/// Human-readable label
	pub label: String,
	/// Origin states, wildcard-capable
	pub from: Vec<String>,
	/// Target state
	pub to: String,
}

/// Parses domain definition documents into fully-validated [`Domain`]s.
pub struct DomainDefinitionParser {
	field_types: Arc<FieldTypeRegistry>,
}

impl DomainDefinitionParser {
	/// Creates a parser validating field declarations against the given
	/// plugin table.
	pub fn new(field_types: Arc<FieldTypeRegistry>) -> Self {
		Self { field_types }
	}

	/// Parses a JSON document. Malformed JSON, like any other violation,
	/// fails the load as a whole.
	pub fn parse(&self, source: &str) -> CmsResult<Domain> {
		let definition: DomainDefinition =
			serde_json::from_str(source).map_err(|error| CmsError::Definition {
				violations: vec![Violation {
					property_path: String::new(),
					message: format!("Malformed domain definition: {error}"),
					parameters: BTreeMap::new(),
				}],
			})?;
		self.build(definition)
	}

	/// Builds and validates a domain from an already-deserialized
	/// definition.
	pub fn build(&self, definition: DomainDefinition) -> CmsResult<Domain> {
		let mut ctx = ValidationContext::new();

		if !is_valid_identifier(&definition.identifier) {
			ctx.build_violation(
				"This value contains invalid characters. Use lowercase letters, digits and underscores, starting with a letter.",
			)
			.at("identifier")
			.emit();
		}

		// Identifiers must be unique across the declared and embedded
		// namespaces combined; union ids are derived and resolved by
		// namespace precedence instead.
		let mut seen = HashSet::new();
		let mut types = ContentTypeManager::new();
		for def in &definition.content_types {
			ctx.enter(format!("content_types.{}", def.identifier));
			let content_type = self.build_content_type(def, &mut seen, &mut ctx);
			ctx.leave();
			types.register_content_type(content_type);
		}
		for def in &definition.embedded_content_types {
			ctx.enter(format!("embedded_content_types.{}", def.identifier));
			let content_type = self.build_content_type(def, &mut seen, &mut ctx);
			ctx.leave();
			types.register_embedded_content_type(content_type);
		}

		// Field declarations are checked only after every type is
		// registered, so forward and mutual references resolve no matter the
		// declaration order.
		for def in &definition.content_types {
			if let Some(content_type) = types.get_content_type(&def.identifier) {
				ctx.enter(format!("content_types.{}", def.identifier));
				validate_content_type(&self.field_types, content_type, &types, &mut ctx);
				ctx.leave();
			}
		}
		for def in &definition.embedded_content_types {
			if let Some(content_type) = types.get_embedded_content_type(&def.identifier) {
				ctx.enter(format!("embedded_content_types.{}", def.identifier));
				validate_content_type(&self.field_types, content_type, &types, &mut ctx);
				ctx.leave();
			}
		}

		let mut domain_rules = Vec::new();
		for (key, source) in &definition.permissions {
			ctx.enter(format!("permissions.{key}"));
			if let Some(rule) = parse_permission(key, source, &mut ctx) {
				domain_rules.push(rule);
			}
			ctx.leave();
		}

		if !ctx.is_empty() {
			return Err(CmsError::Definition {
				violations: ctx.into_violations(),
			});
		}

		let mut domain = Domain::new(definition.identifier.as_str(), definition.title.as_str())
			.with_content_types(types);
		for (action, rule) in domain_rules {
			domain = domain.with_permission(action, rule);
		}
		debug!(
			domain = %definition.identifier,
			content_types = definition.content_types.len(),
			embedded = definition.embedded_content_types.len(),
			"parsed domain definition"
		);
		Ok(domain)
	}

	fn build_content_type(
		&self,
		def: &ContentTypeDefinition,
		seen: &mut HashSet<String>,
		ctx: &mut ValidationContext,
	) -> ContentType {
		if !is_valid_identifier(&def.identifier) {
			ctx.build_violation(
				"This value contains invalid characters. Use lowercase letters, digits and underscores, starting with a letter.",
			)
			.at("identifier")
			.emit();
		} else if !seen.insert(def.identifier.clone()) {
			ctx.build_violation("Duplicate content type identifier \"{{ identifier }}\".")
				.parameter("identifier", def.identifier.as_str())
				.at("identifier")
				.emit();
		}

		let mut content_type = ContentType::new(def.identifier.as_str(), def.title.as_str());

		let mut field_ids = HashSet::new();
		for field_def in &def.fields {
			ctx.enter(format!("fields.{}", field_def.identifier));
			if !is_valid_identifier(&field_def.identifier) {
				ctx.build_violation(
					"This value contains invalid characters. Use lowercase letters, digits and underscores, starting with a letter.",
				)
				.at("identifier")
				.emit();
			} else if !field_ids.insert(field_def.identifier.clone()) {
				ctx.build_violation("Duplicate field identifier \"{{ identifier }}\".")
					.parameter("identifier", field_def.identifier.as_str())
					.at("identifier")
					.emit();
			}
			ctx.leave();

			let mut field =
				ContentTypeField::new(field_def.identifier.as_str(), field_def.field_type.as_str());
			if let Some(return_type) = &field_def.return_type {
				field = field.with_return_type(return_type.as_str());
			}
			for (member, discriminator) in &field_def.union_types {
				field = field.with_union_type(member.as_str(), discriminator.as_str());
			}
			if field_def.list_of {
				field = field.list_of();
			}
			if field_def.required {
				field = field.required();
			}
			for (key, value) in &field_def.settings {
				field = field.with_setting(key.as_str(), value.clone());
			}
			content_type = content_type.with_field(field);
		}

		if !def.workflow.is_empty() {
			let mut workflow = Workflow::new();
			for transition in &def.workflow {
				workflow = workflow.with_transition(StateTransition::new(
					transition.identifier.as_str(),
					transition.label.as_str(),
					transition.from.clone(),
					transition.to.as_str(),
				));
			}
			ctx.enter("workflow");
			workflow.validate(ctx);
			ctx.leave();
			if let Some(initial) = &def.initial_state {
				if !workflow.states().contains(initial.as_str()) {
					ctx.build_violation(
						"The initial state \"{{ state }}\" does not occur in the workflow.",
					)
					.parameter("state", initial.as_str())
					.at("initial_state")
					.emit();
				}
			}

			let initial = def
				.initial_state
				.clone()
				.unwrap_or_else(|| DEFAULT_INITIAL_STATE.to_string());
			content_type = content_type.with_workflow(workflow).with_initial_state(initial);
		} else if let Some(initial) = &def.initial_state {
			content_type = content_type.with_initial_state(initial.as_str());
		}

		for (key, source) in &def.permissions {
			ctx.enter(format!("permissions.{key}"));
			if let Some((action, rule)) = parse_permission(key, source, ctx) {
				content_type = content_type.with_permission(action, rule);
			}
			ctx.leave();
		}

		content_type
	}
}

fn parse_permission(
	key: &str,
	source: &str,
	ctx: &mut ValidationContext,
) -> Option<(Action, PermissionRule)> {
	let action = Action::parse(key);
	if action.is_none() {
		ctx.build_violation("Unknown action \"{{ action }}\".")
			.parameter("action", key)
			.emit();
	}
	match PermissionRule::parse(source) {
		Ok(rule) => action.map(|action| (action, rule)),
		Err(error) => {
			ctx.build_violation("Invalid permission expression: {{ error }}")
				.parameter("error", error.to_string())
				.emit();
			None
		}
	}
}

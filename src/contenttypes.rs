//! Runtime content-type schema and the per-domain type registry
//!
//! Content types are declared at runtime per domain, not at compile time.
//! The [`ContentTypeManager`] keeps three namespaces: *declared* types
//! (independently queryable), *embedded* types (nested values only) and
//! *union* types, which are never authored: they are synthesized from any
//! field that declares multiple possible return types.

use crate::permissions::{Action, PermissionRule};
use crate::workflow::Workflow;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One field of a [`ContentType`].
///
/// Owned exclusively by its content type and immutable once domain-definition
/// parsing has finished. The `settings` bag is uninterpreted here; only the
/// matching field-type plugin gives it meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTypeField {
	/// Field identifier, unique within its content type
	pub id: String,
	/// Type tag resolved through the field-type registry, e.g. `"reference"`
	pub field_type: String,
	/// Declared return type for reference/object-valued fields
	pub return_type: String,
	/// Union member types: member type name → discriminator. Empty for
	/// non-union fields. Ordered so union synthesis is deterministic.
	pub union_types: BTreeMap<String, String>,
	/// `true` when the field holds an ordered list of values
	pub list_of: bool,
	/// `true` when content must supply a value for this field
	pub required: bool,
	/// Type-specific configuration, interpreted only by the plugin
	pub settings: serde_json::Map<String, JsonValue>,
}

impl ContentTypeField {
	/// Creates a field with the given identifier and type tag.
	///
	/// The return type defaults to the type tag and is usually overridden for
	/// entity-valued fields.
	pub fn new(id: impl Into<String>, field_type: impl Into<String>) -> Self {
		let field_type = field_type.into();
		Self {
			id: id.into(),
			return_type: field_type.clone(),
			field_type,
			union_types: BTreeMap::new(),
			list_of: false,
			required: false,
			settings: serde_json::Map::new(),
		}
	}

	/// Sets the declared return type.
	pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
		self.return_type = return_type.into();
		self
	}

	/// Adds a union member type with its discriminator.
	pub fn with_union_type(
		mut self,
		member: impl Into<String>,
		discriminator: impl Into<String>,
	) -> Self {
		self.union_types.insert(member.into(), discriminator.into());
		self
	}

	/// Marks the field as list-valued.
	pub fn list_of(mut self) -> Self {
		self.list_of = true;
		self
	}

	/// Marks the field as required.
	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	/// Sets one settings key.
	pub fn with_setting(mut self, key: impl Into<String>, value: JsonValue) -> Self {
		self.settings.insert(key.into(), value);
		self
	}
}

/// Schema for one kind of content entity within a domain.
#[derive(Debug, Clone, Default)]
pub struct ContentType {
	id: String,
	title: String,
	fields: Vec<ContentTypeField>,
	workflow: Option<Workflow>,
	permissions: HashMap<Action, PermissionRule>,
	initial_state: Option<String>,
}

impl ContentType {
	/// Creates a content type with the given identifier and human title.
	pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			title: title.into(),
			..Self::default()
		}
	}

	/// Appends a field. Declaration order is preserved.
	pub fn with_field(mut self, field: ContentTypeField) -> Self {
		self.fields.push(field);
		self
	}

	/// Attaches the workflow gating mutations of this type.
	pub fn with_workflow(mut self, workflow: Workflow) -> Self {
		self.workflow = Some(workflow);
		self
	}

	/// Sets the type-level permission rule for an action, overriding the
	/// domain-level table.
	pub fn with_permission(mut self, action: Action, rule: PermissionRule) -> Self {
		self.permissions.insert(action, rule);
		self
	}

	/// Records the conventional state for newly created content.
	pub fn with_initial_state(mut self, state: impl Into<String>) -> Self {
		self.initial_state = Some(state.into());
		self
	}

	/// Identifier, unique within the domain.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Human-readable title.
	pub fn title(&self) -> &str {
		&self.title
	}

	/// Fields in declaration order.
	pub fn fields(&self) -> &[ContentTypeField] {
		&self.fields
	}

	/// Looks up one field by identifier.
	pub fn field(&self, id: &str) -> Option<&ContentTypeField> {
		self.fields.iter().find(|field| field.id == id)
	}

	/// The workflow gating this type's mutations, if one is declared.
	pub fn workflow(&self) -> Option<&Workflow> {
		self.workflow.as_ref()
	}

	/// Type-level permission rule for an action, if configured.
	pub fn permission(&self, action: &Action) -> Option<&PermissionRule> {
		self.permissions.get(action)
	}

	/// Conventional state for newly created content, if recorded.
	///
	/// The workflow state machine validates transitions only; initial
	/// placement stays a domain convention carried by this hint.
	pub fn initial_state(&self) -> Option<&str> {
		self.initial_state.as_deref()
	}
}

/// The per-domain registry of declared, embedded and union content types.
///
/// Rebuilt (or re-attached) per domain context at the start of a request;
/// never shared mutably across requests.
#[derive(Debug, Default)]
pub struct ContentTypeManager {
	content_types: HashMap<String, ContentType>,
	embedded_content_types: HashMap<String, ContentType>,
	union_content_types: HashMap<String, ContentType>,
	// Union ids derived from each declared type, so re-registration can drop
	// the previous derivation instead of accumulating stale unions.
	derived_unions: HashMap<String, Vec<String>>,
}

impl ContentTypeManager {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a declared content type, replacing any prior definition
	/// under the same identifier together with its derived unions.
	///
	/// Every field declaring union member types synthesizes a union content
	/// type named after the field's return type, with one field per member,
	/// named after the member type and returning it. The derivation is
	/// deterministic: registering the same definition twice leaves the
	/// registry in the same state as registering it once.
	pub fn register_content_type(&mut self, content_type: ContentType) -> &mut Self {
		if let Some(stale) = self.derived_unions.remove(content_type.id()) {
			for union_id in stale {
				self.union_content_types.remove(&union_id);
			}
		}

		let mut derived = Vec::new();
		for field in content_type.fields() {
			if field.union_types.is_empty() {
				continue;
			}
			let mut union_type =
				ContentType::new(field.return_type.as_str(), field.return_type.as_str());
			for member in field.union_types.keys() {
				union_type = union_type.with_field(
					ContentTypeField::new(member.as_str(), field.field_type.as_str())
						.with_return_type(member.as_str()),
				);
			}
			derived.push(union_type.id().to_string());
			self.union_content_types
				.insert(union_type.id().to_string(), union_type);
		}

		debug!(
			content_type = content_type.id(),
			unions = derived.len(),
			"registered content type"
		);
		self.derived_unions
			.insert(content_type.id().to_string(), derived);
		self.content_types
			.insert(content_type.id().to_string(), content_type);
		self
	}

	/// Registers an embedded content type. Embedded types never synthesize
	/// unions.
	pub fn register_embedded_content_type(&mut self, content_type: ContentType) -> &mut Self {
		self.embedded_content_types
			.insert(content_type.id().to_string(), content_type);
		self
	}

	/// Declared type by identifier.
	pub fn get_content_type(&self, id: &str) -> Option<&ContentType> {
		self.content_types.get(id)
	}

	/// Embedded type by identifier.
	pub fn get_embedded_content_type(&self, id: &str) -> Option<&ContentType> {
		self.embedded_content_types.get(id)
	}

	/// Synthesized union type by identifier.
	pub fn get_union_content_type(&self, id: &str) -> Option<&ContentType> {
		self.union_content_types.get(id)
	}

	/// Probes declared, then embedded, then union namespaces.
	///
	/// Declared types are the common case and must win over an accidental
	/// union-id collision.
	pub fn get_any_type(&self, id: &str) -> Option<&ContentType> {
		self.get_content_type(id)
			.or_else(|| self.get_embedded_content_type(id))
			.or_else(|| self.get_union_content_type(id))
	}

	/// Merged view across all three namespaces for schema introspection.
	/// On identifier collision the earlier namespace wins (declared, then
	/// embedded, then union).
	pub fn get_all_types(&self) -> BTreeMap<&str, &ContentType> {
		let mut merged: BTreeMap<&str, &ContentType> = BTreeMap::new();
		for source in [
			&self.content_types,
			&self.embedded_content_types,
			&self.union_content_types,
		] {
			for (id, content_type) in source {
				merged.entry(id.as_str()).or_insert(content_type);
			}
		}
		merged
	}

	/// All declared types.
	pub fn content_types(&self) -> &HashMap<String, ContentType> {
		&self.content_types
	}

	/// All embedded types.
	pub fn embedded_content_types(&self) -> &HashMap<String, ContentType> {
		&self.embedded_content_types
	}

	/// All synthesized union types.
	pub fn union_content_types(&self) -> &HashMap<String, ContentType> {
		&self.union_content_types
	}
}

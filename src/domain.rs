//! Domains (tenants) and the per-request domain context
//!
//! A domain owns its content types, permission table and storage
//! collaborator. The [`DomainManager`] holds the domain a request is acting
//! in; the core holds no other cross-request mutable state.

use crate::content::ContentManager;
use crate::contenttypes::ContentTypeManager;
use crate::error::{CmsError, CmsResult};
use crate::permissions::{Action, PermissionRule};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A tenant: content types, permissions and collaborators in one scope.
pub struct Domain {
	id: String,
	title: String,
	organization: String,
	content_types: ContentTypeManager,
	permissions: HashMap<Action, PermissionRule>,
	content_manager: Option<Arc<dyn ContentManager>>,
}

impl Domain {
	/// Creates a domain with the given identifier and human title.
	pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			title: title.into(),
			organization: String::new(),
			content_types: ContentTypeManager::new(),
			permissions: HashMap::new(),
			content_manager: None,
		}
	}

	/// Sets the owning organization.
	pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
		self.organization = organization.into();
		self
	}

	/// Replaces the content-type registry wholesale.
	pub fn with_content_types(mut self, content_types: ContentTypeManager) -> Self {
		self.content_types = content_types;
		self
	}

	/// Sets the domain-level permission rule for an action.
	pub fn with_permission(mut self, action: Action, rule: PermissionRule) -> Self {
		self.permissions.insert(action, rule);
		self
	}

	/// Attaches the storage collaborator entities are read through.
	pub fn with_content_manager(mut self, content_manager: Arc<dyn ContentManager>) -> Self {
		self.content_manager = Some(content_manager);
		self
	}

	/// Domain identifier.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Human-readable title.
	pub fn title(&self) -> &str {
		&self.title
	}

	/// Identifier of the owning organization.
	pub fn organization(&self) -> &str {
		&self.organization
	}

	/// The domain's content-type registry.
	pub fn content_types(&self) -> &ContentTypeManager {
		&self.content_types
	}

	/// Mutable registry access, for definition parsing.
	pub fn content_types_mut(&mut self) -> &mut ContentTypeManager {
		&mut self.content_types
	}

	/// Domain-level permission rule for an action, if configured.
	pub fn permission(&self, action: &Action) -> Option<&PermissionRule> {
		self.permissions.get(action)
	}

	/// The attached storage collaborator.
	pub fn content_manager(&self) -> CmsResult<&Arc<dyn ContentManager>> {
		self.content_manager
			.as_ref()
			.ok_or_else(|| CmsError::NoContentManager(self.id.clone()))
	}
}

impl fmt::Debug for Domain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Domain")
			.field("id", &self.id)
			.field("title", &self.title)
			.field("organization", &self.organization)
			.finish_non_exhaustive()
	}
}

/// Holds the domain the current request operates in.
///
/// Attached at the start of a request, read by the resolution pipeline and
/// the field plugins. Attaching replaces any previous domain.
#[derive(Default)]
pub struct DomainManager {
	current: RwLock<Option<Arc<Domain>>>,
}

impl DomainManager {
	/// Creates a manager with no domain attached.
	pub fn new() -> Self {
		Self::default()
	}

	/// Attaches `domain` as the current one.
	pub fn attach(&self, domain: Arc<Domain>) {
		tracing::debug!(domain = domain.id(), "attached domain");
		*self.current.write() = Some(domain);
	}

	/// Detaches the current domain, if any.
	pub fn detach(&self) {
		*self.current.write() = None;
	}

	/// The current domain, or [`CmsError::NoDomain`] when none is attached.
	pub fn current(&self) -> CmsResult<Arc<Domain>> {
		self.current.read().clone().ok_or(CmsError::NoDomain)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn current_fails_until_a_domain_is_attached() {
		let manager = DomainManager::new();
		assert!(matches!(manager.current(), Err(CmsError::NoDomain)));

		manager.attach(Arc::new(Domain::new("marketing", "Marketing")));
		assert_eq!(manager.current().unwrap().id(), "marketing");

		manager.detach();
		assert!(matches!(manager.current(), Err(CmsError::NoDomain)));
	}

	#[rstest]
	fn missing_content_manager_is_an_explicit_error() {
		let domain = Domain::new("marketing", "Marketing");

		assert!(matches!(
			domain.content_manager(),
			Err(CmsError::NoContentManager(_))
		));
	}
}

//! # Grappelli CMS
//!
//! The core of a multi-tenant headless CMS whose schemas are defined at
//! runtime per domain (tenant) rather than at compile time.
//!
//! ## Features
//!
//! - **Runtime Content Types**: declared, embedded and synthesized union
//!   types registered per domain
//! - **Pluggable Field Kinds**: polymorphic validation and resolution behind
//!   a type-tag dispatch table, including batched cross-entity reference
//!   resolution
//! - **Workflow Engine**: per-type state machines with implicit states and
//!   wildcard transitions, gating every mutation
//! - **Expression Permissions**: attribute-based access control through a
//!   minimal, auditable boolean expression language
//! - **Single-Pass Definition Loading**: a whole tenant is parsed from one
//!   JSON document, with every violation collected before the load fails
//!
//! ## Architecture
//!
//! ```text
//! grappelli-cms
//! ├── domain       - tenants and the per-request domain context
//! ├── contenttypes - runtime schema and the three-namespace type registry
//! ├── content      - raw field data and the storage collaborator contract
//! ├── field        - the field-type plugin contract and dispatch table
//! ├── fields       - built-in field kinds (text, reference, ...)
//! ├── resolver     - field-resolution pipeline and mutation gating
//! ├── workflow     - state machine of named transitions
//! ├── permissions  - actions, callers and the access evaluator
//! ├── validation   - violation accumulation
//! └── definition   - domain definition (JSON) parsing
//! ```
//!
//! Storage, transport and querying stay outside: the core orchestrates
//! collaborators through the [`content::ContentManager`] trait and performs
//! no I/O of its own.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use grappelli_cms::prelude::*;
//! use std::sync::Arc;
//!
//! let field_types = Arc::new(FieldTypeRegistry::with_defaults());
//! let parser = DomainDefinitionParser::new(Arc::clone(&field_types));
//! let domain = parser.parse(definition_json)?;
//!
//! let domains = Arc::new(DomainManager::new());
//! domains.attach(Arc::new(domain.with_content_manager(storage)));
//!
//! let resolver = ContentResolver::new(domains, field_types);
//! let author = resolver.resolve_field(&article, "author").await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod content;
pub mod contenttypes;
pub mod definition;
pub mod domain;
pub mod field;
pub mod fields;
pub mod permissions;
pub mod resolver;
pub mod validation;
pub mod workflow;

// Prelude for convenient imports
pub mod prelude {
	//! Convenient re-exports of commonly used items

	// Domains
	pub use crate::domain::{Domain, DomainManager};

	// Content types
	pub use crate::contenttypes::{ContentType, ContentTypeField, ContentTypeManager};

	// Content and collaborators
	pub use crate::content::{Content, ContentFilter, ContentManager, FieldData, ResultSet};

	// Field plugins
	pub use crate::field::{FieldType, FieldTypeRegistry, ResolvedField};

	// Pipeline
	pub use crate::resolver::ContentResolver;

	// Workflow
	pub use crate::workflow::{StateTransition, Workflow};

	// Permissions
	pub use crate::permissions::{AccessEvaluator, AccessScope, Action, Caller};

	// Definition loading
	pub use crate::definition::DomainDefinitionParser;

	// Validation
	pub use crate::validation::{ValidationContext, Violation};

	// Errors
	pub use crate::error::{CmsError, CmsResult};
}

/// CMS error types
pub mod error {
	use crate::validation::Violation;
	use thiserror::Error;

	/// Core errors surfaced to the transport layer.
	#[derive(Error, Debug)]
	pub enum CmsError {
		/// Content type not registered in the current domain
		#[error("Content type not found: {0}")]
		UnknownContentType(String),

		/// Field not declared on the content type
		#[error("Field \"{field}\" not found on content type \"{content_type}\"")]
		UnknownField {
			/// The content type that was probed
			content_type: String,
			/// The missing field identifier
			field: String,
		},

		/// Field-type tag with no registered plugin
		#[error("Field type not registered: {0}")]
		UnknownFieldType(String),

		/// Workflow rejected the requested transition; content state is
		/// left unchanged
		#[error("Transition \"{transition}\" is not allowed from state \"{state}\"")]
		TransitionRejected {
			/// The requested transition identifier
			transition: String,
			/// The content's current state
			state: String,
		},

		/// The target does not exist, or the caller may not know whether
		/// it exists. Authorization denials use this same variant so the
		/// two cases are indistinguishable to the caller.
		#[error("Content not found")]
		NotFound,

		/// No domain attached to the current request context
		#[error("No domain attached to the current request")]
		NoDomain,

		/// Domain has no storage collaborator attached
		#[error("No content manager attached to domain \"{0}\"")]
		NoContentManager(String),

		/// The domain definition failed validation; nothing was loaded
		#[error("Invalid domain definition ({} violation(s))", .violations.len())]
		Definition {
			/// The full violation set, for the transport layer to format
			violations: Vec<Violation>,
		},

		/// Opaque failure in the storage collaborator
		#[error("Storage error: {0}")]
		Storage(#[from] anyhow::Error),
	}

	/// Result alias for core operations.
	pub type CmsResult<T> = Result<T, CmsError>;
}

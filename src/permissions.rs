//! Attribute-based access control
//!
//! Every mutation the workflow allows still has to pass authorization. A
//! domain (and optionally each content type) carries a table mapping actions
//! to boolean expressions over the caller's memberships; where no expression
//! is configured a role-hierarchy default applies. Evaluation happens fresh
//! on every check; membership is mutable between requests, so results are
//! never cached.

pub mod expression;

use crate::content::Content;
use crate::contenttypes::ContentType;
use crate::domain::Domain;
use self::expression::{Expr, ExpressionContext, ExpressionError, Literal};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// The fixed enumeration of authorizable actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
	/// Read a single entity
	View,
	/// Create a new entity
	Create,
	/// Update an existing entity
	Update,
	/// Delete an entity
	Delete,
	/// Fire the named workflow transition
	Transition(String),
}

impl Action {
	/// Parses the textual form used in permission tables: `view`, `create`,
	/// `update`, `delete` or `transition:<identifier>`.
	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"view" => Some(Action::View),
			"create" => Some(Action::Create),
			"update" => Some(Action::Update),
			"delete" => Some(Action::Delete),
			_ => value
				.strip_prefix("transition:")
				.filter(|id| !id.is_empty())
				.map(|id| Action::Transition(id.to_string())),
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Action::View => write!(f, "view"),
			Action::Create => write!(f, "create"),
			Action::Update => write!(f, "update"),
			Action::Delete => write!(f, "delete"),
			Action::Transition(id) => write!(f, "transition:{id}"),
		}
	}
}

/// A configured permission expression.
///
/// Parsed once at definition time (malformed rules are configuration
/// errors), evaluated fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionRule {
	source: String,
	expr: Expr,
}

impl PermissionRule {
	/// Parses an expression source into a rule.
	pub fn parse(source: impl Into<String>) -> Result<Self, ExpressionError> {
		let source = source.into();
		let expr = expression::parse(&source)?;
		Ok(Self { source, expr })
	}

	/// The original expression source.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Evaluates the rule. Unresolvable context variables deny.
	pub fn evaluate(&self, ctx: &dyn ExpressionContext) -> bool {
		self.expr.evaluate(ctx)
	}
}

/// Platform-wide role of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalRole {
	/// May do anything, across tenants
	PlatformAdmin,
	/// A signed-in user; scoped by memberships
	User,
	/// No identity at all
	Anonymous,
}

impl GlobalRole {
	/// The value exposed to expressions as `role`.
	pub fn as_str(&self) -> &'static str {
		match self {
			GlobalRole::PlatformAdmin => "platform_admin",
			GlobalRole::User => "user",
			GlobalRole::Anonymous => "anonymous",
		}
	}
}

/// Role within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationRole {
	/// Administers the organization and its domains
	Admin,
	/// Plain organization member
	Member,
}

impl OrganizationRole {
	/// The value exposed to expressions as `organization.role`.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrganizationRole::Admin => "admin",
			OrganizationRole::Member => "member",
		}
	}
}

/// A caller's membership in an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationMembership {
	/// Organization identifier
	pub organization: String,
	/// Role within that organization
	pub role: OrganizationRole,
}

/// A caller's membership in a domain, carrying the free-form member type
/// (`"editor"`, `"viewer"`, ...) that expressions compare against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainMembership {
	/// Domain identifier
	pub domain: String,
	/// Member type label
	pub member_type: String,
}

/// The acting identity an authorization check runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
	/// Caller identity
	pub id: Uuid,
	/// Platform-wide role
	pub role: GlobalRole,
	/// Organization membership, if any
	pub organization: Option<OrganizationMembership>,
	/// Domain membership, if any
	pub membership: Option<DomainMembership>,
}

impl Caller {
	/// An unauthenticated caller. Always denied.
	pub fn anonymous() -> Self {
		Self {
			id: Uuid::nil(),
			role: GlobalRole::Anonymous,
			organization: None,
			membership: None,
		}
	}

	/// A signed-in user with no memberships yet.
	pub fn user(id: Uuid) -> Self {
		Self {
			id,
			role: GlobalRole::User,
			organization: None,
			membership: None,
		}
	}

	/// A platform administrator.
	pub fn platform_admin(id: Uuid) -> Self {
		Self {
			id,
			role: GlobalRole::PlatformAdmin,
			organization: None,
			membership: None,
		}
	}

	/// A token-authenticated API client. API clients act as members of
	/// exactly one domain, under the given member type.
	pub fn api_client(domain: impl Into<String>, member_type: impl Into<String>) -> Self {
		Self {
			id: Uuid::new_v4(),
			role: GlobalRole::User,
			organization: None,
			membership: Some(DomainMembership {
				domain: domain.into(),
				member_type: member_type.into(),
			}),
		}
	}

	/// Attaches an organization membership.
	pub fn with_organization(
		mut self,
		organization: impl Into<String>,
		role: OrganizationRole,
	) -> Self {
		self.organization = Some(OrganizationMembership {
			organization: organization.into(),
			role,
		});
		self
	}

	/// Attaches a domain membership.
	pub fn with_membership(
		mut self,
		domain: impl Into<String>,
		member_type: impl Into<String>,
	) -> Self {
		self.membership = Some(DomainMembership {
			domain: domain.into(),
			member_type: member_type.into(),
		});
		self
	}
}

/// What an authorization check targets: the domain, optionally the content
/// type, and, for update/delete, the specific entity.
pub struct AccessScope<'a> {
	/// The tenant owning the target
	pub domain: &'a Domain,
	/// Content type the action addresses, if type-scoped
	pub content_type: Option<&'a ContentType>,
	/// The specific target entity, for update/delete checks
	pub entity: Option<&'a dyn Content>,
}

// Expression context over a caller and an optional target entity. Paths a
// caller cannot supply (no membership, no entity) resolve to None, which
// denies.
struct CallerContext<'a> {
	caller: &'a Caller,
	entity: Option<&'a dyn Content>,
}

impl ExpressionContext for CallerContext<'_> {
	fn resolve(&self, path: &[String]) -> Option<Literal> {
		let segments: Vec<&str> = path.iter().map(String::as_str).collect();
		match segments.as_slice() {
			["role"] => Some(Literal::Str(self.caller.role.as_str().to_string())),
			["organization", "role"] => self
				.caller
				.organization
				.as_ref()
				.map(|membership| Literal::Str(membership.role.as_str().to_string())),
			["member", "type"] => self
				.caller
				.membership
				.as_ref()
				.map(|membership| Literal::Str(membership.member_type.clone())),
			["content", "id"] => self
				.entity
				.map(|entity| Literal::Str(entity.id().to_string())),
			["content", "type"] => self
				.entity
				.map(|entity| Literal::Str(entity.content_type().to_string())),
			_ => None,
		}
	}
}

/// Evaluates the composed authorization rule.
///
/// Access is granted iff the caller's role tier is sufficient, the caller
/// belongs to the target tenant, and the configured expression (or the
/// role-hierarchy default) holds. Denials short-circuit before any storage
/// call ever happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessEvaluator;

impl AccessEvaluator {
	/// Creates an evaluator.
	pub fn new() -> Self {
		Self
	}

	/// Runs the composed check for `action` by `caller` against `scope`.
	pub fn authorize(&self, action: &Action, caller: &Caller, scope: &AccessScope<'_>) -> bool {
		// Role tier: anonymous callers never pass; platform admins always
		// do, including across tenants.
		match caller.role {
			GlobalRole::Anonymous => {
				debug!(action = %action, "denied: anonymous caller");
				return false;
			}
			GlobalRole::PlatformAdmin => return true,
			GlobalRole::User => {}
		}

		// Tenancy: the caller's membership must name the target domain or
		// its owning organization. Cross-tenant access is denied no matter
		// what any expression says.
		if !self.belongs_to_tenant(caller, scope.domain) {
			debug!(action = %action, domain = scope.domain.id(), "denied: caller not in tenant");
			return false;
		}

		let rule = scope
			.content_type
			.and_then(|content_type| content_type.permission(action))
			.or_else(|| scope.domain.permission(action));

		let granted = match rule {
			Some(rule) => {
				let ctx = CallerContext {
					caller,
					entity: scope.entity,
				};
				rule.evaluate(&ctx)
			}
			None => self.default_grant(action, caller, scope.domain),
		};
		if !granted {
			debug!(action = %action, domain = scope.domain.id(), "denied: rule evaluated false");
		}
		granted
	}

	fn belongs_to_tenant(&self, caller: &Caller, domain: &Domain) -> bool {
		let member_of_domain = caller
			.membership
			.as_ref()
			.is_some_and(|membership| membership.domain == domain.id());
		let member_of_organization = caller
			.organization
			.as_ref()
			.is_some_and(|membership| membership.organization == domain.organization());
		member_of_domain || member_of_organization
	}

	// Role-hierarchy fallback for actions with no configured expression:
	// viewing takes any membership in the tenant (already established),
	// everything else takes an organization admin of the owning
	// organization.
	fn default_grant(&self, action: &Action, caller: &Caller, domain: &Domain) -> bool {
		match action {
			Action::View => true,
			_ => caller.organization.as_ref().is_some_and(|membership| {
				membership.organization == domain.organization()
					&& membership.role == OrganizationRole::Admin
			}),
		}
	}
}

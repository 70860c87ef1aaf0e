//! Tests for the access control evaluator

mod common;

use common::TestContent;
use grappelli_cms::contenttypes::ContentType;
use grappelli_cms::domain::Domain;
use grappelli_cms::permissions::{
	AccessEvaluator, AccessScope, Action, Caller, OrganizationRole, PermissionRule,
};
use rstest::rstest;
use uuid::Uuid;

fn marketing_domain() -> Domain {
	Domain::new("marketing", "Marketing")
		.with_organization("acme")
		.with_permission(
			Action::Update,
			PermissionRule::parse("member.type == \"editor\"").unwrap(),
		)
}

fn domain_scope(domain: &Domain) -> AccessScope<'_> {
	AccessScope {
		domain,
		content_type: None,
		entity: None,
	}
}

#[rstest]
fn expression_grants_the_editor_and_denies_the_viewer() {
	let domain = marketing_domain();
	let evaluator = AccessEvaluator::new();

	let editor = Caller::user(Uuid::new_v4()).with_membership("marketing", "editor");
	let viewer = Caller::user(Uuid::new_v4()).with_membership("marketing", "viewer");

	assert!(evaluator.authorize(&Action::Update, &editor, &domain_scope(&domain)));
	assert!(!evaluator.authorize(&Action::Update, &viewer, &domain_scope(&domain)));
}

#[rstest]
fn caller_without_membership_is_denied_not_errored() {
	// The update rule references member.type; a caller with no domain
	// membership cannot resolve it, which must deny rather than error. Here
	// the caller still belongs to the owning organization, so the tenancy
	// gate is passed and the expression itself is what denies.
	let domain = marketing_domain();
	let evaluator = AccessEvaluator::new();
	let org_admin =
		Caller::user(Uuid::new_v4()).with_organization("acme", OrganizationRole::Admin);

	assert!(!evaluator.authorize(&Action::Update, &org_admin, &domain_scope(&domain)));
}

#[rstest]
fn cross_tenant_access_is_always_denied() {
	let domain = marketing_domain();
	let evaluator = AccessEvaluator::new();
	// An editor, but of a different domain in a different organization.
	let outsider = Caller::user(Uuid::new_v4())
		.with_organization("globex", OrganizationRole::Admin)
		.with_membership("sales", "editor");

	assert!(!evaluator.authorize(&Action::View, &outsider, &domain_scope(&domain)));
	assert!(!evaluator.authorize(&Action::Update, &outsider, &domain_scope(&domain)));
}

#[rstest]
fn platform_admins_cross_tenants() {
	let domain = marketing_domain();
	let evaluator = AccessEvaluator::new();
	let admin = Caller::platform_admin(Uuid::new_v4());

	assert!(evaluator.authorize(&Action::Update, &admin, &domain_scope(&domain)));
	assert!(evaluator.authorize(&Action::Delete, &admin, &domain_scope(&domain)));
}

#[rstest]
fn anonymous_callers_never_pass() {
	let domain = marketing_domain();
	let evaluator = AccessEvaluator::new();

	assert!(!evaluator.authorize(&Action::View, &Caller::anonymous(), &domain_scope(&domain)));
}

#[rstest]
fn role_hierarchy_default_applies_without_a_configured_rule() {
	// No rule for view/delete: any tenant membership may view, only an
	// organization admin may mutate.
	let domain = marketing_domain();
	let evaluator = AccessEvaluator::new();

	let member = Caller::user(Uuid::new_v4()).with_organization("acme", OrganizationRole::Member);
	let admin = Caller::user(Uuid::new_v4()).with_organization("acme", OrganizationRole::Admin);
	let domain_member = Caller::user(Uuid::new_v4()).with_membership("marketing", "viewer");

	assert!(evaluator.authorize(&Action::View, &member, &domain_scope(&domain)));
	assert!(evaluator.authorize(&Action::View, &domain_member, &domain_scope(&domain)));
	assert!(!evaluator.authorize(&Action::Delete, &member, &domain_scope(&domain)));
	assert!(!evaluator.authorize(&Action::Delete, &domain_member, &domain_scope(&domain)));
	assert!(evaluator.authorize(&Action::Delete, &admin, &domain_scope(&domain)));
}

#[rstest]
fn content_type_rules_override_the_domain_table() {
	let domain = marketing_domain();
	let content_type = ContentType::new("press_release", "Press release").with_permission(
		Action::Update,
		PermissionRule::parse("member.type == \"publisher\"").unwrap(),
	);
	let evaluator = AccessEvaluator::new();
	let editor = Caller::user(Uuid::new_v4()).with_membership("marketing", "editor");

	let scope = AccessScope {
		domain: &domain,
		content_type: Some(&content_type),
		entity: None,
	};

	// The domain table would grant the editor; the type-level rule wins.
	assert!(!evaluator.authorize(&Action::Update, &editor, &scope));
	assert!(evaluator.authorize(&Action::Update, &editor, &domain_scope(&domain)));
}

#[rstest]
fn rules_may_target_the_specific_entity() {
	let domain = Domain::new("marketing", "Marketing")
		.with_organization("acme")
		.with_permission(
			Action::Delete,
			PermissionRule::parse("member.type == \"editor\" && content.type != \"legal_page\"")
				.unwrap(),
		);
	let evaluator = AccessEvaluator::new();
	let editor = Caller::user(Uuid::new_v4()).with_membership("marketing", "editor");

	let page = TestContent::new("c1", "landing_page");
	let legal = TestContent::new("c2", "legal_page");

	let page_scope = AccessScope {
		domain: &domain,
		content_type: None,
		entity: Some(&page),
	};
	let legal_scope = AccessScope {
		domain: &domain,
		content_type: None,
		entity: Some(&legal),
	};

	assert!(evaluator.authorize(&Action::Delete, &editor, &page_scope));
	assert!(!evaluator.authorize(&Action::Delete, &editor, &legal_scope));
}

#[rstest]
fn api_clients_act_as_domain_members() {
	let domain = marketing_domain();
	let evaluator = AccessEvaluator::new();

	let client = Caller::api_client("marketing", "editor");

	assert!(evaluator.authorize(&Action::Update, &client, &domain_scope(&domain)));
	assert!(evaluator.authorize(&Action::View, &client, &domain_scope(&domain)));
}

#[rstest]
fn evaluation_reflects_membership_changes_between_requests() {
	// Nothing is cached: the same evaluator revisits the caller's current
	// membership on every check.
	let domain = marketing_domain();
	let evaluator = AccessEvaluator::new();
	let id = Uuid::new_v4();

	let as_editor = Caller::user(id).with_membership("marketing", "editor");
	assert!(evaluator.authorize(&Action::Update, &as_editor, &domain_scope(&domain)));

	let demoted = Caller::user(id).with_membership("marketing", "viewer");
	assert!(!evaluator.authorize(&Action::Update, &demoted, &domain_scope(&domain)));
}

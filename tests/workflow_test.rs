//! Tests for workflow gating of mutations

mod common;

use common::TestContent;
use grappelli_cms::definition::DomainDefinitionParser;
use grappelli_cms::domain::DomainManager;
use grappelli_cms::error::CmsError;
use grappelli_cms::field::FieldTypeRegistry;
use grappelli_cms::permissions::{Action, Caller};
use grappelli_cms::resolver::ContentResolver;
use grappelli_cms::workflow::{StateTransition, Workflow};
use rstest::rstest;
use std::sync::Arc;

const EDITORIAL_DEFINITION: &str = r#"{
	"title": "Editorial",
	"identifier": "editorial",
	"content_types": [
		{
			"identifier": "article",
			"title": "Article",
			"fields": [
				{"identifier": "title", "type": "text", "required": true}
			],
			"workflow": [
				{"identifier": "submit", "label": "Submit for review", "from": ["draft"], "to": "review"},
				{"identifier": "publish", "label": "Publish", "from": ["review"], "to": "published"}
			],
			"permissions": {
				"transition:publish": "member.type == \"editor\""
			}
		},
		{
			"identifier": "note",
			"title": "Note",
			"fields": [
				{"identifier": "body", "type": "text"}
			]
		}
	]
}"#;

fn editorial_resolver() -> ContentResolver {
	let field_types = Arc::new(FieldTypeRegistry::with_defaults());
	let parser = DomainDefinitionParser::new(Arc::clone(&field_types));
	let domain = parser.parse(EDITORIAL_DEFINITION).unwrap();
	let domains = Arc::new(DomainManager::new());
	domains.attach(Arc::new(domain));
	ContentResolver::new(domains, field_types)
}

fn editor() -> Caller {
	Caller::api_client("editorial", "editor")
}

#[rstest]
fn transition_legality_follows_the_declared_graph() {
	let workflow = Workflow::new()
		.with_transition(StateTransition::new(
			"submit",
			"Submit for review",
			vec!["draft".into()],
			"review",
		))
		.with_transition(StateTransition::new(
			"publish",
			"Publish",
			vec!["review".into()],
			"published",
		));

	assert!(workflow.is_transition_allowed("draft", "submit"));
	assert!(!workflow.is_transition_allowed("published", "submit"));
	assert!(!workflow.is_transition_allowed("draft", "publish"));
}

#[rstest]
fn allowed_transition_yields_the_new_state() {
	let resolver = editorial_resolver();
	let article = TestContent::new("art1", "article");

	let next = resolver
		.plan_transition(&article, "draft", "submit", &editor())
		.unwrap();

	assert_eq!(next, "review");
}

#[rstest]
fn illegal_transition_is_a_rejected_mutation() {
	let resolver = editorial_resolver();
	let article = TestContent::new("art1", "article");

	let error = resolver
		.plan_transition(&article, "draft", "publish", &editor())
		.unwrap_err();

	match error {
		CmsError::TransitionRejected { transition, state } => {
			assert_eq!(transition, "publish");
			assert_eq!(state, "draft");
		}
		other => panic!("expected a rejected transition, got {other}"),
	}
}

#[rstest]
fn unknown_transition_is_explicitly_rejected() {
	let resolver = editorial_resolver();
	let article = TestContent::new("art1", "article");

	let error = resolver
		.plan_transition(&article, "draft", "archive", &editor())
		.unwrap_err();

	assert!(matches!(error, CmsError::TransitionRejected { .. }));
}

#[rstest]
fn workflow_check_runs_before_authorization() {
	// A viewer may not publish, but an illegal transition must surface as
	// the workflow rejection, not as an access denial.
	let resolver = editorial_resolver();
	let article = TestContent::new("art1", "article");
	let viewer = Caller::api_client("editorial", "viewer");

	let error = resolver
		.plan_transition(&article, "draft", "publish", &viewer)
		.unwrap_err();

	assert!(matches!(error, CmsError::TransitionRejected { .. }));
}

#[rstest]
fn denied_transition_is_indistinguishable_from_not_found() {
	let resolver = editorial_resolver();
	let article = TestContent::new("art1", "article");
	let viewer = Caller::api_client("editorial", "viewer");

	let error = resolver
		.plan_transition(&article, "review", "publish", &viewer)
		.unwrap_err();

	assert!(matches!(error, CmsError::NotFound));
	assert_eq!(error.to_string(), CmsError::NotFound.to_string());
}

#[rstest]
fn permitted_caller_passes_the_gate() {
	let resolver = editorial_resolver();
	let article = TestContent::new("art1", "article");

	let next = resolver
		.plan_transition(&article, "review", "publish", &editor())
		.unwrap();

	assert_eq!(next, "published");
}

#[rstest]
fn the_raw_authorization_outcome_is_exposed_for_voters() {
	let resolver = editorial_resolver();

	// No update rule is configured, so the role-hierarchy default applies:
	// a domain member may view but not mutate.
	let member = editor();
	assert!(
		resolver
			.authorize(&Action::View, &member, Some("article"), None)
			.unwrap()
	);
	assert!(
		!resolver
			.authorize(&Action::Update, &member, Some("article"), None)
			.unwrap()
	);

	// An unknown content type is a configuration-class error, not a denial.
	let error = resolver
		.authorize(&Action::View, &member, Some("podcast"), None)
		.unwrap_err();
	assert!(matches!(error, CmsError::UnknownContentType(_)));
}

#[rstest]
fn types_without_a_workflow_reject_every_transition() {
	let resolver = editorial_resolver();
	let note = TestContent::new("n1", "note");

	let error = resolver
		.plan_transition(&note, "draft", "submit", &editor())
		.unwrap_err();

	assert!(matches!(error, CmsError::TransitionRejected { .. }));
}

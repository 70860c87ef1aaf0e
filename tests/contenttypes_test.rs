//! Tests for the content type registry and union synthesis

use grappelli_cms::contenttypes::{ContentType, ContentTypeField, ContentTypeManager};
use rstest::rstest;

fn article_with_block_union() -> ContentType {
	ContentType::new("article", "Article")
		.with_field(ContentTypeField::new("title", "text").required())
		.with_field(
			ContentTypeField::new("blocks", "reference")
				.with_return_type("article_block")
				.with_union_type("gallery", "GALLERY")
				.with_union_type("paragraph", "PARAGRAPH")
				.list_of(),
		)
}

#[rstest]
fn registering_synthesizes_one_union_per_declaration() {
	// Arrange
	let mut types = ContentTypeManager::new();

	// Act
	types.register_content_type(article_with_block_union());

	// Assert - exactly one union, named after the field's return type, with
	// one field per member type
	assert_eq!(types.union_content_types().len(), 1);
	let union = types.get_union_content_type("article_block").unwrap();
	let field_ids: Vec<&str> = union.fields().iter().map(|field| field.id.as_str()).collect();
	assert_eq!(field_ids, vec!["gallery", "paragraph"]);
	assert_eq!(union.field("gallery").unwrap().return_type, "gallery");
	assert_eq!(union.field("gallery").unwrap().field_type, "reference");
}

#[rstest]
fn non_union_fields_synthesize_nothing() {
	let mut types = ContentTypeManager::new();

	types.register_content_type(
		ContentType::new("page", "Page").with_field(ContentTypeField::new("body", "text")),
	);

	assert!(types.union_content_types().is_empty());
}

#[rstest]
fn re_registration_is_idempotent() {
	let mut types = ContentTypeManager::new();

	types.register_content_type(article_with_block_union());
	types.register_content_type(article_with_block_union());

	assert_eq!(types.content_types().len(), 1);
	assert_eq!(types.union_content_types().len(), 1);
	assert_eq!(
		types
			.get_union_content_type("article_block")
			.unwrap()
			.fields()
			.len(),
		2
	);
}

#[rstest]
fn re_registration_drops_stale_unions() {
	let mut types = ContentTypeManager::new();
	types.register_content_type(article_with_block_union());
	assert!(types.get_union_content_type("article_block").is_some());

	// Same identifier, no union field any more: the derived union must go.
	types.register_content_type(
		ContentType::new("article", "Article").with_field(ContentTypeField::new("title", "text")),
	);

	assert!(types.get_union_content_type("article_block").is_none());
	assert!(types.union_content_types().is_empty());
}

#[rstest]
fn get_any_type_prefers_declared_over_union() {
	let mut types = ContentTypeManager::new();
	// A union whose derived id collides with a declared type.
	types.register_content_type(
		ContentType::new("media", "Media (declared)").with_field(ContentTypeField::new("url", "text")),
	);
	types.register_content_type(
		ContentType::new("article", "Article").with_field(
			ContentTypeField::new("attachment", "reference")
				.with_return_type("media")
				.with_union_type("image", "IMAGE")
				.with_union_type("video", "VIDEO"),
		),
	);
	assert!(types.get_union_content_type("media").is_some());

	let found = types.get_any_type("media").unwrap();

	assert_eq!(found.title(), "Media (declared)");
}

#[rstest]
fn get_any_type_probes_embedded_before_union() {
	let mut types = ContentTypeManager::new();
	types.register_embedded_content_type(ContentType::new("address", "Address (embedded)"));

	assert_eq!(
		types.get_any_type("address").unwrap().title(),
		"Address (embedded)"
	);
	assert!(types.get_any_type("missing").is_none());
}

#[rstest]
fn get_all_types_merges_with_declared_precedence() {
	let mut types = ContentTypeManager::new();
	types.register_content_type(
		ContentType::new("media", "Media (declared)").with_field(ContentTypeField::new("url", "text")),
	);
	types.register_embedded_content_type(ContentType::new("address", "Address"));
	types.register_content_type(
		ContentType::new("article", "Article").with_field(
			ContentTypeField::new("attachment", "reference")
				.with_return_type("media")
				.with_union_type("image", "IMAGE"),
		),
	);

	let all = types.get_all_types();

	assert_eq!(all.len(), 3);
	assert_eq!(all.get("media").unwrap().title(), "Media (declared)");
	assert!(all.contains_key("article"));
	assert!(all.contains_key("address"));
}

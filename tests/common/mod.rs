//! Shared fixtures: a content record and an in-memory content manager
//!
//! The in-memory manager mirrors the storage collaborator contract: `find`
//! returns a duplicate-free result set and silently omits ids that do not
//! resolve, which is exactly the behavior batched reference resolution has
//! to compensate for.

#![allow(dead_code)]

use async_trait::async_trait;
use grappelli_cms::content::{Content, ContentFilter, ContentManager, FieldData, ResultSet};
use grappelli_cms::domain::Domain;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A minimal content record.
pub struct TestContent {
	id: String,
	content_type: String,
	data: HashMap<String, FieldData>,
}

impl TestContent {
	pub fn new(id: impl Into<String>, content_type: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			content_type: content_type.into(),
			data: HashMap::new(),
		}
	}

	pub fn with_data(mut self, field: impl Into<String>, data: FieldData) -> Self {
		self.data.insert(field.into(), data);
		self
	}
}

impl Content for TestContent {
	fn id(&self) -> &str {
		&self.id
	}

	fn content_type(&self) -> &str {
		&self.content_type
	}

	fn field_data(&self, field: &str) -> Option<&FieldData> {
		self.data.get(field)
	}
}

/// In-memory content manager with a call counter, so tests can assert that
/// list resolution batches into a single lookup.
#[derive(Default)]
pub struct InMemoryContentManager {
	entities: HashMap<String, Vec<Arc<TestContent>>>,
	find_calls: AtomicUsize,
}

impl InMemoryContentManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, content: TestContent) -> &mut Self {
		self.entities
			.entry(content.content_type.clone())
			.or_default()
			.push(Arc::new(content));
		self
	}

	pub fn find_calls(&self) -> usize {
		self.find_calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ContentManager for InMemoryContentManager {
	async fn find(
		&self,
		_domain: &Domain,
		type_id: &str,
		filter: &ContentFilter,
	) -> anyhow::Result<ResultSet> {
		self.find_calls.fetch_add(1, Ordering::SeqCst);
		let result: Vec<Arc<dyn Content>> = self
			.entities
			.get(type_id)
			.into_iter()
			.flatten()
			.filter(|entity| match &filter.ids {
				Some(ids) => ids.iter().any(|id| id == entity.id()),
				None => true,
			})
			.map(|entity| Arc::clone(entity) as Arc<dyn Content>)
			.collect();
		Ok(ResultSet::of(result))
	}

	async fn get(
		&self,
		_domain: &Domain,
		type_id: &str,
		id: &str,
	) -> anyhow::Result<Option<Arc<dyn Content>>> {
		Ok(self
			.entities
			.get(type_id)
			.and_then(|entities| entities.iter().find(|entity| entity.id() == id))
			.map(|entity| Arc::clone(entity) as Arc<dyn Content>))
	}
}

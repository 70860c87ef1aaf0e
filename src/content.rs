//! Raw content data and the storage collaborator contract
//!
//! The core never talks to a database. Content records are read through the
//! [`ContentManager`] trait, and the raw values stored for a field arrive as
//! [`FieldData`], a single JSON value or an ordered list of them. Both are
//! transient: they are built per resolution and never persisted here.

use crate::domain::Domain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Raw stored value(s) for one field of one content instance.
///
/// List-valued fields carry an ordered sequence of rows; everything else is a
/// single value. The serde representation is untagged so stored JSON maps
/// directly: an array becomes [`FieldData::List`], anything else
/// [`FieldData::Single`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldData {
	/// Ordered rows of a list-valued field
	List(Vec<JsonValue>),
	/// A single raw value
	Single(JsonValue),
}

impl FieldData {
	/// Wraps a single raw value.
	pub fn single(value: impl Into<JsonValue>) -> Self {
		FieldData::Single(value.into())
	}

	/// Wraps an ordered list of rows.
	pub fn list(rows: impl IntoIterator<Item = JsonValue>) -> Self {
		FieldData::List(rows.into_iter().collect())
	}

	/// `true` for list-valued data.
	pub fn is_list(&self) -> bool {
		matches!(self, FieldData::List(_))
	}

	/// The single value, when not list-valued.
	pub fn value(&self) -> Option<&JsonValue> {
		match self {
			FieldData::Single(value) => Some(value),
			FieldData::List(_) => None,
		}
	}

	/// All rows in order. A single value is exposed as a one-row slice.
	pub fn rows(&self) -> &[JsonValue] {
		match self {
			FieldData::List(rows) => rows,
			FieldData::Single(value) => std::slice::from_ref(value),
		}
	}
}

/// A content instance as seen by the resolution pipeline.
///
/// Implemented by the storage collaborator's records. The pipeline never
/// mutates a content instance.
pub trait Content: Send + Sync {
	/// Storage-assigned identifier, opaque to the core.
	fn id(&self) -> &str;

	/// Identifier of the instance's content type within its domain.
	fn content_type(&self) -> &str;

	/// Raw stored data for the given field, if any was stored.
	fn field_data(&self, field: &str) -> Option<&FieldData>;
}

/// Filter handed to [`ContentManager::find`].
///
/// The core only ever filters by id sets (batched reference resolution);
/// richer querying belongs to the storage collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
	/// Restrict to entities whose id is in this set.
	pub ids: Option<Vec<String>>,
}

impl ContentFilter {
	/// Filter matching exactly the given ids.
	pub fn by_ids(ids: Vec<String>) -> Self {
		Self { ids: Some(ids) }
	}
}

/// One page of results from [`ContentManager::find`].
pub struct ResultSet {
	/// Matching entities. Free of duplicate ids for a given filter.
	pub result: Vec<Arc<dyn Content>>,
	/// Page number this result set represents.
	pub page: usize,
	/// Total number of matches across all pages.
	pub total: usize,
}

impl ResultSet {
	/// A single-page result set over the given entities.
	pub fn of(result: Vec<Arc<dyn Content>>) -> Self {
		let total = result.len();
		Self {
			result,
			page: 1,
			total,
		}
	}
}

/// Read-side storage collaborator.
///
/// Implementations must return result sets free of duplicate ids for a given
/// filter. Errors are opaque to the core and surface as
/// [`CmsError::Storage`](crate::error::CmsError::Storage).
#[async_trait]
pub trait ContentManager: Send + Sync {
	/// Finds entities of `type_id` in `domain` matching `filter`.
	async fn find(
		&self,
		domain: &Domain,
		type_id: &str,
		filter: &ContentFilter,
	) -> anyhow::Result<ResultSet>;

	/// Fetches one entity by id, `None` when it does not exist.
	async fn get(
		&self,
		domain: &Domain,
		type_id: &str,
		id: &str,
	) -> anyhow::Result<Option<Arc<dyn Content>>>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn single_value_exposes_one_row() {
		let data = FieldData::single("hello");

		assert!(!data.is_list());
		assert_eq!(data.value(), Some(&json!("hello")));
		assert_eq!(data.rows(), &[json!("hello")]);
	}

	#[rstest]
	fn list_preserves_row_order_and_duplicates() {
		let data = FieldData::list(vec![json!("a"), json!("b"), json!("a")]);

		assert!(data.is_list());
		assert_eq!(data.value(), None);
		assert_eq!(data.rows(), &[json!("a"), json!("b"), json!("a")]);
	}

	#[rstest]
	fn untagged_serde_round_trip() {
		let single: FieldData = serde_json::from_value(json!("x")).unwrap();
		let list: FieldData = serde_json::from_value(json!(["x", "y"])).unwrap();

		assert_eq!(single, FieldData::single("x"));
		assert_eq!(list, FieldData::list(vec![json!("x"), json!("y")]));
	}
}

//! Violation accumulation for configuration and data validation
//!
//! All validation in this crate accumulates into a [`ValidationContext`]
//! instead of failing fast, so a caller always receives the complete set of
//! problems in one pass.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

// Identifier pattern shared by content types, fields and workflow
// transitions: lowercase start, then lowercase/digits/underscores.
static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[a-z][a-z0-9_]*$").expect("IDENTIFIER_REGEX: invalid regex pattern")
});

/// Returns `true` when `value` is a well-formed identifier.
///
/// Identifiers start with a lowercase ASCII letter and may continue with
/// lowercase letters, digits and underscores.
///
/// # Examples
///
/// ```
/// use grappelli_cms::validation::is_valid_identifier;
///
/// assert!(is_valid_identifier("blog_post"));
/// assert!(!is_valid_identifier("BlogPost"));
/// assert!(!is_valid_identifier("1st"));
/// assert!(!is_valid_identifier(""));
/// ```
pub fn is_valid_identifier(value: &str) -> bool {
	IDENTIFIER_REGEX.is_match(value)
}

/// A single validation failure.
///
/// The message is a template; placeholders of the form `{{ name }}` are
/// substituted from [`Violation::parameters`] when rendering, so transport
/// layers can translate templates without re-deriving the parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
	/// Dotted path to the offending property, e.g. `content_types.blog.fields.author.return_type`
	pub property_path: String,
	/// Message template with `{{ name }}` placeholders
	pub message: String,
	/// Placeholder values keyed by name
	pub parameters: BTreeMap<String, String>,
}

impl Violation {
	/// Renders the message template with all parameters substituted.
	pub fn rendered_message(&self) -> String {
		let mut out = self.message.clone();
		for (name, value) in &self.parameters {
			out = out.replace(&format!("{{{{ {name} }}}}"), value);
		}
		out
	}
}

/// Accumulates [`Violation`]s during configuration or data validation.
///
/// A prefix stack lets callers scope nested validation (a content type
/// entering `fields.author` before delegating to the field plugin) without
/// the plugin knowing where it is mounted.
#[derive(Debug, Default)]
pub struct ValidationContext {
	prefix: Vec<String>,
	violations: Vec<Violation>,
}

impl ValidationContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Pushes a path segment; subsequent violations are reported below it.
	pub fn enter(&mut self, segment: impl Into<String>) {
		self.prefix.push(segment.into());
	}

	/// Pops the most recent path segment.
	pub fn leave(&mut self) {
		self.prefix.pop();
	}

	/// Starts building a violation with the given message template.
	///
	/// # Examples
	///
	/// ```
	/// use grappelli_cms::validation::ValidationContext;
	///
	/// let mut ctx = ValidationContext::new();
	/// ctx.enter("fields.author");
	/// ctx.build_violation("Unknown setting \"{{ setting }}\".")
	/// 	.parameter("setting", "colour")
	/// 	.at("settings.colour")
	/// 	.emit();
	///
	/// let violation = &ctx.violations()[0];
	/// assert_eq!(violation.property_path, "fields.author.settings.colour");
	/// assert_eq!(violation.rendered_message(), "Unknown setting \"colour\".");
	/// ```
	pub fn build_violation(&mut self, message: impl Into<String>) -> ViolationBuilder<'_> {
		ViolationBuilder {
			context: self,
			leaf: String::new(),
			message: message.into(),
			parameters: BTreeMap::new(),
		}
	}

	/// All violations accumulated so far.
	pub fn violations(&self) -> &[Violation] {
		&self.violations
	}

	/// `true` when no violation has been recorded.
	pub fn is_empty(&self) -> bool {
		self.violations.is_empty()
	}

	/// Consumes the context, returning the accumulated violations.
	pub fn into_violations(self) -> Vec<Violation> {
		self.violations
	}

	fn full_path(&self, leaf: &str) -> String {
		let mut segments: Vec<&str> = self.prefix.iter().map(String::as_str).collect();
		if !leaf.is_empty() {
			segments.push(leaf);
		}
		segments.join(".")
	}
}

/// Builder returned by [`ValidationContext::build_violation`].
///
/// Nothing is recorded until [`emit`](ViolationBuilder::emit) is called.
#[must_use = "a violation is only recorded once emit() is called"]
pub struct ViolationBuilder<'a> {
	context: &'a mut ValidationContext,
	leaf: String,
	message: String,
	parameters: BTreeMap<String, String>,
}

impl ViolationBuilder<'_> {
	/// Sets the path of the violation relative to the current prefix.
	pub fn at(mut self, leaf: impl Into<String>) -> Self {
		self.leaf = leaf.into();
		self
	}

	/// Adds a `{{ name }}` placeholder value.
	pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parameters.insert(name.into(), value.into());
		self
	}

	/// Records the violation on the owning context.
	pub fn emit(self) {
		let violation = Violation {
			property_path: self.context.full_path(&self.leaf),
			message: self.message,
			parameters: self.parameters,
		};
		self.context.violations.push(violation);
	}
}

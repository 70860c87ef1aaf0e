//! Per-content-type workflow state machine
//!
//! A workflow is nothing more than its transitions: the state set is implicit
//! (the union of every `from`/`to` value) and the machine validates
//! *transitions*, never initial placement. An illegal transition request is a
//! rejected mutation, not a crash; content state is left untouched.

use crate::error::{CmsError, CmsResult};
use crate::validation::{ValidationContext, is_valid_identifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const IDENTIFIER_MAX_LENGTH: usize = 30;
const LABEL_MAX_LENGTH: usize = 255;

/// A named, labeled transition between workflow states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
	/// Transition identifier, unique within its workflow
	pub identifier: String,
	/// Human-readable label
	pub label: String,
	/// States this transition may leave from. May contain
	/// [`StateTransition::WILDCARD`].
	pub froms: Vec<String>,
	/// The single deterministic target state
	pub to: String,
}

impl StateTransition {
	/// A `from` entry covering every state.
	pub const WILDCARD: &'static str = "*";

	/// Creates a transition.
	pub fn new(
		identifier: impl Into<String>,
		label: impl Into<String>,
		froms: Vec<String>,
		to: impl Into<String>,
	) -> Self {
		Self {
			identifier: identifier.into(),
			label: label.into(),
			froms,
			to: to.into(),
		}
	}

	/// `true` when the transition may leave from `state`.
	pub fn allows_from(&self, state: &str) -> bool {
		self.froms
			.iter()
			.any(|from| from == state || from == Self::WILDCARD)
	}

	/// Validates the declaration in two sequenced tiers.
	///
	/// Tier one checks presence (non-blank identifier, label and target, a
	/// non-empty `from` list). Tier two checks lengths and the identifier
	/// character set, and only runs when tier one passed: a malformed
	/// transition must not cascade into confusing follow-up errors.
	pub fn validate(&self, ctx: &mut ValidationContext) {
		let mut presence_ok = true;

		if self.identifier.trim().is_empty() {
			ctx.build_violation("This value should not be blank.")
				.at("identifier")
				.emit();
			presence_ok = false;
		}
		if self.label.trim().is_empty() {
			ctx.build_violation("This value should not be blank.")
				.at("label")
				.emit();
			presence_ok = false;
		}
		if self.froms.is_empty() || self.froms.iter().any(|from| from.trim().is_empty()) {
			ctx.build_violation("A transition requires at least one non-blank origin state.")
				.at("from")
				.emit();
			presence_ok = false;
		}
		if self.to.trim().is_empty() {
			ctx.build_violation("This value should not be blank.")
				.at("to")
				.emit();
			presence_ok = false;
		}

		if !presence_ok {
			return;
		}

		if self.identifier.len() > IDENTIFIER_MAX_LENGTH {
			ctx.build_violation(
				"This value is too long. It should have {{ limit }} characters or less.",
			)
			.parameter("limit", IDENTIFIER_MAX_LENGTH.to_string())
			.at("identifier")
			.emit();
		}
		if !is_valid_identifier(&self.identifier) {
			ctx.build_violation(
				"This value contains invalid characters. Use lowercase letters, digits and underscores, starting with a letter.",
			)
			.at("identifier")
			.emit();
		}
		if self.label.len() > LABEL_MAX_LENGTH {
			ctx.build_violation(
				"This value is too long. It should have {{ limit }} characters or less.",
			)
			.parameter("limit", LABEL_MAX_LENGTH.to_string())
			.at("label")
			.emit();
		}
	}
}

/// The set of transitions governing legal state changes for a content type.
///
/// # Examples
///
/// ```
/// use grappelli_cms::workflow::{StateTransition, Workflow};
///
/// let workflow = Workflow::new()
/// 	.with_transition(StateTransition::new(
/// 		"submit",
/// 		"Submit for review",
/// 		vec!["draft".into()],
/// 		"review",
/// 	))
/// 	.with_transition(StateTransition::new(
/// 		"publish",
/// 		"Publish",
/// 		vec!["review".into()],
/// 		"published",
/// 	));
///
/// assert!(workflow.is_transition_allowed("draft", "submit"));
/// assert!(!workflow.is_transition_allowed("draft", "publish"));
/// assert!(!workflow.is_transition_allowed("published", "submit"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
	transitions: Vec<StateTransition>,
}

impl Workflow {
	/// Creates an empty workflow.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a transition.
	pub fn with_transition(mut self, transition: StateTransition) -> Self {
		self.transitions.push(transition);
		self
	}

	/// All transitions in declaration order.
	pub fn transitions(&self) -> &[StateTransition] {
		&self.transitions
	}

	/// Looks up a transition by identifier.
	pub fn transition(&self, identifier: &str) -> Option<&StateTransition> {
		self.transitions
			.iter()
			.find(|transition| transition.identifier == identifier)
	}

	/// Whether the named transition may fire from `current_state`.
	///
	/// An unknown transition identifier is an explicit rejection, never a
	/// silent pass.
	pub fn is_transition_allowed(&self, current_state: &str, transition: &str) -> bool {
		match self.transition(transition) {
			Some(transition) => transition.allows_from(current_state),
			None => false,
		}
	}

	/// Applies the named transition, returning the deterministic new state.
	pub fn apply(&self, current_state: &str, transition: &str) -> CmsResult<&str> {
		match self.transition(transition) {
			Some(found) if found.allows_from(current_state) => Ok(found.to.as_str()),
			_ => Err(CmsError::TransitionRejected {
				transition: transition.to_string(),
				state: current_state.to_string(),
			}),
		}
	}

	/// The implicit state set: every `from` and `to` across all transitions,
	/// wildcard excluded.
	pub fn states(&self) -> BTreeSet<&str> {
		let mut states = BTreeSet::new();
		for transition in &self.transitions {
			for from in &transition.froms {
				if from != StateTransition::WILDCARD {
					states.insert(from.as_str());
				}
			}
			states.insert(transition.to.as_str());
		}
		states
	}

	/// States that appear only as a `to`, never as a `from`.
	pub fn terminal_states(&self) -> BTreeSet<&str> {
		let mut terminal = self.states();
		for transition in &self.transitions {
			for from in &transition.froms {
				terminal.remove(from.as_str());
			}
		}
		terminal
	}

	/// Validates every transition declaration, plus identifier uniqueness
	/// across the workflow.
	pub fn validate(&self, ctx: &mut ValidationContext) {
		let mut seen = BTreeSet::new();
		for (index, transition) in self.transitions.iter().enumerate() {
			ctx.enter(format!("transitions.{index}"));
			transition.validate(ctx);
			if !transition.identifier.trim().is_empty() && !seen.insert(&transition.identifier) {
				ctx.build_violation("Duplicate transition identifier \"{{ identifier }}\".")
					.parameter("identifier", transition.identifier.as_str())
					.at("identifier")
					.emit();
			}
			ctx.leave();
		}
	}
}

//! Minimal boolean expression language for permission rules
//!
//! Grammar: string/bool literals, dotted context paths (`member.type`),
//! equality (`==`, `!=`), membership (`in ["a", "b"]`), `!`, `&&`, `||` and
//! parentheses. Nothing else: this is a fixed, auditable rule language, not
//! a scripting sandbox. String literals carry no escape sequences.
//!
//! Precedence, loosest to tightest: `||`, `&&`, `!`, comparison. Note that
//! `!` applies to the comparison that follows it, so `!member.type == "bot"`
//! reads as `!(member.type == "bot")`.
//!
//! Expressions are parsed once at domain-definition time and evaluated fresh
//! on every authorization check. Evaluation is side-effect-free; any
//! reference to a context variable the caller cannot supply makes the whole
//! expression false. Deny by default, never an error.

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_while},
	character::complete::{alpha1, alphanumeric1, char, multispace0},
	combinator::{map, not, opt, recognize, value},
	multi::{many0, many0_count, separated_list0, separated_list1},
	sequence::{delimited, pair, preceded, terminated},
};
use thiserror::Error;

/// A literal value in an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
	/// A double-quoted string
	Str(String),
	/// `true` or `false`
	Bool(bool),
}

impl Literal {
	fn as_bool(&self) -> Result<bool, Unresolved> {
		match self {
			Literal::Bool(flag) => Ok(*flag),
			Literal::Str(_) => Err(Unresolved),
		}
	}
}

/// Equality operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
	/// `==`
	Eq,
	/// `!=`
	Ne,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	/// A literal value
	Literal(Literal),
	/// A dotted context path such as `member.type`
	Path(Vec<String>),
	/// Logical negation
	Not(Box<Expr>),
	/// Both operands must hold
	And(Box<Expr>, Box<Expr>),
	/// Either operand must hold
	Or(Box<Expr>, Box<Expr>),
	/// Equality comparison
	Compare {
		/// The operator
		op: CompareOp,
		/// Left operand
		left: Box<Expr>,
		/// Right operand
		right: Box<Expr>,
	},
	/// Membership in a literal list
	In {
		/// The value being tested
		needle: Box<Expr>,
		/// The literal candidates
		haystack: Vec<Literal>,
	},
}

/// Parse failure with the byte position of the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid expression at position {position}: {message}")]
pub struct ExpressionError {
	/// Byte offset into the source
	pub position: usize,
	/// What went wrong
	pub message: String,
}

/// Supplies context variable values during evaluation.
///
/// Returning `None` marks the path as unresolvable for this caller, which
/// makes the whole expression evaluate to false.
pub trait ExpressionContext {
	/// Resolves a dotted path like `["member", "type"]`.
	fn resolve(&self, path: &[String]) -> Option<Literal>;
}

// Poison marker: a referenced variable the context cannot supply. Bubbles to
// the top of evaluation where it becomes a plain `false`.
struct Unresolved;

impl Expr {
	/// Evaluates the expression against `ctx`.
	///
	/// # Examples
	///
	/// ```
	/// use grappelli_cms::permissions::expression::{ExpressionContext, Literal, parse};
	///
	/// struct Editor;
	/// impl ExpressionContext for Editor {
	/// 	fn resolve(&self, path: &[String]) -> Option<Literal> {
	/// 		(path == ["member", "type"]).then(|| Literal::Str("editor".into()))
	/// 	}
	/// }
	///
	/// let expr = parse("member.type == \"editor\"").unwrap();
	/// assert!(expr.evaluate(&Editor));
	/// ```
	pub fn evaluate(&self, ctx: &dyn ExpressionContext) -> bool {
		matches!(self.eval(ctx), Ok(Literal::Bool(true)))
	}

	fn eval(&self, ctx: &dyn ExpressionContext) -> Result<Literal, Unresolved> {
		match self {
			Expr::Literal(literal) => Ok(literal.clone()),
			Expr::Path(path) => ctx.resolve(path).ok_or(Unresolved),
			Expr::Not(inner) => Ok(Literal::Bool(!inner.eval(ctx)?.as_bool()?)),
			// No short-circuit: an unresolved variable anywhere must poison
			// the whole expression, independent of operand order.
			Expr::And(left, right) => {
				let left = left.eval(ctx)?.as_bool()?;
				let right = right.eval(ctx)?.as_bool()?;
				Ok(Literal::Bool(left && right))
			}
			Expr::Or(left, right) => {
				let left = left.eval(ctx)?.as_bool()?;
				let right = right.eval(ctx)?.as_bool()?;
				Ok(Literal::Bool(left || right))
			}
			Expr::Compare { op, left, right } => {
				let left = left.eval(ctx)?;
				let right = right.eval(ctx)?;
				let equal = left == right;
				Ok(Literal::Bool(match op {
					CompareOp::Eq => equal,
					CompareOp::Ne => !equal,
				}))
			}
			Expr::In { needle, haystack } => {
				let needle = needle.eval(ctx)?;
				Ok(Literal::Bool(haystack.contains(&needle)))
			}
		}
	}
}

/// Parses an expression, requiring the whole input to be consumed.
pub fn parse(source: &str) -> Result<Expr, ExpressionError> {
	match expression(source) {
		Ok((rest, expr)) if rest.trim().is_empty() => Ok(expr),
		Ok((rest, _)) => Err(ExpressionError {
			position: source.len() - rest.len(),
			message: format!("unexpected trailing input \"{}\"", rest.trim()),
		}),
		Err(nom::Err::Error(error)) | Err(nom::Err::Failure(error)) => Err(ExpressionError {
			position: source.len() - error.input.len(),
			message: "expected an expression".to_string(),
		}),
		Err(nom::Err::Incomplete(_)) => Err(ExpressionError {
			position: source.len(),
			message: "incomplete expression".to_string(),
		}),
	}
}

fn identifier(input: &str) -> IResult<&str, &str> {
	recognize(pair(
		alt((alpha1, tag("_"))),
		many0_count(alt((alphanumeric1, tag("_")))),
	))
	.parse(input)
}

// Rejects keyword prefixes of longer words, so `trueish` lexes as a path.
fn keyword_boundary(input: &str) -> IResult<&str, ()> {
	not(alt((alphanumeric1, tag("_")))).parse(input)
}

fn bool_literal(input: &str) -> IResult<&str, Literal> {
	alt((
		value(Literal::Bool(true), terminated(tag("true"), keyword_boundary)),
		value(
			Literal::Bool(false),
			terminated(tag("false"), keyword_boundary),
		),
	))
	.parse(input)
}

fn string_literal(input: &str) -> IResult<&str, Literal> {
	map(
		delimited(char('"'), take_while(|c| c != '"'), char('"')),
		|text: &str| Literal::Str(text.to_string()),
	)
	.parse(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
	alt((string_literal, bool_literal)).parse(input)
}

fn path_expr(input: &str) -> IResult<&str, Expr> {
	map(
		separated_list1(char('.'), identifier),
		|segments: Vec<&str>| Expr::Path(segments.into_iter().map(str::to_string).collect()),
	)
	.parse(input)
}

fn operand(input: &str) -> IResult<&str, Expr> {
	preceded(
		multispace0,
		alt((
			map(literal, Expr::Literal),
			delimited(char('('), expression, preceded(multispace0, char(')'))),
			path_expr,
		)),
	)
	.parse(input)
}

fn literal_list(input: &str) -> IResult<&str, Vec<Literal>> {
	delimited(
		preceded(multispace0, char('[')),
		separated_list0(
			preceded(multispace0, char(',')),
			preceded(multispace0, literal),
		),
		preceded(multispace0, char(']')),
	)
	.parse(input)
}

fn in_keyword(input: &str) -> IResult<&str, &str> {
	preceded(multispace0, terminated(tag("in"), keyword_boundary)).parse(input)
}

enum ComparisonTail {
	Cmp(CompareOp, Expr),
	In(Vec<Literal>),
}

fn comparison(input: &str) -> IResult<&str, Expr> {
	let (input, left) = operand(input)?;
	let (input, tail) = opt(alt((
		map(
			preceded(preceded(multispace0, tag("==")), operand),
			|right| ComparisonTail::Cmp(CompareOp::Eq, right),
		),
		map(
			preceded(preceded(multispace0, tag("!=")), operand),
			|right| ComparisonTail::Cmp(CompareOp::Ne, right),
		),
		map(preceded(in_keyword, literal_list), ComparisonTail::In),
	)))
	.parse(input)?;

	let expr = match tail {
		None => left,
		Some(ComparisonTail::Cmp(op, right)) => Expr::Compare {
			op,
			left: Box::new(left),
			right: Box::new(right),
		},
		Some(ComparisonTail::In(haystack)) => Expr::In {
			needle: Box::new(left),
			haystack,
		},
	};
	Ok((input, expr))
}

fn unary_expr(input: &str) -> IResult<&str, Expr> {
	alt((
		map(
			preceded(preceded(multispace0, char('!')), unary_expr),
			|inner| Expr::Not(Box::new(inner)),
		),
		comparison,
	))
	.parse(input)
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
	let (input, first) = unary_expr(input)?;
	let (input, rest) =
		many0(preceded(preceded(multispace0, tag("&&")), unary_expr)).parse(input)?;
	let expr = rest
		.into_iter()
		.fold(first, |acc, next| Expr::And(Box::new(acc), Box::new(next)));
	Ok((input, expr))
}

fn expression(input: &str) -> IResult<&str, Expr> {
	let (input, first) = and_expr(input)?;
	let (input, rest) = many0(preceded(preceded(multispace0, tag("||")), and_expr)).parse(input)?;
	let expr = rest
		.into_iter()
		.fold(first, |acc, next| Expr::Or(Box::new(acc), Box::new(next)));
	Ok((input, expr))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::BTreeMap;

	struct MapContext(BTreeMap<&'static str, Literal>);

	impl ExpressionContext for MapContext {
		fn resolve(&self, path: &[String]) -> Option<Literal> {
			self.0.get(path.join(".").as_str()).cloned()
		}
	}

	fn editor_context() -> MapContext {
		MapContext(BTreeMap::from([
			("member.type", Literal::Str("editor".into())),
			("role", Literal::Str("user".into())),
		]))
	}

	#[rstest]
	fn parses_equality_over_a_path() {
		let expr = parse("member.type == \"editor\"").unwrap();

		assert_eq!(
			expr,
			Expr::Compare {
				op: CompareOp::Eq,
				left: Box::new(Expr::Path(vec!["member".into(), "type".into()])),
				right: Box::new(Expr::Literal(Literal::Str("editor".into()))),
			}
		);
	}

	#[rstest]
	#[case("member.type == \"editor\"", true)]
	#[case("member.type == \"viewer\"", false)]
	#[case("member.type != \"viewer\"", true)]
	#[case("member.type in [\"editor\", \"admin\"]", true)]
	#[case("member.type in [\"viewer\"]", false)]
	#[case("!(member.type == \"viewer\")", true)]
	#[case("member.type == \"editor\" && role == \"user\"", true)]
	#[case("member.type == \"viewer\" || role == \"user\"", true)]
	#[case("true", true)]
	#[case("false || member.type == \"editor\"", true)]
	fn evaluates_against_a_resolvable_context(#[case] source: &str, #[case] expected: bool) {
		let expr = parse(source).unwrap();

		assert_eq!(expr.evaluate(&editor_context()), expected);
	}

	#[rstest]
	#[case("organization.role == \"admin\"")]
	#[case("member.type == \"editor\" && organization.role == \"admin\"")]
	// Even a disjunction that would otherwise hold is poisoned by an
	// unresolved variable.
	#[case("member.type == \"editor\" || organization.role == \"admin\"")]
	fn unresolved_variables_deny_instead_of_erroring(#[case] source: &str) {
		let expr = parse(source).unwrap();

		assert!(!expr.evaluate(&editor_context()));
	}

	#[rstest]
	fn non_boolean_top_level_result_is_false() {
		let expr = parse("member.type").unwrap();

		assert!(!expr.evaluate(&editor_context()));
	}

	#[rstest]
	#[case("member.type ==")]
	#[case("== \"editor\"")]
	#[case("member.type == \"editor\" extra")]
	#[case("(member.type == \"editor\"")]
	#[case("member.type in editor")]
	fn malformed_expressions_fail_to_parse(#[case] source: &str) {
		assert!(parse(source).is_err());
	}

	#[rstest]
	fn keyword_prefixes_lex_as_paths() {
		// `trueish` is a context path, not the literal `true` plus garbage.
		let expr = parse("trueish == \"yes\"").unwrap();

		assert_eq!(
			expr,
			Expr::Compare {
				op: CompareOp::Eq,
				left: Box::new(Expr::Path(vec!["trueish".into()])),
				right: Box::new(Expr::Literal(Literal::Str("yes".into()))),
			}
		);
	}
}

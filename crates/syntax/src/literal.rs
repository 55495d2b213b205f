//! Evaluation of constant literal expressions.
//!
//! Accepts only the object / array / primitive literal subset of the grammar
//! and never executes code: identifiers, calls and operators other than unary
//! `-`, `+` and `!` on literals are rejected.

use crate::error::{Result, SyntaxError};
use crate::lexical::{number_to_json, parse_number, string_value};
use crate::node::{member_parts, named_children, property_key, text, unary_operator, NodeKind};
use crate::parser::ScriptParser;
use serde_json::{Map, Value};
use tree_sitter::Node;

pub struct LiteralEvaluator {
    parser: ScriptParser,
}

impl LiteralEvaluator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: ScriptParser::new()?,
        })
    }

    /// Evaluate one literal expression, e.g. `{a:"b",1e3:[1,!0]}`.
    pub fn evaluate(&mut self, expression: &str) -> Result<Value> {
        // Parenthesized so that `{` opens an object, not a block.
        let wrapped = format!("({expression})");
        let tree = self.parser.parse(&wrapped)?;
        let root = tree.root_node();

        let statements = named_children(root);
        let [statement] = statements.as_slice() else {
            return Err(SyntaxError::unsupported("program", expression));
        };
        if NodeKind::of(*statement) != NodeKind::ExpressionStatement {
            return Err(SyntaxError::unsupported(statement.kind(), expression));
        }
        let inner = named_children(*statement)
            .into_iter()
            .next()
            .ok_or_else(|| SyntaxError::unsupported("expression_statement", expression))?;
        evaluate_node(inner, &wrapped)
    }
}

/// One-shot helper that builds a throwaway parser.
pub fn evaluate_literal(expression: &str) -> Result<Value> {
    LiteralEvaluator::new()?.evaluate(expression)
}

fn evaluate_node(node: Node<'_>, source: &str) -> Result<Value> {
    let unsupported = || SyntaxError::unsupported(node.kind(), text(node, source));

    match NodeKind::of(node) {
        NodeKind::Parenthesized => {
            let children = named_children(node);
            match children.as_slice() {
                [inner] => evaluate_node(*inner, source),
                _ => Err(unsupported()),
            }
        }
        NodeKind::Object => {
            let mut object = Map::new();
            for member in named_children(node) {
                if NodeKind::of(member) != NodeKind::Pair {
                    return Err(SyntaxError::unsupported(member.kind(), text(member, source)));
                }
                let (key, value) = member_parts(member)
                    .ok_or_else(|| SyntaxError::unsupported("pair", text(member, source)))?;
                let name = property_key(key, source)
                    .ok_or_else(|| SyntaxError::unsupported(key.kind(), text(key, source)))?;
                object.insert(name, evaluate_node(value, source)?);
            }
            Ok(Value::Object(object))
        }
        NodeKind::Array => named_children(node)
            .into_iter()
            .map(|element| evaluate_node(element, source))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        NodeKind::String => string_value(node, source)
            .map(Value::String)
            .ok_or_else(unsupported),
        NodeKind::TemplateString => {
            // Only substitution-free templates are constant.
            let raw = text(node, source);
            if named_children(node)
                .iter()
                .any(|child| child.kind() == "template_substitution")
            {
                return Err(unsupported());
            }
            let inner = raw
                .strip_prefix('`')
                .and_then(|rest| rest.strip_suffix('`'))
                .ok_or_else(unsupported)?;
            Ok(Value::String(crate::lexical::unescape(inner)))
        }
        NodeKind::Number => parse_number(text(node, source))
            .map(number_to_json)
            .ok_or_else(unsupported),
        NodeKind::True => Ok(Value::Bool(true)),
        NodeKind::False => Ok(Value::Bool(false)),
        NodeKind::Null | NodeKind::Undefined => Ok(Value::Null),
        NodeKind::UnaryExpression => {
            let argument = node
                .child_by_field_name("argument")
                .ok_or_else(unsupported)?;
            let value = evaluate_node(argument, source)?;
            match (unary_operator(node, source), &value) {
                (Some("!"), _) => Ok(Value::Bool(!truthy(&value))),
                (Some("-"), Value::Number(n)) => n
                    .as_f64()
                    .map(|v| number_to_json(-v))
                    .ok_or_else(unsupported),
                (Some("+"), Value::Number(_)) => Ok(value),
                _ => Err(unsupported()),
            }
        }
        _ => Err(unsupported()),
    }
}

/// Truthiness of an evaluated literal under the source language's rules.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn evaluates_nested_literals() {
        let value = evaluate_literal(r#"{a:"x",'b':[1,-2,.5],c:{d:null,e:!0,f:!1},"g h":`t`}"#)
            .unwrap();
        assert_eq!(
            value,
            json!({
                "a": "x",
                "b": [1, -2, 0.5],
                "c": { "d": null, "e": true, "f": false },
                "g h": "t"
            })
        );
    }

    #[test]
    fn numeric_keys_use_canonical_spelling() {
        let value = evaluate_literal(r#"{1e3:"aaaa",42:"bbbb"}"#).unwrap();
        assert_eq!(value, json!({ "1000": "aaaa", "42": "bbbb" }));
    }

    #[test]
    fn rejects_code() {
        for expression in [
            "{a: foo()}",
            "{a: b}",
            "{[k]: 1}",
            "{...rest}",
            "{a: 1 + 2}",
            "`x${y}`",
            "{ get a() { return 1 } }",
        ] {
            let err = evaluate_literal(expression).unwrap_err();
            assert!(
                matches!(err, SyntaxError::UnsupportedLiteral { .. }),
                "{expression}: {err:?}"
            );
        }
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let err = evaluate_literal("{a: }").unwrap_err();
        assert!(err.is_parse_error(), "{err:?}");
    }

    #[test]
    fn evaluator_is_reusable() {
        let mut evaluator = LiteralEvaluator::new().unwrap();
        assert_eq!(evaluator.evaluate("[]").unwrap(), json!([]));
        assert_eq!(evaluator.evaluate("'s'").unwrap(), json!("s"));
    }
}

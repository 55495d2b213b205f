use crate::error::Result;
use crate::lexical::{number_to_json, parse_number, string_value};
use crate::node::{member_parts, named_children, property_key, text, unary_operator, NodeKind};
use crate::parser::ScriptParser;
use buildscope_protocol::{Experiment, ExperimentKind, ExperimentTreatment};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tree_sitter::Node;

/// Property names that mark an object literal as an experiment definition.
const EXPERIMENT_PROPERTIES: [&str; 3] = ["kind", "id", "label"];

/// Finds experiment definitions in script text.
pub struct ExperimentExtractor {
    parser: ScriptParser,
}

impl ExperimentExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: ScriptParser::new()?,
        })
    }

    /// Extract every experiment literal in `script`, first occurrence of
    /// each id wins.
    pub fn extract(&mut self, script: &str) -> Result<Vec<Experiment>> {
        let tree = self.parser.parse(script)?;
        let mut found = ExperimentSet::default();

        // Pre-order, source order. Iterative so minified bundles with deep
        // nesting cannot exhaust the stack.
        let mut cursor = tree.walk();
        'walk: loop {
            let node = cursor.node();
            if NodeKind::of(node) == NodeKind::Object && is_experiment(node, script) {
                if let Some(experiment) = build_experiment(node, script) {
                    found.insert(experiment);
                }
            }

            if cursor.goto_first_child() {
                continue;
            }
            while !cursor.goto_next_sibling() {
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }

        log::debug!("extracted {} experiment(s)", found.len());
        Ok(found.into_vec())
    }
}

/// Ordered experiment collection deduplicated by id.
#[derive(Debug, Default)]
pub struct ExperimentSet {
    seen: HashSet<String>,
    experiments: Vec<Experiment>,
}

impl ExperimentSet {
    /// Returns `false` when an experiment with the same id is already present.
    pub fn insert(&mut self, experiment: Experiment) -> bool {
        if !self.seen.insert(experiment.id.clone()) {
            log::trace!("skipping duplicate experiment {}", experiment.id);
            return false;
        }
        self.experiments.push(experiment);
        true
    }

    pub fn extend(&mut self, experiments: impl IntoIterator<Item = Experiment>) {
        for experiment in experiments {
            self.insert(experiment);
        }
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    pub fn into_vec(self) -> Vec<Experiment> {
        self.experiments
    }
}

fn is_experiment(object: Node<'_>, source: &str) -> bool {
    let keys: Vec<String> = named_children(object)
        .into_iter()
        .filter_map(member_parts)
        .filter_map(|(key, _)| property_key(key, source))
        .collect();
    EXPERIMENT_PROPERTIES
        .iter()
        .all(|wanted| keys.iter().any(|key| key == wanted))
}

fn build_experiment(object: Node<'_>, source: &str) -> Option<Experiment> {
    let Value::Object(mut fields) = serialize(object, source) else {
        return None;
    };

    let kind = match fields.remove("kind") {
        Some(Value::String(raw)) => ExperimentKind::parse(&raw),
        Some(other) => ExperimentKind::Other(other.to_string()),
        None => return None,
    };
    let id = value_to_string(fields.remove("id")?);
    let label = value_to_string(fields.remove("label")?);
    let default_config = fields.remove("defaultConfig");
    let treatments = match fields.remove("treatments") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| build_treatment(item, &id))
            .collect(),
        _ => Vec::new(),
    };

    Some(Experiment {
        kind,
        id,
        label,
        default_config,
        treatments,
    })
}

fn build_treatment(item: Value, experiment_id: &str) -> Option<ExperimentTreatment> {
    let Value::Object(mut fields) = item else {
        log::debug!("{experiment_id}: treatment is not an object literal");
        return None;
    };
    let id = match fields.get("id") {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|v| v as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    let Some(id) = id else {
        log::debug!("{experiment_id}: treatment without numeric id");
        return None;
    };
    Some(ExperimentTreatment {
        id,
        label: fields.remove("label").map(value_to_string).unwrap_or_default(),
        config: fields.remove("config").unwrap_or(Value::Null),
    })
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Structured value of an arbitrary expression node.
///
/// Literals pass through, object and array literals recurse, `!0`/`!1` become
/// booleans and `Enum.Member` chains become the member name. Anything else is
/// kept as its source text.
fn serialize(node: Node<'_>, source: &str) -> Value {
    let raw = || Value::String(text(node, source).to_string());

    match NodeKind::of(node) {
        NodeKind::Object => {
            let mut object = Map::new();
            for member in named_children(node) {
                let Some((key, value)) = member_parts(member) else {
                    continue;
                };
                if let Some(name) = property_key(key, source) {
                    object.insert(name, serialize(value, source));
                }
            }
            Value::Object(object)
        }
        NodeKind::Array => Value::Array(
            named_children(node)
                .into_iter()
                .map(|element| serialize(element, source))
                .collect(),
        ),
        NodeKind::String => string_value(node, source).map_or_else(raw, Value::String),
        NodeKind::Number => parse_number(text(node, source)).map_or_else(raw, number_to_json),
        NodeKind::True => Value::Bool(true),
        NodeKind::False => Value::Bool(false),
        NodeKind::Null => Value::Null,
        NodeKind::Parenthesized => match named_children(node).as_slice() {
            [inner] => serialize(*inner, source),
            _ => raw(),
        },
        NodeKind::UnaryExpression => serialize_unary(node, source).unwrap_or_else(raw),
        NodeKind::MemberExpression => enum_member_name(node, source)
            .map(Value::String)
            .unwrap_or_else(raw),
        _ => raw(),
    }
}

fn serialize_unary(node: Node<'_>, source: &str) -> Option<Value> {
    let argument = node.child_by_field_name("argument")?;
    if NodeKind::of(argument) != NodeKind::Number {
        return None;
    }
    let value = parse_number(text(argument, source))?;
    match unary_operator(node, source)? {
        // minifier spelling of booleans
        "!" if value == 0.0 => Some(Value::Bool(true)),
        "!" if value == 1.0 => Some(Value::Bool(false)),
        "-" => Some(number_to_json(-value)),
        _ => None,
    }
}

/// Final property name of a non-computed member chain rooted at a plain
/// identifier, e.g. `a.b.GUILD` -> `GUILD`.
fn enum_member_name(node: Node<'_>, source: &str) -> Option<String> {
    let property = node.child_by_field_name("property")?;
    if NodeKind::of(property) != NodeKind::PropertyIdentifier {
        return None;
    }

    let mut object = node.child_by_field_name("object")?;
    loop {
        match NodeKind::of(object) {
            NodeKind::Identifier => break,
            NodeKind::MemberExpression => {
                let inner = object.child_by_field_name("property")?;
                if NodeKind::of(inner) != NodeKind::PropertyIdentifier {
                    return None;
                }
                object = object.child_by_field_name("object")?;
            }
            _ => return None,
        }
    }
    Some(text(property, source).to_string())
}

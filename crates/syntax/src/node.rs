use tree_sitter::Node;

/// Grammar node kinds the analyzers care about.
///
/// Everything else collapses into [`NodeKind::Other`], which every consumer
/// treats as opaque source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Program,
    ExpressionStatement,
    Parenthesized,
    Object,
    Pair,
    ShorthandProperty,
    MethodDefinition,
    SpreadElement,
    Array,
    String,
    TemplateString,
    Number,
    True,
    False,
    Null,
    Undefined,
    Identifier,
    PropertyIdentifier,
    ComputedPropertyName,
    MemberExpression,
    SubscriptExpression,
    UnaryExpression,
    Comment,
    Error,
    Other,
}

impl NodeKind {
    pub fn of(node: Node<'_>) -> Self {
        if node.is_error() {
            return NodeKind::Error;
        }
        match node.kind() {
            "program" => NodeKind::Program,
            "expression_statement" => NodeKind::ExpressionStatement,
            "parenthesized_expression" => NodeKind::Parenthesized,
            "object" => NodeKind::Object,
            "pair" => NodeKind::Pair,
            "shorthand_property_identifier" => NodeKind::ShorthandProperty,
            "method_definition" => NodeKind::MethodDefinition,
            "spread_element" => NodeKind::SpreadElement,
            "array" => NodeKind::Array,
            "string" => NodeKind::String,
            "template_string" => NodeKind::TemplateString,
            "number" => NodeKind::Number,
            "true" => NodeKind::True,
            "false" => NodeKind::False,
            "null" => NodeKind::Null,
            "undefined" => NodeKind::Undefined,
            "identifier" => NodeKind::Identifier,
            "property_identifier" => NodeKind::PropertyIdentifier,
            "computed_property_name" => NodeKind::ComputedPropertyName,
            "member_expression" => NodeKind::MemberExpression,
            "subscript_expression" => NodeKind::SubscriptExpression,
            "unary_expression" => NodeKind::UnaryExpression,
            "comment" => NodeKind::Comment,
            _ => NodeKind::Other,
        }
    }
}

/// Source text spanned by a node.
pub(crate) fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Named children in source order, comments skipped.
pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| NodeKind::of(*child) != NodeKind::Comment)
        .collect()
}

/// Operator token of a unary expression (`!`, `-`, `typeof`, ...).
pub(crate) fn unary_operator<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name("operator")
        .map(|operator| text(operator, source))
}

/// Static name of an object-literal property key, if it has one.
///
/// Identifier keys and string keys both count; numeric keys use their
/// canonical number spelling. Computed keys have no static name.
pub(crate) fn property_key(key: Node<'_>, source: &str) -> Option<String> {
    match NodeKind::of(key) {
        NodeKind::PropertyIdentifier | NodeKind::Identifier | NodeKind::ShorthandProperty => {
            Some(text(key, source).to_string())
        }
        NodeKind::String => crate::lexical::string_value(key, source),
        NodeKind::Number => crate::lexical::parse_number(text(key, source))
            .map(crate::lexical::number_key),
        _ => None,
    }
}

/// Key node and value node of an object member, in the shapes that carry a
/// static key. Spread elements yield `None`.
pub(crate) fn member_parts<'t>(member: Node<'t>) -> Option<(Node<'t>, Node<'t>)> {
    match NodeKind::of(member) {
        NodeKind::Pair => Some((
            member.child_by_field_name("key")?,
            member.child_by_field_name("value")?,
        )),
        // `{ a }` keys and values are the same node
        NodeKind::ShorthandProperty => Some((member, member)),
        NodeKind::MethodDefinition => Some((member.child_by_field_name("name")?, member)),
        _ => None,
    }
}

/// Compiled binding patterns and the expression fragments they embed.
///
/// Pattern nodes live in a [`PatternArena`] and are addressed by [`NodeId`].
/// Children are owned by the arena; the `parent` link is a plain index kept
/// only so diagnostics can rebuild the path from the root to a failing node.
use crate::interpreter::{Completion, Interpreter, NativeFn};
use crate::static_semantics::{self, StaticFacts};
use crate::types::JsValue;
use rustc_hash::FxHashSet;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

/// The expression forms a pattern can embed: default initializers, computed
/// keys and spread operands.
#[derive(Clone, Debug)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    Array(Vec<ArrayElement>),
    Object(Vec<ObjectProperty>),
    Call(Box<Expression>, Vec<Argument>),
    Function(FunctionLiteral),
    /// `name = value`
    Assign(String, Box<Expression>),
}

impl Expression {
    pub fn number(n: f64) -> Self {
        Expression::Literal(Literal::Number(n))
    }

    pub fn string(s: &str) -> Self {
        Expression::Literal(Literal::String(s.to_string()))
    }

    pub fn identifier(name: &str) -> Self {
        Expression::Identifier(name.to_string())
    }

    pub fn call(callee: Expression, arguments: Vec<Argument>) -> Self {
        Expression::Call(Box::new(callee), arguments)
    }

    pub fn assign(name: &str, value: Expression) -> Self {
        Expression::Assign(name.to_string(), Box::new(value))
    }

    /// §15.1.9 IsAnonymousFunctionDefinition
    pub fn is_anonymous_function_definition(&self) -> bool {
        matches!(self, Expression::Function(f) if f.name.is_none())
    }
}

#[derive(Clone, Debug)]
pub enum ArrayElement {
    Expression(Expression),
    Hole,
    Spread(NodeId),
}

#[derive(Clone, Debug)]
pub struct ObjectProperty {
    pub key: PropertyName,
    pub value: Expression,
}

#[derive(Clone, Debug)]
pub enum Argument {
    Expression(Expression),
    Spread(NodeId),
}

/// A function whose behavior is supplied by the host.
#[derive(Clone)]
pub struct FunctionLiteral {
    pub name: Option<String>,
    pub arity: usize,
    pub body: NativeFn,
}

impl FunctionLiteral {
    pub fn new(
        name: Option<&str>,
        arity: usize,
        body: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        FunctionLiteral {
            name: name.map(str::to_string),
            arity,
            body: Rc::new(body),
        }
    }
}

impl fmt::Debug for FunctionLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionLiteral({:?}, {})", self.name, self.arity)
    }
}

#[derive(Clone, Debug)]
pub enum PropertyName {
    Identifier(String),
    String(String),
    Number(f64),
    Computed(NodeId),
}

/// What a binding element ultimately binds: a single name or a nested pattern.
#[derive(Clone, Debug)]
pub enum ElementTarget {
    Name(String),
    Pattern(NodeId),
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    ComputedPropertyName(Expression),
    ObjectBindingPattern {
        properties: Vec<NodeId>,
        rest: Option<NodeId>,
    },
    ArrayBindingPattern {
        elements: Vec<NodeId>,
        rest: Option<NodeId>,
    },
    BindingElement {
        property: Option<PropertyName>,
        target: ElementTarget,
        initializer: Option<Expression>,
    },
    BindingRestElement {
        target: ElementTarget,
    },
    SpreadElement(Expression),
    OmittedExpression,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::ComputedPropertyName(_) => "ComputedPropertyName",
            NodeKind::ObjectBindingPattern { .. } => "ObjectBindingPattern",
            NodeKind::ArrayBindingPattern { .. } => "ArrayBindingPattern",
            NodeKind::BindingElement { .. } => "BindingElement",
            NodeKind::BindingRestElement { .. } => "BindingRestElement",
            NodeKind::SpreadElement(_) => "SpreadElement",
            NodeKind::OmittedExpression => "OmittedExpression",
        }
    }

    pub fn is_binding_pattern(&self) -> bool {
        matches!(
            self,
            NodeKind::ObjectBindingPattern { .. } | NodeKind::ArrayBindingPattern { .. }
        )
    }
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub facts: StaticFacts,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("'{0}' is not a valid binding identifier")]
    InvalidIdentifier(String),
    #[error("node {0} is already attached to a parent")]
    AlreadyAttached(NodeId),
    #[error("{found} cannot appear as {context}")]
    Misplaced {
        found: &'static str,
        context: &'static str,
    },
}

/// The formal parameter list of a function, kept outside the arena because
/// it has no parent and is never the target of diagnostics paths.
#[derive(Debug)]
pub struct FormalParameters {
    pub elements: Vec<NodeId>,
    pub rest: Option<NodeId>,
    pub facts: StaticFacts,
}

#[derive(Debug, Default)]
pub struct PatternArena {
    nodes: Vec<Node>,
}

impl PatternArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn facts(&self, id: NodeId) -> &StaticFacts {
        &self.node(id).facts
    }

    /// Ancestors of `id`, root first, ending with `id` itself.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let facts = static_semantics::compute(self, &kind);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            facts,
        });
        id
    }

    /// Pushes `kind` and makes it the parent of `children`. Every child must
    /// be unattached and listed once; otherwise the arena is left untouched.
    fn push_with_children(&mut self, kind: NodeKind, children: Vec<NodeId>) -> Result<NodeId, BuildError> {
        let mut seen = FxHashSet::default();
        for &child in &children {
            if self.parent(child).is_some() || !seen.insert(child) {
                return Err(BuildError::AlreadyAttached(child));
            }
        }
        let id = self.push(kind);
        for child in children {
            self.nodes[child.index()].parent = Some(id);
        }
        Ok(id)
    }

    fn expect_kind(
        &self,
        id: NodeId,
        context: &'static str,
        allowed: impl Fn(&NodeKind) -> bool,
    ) -> Result<(), BuildError> {
        let kind = self.kind(id);
        if allowed(kind) {
            Ok(())
        } else {
            Err(BuildError::Misplaced {
                found: kind.name(),
                context,
            })
        }
    }

    fn check_target(&self, target: &ElementTarget) -> Result<(), BuildError> {
        match target {
            ElementTarget::Name(name) => check_identifier(name),
            ElementTarget::Pattern(id) => {
                self.expect_kind(*id, "a nested binding pattern", NodeKind::is_binding_pattern)
            }
        }
    }

    pub fn computed_property_name(&mut self, expr: Expression) -> Result<NodeId, BuildError> {
        let mut children = Vec::new();
        expression_children(&expr, &mut children);
        self.push_with_children(NodeKind::ComputedPropertyName(expr), children)
    }

    pub fn spread_element(&mut self, expr: Expression) -> Result<NodeId, BuildError> {
        let mut children = Vec::new();
        expression_children(&expr, &mut children);
        self.push_with_children(NodeKind::SpreadElement(expr), children)
    }

    pub fn elision(&mut self) -> NodeId {
        self.push(NodeKind::OmittedExpression)
    }

    /// `name` or `name = initializer`
    pub fn single_name(
        &mut self,
        name: &str,
        initializer: Option<Expression>,
    ) -> Result<NodeId, BuildError> {
        self.binding_element(None, ElementTarget::Name(name.to_string()), initializer)
    }

    /// `pattern` or `pattern = initializer`
    pub fn pattern_element(
        &mut self,
        pattern: NodeId,
        initializer: Option<Expression>,
    ) -> Result<NodeId, BuildError> {
        self.binding_element(None, ElementTarget::Pattern(pattern), initializer)
    }

    /// `key: target` or `key: target = initializer` inside an object pattern.
    pub fn property(
        &mut self,
        key: PropertyName,
        target: ElementTarget,
        initializer: Option<Expression>,
    ) -> Result<NodeId, BuildError> {
        self.binding_element(Some(key), target, initializer)
    }

    pub fn binding_element(
        &mut self,
        property: Option<PropertyName>,
        target: ElementTarget,
        initializer: Option<Expression>,
    ) -> Result<NodeId, BuildError> {
        self.check_target(&target)?;
        if let Some(PropertyName::Computed(key)) = property {
            self.expect_kind(key, "a property name", |k| {
                matches!(k, NodeKind::ComputedPropertyName(_))
            })?;
        }
        let mut children = Vec::new();
        if let Some(PropertyName::Computed(key)) = property {
            children.push(key);
        }
        children.extend(target_child(&target));
        if let Some(init) = &initializer {
            expression_children(init, &mut children);
        }
        self.push_with_children(
            NodeKind::BindingElement {
                property,
                target,
                initializer,
            },
            children,
        )
    }

    /// `...target`
    pub fn rest_element(&mut self, target: ElementTarget) -> Result<NodeId, BuildError> {
        self.check_target(&target)?;
        let children = target_child(&target).into_iter().collect();
        self.push_with_children(NodeKind::BindingRestElement { target }, children)
    }

    pub fn object_pattern(
        &mut self,
        properties: Vec<NodeId>,
        rest: Option<NodeId>,
    ) -> Result<NodeId, BuildError> {
        for &property in &properties {
            match self.kind(property) {
                NodeKind::BindingElement {
                    property: None,
                    target: ElementTarget::Pattern(_),
                    ..
                } => {
                    return Err(BuildError::Misplaced {
                        found: "an unnamed nested pattern",
                        context: "an object pattern property",
                    });
                }
                NodeKind::BindingElement { .. } => {}
                other => {
                    return Err(BuildError::Misplaced {
                        found: other.name(),
                        context: "an object pattern property",
                    });
                }
            }
        }
        if let Some(rest) = rest {
            self.expect_kind(rest, "an object rest property", |k| {
                matches!(
                    k,
                    NodeKind::BindingRestElement {
                        target: ElementTarget::Name(_)
                    }
                )
            })?;
        }
        let children = properties.iter().copied().chain(rest).collect();
        self.push_with_children(NodeKind::ObjectBindingPattern { properties, rest }, children)
    }

    pub fn array_pattern(
        &mut self,
        elements: Vec<NodeId>,
        rest: Option<NodeId>,
    ) -> Result<NodeId, BuildError> {
        for &element in &elements {
            self.expect_kind(element, "an array pattern element", |k| {
                matches!(
                    k,
                    NodeKind::BindingElement { property: None, .. } | NodeKind::OmittedExpression
                )
            })?;
        }
        if let Some(rest) = rest {
            self.expect_kind(rest, "an array rest element", |k| {
                matches!(k, NodeKind::BindingRestElement { .. })
            })?;
        }
        let children = elements.iter().copied().chain(rest).collect();
        self.push_with_children(NodeKind::ArrayBindingPattern { elements, rest }, children)
    }

    pub fn formal_parameters(
        &mut self,
        elements: Vec<NodeId>,
        rest: Option<NodeId>,
    ) -> Result<FormalParameters, BuildError> {
        for &element in &elements {
            self.expect_kind(element, "a formal parameter", |k| {
                matches!(k, NodeKind::BindingElement { property: None, .. })
            })?;
        }
        if let Some(rest) = rest {
            self.expect_kind(rest, "a rest parameter", |k| {
                matches!(k, NodeKind::BindingRestElement { .. })
            })?;
        }
        // Parameter lists own their nodes without becoming their parent.
        let mut seen = FxHashSet::default();
        for &node in elements.iter().chain(&rest) {
            if self.parent(node).is_some() || !seen.insert(node) {
                return Err(BuildError::AlreadyAttached(node));
            }
        }
        let facts = static_semantics::compute_parameters(self, &elements, rest);
        Ok(FormalParameters {
            elements,
            rest,
            facts,
        })
    }

    /// A readable rendering of the path to `id`, used in diagnostics.
    pub fn describe_path(&self, id: NodeId) -> String {
        self.path(id)
            .into_iter()
            .map(|n| self.label(n))
            .collect::<Vec<_>>()
            .join(" > ")
    }

    fn label(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::BindingElement {
                target: ElementTarget::Name(name),
                ..
            }
            | NodeKind::BindingRestElement {
                target: ElementTarget::Name(name),
            } => format!("{}({name})", self.kind(id).name()),
            kind => kind.name().to_string(),
        }
    }
}

fn target_child(target: &ElementTarget) -> Option<NodeId> {
    match target {
        ElementTarget::Name(_) => None,
        ElementTarget::Pattern(id) => Some(*id),
    }
}

/// Collects the spread elements and computed keys an expression embeds.
fn expression_children(expr: &Expression, out: &mut Vec<NodeId>) {
    match expr {
        Expression::Literal(_) | Expression::Identifier(_) | Expression::Function(_) => {}
        Expression::Array(elements) => {
            for element in elements {
                match element {
                    ArrayElement::Expression(e) => expression_children(e, out),
                    ArrayElement::Spread(id) => out.push(*id),
                    ArrayElement::Hole => {}
                }
            }
        }
        Expression::Object(properties) => {
            for property in properties {
                if let PropertyName::Computed(id) = property.key {
                    out.push(id);
                }
                expression_children(&property.value, out);
            }
        }
        Expression::Call(callee, arguments) => {
            expression_children(callee, out);
            for argument in arguments {
                match argument {
                    Argument::Expression(e) => expression_children(e, out),
                    Argument::Spread(id) => out.push(*id),
                }
            }
        }
        Expression::Assign(_, value) => expression_children(value, out),
    }
}

/// Binding identifiers follow the ID_Start / ID_Continue rules used by the lexer.
fn check_identifier(name: &str) -> Result<(), BuildError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c == '$' || c == '_' || unicode_ident::is_xid_start(c));
    if valid_start
        && chars.all(|c| c == '$' || c == '\u{200C}' || c == '\u{200D}' || unicode_ident::is_xid_continue(c))
    {
        Ok(())
    } else {
        Err(BuildError::InvalidIdentifier(name.to_string()))
    }
}

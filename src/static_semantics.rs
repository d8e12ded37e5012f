//! Static semantics of binding patterns (§8.2 BoundNames, §15.1.2
//! ContainsExpression, §15.1.3 IsSimpleParameterList, §15.1.4 HasInitializer).
//!
//! Facts are computed once, bottom-up, when a node is pushed into the arena.
//! A node's facts depend only on its own syntax and the facts of its children,
//! which always exist before the parent does.

use crate::ast::{ElementTarget, NodeId, NodeKind, PatternArena, PropertyName};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticFacts {
    pub bound_names: Vec<String>,
    pub contains_expression: bool,
    pub has_initializer: bool,
    pub is_simple_parameter_list: bool,
}

fn target_names(arena: &PatternArena, target: &ElementTarget) -> Vec<String> {
    match target {
        ElementTarget::Name(name) => vec![name.clone()],
        ElementTarget::Pattern(id) => arena.facts(*id).bound_names.clone(),
    }
}

fn target_contains_expression(arena: &PatternArena, target: &ElementTarget) -> bool {
    match target {
        ElementTarget::Name(_) => false,
        ElementTarget::Pattern(id) => arena.facts(*id).contains_expression,
    }
}

fn collect<'a>(arena: &PatternArena, ids: impl IntoIterator<Item = &'a NodeId>) -> (Vec<String>, bool) {
    let mut names = Vec::new();
    let mut contains_expression = false;
    for id in ids {
        let facts = arena.facts(*id);
        names.extend(facts.bound_names.iter().cloned());
        contains_expression |= facts.contains_expression;
    }
    (names, contains_expression)
}

pub(crate) fn compute(arena: &PatternArena, kind: &NodeKind) -> StaticFacts {
    match kind {
        NodeKind::ComputedPropertyName(_) | NodeKind::SpreadElement(_) => StaticFacts {
            contains_expression: true,
            ..StaticFacts::default()
        },
        NodeKind::OmittedExpression => StaticFacts::default(),
        NodeKind::ObjectBindingPattern { properties, rest }
        | NodeKind::ArrayBindingPattern {
            elements: properties,
            rest,
        } => {
            let (bound_names, contains_expression) =
                collect(arena, properties.iter().chain(rest.iter()));
            StaticFacts {
                bound_names,
                contains_expression,
                ..StaticFacts::default()
            }
        }
        NodeKind::BindingElement {
            property,
            target,
            initializer,
        } => {
            let has_initializer = initializer.is_some();
            let computed_key = matches!(property, Some(PropertyName::Computed(_)));
            StaticFacts {
                bound_names: target_names(arena, target),
                contains_expression: has_initializer
                    || computed_key
                    || target_contains_expression(arena, target),
                has_initializer,
                is_simple_parameter_list: property.is_none()
                    && !has_initializer
                    && matches!(target, ElementTarget::Name(_)),
            }
        }
        NodeKind::BindingRestElement { target } => StaticFacts {
            bound_names: target_names(arena, target),
            contains_expression: target_contains_expression(arena, target),
            ..StaticFacts::default()
        },
    }
}

pub(crate) fn compute_parameters(
    arena: &PatternArena,
    elements: &[NodeId],
    rest: Option<NodeId>,
) -> StaticFacts {
    let (bound_names, contains_expression) = collect(arena, elements.iter().chain(rest.iter()));
    StaticFacts {
        bound_names,
        contains_expression,
        has_initializer: elements.iter().any(|e| arena.facts(*e).has_initializer),
        is_simple_parameter_list: rest.is_none()
            && elements.iter().all(|e| arena.facts(*e).is_simple_parameter_list),
    }
}

/// §15.1.5 ExpectedArgumentCount: parameters before the first default or rest.
pub fn expected_argument_count(arena: &PatternArena, elements: &[NodeId]) -> usize {
    elements
        .iter()
        .take_while(|e| !arena.facts(**e).has_initializer)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expression;
    use pretty_assertions::assert_eq;

    fn names(arena: &PatternArena, id: NodeId) -> Vec<&str> {
        arena
            .facts(id)
            .bound_names
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn bound_names_preserve_source_order_and_duplicates() {
        let mut arena = PatternArena::new();
        let a = arena.single_name("a", None).unwrap();
        let hole = arena.elision();
        let b = arena.single_name("b", None).unwrap();
        let a_again = arena.single_name("a", None).unwrap();
        let inner = arena.array_pattern(vec![b, a_again], None).unwrap();
        let nested = arena.pattern_element(inner, None).unwrap();
        let rest = arena
            .rest_element(ElementTarget::Name("tail".into()))
            .unwrap();
        let root = arena.array_pattern(vec![a, hole, nested], Some(rest)).unwrap();

        assert_eq!(names(&arena, root), vec!["a", "b", "a", "tail"]);
        assert!(arena.facts(hole).bound_names.is_empty());
    }

    #[test]
    fn contains_expression_sources() {
        let mut arena = PatternArena::new();
        let plain = arena.single_name("a", None).unwrap();
        let defaulted = arena
            .single_name("b", Some(Expression::number(1.0)))
            .unwrap();
        let key = arena
            .computed_property_name(Expression::string("k"))
            .unwrap();
        let computed = arena
            .property(PropertyName::Computed(key), ElementTarget::Name("c".into()), None)
            .unwrap();
        let literal = arena
            .property(
                PropertyName::Identifier("d".into()),
                ElementTarget::Name("e".into()),
                None,
            )
            .unwrap();

        assert!(!arena.facts(plain).contains_expression);
        assert!(arena.facts(defaulted).contains_expression);
        assert!(arena.facts(computed).contains_expression);
        assert!(!arena.facts(literal).contains_expression);

        let quiet = arena.object_pattern(vec![literal], None).unwrap();
        let loud = arena.object_pattern(vec![computed], None).unwrap();
        assert!(!arena.facts(quiet).contains_expression);
        assert!(arena.facts(loud).contains_expression);

        let nested = arena.pattern_element(loud, None).unwrap();
        assert!(arena.facts(nested).contains_expression);
        assert!(!arena.facts(nested).has_initializer);
    }

    #[test]
    fn simple_parameter_list_only_for_bare_names() {
        let mut arena = PatternArena::new();
        let a = arena.single_name("a", None).unwrap();
        let b = arena.single_name("b", None).unwrap();
        let simple = arena.formal_parameters(vec![a, b], None).unwrap();
        assert!(simple.facts.is_simple_parameter_list);
        assert!(!simple.facts.has_initializer);

        let c = arena
            .single_name("c", Some(Expression::number(0.0)))
            .unwrap();
        let d = arena.single_name("d", None).unwrap();
        let with_default = arena.formal_parameters(vec![c, d], None).unwrap();
        assert!(!with_default.facts.is_simple_parameter_list);
        assert!(with_default.facts.has_initializer);
        assert_eq!(expected_argument_count(&arena, &with_default.elements), 0);

        let e = arena.single_name("e", None).unwrap();
        let rest = arena.rest_element(ElementTarget::Name("r".into())).unwrap();
        let with_rest = arena.formal_parameters(vec![e], Some(rest)).unwrap();
        assert!(!with_rest.facts.is_simple_parameter_list);
        assert_eq!(with_rest.facts.bound_names, vec!["e", "r"]);
    }

    #[test]
    fn facts_are_stable_across_reads() {
        let mut arena = PatternArena::new();
        let a = arena
            .single_name("a", Some(Expression::number(1.0)))
            .unwrap();
        let root = arena.object_pattern(vec![a], None).unwrap();
        let first = arena.facts(root).clone();
        let second = arena.facts(root).clone();
        assert_eq!(first, second);
        assert_eq!(arena.facts(a).has_initializer, arena.facts(a).has_initializer);
    }
}

use super::*;
use crate::ast::{NodeId, PatternArena};

impl Interrupt {
    /// Records that this completion passed out through `id`. The abrupt
    /// kind and value are left untouched; host timeouts carry no trace.
    pub(crate) fn at_node(self, arena: &PatternArena, id: NodeId) -> Self {
        match self {
            Interrupt::Completion { abrupt, mut trace } => {
                if trace.is_empty() {
                    tracing::trace!(node = %id, %abrupt, "abrupt completion");
                }
                trace.push(TraceFrame {
                    node: id,
                    kind: arena.kind(id).name(),
                    path: arena.describe_path(id),
                });
                Interrupt::Completion { abrupt, trace }
            }
            timeout @ Interrupt::Timeout { .. } => timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ElementTarget;
    use pretty_assertions::assert_eq;

    #[test]
    fn frames_accumulate_innermost_first() {
        let mut arena = PatternArena::new();
        let x = arena.single_name("x", None).unwrap();
        let root = arena.array_pattern(vec![x], None).unwrap();
        let err = Interrupt::throw(JsValue::from("e"))
            .at_node(&arena, x)
            .at_node(&arena, root);
        assert_eq!(err.thrown(), Some(&JsValue::from("e")));
        let frames: Vec<(&str, &str)> = err
            .trace()
            .iter()
            .map(|f| (f.kind, f.path.as_str()))
            .collect();
        assert_eq!(
            frames,
            vec![
                ("BindingElement", "ArrayBindingPattern > BindingElement(x)"),
                ("ArrayBindingPattern", "ArrayBindingPattern"),
            ]
        );
    }

    #[test]
    fn non_throw_completions_keep_their_kind() {
        let mut arena = PatternArena::new();
        let rest = arena.rest_element(ElementTarget::Name("r".into())).unwrap();
        let err = Interrupt::from(Abrupt::Break(Some("outer".into()))).at_node(&arena, rest);
        assert!(matches!(
            &err,
            Interrupt::Completion { abrupt: Abrupt::Break(Some(label)), .. } if label == "outer"
        ));
        assert_eq!(err.trace()[0].path, "BindingRestElement(r)");
    }

    #[test]
    fn timeouts_pass_through() {
        let mut arena = PatternArena::new();
        let gap = arena.elision();
        let err = Interrupt::Timeout { ticks: 4 }.at_node(&arena, gap);
        assert!(err.is_timeout());
        assert!(err.trace().is_empty());
    }
}

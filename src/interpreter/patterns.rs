//! Runtime semantics of binding patterns: BindingInitialization (§8.6.2),
//! PropertyBindingInitialization (§14.3.3.1), KeyedBindingInitialization
//! (§14.3.3.3) and IteratorBindingInitialization (§8.6.3).
//!
//! `env` selects the binding mode. `Some(env)` initializes bindings declared
//! in that environment; `None` assigns through PutValue, which is how
//! destructuring assignment and sloppy `var` targets behave.

use super::*;
use crate::ast::{ElementTarget, Expression, NodeId, NodeKind, PatternArena};

impl Interpreter {
    /// §8.6.2 BindingInitialization for an object or array binding pattern.
    #[tracing::instrument(level = "trace", skip_all, fields(node = %id))]
    pub fn initialize_binding(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        value: JsValue,
        env: Option<&EnvRef>,
    ) -> Completion<()> {
        self.check_timeout()?;
        let result = match arena.kind(id) {
            NodeKind::ObjectBindingPattern { properties, rest } => {
                self.bind_object_pattern(arena, properties, *rest, value, env)
            }
            NodeKind::ArrayBindingPattern { elements, rest } => {
                self.bind_array_pattern(arena, elements, *rest, value, env)
            }
            other => Err(self.throw_type_error(format!("{} is not a binding pattern", other.name()))),
        };
        result.map_err(|e| e.at_node(arena, id))
    }

    fn bind_object_pattern(
        &mut self,
        arena: &PatternArena,
        properties: &[NodeId],
        rest: Option<NodeId>,
        value: JsValue,
        env: Option<&EnvRef>,
    ) -> Completion<()> {
        if value.is_nullish() {
            return Err(self.throw_type_error(format!("Cannot destructure {value} into object")));
        }
        let mut excluded = Vec::with_capacity(properties.len());
        for &property in properties {
            excluded.extend(self.initialize_property_binding(arena, property, &value, env)?);
        }
        if let Some(rest) = rest {
            self.initialize_rest_property(arena, rest, &value, env, &excluded)?;
        }
        Ok(())
    }

    fn bind_array_pattern(
        &mut self,
        arena: &PatternArena,
        elements: &[NodeId],
        rest: Option<NodeId>,
        value: JsValue,
        env: Option<&EnvRef>,
    ) -> Completion<()> {
        let mut record = self.get_iterator(&value)?;
        let result = self.bind_array_elements(arena, elements, rest, &mut record, env);
        if record.done {
            result
        } else {
            self.iterator_close(&record, result)
        }
    }

    /// Drives `record` through the element list of an array pattern. Each
    /// slot consumes at most one step; a trailing elision consumes none.
    fn bind_array_elements(
        &mut self,
        arena: &PatternArena,
        elements: &[NodeId],
        rest: Option<NodeId>,
        record: &mut IteratorRecord,
        env: Option<&EnvRef>,
    ) -> Completion<()> {
        let last = elements.len().saturating_sub(1);
        for (index, &element) in elements.iter().enumerate() {
            let elision = matches!(arena.kind(element), NodeKind::OmittedExpression);
            if elision && index == last && rest.is_none() {
                break;
            }
            if elision && env.is_none() {
                self.evaluate_destructuring_assignment_iterator(arena, element, record)?;
            } else {
                self.initialize_iterator_binding(arena, element, record, env)?;
            }
        }
        if let Some(rest) = rest {
            self.initialize_iterator_binding(arena, rest, record, env)?;
        }
        Ok(())
    }

    /// §8.6.3 IteratorBindingInitialization. `id` may be an array pattern,
    /// a binding element, a rest element or an elision; each non-pattern
    /// node consumes at most one step of `record`.
    #[tracing::instrument(level = "trace", skip_all, fields(node = %id))]
    pub fn initialize_iterator_binding(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        record: &mut IteratorRecord,
        env: Option<&EnvRef>,
    ) -> Completion<()> {
        self.check_timeout()?;
        let result = match arena.kind(id) {
            NodeKind::ArrayBindingPattern { elements, rest } => {
                self.bind_array_elements(arena, elements, *rest, record, env)
            }
            NodeKind::BindingElement {
                target, initializer, ..
            } => self.bind_iterator_element(arena, target, initializer.as_ref(), record, env),
            NodeKind::BindingRestElement { target } => self.bind_iterator_rest(arena, target, record, env),
            NodeKind::OmittedExpression => self.skip_iterator_step(record),
            other => Err(self.throw_type_error(format!(
                "{} cannot be bound from an iterator",
                other.name()
            ))),
        };
        result.map_err(|e| e.at_node(arena, id))
    }

    fn bind_iterator_element(
        &mut self,
        arena: &PatternArena,
        target: &ElementTarget,
        initializer: Option<&Expression>,
        record: &mut IteratorRecord,
        env: Option<&EnvRef>,
    ) -> Completion<()> {
        match target {
            ElementTarget::Name(name) => {
                let reference = self.resolve_binding(name, env);
                let value = self.next_binding_value(record)?;
                let value = self.apply_default(arena, value, initializer, Some(name))?;
                self.bind_reference(&reference, value, env)
            }
            ElementTarget::Pattern(pattern) => {
                let value = self.next_binding_value(record)?;
                let value = self.apply_default(arena, value, initializer, None)?;
                self.initialize_binding(arena, *pattern, value, env)
            }
        }
    }

    fn bind_iterator_rest(
        &mut self,
        arena: &PatternArena,
        target: &ElementTarget,
        record: &mut IteratorRecord,
        env: Option<&EnvRef>,
    ) -> Completion<()> {
        match target {
            ElementTarget::Name(name) => {
                let reference = self.resolve_binding(name, env);
                let array = self.drain_into_array(record)?;
                self.bind_reference(&reference, array, env)
            }
            ElementTarget::Pattern(pattern) => {
                let array = self.drain_into_array(record)?;
                self.initialize_binding(arena, *pattern, array, env)
            }
        }
    }

    fn drain_into_array(&mut self, record: &mut IteratorRecord) -> Completion {
        let mut values = Vec::new();
        while !record.done {
            if let Some(value) = self.iterator_step_value(record)? {
                values.push(value);
            }
        }
        Ok(self.create_array(values))
    }

    /// The value for the next slot: undefined once the iterator is done.
    fn next_binding_value(&mut self, record: &mut IteratorRecord) -> Completion {
        if record.done {
            return Ok(JsValue::Undefined);
        }
        Ok(self.iterator_step_value(record)?.unwrap_or(JsValue::Undefined))
    }

    /// Advances past one slot without reading its value.
    fn skip_iterator_step(&mut self, record: &mut IteratorRecord) -> Completion<()> {
        if record.done {
            return Ok(());
        }
        let stepped = match self.builtin_step(record) {
            Some(stepped) => stepped.map(|value| value.is_some()),
            None => self.iterator_step(record).map(|result| result.is_some()),
        };
        match stepped {
            Ok(true) => Ok(()),
            Ok(false) => {
                record.done = true;
                Ok(())
            }
            Err(e) => {
                record.done = true;
                Err(e)
            }
        }
    }

    /// §13.15.5.5 IteratorDestructuringAssignmentEvaluation for an Elision.
    pub fn evaluate_destructuring_assignment_iterator(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        record: &mut IteratorRecord,
    ) -> Completion<()> {
        self.check_timeout()?;
        let result = match arena.kind(id) {
            NodeKind::OmittedExpression => self.skip_iterator_step(record),
            other => Err(self.throw_type_error(format!("{} is not an elision", other.name()))),
        };
        result.map_err(|e| e.at_node(arena, id))
    }

    /// Substitutes the initializer's value when `value` is undefined. Only
    /// undefined triggers it; other falsy values are kept.
    fn apply_default(
        &mut self,
        arena: &PatternArena,
        value: JsValue,
        initializer: Option<&Expression>,
        name: Option<&str>,
    ) -> Completion {
        match initializer {
            Some(init) if value.is_undefined() => match name {
                Some(name) => self.eval_named(arena, init, name),
                None => self.eval_expr(arena, init),
            },
            _ => Ok(value),
        }
    }

    /// §14.3.3.1 PropertyBindingInitialization for one property of an object
    /// pattern. Returns the property keys it consumed, which a trailing rest
    /// property excludes.
    #[tracing::instrument(level = "trace", skip_all, fields(node = %id))]
    pub fn initialize_property_binding(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        value: &JsValue,
        env: Option<&EnvRef>,
    ) -> Completion<Vec<PropertyKey>> {
        self.check_timeout()?;
        self.property_binding(arena, id, value, env)
            .map_err(|e| e.at_node(arena, id))
    }

    fn property_binding(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        value: &JsValue,
        env: Option<&EnvRef>,
    ) -> Completion<Vec<PropertyKey>> {
        let key = match arena.kind(id) {
            NodeKind::BindingElement {
                property: Some(name),
                ..
            } => self.eval_property_name(arena, name)?,
            NodeKind::BindingElement {
                property: None,
                target: ElementTarget::Name(name),
                ..
            } => PropertyKey::from(name.as_str()),
            other => {
                return Err(self.throw_type_error(format!(
                    "{} cannot appear as an object pattern property",
                    other.name()
                )));
            }
        };
        self.keyed_binding(arena, id, value, env, &key)?;
        Ok(vec![key])
    }

    /// §14.3.3.3 KeyedBindingInitialization: binds `value[key]`, or the
    /// element's default when that is undefined, to the element's target.
    #[tracing::instrument(level = "trace", skip_all, fields(node = %id, key = %key))]
    pub fn initialize_keyed_binding(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        value: &JsValue,
        env: Option<&EnvRef>,
        key: &PropertyKey,
    ) -> Completion<()> {
        self.check_timeout()?;
        self.keyed_binding(arena, id, value, env, key)
            .map_err(|e| e.at_node(arena, id))
    }

    fn keyed_binding(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        value: &JsValue,
        env: Option<&EnvRef>,
        key: &PropertyKey,
    ) -> Completion<()> {
        let NodeKind::BindingElement {
            target, initializer, ..
        } = arena.kind(id)
        else {
            return Err(self.throw_type_error(format!(
                "{} cannot be bound by key",
                arena.kind(id).name()
            )));
        };
        match target {
            ElementTarget::Name(name) => {
                let reference = self.resolve_binding(name, env);
                let v = self.get_v(value, key)?;
                let v = self.apply_default(arena, v, initializer.as_ref(), Some(name))?;
                self.bind_reference(&reference, v, env)
            }
            ElementTarget::Pattern(pattern) => {
                let v = self.get_v(value, key)?;
                let v = self.apply_default(arena, v, initializer.as_ref(), None)?;
                self.initialize_binding(arena, *pattern, v, env)
            }
        }
    }

    /// §14.3.3.2 RestBindingInitialization: copies every own enumerable
    /// property not named in `excluded` into a fresh object.
    fn initialize_rest_property(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        value: &JsValue,
        env: Option<&EnvRef>,
        excluded: &[PropertyKey],
    ) -> Completion<()> {
        self.check_timeout()?;
        let result = match arena.kind(id) {
            NodeKind::BindingRestElement {
                target: ElementTarget::Name(name),
            } => {
                let reference = self.resolve_binding(name, env);
                let rest = self.new_object([]);
                self.copy_data_properties(&rest, value, excluded)
                    .and_then(|()| self.bind_reference(&reference, rest, env))
            }
            other => Err(self.throw_type_error(format!(
                "{} cannot appear as an object rest property",
                other.name()
            ))),
        };
        result.map_err(|e| e.at_node(arena, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PropertyName;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn declare(env: &EnvRef, names: &[&str]) {
        for name in names {
            env.borrow_mut().declare(name, BindingKind::Let);
        }
    }

    fn num(n: f64) -> JsValue {
        JsValue::Number(n)
    }

    #[test]
    fn object_pattern_binds_shorthand_and_renamed() {
        let mut interp = Interpreter::new();
        let mut arena = PatternArena::new();
        let a = arena.single_name("a", None).unwrap();
        let c = arena
            .property(PropertyName::Identifier("b".into()), ElementTarget::Name("c".into()), None)
            .unwrap();
        let root = arena.object_pattern(vec![a, c], None).unwrap();
        let env = Environment::new(Some(interp.global_env()));
        declare(&env, &["a", "c"]);
        let value = interp.new_object([("a", num(1.0)), ("b", num(2.0))]);
        interp.initialize_binding(&arena, root, value, Some(&env)).unwrap();
        assert_eq!(env.borrow().get("a"), Some(num(1.0)));
        assert_eq!(env.borrow().get("c"), Some(num(2.0)));
    }

    #[test]
    fn primitives_are_boxed_for_keyed_reads() {
        let mut interp = Interpreter::new();
        let mut arena = PatternArena::new();
        let len = arena.single_name("length", None).unwrap();
        let root = arena.object_pattern(vec![len], None).unwrap();
        let env = Environment::new(None);
        declare(&env, &["length"]);
        interp
            .initialize_binding(&arena, root, JsValue::from("abc"), Some(&env))
            .unwrap();
        assert_eq!(env.borrow().get("length"), Some(num(3.0)));
    }

    #[test]
    fn undefined_value_cannot_be_destructured() {
        let mut interp = Interpreter::new();
        let mut arena = PatternArena::new();
        let root = arena.object_pattern(vec![], None).unwrap();
        let err = interp
            .initialize_binding(&arena, root, JsValue::Undefined, None)
            .unwrap_err();
        let thrown = err.thrown().unwrap().clone();
        assert_eq!(
            interp.error_message(&thrown).as_deref(),
            Some("Cannot destructure undefined into object")
        );
        assert_eq!(err.trace().len(), 1);
        assert_eq!(err.trace()[0].kind, "ObjectBindingPattern");
    }

    #[test]
    fn array_rest_collects_remaining_values() {
        let mut interp = Interpreter::new();
        let mut arena = PatternArena::new();
        let first = arena.single_name("first", None).unwrap();
        let rest = arena.rest_element(ElementTarget::Name("others".into())).unwrap();
        let root = arena.array_pattern(vec![first], Some(rest)).unwrap();
        let env = Environment::new(None);
        declare(&env, &["first", "others"]);
        let value = interp.create_array(vec![num(1.0), num(2.0), num(3.0)]);
        interp.initialize_binding(&arena, root, value, Some(&env)).unwrap();
        let others = env.borrow().get("others").unwrap();
        assert_eq!(interp.iterable_to_list(&others).unwrap(), vec![num(2.0), num(3.0)]);
    }

    #[test]
    fn rest_into_nested_pattern() {
        let mut interp = Interpreter::new();
        let mut arena = PatternArena::new();
        let x = arena.single_name("x", None).unwrap();
        let y = arena.single_name("y", None).unwrap();
        let inner = arena.array_pattern(vec![x, y], None).unwrap();
        let rest = arena.rest_element(ElementTarget::Pattern(inner)).unwrap();
        let skip = arena.elision();
        let root = arena.array_pattern(vec![skip], Some(rest)).unwrap();
        let env = Environment::new(None);
        declare(&env, &["x", "y"]);
        let value = interp.create_array(vec![num(1.0), num(2.0), num(3.0)]);
        interp.initialize_binding(&arena, root, value, Some(&env)).unwrap();
        assert_eq!(env.borrow().get("x"), Some(num(2.0)));
        assert_eq!(env.borrow().get("y"), Some(num(3.0)));
    }

    #[test]
    fn object_rest_excludes_consumed_keys() {
        let mut interp = Interpreter::new();
        let mut arena = PatternArena::new();
        let a = arena.single_name("a", None).unwrap();
        let rest = arena.rest_element(ElementTarget::Name("rest".into())).unwrap();
        let root = arena.object_pattern(vec![a], Some(rest)).unwrap();
        let env = Environment::new(None);
        declare(&env, &["a", "rest"]);
        let value = interp.new_object([("a", num(1.0)), ("b", num(2.0)), ("c", num(3.0))]);
        interp.initialize_binding(&arena, root, value, Some(&env)).unwrap();
        let rest = env.borrow().get("rest").unwrap();
        assert_eq!(interp.get_property(&rest, "a").unwrap(), JsValue::Undefined);
        assert_eq!(interp.get_property(&rest, "b").unwrap(), num(2.0));
        assert_eq!(interp.get_property(&rest, "c").unwrap(), num(3.0));
    }

    #[test]
    fn single_name_default_is_named() {
        let mut interp = Interpreter::new();
        let mut arena = PatternArena::new();
        let init = Expression::Function(crate::ast::FunctionLiteral::new(None, 0, |_i, _t, _a| {
            Ok(JsValue::Undefined)
        }));
        let f = arena.single_name("handler", Some(init)).unwrap();
        let root = arena.array_pattern(vec![f], None).unwrap();
        let env = Environment::new(None);
        declare(&env, &["handler"]);
        let value = interp.create_array(vec![]);
        interp.initialize_binding(&arena, root, value, Some(&env)).unwrap();
        let handler = env.borrow().get("handler").unwrap();
        assert_eq!(interp.get_property(&handler, "name").unwrap(), JsValue::from("handler"));
    }

    #[test]
    fn missing_declaration_is_reference_error() {
        let mut interp = Interpreter::new();
        let mut arena = PatternArena::new();
        let a = arena.single_name("a", None).unwrap();
        let root = arena.array_pattern(vec![a], None).unwrap();
        let env = Environment::new(None);
        let value = interp.create_array(vec![num(1.0)]);
        let err = interp.initialize_binding(&arena, root, value, Some(&env)).unwrap_err();
        let thrown = err.thrown().unwrap().clone();
        assert_eq!(interp.error_name(&thrown).as_deref(), Some("ReferenceError"));
        let kinds: Vec<&str> = err.trace().iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec!["BindingElement", "ArrayBindingPattern"]);
    }

    #[test]
    fn exhausted_iterator_leaves_later_slots_undefined() {
        let mut interp = Interpreter::new();
        let mut arena = PatternArena::new();
        let a = arena.single_name("a", None).unwrap();
        let gap = arena.elision();
        let b = arena.single_name("b", Some(Expression::number(9.0))).unwrap();
        let root = arena.array_pattern(vec![a, gap, b], None).unwrap();
        let env = Environment::new(None);
        declare(&env, &["a", "b"]);
        let value = interp.create_array(vec![]);
        interp.initialize_binding(&arena, root, value, Some(&env)).unwrap();
        assert_eq!(env.borrow().get("a"), Some(JsValue::Undefined));
        assert_eq!(env.borrow().get("b"), Some(num(9.0)));
    }

    #[test]
    fn initializer_throw_closes_iterator() {
        let mut interp = Interpreter::new();
        let closed = Rc::new(Cell::new(0));
        let counter = closed.clone();
        let iterable = interp.new_object([]);
        let make_iter = interp.create_native_function("[Symbol.iterator]", 0, move |interp, _this, _args| {
            let counter = counter.clone();
            let next = interp.create_native_function("next", 0, |interp, _t, _a| {
                Ok(interp.new_object([("value", JsValue::Undefined), ("done", JsValue::Boolean(false))]))
            });
            let ret = interp.create_native_function("return", 0, move |interp, _t, _a| {
                counter.set(counter.get() + 1);
                Ok(interp.new_object([]))
            });
            Ok(interp.new_object([("next", next), ("return", ret)]))
        });
        if let JsValue::Object(o) = &iterable {
            let key = PropertyKey::Symbol(interp.symbol_iterator());
            interp.get_object(o.id).unwrap().borrow_mut().insert_value(key, make_iter);
        }
        let boom = interp.create_native_function("boom", 0, |_i, _t, _a| {
            Err(Interrupt::throw(JsValue::from("boom")))
        });
        interp.global_env().borrow_mut().define("boom", BindingKind::Var, boom);

        let mut arena = PatternArena::new();
        let a = arena
            .single_name("a", Some(Expression::call(Expression::identifier("boom"), vec![])))
            .unwrap();
        let root = arena.array_pattern(vec![a], None).unwrap();
        let env = Environment::new(None);
        declare(&env, &["a"]);
        let err = interp.initialize_binding(&arena, root, iterable, Some(&env)).unwrap_err();
        assert_eq!(err.thrown(), Some(&JsValue::from("boom")));
        assert_eq!(closed.get(), 1);
    }
}

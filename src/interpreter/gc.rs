use super::*;
use crate::types::JsObject;

impl Interpreter {
    pub(crate) fn allocate_object_slot(&mut self, obj: Rc<RefCell<JsObjectData>>) -> u64 {
        let id = if let Some(idx) = self.free_list.pop() {
            self.objects[idx] = Some(obj.clone());
            idx as u64
        } else {
            let idx = self.objects.len();
            self.objects.push(Some(obj.clone()));
            idx as u64
        };
        obj.borrow_mut().id = Some(id);
        id
    }

    /// Number of occupied heap slots.
    pub fn heap_size(&self) -> usize {
        self.objects.iter().filter(|slot| slot.is_some()).count()
    }

    /// Mark/sweep over the object heap and returns how many objects were
    /// freed. Freed slots are reused by later allocations.
    ///
    /// Roots are the global and running environments, the intrinsics, and
    /// `roots`. Only call this between evaluations: values held by the host,
    /// including those captured by native function closures, survive only if
    /// they are passed in `roots` or reachable from an environment.
    pub fn collect_garbage(&mut self, roots: &[JsValue]) -> usize {
        let obj_count = self.objects.len();
        let mut marks = vec![false; obj_count];

        let mut worklist: Vec<u64> = Vec::new();
        Self::collect_env_roots(&self.global_env, &mut worklist);
        Self::collect_env_roots(&self.running_env, &mut worklist);
        for proto in [
            &self.object_prototype,
            &self.function_prototype,
            &self.array_prototype,
            &self.string_prototype,
            &self.number_prototype,
            &self.boolean_prototype,
            &self.symbol_prototype,
            &self.bigint_prototype,
            &self.iterator_prototype,
            &self.array_iterator_prototype,
            &self.string_iterator_prototype,
            &self.type_error_prototype,
            &self.reference_error_prototype,
        ] {
            if let Some(p) = proto
                && let Some(id) = p.borrow().id
            {
                worklist.push(id);
            }
        }
        worklist.extend(self.builtin_next.keys().copied());
        for root in roots {
            Self::collect_value_roots(root, &mut worklist);
        }

        while let Some(id) = worklist.pop() {
            let idx = id as usize;
            if idx >= obj_count || marks[idx] {
                continue;
            }
            marks[idx] = true;
            let Some(obj_rc) = self.objects[idx].clone() else {
                continue;
            };
            let obj = obj_rc.borrow();

            if let Some(proto) = &obj.prototype
                && let Some(pid) = proto.borrow().id
            {
                worklist.push(pid);
            }
            for desc in obj.properties.values() {
                for v in [&desc.value, &desc.get, &desc.set].into_iter().flatten() {
                    Self::collect_value_roots(v, &mut worklist);
                }
            }
            if let Some(v) = &obj.primitive_value {
                Self::collect_value_roots(v, &mut worklist);
            }
            match &obj.iterator_state {
                Some(IteratorState::ArrayIterator { target, .. }) => worklist.push(target.id),
                Some(IteratorState::List { values, .. }) => {
                    for v in values {
                        Self::collect_value_roots(v, &mut worklist);
                    }
                }
                Some(IteratorState::StringIterator { .. }) | None => {}
            }
        }

        let mut freed = 0;
        for (idx, marked) in marks.into_iter().enumerate() {
            if !marked && self.objects[idx].take().is_some() {
                self.free_list.push(idx);
                freed += 1;
            }
        }
        tracing::debug!(freed, live = obj_count - self.free_list.len(), "heap collected");
        freed
    }

    fn collect_env_roots(env: &EnvRef, worklist: &mut Vec<u64>) {
        let mut current = Some(env.clone());
        while let Some(scope) = current {
            for value in scope.borrow().values() {
                Self::collect_value_roots(value, worklist);
            }
            current = scope.borrow().parent();
        }
    }

    fn collect_value_roots(value: &JsValue, worklist: &mut Vec<u64>) {
        if let JsValue::Object(JsObject { id }) = value {
            worklist.push(*id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unreachable_objects_are_freed_and_slots_reused() {
        let mut interp = Interpreter::new();
        interp.collect_garbage(&[]);
        let baseline = interp.heap_size();

        let kept = interp.new_object([]);
        let inner = interp.new_object([]);
        let holder = interp.create_array(vec![inner.clone()]);
        interp.new_object([("garbage", JsValue::Null)]);
        interp.global_env().borrow_mut().define("holder", BindingKind::Var, holder);

        assert_eq!(interp.collect_garbage(&[kept.clone()]), 1);
        assert_eq!(interp.heap_size(), baseline + 3);
        assert!(interp.get_object(inner.as_object().map(|o| o.id).unwrap()).is_some());

        let reused = interp.new_object([]);
        assert_eq!(interp.heap_size(), baseline + 4);
        assert_ne!(reused, kept);
    }

    #[test]
    fn intrinsic_iterators_survive_collection() {
        let mut interp = Interpreter::new();
        interp.collect_garbage(&[]);
        let values = interp
            .iterable_to_list(&JsValue::from("ok"))
            .unwrap();
        assert_eq!(values, vec![JsValue::from("o"), JsValue::from("k")]);
        let mut record = interp.create_list_iterator_record(vec![JsValue::Null]);
        assert_eq!(interp.iterator_step_value(&mut record).unwrap(), Some(JsValue::Null));
    }
}

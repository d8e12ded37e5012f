use super::*;
use crate::types::{JsObject, JsString, number_ops};

impl Interpreter {
    /// §7.4.3 GetIterator(obj, sync)
    pub fn get_iterator(&mut self, obj: &JsValue) -> Completion<IteratorRecord> {
        self.check_timeout()?;
        let key = PropertyKey::Symbol(self.symbol_iterator.clone());
        let method = if obj.is_nullish() {
            None
        } else {
            self.get_method(obj, &key)?
        };
        let Some(method) = method else {
            return Err(self.throw_type_error(format!("{} is not iterable", describe(obj))));
        };
        self.get_iterator_from_method(obj, &method)
    }

    /// §7.4.2 GetIteratorFromMethod
    pub(crate) fn get_iterator_from_method(
        &mut self,
        obj: &JsValue,
        method: &JsValue,
    ) -> Completion<IteratorRecord> {
        let iterator = self.call_function(method, obj, &[])?;
        if !iterator.is_object() {
            return Err(self.throw_type_error("Result of the Symbol.iterator method is not an object"));
        }
        let next_method = self.get_v(&iterator, &PropertyKey::from("next"))?;
        Ok(IteratorRecord {
            iterator,
            next_method,
            done: false,
        })
    }

    /// §7.4.4 IteratorNext
    pub(crate) fn iterator_next(&mut self, record: &IteratorRecord) -> Completion {
        let result = self.call_function(&record.next_method, &record.iterator, &[])?;
        if !result.is_object() {
            return Err(self.throw_type_error(format!("Iterator result {result} is not an object")));
        }
        Ok(result)
    }

    /// §7.4.5 IteratorComplete
    pub(crate) fn iterator_complete(&mut self, result: &JsValue) -> Completion<bool> {
        Ok(self.get_v(result, &PropertyKey::from("done"))?.to_boolean())
    }

    /// §7.4.6 IteratorValue
    pub fn iterator_value(&mut self, result: &JsValue) -> Completion {
        self.check_timeout()?;
        self.get_v(result, &PropertyKey::from("value"))
    }

    /// §7.4.7 IteratorStep: the next result object, or `None` once the
    /// iterator reports completion. Leaves `record.done` to the caller.
    pub fn iterator_step(&mut self, record: &IteratorRecord) -> Completion<Option<JsValue>> {
        self.check_timeout()?;
        let result = self.iterator_next(record)?;
        if self.iterator_complete(&result)? {
            Ok(None)
        } else {
            Ok(Some(result))
        }
    }

    /// §7.4.8 IteratorStepValue: steps and extracts the value, marking the
    /// record done on exhaustion or on any abrupt completion.
    pub fn iterator_step_value(&mut self, record: &mut IteratorRecord) -> Completion<Option<JsValue>> {
        if let Some(stepped) = self.builtin_step(record) {
            if !matches!(stepped, Ok(Some(_))) {
                record.done = true;
            }
            return stepped;
        }
        let result = match self.iterator_step(record) {
            Ok(Some(result)) => result,
            Ok(None) => {
                record.done = true;
                return Ok(None);
            }
            Err(e) => {
                record.done = true;
                return Err(e);
            }
        };
        match self.iterator_value(&result) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                record.done = true;
                Err(e)
            }
        }
    }

    /// §7.4.10 IteratorClose(iteratorRecord, completion)
    ///
    /// A throw in `completion` wins over anything `return()` does. Any other
    /// `completion` (normal, return, break, continue) is replaced by an abrupt
    /// result from `return()`, or by a TypeError when `return()` yields a
    /// non-object. Host timeouts skip the
    /// close entirely and take priority over everything else.
    pub fn iterator_close<T>(&mut self, record: &IteratorRecord, completion: Completion<T>) -> Completion<T> {
        if matches!(completion, Err(Interrupt::Timeout { .. })) {
            tracing::trace!("iterator close skipped after timeout");
            return completion;
        }
        tracing::trace!("closing iterator");
        let inner = match self.call_return_method(record) {
            Err(timeout @ Interrupt::Timeout { .. }) => return Err(timeout),
            other => other,
        };
        if matches!(completion, Err(ref e) if e.is_throw()) {
            return completion;
        }
        match inner {
            Err(e) => Err(e),
            Ok(Some(result)) if !result.is_object() => {
                Err(self.throw_type_error("Iterator result of return() is not an object"))
            }
            Ok(_) => completion,
        }
    }

    /// Steps 3-5 of IteratorClose: GetMethod(iterator, "return") and Call.
    /// `None` when the iterator has no `return` method.
    fn call_return_method(&mut self, record: &IteratorRecord) -> Completion<Option<JsValue>> {
        self.check_timeout()?;
        let Some(method) = self.get_method(&record.iterator, &PropertyKey::from("return"))? else {
            return Ok(None);
        };
        self.call_function(&method, &record.iterator, &[]).map(Some)
    }

    /// §7.4.12 CreateListIteratorRecord. The iterator is not observable from
    /// script, so closing it is a no-op.
    pub fn create_list_iterator_record(&mut self, values: Vec<JsValue>) -> IteratorRecord {
        let iterator = self.create_object();
        iterator.borrow_mut().iterator_state = Some(IteratorState::List { values, index: 0 });
        IteratorRecord {
            iterator: Self::object_value(&iterator),
            next_method: self.list_iterator_next.clone(),
            done: false,
        }
    }

    /// Steps a record whose `next` is still one of the intrinsic iterator
    /// functions without allocating a result object. `None` when the record
    /// uses some other `next`.
    pub(crate) fn builtin_step(&mut self, record: &IteratorRecord) -> Option<Completion<Option<JsValue>>> {
        let JsValue::Object(next) = &record.next_method else {
            return None;
        };
        let kind = *self.builtin_next.get(&next.id)?;
        Some(
            self.check_timeout()
                .and_then(|()| self.advance_builtin_iterator(kind, &record.iterator)),
        )
    }

    /// The intrinsic `next` methods: %ArrayIteratorPrototype%.next,
    /// %StringIteratorPrototype%.next and the list iterator's.
    pub(crate) fn builtin_iterator_next(&mut self, kind: BuiltinIterator, this: &JsValue) -> Completion {
        let value = self.advance_builtin_iterator(kind, this)?;
        let done = value.is_none();
        Ok(self.create_iter_result_object(value.unwrap_or(JsValue::Undefined), done))
    }

    fn advance_builtin_iterator(&mut self, kind: BuiltinIterator, this: &JsValue) -> Completion<Option<JsValue>> {
        let state = this
            .as_object()
            .and_then(|o| self.get_object(o.id))
            .and_then(|obj| {
                let state = obj.borrow().iterator_state.clone();
                state.map(|s| (obj, s))
            });
        match (kind, state) {
            (BuiltinIterator::List, Some((obj, IteratorState::List { values, index }))) => {
                let value = values.get(index).cloned();
                if value.is_some() {
                    obj.borrow_mut().iterator_state = Some(IteratorState::List {
                        values,
                        index: index + 1,
                    });
                }
                Ok(value)
            }
            (BuiltinIterator::Array, Some((obj, IteratorState::ArrayIterator { target, index, done }))) => {
                self.array_iterator_step(&obj, target, index, done)
            }
            (BuiltinIterator::String, Some((obj, IteratorState::StringIterator { string, position, done }))) => {
                Ok(string_iterator_step(&obj, string, position, done))
            }
            _ => Err(self.throw_type_error("next method called on incompatible receiver")),
        }
    }

    /// §23.1.5.1 CreateArrayIterator (values)
    pub(crate) fn create_array_iterator(&mut self, this: &JsValue) -> Completion {
        let target = self.to_object(this)?;
        let iterator = self.create_object();
        {
            let mut data = iterator.borrow_mut();
            data.prototype = self.array_iterator_prototype.clone();
            data.iterator_state = Some(IteratorState::ArrayIterator {
                target,
                index: 0,
                done: false,
            });
        }
        Ok(Self::object_value(&iterator))
    }

    /// §23.1.5.2.1 %ArrayIteratorPrototype%.next
    fn array_iterator_step(
        &mut self,
        obj: &Rc<RefCell<JsObjectData>>,
        target: JsObject,
        index: usize,
        done: bool,
    ) -> Completion<Option<JsValue>> {
        if done {
            return Ok(None);
        }
        let len = self.length_of_array_like(target)?;
        if index >= len {
            obj.borrow_mut().iterator_state = Some(IteratorState::ArrayIterator {
                target,
                index,
                done: true,
            });
            return Ok(None);
        }
        obj.borrow_mut().iterator_state = Some(IteratorState::ArrayIterator {
            target,
            index: index + 1,
            done: false,
        });
        let key = PropertyKey::from(number_ops::to_string(index as f64).as_str());
        self.get(target, &key, &JsValue::Object(target)).map(Some)
    }

    /// §22.1.3.36 String.prototype[@@iterator]
    pub(crate) fn create_string_iterator(&mut self, this: &JsValue) -> Completion {
        if this.is_nullish() {
            return Err(self.throw_type_error(format!("Cannot iterate over {this}")));
        }
        let string = self.to_string(this)?;
        let iterator = self.create_object();
        {
            let mut data = iterator.borrow_mut();
            data.prototype = self.string_iterator_prototype.clone();
            data.iterator_state = Some(IteratorState::StringIterator {
                string,
                position: 0,
                done: false,
            });
        }
        Ok(Self::object_value(&iterator))
    }

    /// Drains an iterable into a list; used where script cannot observe the
    /// difference (tests, host helpers).
    pub fn iterable_to_list(&mut self, iterable: &JsValue) -> Completion<Vec<JsValue>> {
        let mut record = self.get_iterator(iterable)?;
        let mut values = Vec::new();
        while let Some(value) = self.iterator_step_value(&mut record)? {
            values.push(value);
        }
        Ok(values)
    }
}

/// §22.1.5.1.1 %StringIteratorPrototype%.next, one code point per step.
fn string_iterator_step(
    obj: &Rc<RefCell<JsObjectData>>,
    string: JsString,
    position: usize,
    done: bool,
) -> Option<JsValue> {
    if done {
        return None;
    }
    let code_point = string.code_point_at(position);
    let state = match &code_point {
        Some(unit) => IteratorState::StringIterator {
            position: position + unit.len(),
            string,
            done: false,
        },
        None => IteratorState::StringIterator {
            string,
            position,
            done: true,
        },
    };
    obj.borrow_mut().iterator_state = Some(state);
    code_point.map(JsValue::String)
}

fn describe(value: &JsValue) -> String {
    match value {
        JsValue::String(s) => format!("\"{s}\""),
        JsValue::Object(_) => "object".to_string(),
        other => other.to_string(),
    }
}

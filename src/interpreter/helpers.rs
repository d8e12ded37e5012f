use super::*;
use crate::types::{JsObject, JsString, number_ops};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PreferredType {
    String,
    Number,
}

impl Interpreter {
    pub(crate) fn get_object(&self, id: u64) -> Option<Rc<RefCell<JsObjectData>>> {
        self.objects.get(id as usize).and_then(|slot| slot.clone())
    }

    fn object_data(&mut self, obj: JsObject) -> Completion<Rc<RefCell<JsObjectData>>> {
        match self.get_object(obj.id) {
            Some(data) => Ok(data),
            None => Err(self.throw_type_error("object has been released")),
        }
    }

    pub(crate) fn create_object(&mut self) -> Rc<RefCell<JsObjectData>> {
        self.create_object_with_class(ObjectClass::Ordinary, self.object_prototype.clone())
    }

    fn create_object_with_class(
        &mut self,
        class: ObjectClass,
        prototype: Option<Rc<RefCell<JsObjectData>>>,
    ) -> Rc<RefCell<JsObjectData>> {
        let mut data = JsObjectData::new(class);
        data.prototype = prototype;
        let obj = Rc::new(RefCell::new(data));
        self.allocate_object_slot(obj.clone());
        obj
    }

    pub(crate) fn object_value(obj: &Rc<RefCell<JsObjectData>>) -> JsValue {
        let id = obj.borrow().id.unwrap_or_default();
        JsValue::Object(JsObject { id })
    }

    /// An ordinary object with the given own data properties, in order.
    pub fn new_object<'a>(
        &mut self,
        properties: impl IntoIterator<Item = (&'a str, JsValue)>,
    ) -> JsValue {
        let obj = self.create_object();
        {
            let mut data = obj.borrow_mut();
            for (key, value) in properties {
                data.insert_value(PropertyKey::from(key), value);
            }
        }
        Self::object_value(&obj)
    }

    /// §10.4.2.2 ArrayCreate followed by CreateDataProperty for each value.
    pub fn create_array(&mut self, values: Vec<JsValue>) -> JsValue {
        let obj = self.create_object_with_class(ObjectClass::Array, self.array_prototype.clone());
        {
            let mut data = obj.borrow_mut();
            let len = values.len();
            for (i, value) in values.into_iter().enumerate() {
                data.insert_value(PropertyKey::from(i as u32), value);
            }
            data.insert_property(
                PropertyKey::from("length"),
                PropertyDescriptor::data(JsValue::Number(len as f64), true, false, false),
            );
        }
        Self::object_value(&obj)
    }

    pub(crate) fn create_function(&mut self, func: JsFunction) -> JsValue {
        let obj = self
            .create_object_with_class(ObjectClass::Function, self.function_prototype.clone());
        {
            let mut data = obj.borrow_mut();
            data.insert_property(
                PropertyKey::from("length"),
                PropertyDescriptor::data(JsValue::Number(func.arity as f64), false, false, true),
            );
            if !func.name.is_empty() {
                data.insert_property(
                    PropertyKey::from("name"),
                    PropertyDescriptor::data(JsValue::from(func.name.as_str()), false, false, true),
                );
            }
            data.callable = Some(func);
        }
        Self::object_value(&obj)
    }

    pub fn create_native_function(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> JsValue {
        self.create_function(JsFunction::native(name, arity, f))
    }

    /// §10.2.9 SetFunctionName, applied only to functions that have no own
    /// `name` yet.
    pub(crate) fn set_function_name(&mut self, func: &JsValue, name: &str) {
        if let JsValue::Object(o) = func
            && let Some(obj) = self.get_object(o.id)
        {
            let mut data = obj.borrow_mut();
            if data.callable.is_some() && !data.properties.contains_key(&PropertyKey::from("name"))
            {
                data.insert_property(
                    PropertyKey::from("name"),
                    PropertyDescriptor::data(JsValue::from(name), false, false, true),
                );
            }
        }
    }

    pub fn define_accessor(
        &mut self,
        target: &JsValue,
        key: &str,
        getter: Option<JsValue>,
        setter: Option<JsValue>,
    ) {
        if let JsValue::Object(o) = target
            && let Some(obj) = self.get_object(o.id)
        {
            obj.borrow_mut().insert_property(
                PropertyKey::from(key),
                PropertyDescriptor::accessor(getter, setter, true),
            );
        }
    }

    fn create_error(&mut self, proto: Option<Rc<RefCell<JsObjectData>>>, message: &str) -> JsValue {
        let obj = self.create_object_with_class(ObjectClass::Error, proto);
        obj.borrow_mut()
            .insert_builtin(PropertyKey::from("message"), JsValue::from(message));
        Self::object_value(&obj)
    }

    pub(crate) fn create_type_error(&mut self, message: &str) -> JsValue {
        self.create_error(self.type_error_prototype.clone(), message)
    }

    pub(crate) fn create_reference_error(&mut self, message: &str) -> JsValue {
        self.create_error(self.reference_error_prototype.clone(), message)
    }

    pub(crate) fn throw_type_error(&mut self, message: impl AsRef<str>) -> Interrupt {
        Interrupt::throw(self.create_type_error(message.as_ref()))
    }

    pub(crate) fn throw_reference_error(&mut self, message: impl AsRef<str>) -> Interrupt {
        Interrupt::throw(self.create_reference_error(message.as_ref()))
    }

    /// Reads a data property along the prototype chain without running getters.
    fn peek_property(&self, value: &JsValue, key: &str) -> Option<JsValue> {
        let JsValue::Object(o) = value else {
            return None;
        };
        let key = PropertyKey::from(key);
        let mut current = self.get_object(o.id);
        while let Some(obj) = current {
            let data = obj.borrow();
            if let Some(desc) = data.get_own_property(&key) {
                return desc.value.clone();
            }
            current = data.prototype.clone();
        }
        None
    }

    pub fn error_name(&self, value: &JsValue) -> Option<String> {
        self.peek_property(value, "name").map(|v| v.to_string())
    }

    pub fn error_message(&self, value: &JsValue) -> Option<String> {
        self.peek_property(value, "message").map(|v| v.to_string())
    }

    pub fn is_callable(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(o) => self
                .get_object(o.id)
                .is_some_and(|obj| obj.borrow().callable.is_some()),
            _ => false,
        }
    }

    /// §7.3.14 Call
    pub fn call_function(
        &mut self,
        func_val: &JsValue,
        this_val: &JsValue,
        args: &[JsValue],
    ) -> Completion {
        let behavior = match func_val {
            JsValue::Object(o) => self
                .get_object(o.id)
                .and_then(|obj| obj.borrow().callable.as_ref().map(|f| f.behavior.clone())),
            _ => None,
        };
        match behavior {
            Some(f) => f(self, this_val, args),
            None => Err(self.throw_type_error(format!("{} is not a function", func_val.type_name()))),
        }
    }

    /// §10.1.8.1 OrdinaryGet
    pub(crate) fn get(&mut self, obj: JsObject, key: &PropertyKey, receiver: &JsValue) -> Completion {
        let data = self.object_data(obj)?;
        self.get_from(Some(data), key, receiver)
    }

    /// OrdinaryGet starting the lookup at `start` and walking its prototypes.
    fn get_from(
        &mut self,
        start: Option<Rc<RefCell<JsObjectData>>>,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Completion {
        let mut current = start;
        while let Some(data) = current {
            let desc = data.borrow().get_own_property(key).cloned();
            if let Some(desc) = desc {
                if desc.is_accessor_descriptor() {
                    let getter = desc.get.unwrap_or(JsValue::Undefined);
                    if getter.is_undefined() {
                        return Ok(JsValue::Undefined);
                    }
                    return self.call_function(&getter, receiver, &[]);
                }
                return Ok(desc.value.unwrap_or(JsValue::Undefined));
            }
            current = data.borrow().prototype.clone();
        }
        Ok(JsValue::Undefined)
    }

    /// §7.3.3 GetV. Primitives are not boxed: a string answers its own
    /// `length` and index keys, and every other lookup starts at the
    /// prototype ToObject would have given the wrapper.
    pub(crate) fn get_v(&mut self, value: &JsValue, key: &PropertyKey) -> Completion {
        let proto = match value {
            JsValue::Object(o) => return self.get(*o, key, value),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.throw_type_error(format!("Cannot convert {value} to object")));
            }
            JsValue::String(s) => {
                if let Some(own) = string_own_value(s, key) {
                    return Ok(own);
                }
                self.string_prototype.clone()
            }
            JsValue::Boolean(_) => self.boolean_prototype.clone(),
            JsValue::Number(_) => self.number_prototype.clone(),
            JsValue::Symbol(_) => self.symbol_prototype.clone(),
            JsValue::BigInt(_) => self.bigint_prototype.clone(),
        };
        self.get_from(proto, key, value)
    }

    /// Convenience `value[key]` for hosts and tests.
    pub fn get_property(&mut self, value: &JsValue, key: &str) -> Completion {
        self.get_v(value, &PropertyKey::from(key))
    }

    /// §7.3.11 GetMethod
    pub(crate) fn get_method(&mut self, value: &JsValue, key: &PropertyKey) -> Completion<Option<JsValue>> {
        let func = self.get_v(value, key)?;
        if func.is_nullish() {
            return Ok(None);
        }
        if !self.is_callable(&func) {
            return Err(self.throw_type_error(format!("{key} is not a function")));
        }
        Ok(Some(func))
    }

    /// §7.3.5 CreateDataProperty. Arrays keep `length` one past their
    /// highest index.
    pub fn create_data_property(
        &mut self,
        target: &JsValue,
        key: PropertyKey,
        value: JsValue,
    ) -> Completion<()> {
        let JsValue::Object(o) = target else {
            return Err(self.throw_type_error("CreateDataProperty on a non-object"));
        };
        let obj = self.object_data(*o)?;
        let mut data = obj.borrow_mut();
        if data.class == ObjectClass::Array
            && let Some(index) = key.as_array_index()
        {
            let length_key = PropertyKey::from("length");
            let len = match data.get_own_property(&length_key).and_then(|d| d.value.clone()) {
                Some(JsValue::Number(n)) => n,
                _ => 0.0,
            };
            if f64::from(index) >= len {
                data.insert_property(
                    length_key,
                    PropertyDescriptor::data(JsValue::Number(f64::from(index) + 1.0), true, false, false),
                );
            }
        }
        data.insert_value(key, value);
        Ok(())
    }

    /// Writes an array's `length` without disturbing its attributes.
    pub(crate) fn set_array_length(&mut self, array: &JsValue, len: usize) -> Completion<()> {
        let JsValue::Object(o) = array else {
            return Err(self.throw_type_error("length update on a non-object"));
        };
        let obj = self.object_data(*o)?;
        obj.borrow_mut().insert_property(
            PropertyKey::from("length"),
            PropertyDescriptor::data(JsValue::Number(len as f64), true, false, false),
        );
        Ok(())
    }

    /// §7.1.18 ToObject
    pub fn to_object(&mut self, value: &JsValue) -> Completion<JsObject> {
        let proto = match value {
            JsValue::Object(o) => return Ok(*o),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.throw_type_error(format!("Cannot convert {value} to object")));
            }
            JsValue::Boolean(_) => self.boolean_prototype.clone(),
            JsValue::Number(_) => self.number_prototype.clone(),
            JsValue::String(_) => self.string_prototype.clone(),
            JsValue::Symbol(_) => self.symbol_prototype.clone(),
            JsValue::BigInt(_) => self.bigint_prototype.clone(),
        };
        let obj = self.create_object_with_class(ObjectClass::Primitive, proto);
        {
            let mut data = obj.borrow_mut();
            // String exotic objects expose their code units as indexed properties.
            if let JsValue::String(s) = value {
                for (i, unit) in s.code_units.iter().enumerate() {
                    data.insert_property(
                        PropertyKey::from(i as u32),
                        PropertyDescriptor::data(
                            JsValue::String(JsString {
                                code_units: vec![*unit],
                            }),
                            false,
                            true,
                            false,
                        ),
                    );
                }
                data.insert_property(
                    PropertyKey::from("length"),
                    PropertyDescriptor::data(JsValue::Number(s.len() as f64), false, false, false),
                );
            }
            data.primitive_value = Some(value.clone());
        }
        let id = obj.borrow().id.unwrap_or_default();
        Ok(JsObject { id })
    }

    /// §7.1.1 ToPrimitive, via OrdinaryToPrimitive.
    pub(crate) fn to_primitive(&mut self, value: &JsValue, hint: PreferredType) -> Completion {
        if !value.is_object() {
            return Ok(value.clone());
        }
        let order = match hint {
            PreferredType::String => ["toString", "valueOf"],
            PreferredType::Number => ["valueOf", "toString"],
        };
        for name in order {
            let method = self.get_v(value, &PropertyKey::from(name))?;
            if self.is_callable(&method) {
                let result = self.call_function(&method, value, &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(self.throw_type_error("Cannot convert object to primitive value"))
    }

    /// §7.1.17 ToString
    pub(crate) fn to_string(&mut self, value: &JsValue) -> Completion<JsString> {
        let prim = self.to_primitive(value, PreferredType::String)?;
        match prim {
            JsValue::String(s) => Ok(s),
            JsValue::Symbol(_) => {
                Err(self.throw_type_error("Cannot convert a Symbol value to a string"))
            }
            JsValue::BigInt(b) => Ok(JsString::from_str(&b.value.to_string())),
            other => Ok(JsString::from_str(&other.to_string())),
        }
    }

    /// §7.1.4 ToNumber
    pub(crate) fn to_number(&mut self, value: &JsValue) -> Completion<f64> {
        let prim = self.to_primitive(value, PreferredType::Number)?;
        match prim {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Boolean(b) => Ok(if b { 1.0 } else { 0.0 }),
            JsValue::Number(n) => Ok(n),
            JsValue::String(s) => Ok(number_ops::string_to_number(&s.to_rust_string())),
            JsValue::Symbol(_) => {
                Err(self.throw_type_error("Cannot convert a Symbol value to a number"))
            }
            JsValue::BigInt(_) => {
                Err(self.throw_type_error("Cannot convert a BigInt value to a number"))
            }
            JsValue::Object(_) => Err(self.throw_type_error("Cannot convert object to number")),
        }
    }

    /// §7.1.19 ToPropertyKey
    pub fn to_property_key(&mut self, value: &JsValue) -> Completion<PropertyKey> {
        let key = self.to_primitive(value, PreferredType::String)?;
        match key {
            JsValue::Symbol(s) => Ok(PropertyKey::Symbol(s)),
            other => Ok(PropertyKey::String(self.to_string(&other)?)),
        }
    }

    /// §7.3.19 LengthOfArrayLike
    pub(crate) fn length_of_array_like(&mut self, obj: JsObject) -> Completion<usize> {
        let receiver = JsValue::Object(obj);
        let len = self.get(obj, &PropertyKey::from("length"), &receiver)?;
        Ok(number_ops::to_length(self.to_number(&len)?))
    }

    /// §7.3.25 CopyDataProperties
    pub(crate) fn copy_data_properties(
        &mut self,
        target: &JsValue,
        source: &JsValue,
        excluded: &[PropertyKey],
    ) -> Completion<()> {
        if source.is_nullish() {
            return Ok(());
        }
        let from = self.to_object(source)?;
        let from_data = self.object_data(from)?;
        let keys = from_data.borrow().own_property_keys();
        for key in keys {
            if excluded.contains(&key) {
                continue;
            }
            let enumerable = from_data
                .borrow()
                .get_own_property(&key)
                .is_some_and(PropertyDescriptor::is_enumerable);
            if enumerable {
                let value = self.get(from, &key, &JsValue::Object(from))?;
                self.create_data_property(target, key, value)?;
            }
        }
        Ok(())
    }

    /// §7.4.14 CreateIterResultObject
    pub(crate) fn create_iter_result_object(&mut self, value: JsValue, done: bool) -> JsValue {
        self.new_object([("value", value), ("done", JsValue::Boolean(done))])
    }
}

/// §10.4.3.5 StringGetOwnProperty, plus the wrapper's own `length`.
fn string_own_value(s: &JsString, key: &PropertyKey) -> Option<JsValue> {
    if *key == PropertyKey::from("length") {
        return Some(JsValue::Number(s.len() as f64));
    }
    let index = key.as_array_index()? as usize;
    s.code_units.get(index).map(|unit| {
        JsValue::String(JsString {
            code_units: vec![*unit],
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_property_key_coerces_numbers() {
        let mut interp = Interpreter::new();
        assert_eq!(
            interp.to_property_key(&JsValue::Number(1.5)).unwrap(),
            PropertyKey::from("1.5")
        );
        assert_eq!(
            interp.to_property_key(&JsValue::Boolean(true)).unwrap(),
            PropertyKey::from("true")
        );
        let sym = interp.create_symbol(Some("tag"));
        assert!(interp.to_property_key(&sym).unwrap().is_symbol());
    }

    #[test]
    fn to_object_rejects_nullish() {
        let mut interp = Interpreter::new();
        let err = interp.to_object(&JsValue::Null).unwrap_err();
        let thrown = err.thrown().unwrap().clone();
        assert_eq!(interp.error_name(&thrown).as_deref(), Some("TypeError"));
        assert_eq!(
            interp.error_message(&thrown).as_deref(),
            Some("Cannot convert null to object")
        );
    }

    #[test]
    fn string_wrappers_expose_indices() {
        let mut interp = Interpreter::new();
        let s = JsValue::from("hi");
        assert_eq!(interp.get_property(&s, "1").unwrap(), JsValue::from("i"));
        assert_eq!(interp.get_property(&s, "length").unwrap(), JsValue::Number(2.0));
    }

    #[test]
    fn getters_receive_the_original_receiver() {
        let mut interp = Interpreter::new();
        let obj = interp.new_object([]);
        let getter = interp.create_native_function("get", 0, |_interp, this, _args| {
            Ok(JsValue::from(this.type_name()))
        });
        interp.define_accessor(&obj, "kind", Some(getter), None);
        assert_eq!(interp.get_property(&obj, "kind").unwrap(), JsValue::from("object"));
    }

    #[test]
    fn length_of_array_like_uses_string_numeric_literals() {
        let mut interp = Interpreter::new();
        for (text, expected) in [("inf", 0), ("0x10", 16), (" 3 ", 3)] {
            let JsValue::Object(obj) = interp.new_object([("length", JsValue::from(text))]) else {
                unreachable!()
            };
            assert_eq!(interp.length_of_array_like(obj).unwrap(), expected, "{text:?}");
        }
    }

    #[test]
    fn array_length_tracks_highest_index() {
        let mut interp = Interpreter::new();
        let arr = interp.create_array(vec![]);
        interp
            .create_data_property(&arr, PropertyKey::from(3), JsValue::Null)
            .unwrap();
        assert_eq!(interp.get_property(&arr, "length").unwrap(), JsValue::Number(4.0));
    }

    #[test]
    fn copy_data_properties_skips_excluded_and_hidden() {
        let mut interp = Interpreter::new();
        let source = interp.new_object([("a", JsValue::Number(1.0)), ("b", JsValue::Number(2.0))]);
        let getter = interp.create_native_function("get", 0, |_i, _t, _a| Ok(JsValue::Null));
        interp.define_accessor(&source, "c", Some(getter), None);
        let target = interp.new_object([]);
        interp
            .copy_data_properties(&target, &source, &[PropertyKey::from("a")])
            .unwrap();
        assert_eq!(interp.get_property(&target, "a").unwrap(), JsValue::Undefined);
        assert_eq!(interp.get_property(&target, "b").unwrap(), JsValue::Number(2.0));
        assert_eq!(interp.get_property(&target, "c").unwrap(), JsValue::Null);
    }
}

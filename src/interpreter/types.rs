use crate::ast::NodeId;
use crate::types::{JsObject, JsString, JsValue, PropertyKey};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// The abrupt half of a completion record (§6.2.4).
#[derive(Debug, Clone, PartialEq)]
pub enum Abrupt {
    Throw(JsValue),
    Return(JsValue),
    Break(Option<String>),
    Continue(Option<String>),
}

impl fmt::Display for Abrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abrupt::Throw(v) => write!(f, "uncaught exception: {v}"),
            Abrupt::Return(v) => write!(f, "return completion ({v})"),
            Abrupt::Break(Some(label)) => write!(f, "break {label}"),
            Abrupt::Break(None) => write!(f, "break"),
            Abrupt::Continue(Some(label)) => write!(f, "continue {label}"),
            Abrupt::Continue(None) => write!(f, "continue"),
        }
    }
}

/// One pattern node an abrupt completion passed through on its way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub node: NodeId,
    pub kind: &'static str,
    pub path: String,
}

/// Everything that can cut evaluation short.
#[derive(Debug, Clone, Error)]
pub enum Interrupt {
    /// A language-level abrupt completion, with the pattern nodes it crossed
    /// (innermost first).
    #[error("{abrupt}{}", render_trace(.trace))]
    Completion {
        abrupt: Abrupt,
        trace: Vec<TraceFrame>,
    },

    /// The host execution budget ran out. Not observable from script code.
    #[error("execution budget exhausted after {ticks} ticks")]
    Timeout { ticks: u64 },
}

fn render_trace(trace: &[TraceFrame]) -> String {
    match trace.first() {
        Some(origin) => format!(" (at {})", origin.path),
        None => String::new(),
    }
}

impl Interrupt {
    pub fn throw(value: JsValue) -> Self {
        Interrupt::Completion {
            abrupt: Abrupt::Throw(value),
            trace: Vec::new(),
        }
    }

    pub fn thrown(&self) -> Option<&JsValue> {
        match self {
            Interrupt::Completion {
                abrupt: Abrupt::Throw(v),
                ..
            } => Some(v),
            _ => None,
        }
    }

    pub fn is_throw(&self) -> bool {
        self.thrown().is_some()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Interrupt::Timeout { .. })
    }

    pub fn trace(&self) -> &[TraceFrame] {
        match self {
            Interrupt::Completion { trace, .. } => trace,
            Interrupt::Timeout { .. } => &[],
        }
    }
}

impl From<Abrupt> for Interrupt {
    fn from(abrupt: Abrupt) -> Self {
        Interrupt::Completion {
            abrupt,
            trace: Vec::new(),
        }
    }
}

pub type Completion<T = JsValue> = Result<T, Interrupt>;

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug)]
pub struct Environment {
    pub(crate) bindings: FxHashMap<String, Binding>,
    pub(crate) parent: Option<EnvRef>,
}

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) value: JsValue,
    pub(crate) kind: BindingKind,
    pub(crate) initialized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("Cannot access '{0}' before initialization")]
    Uninitialized(String),
    #[error("Assignment to constant variable '{0}'")]
    ConstAssignment(String),
    #[error("{0} is not defined")]
    Missing(String),
    #[error("Identifier '{0}' has already been initialized")]
    AlreadyInitialized(String),
}

impl Environment {
    pub fn new(parent: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            bindings: FxHashMap::default(),
            parent,
        }))
    }

    pub fn parent(&self) -> Option<EnvRef> {
        self.parent.clone()
    }

    /// CreateMutableBinding / CreateImmutableBinding. `var` bindings start out
    /// initialized to undefined; lexical bindings stay in their TDZ until
    /// `initialize_binding`.
    pub fn declare(&mut self, name: &str, kind: BindingKind) {
        self.bindings.insert(
            name.to_string(),
            Binding {
                value: JsValue::Undefined,
                kind,
                initialized: kind == BindingKind::Var,
            },
        );
    }

    /// Creates a binding that is initialized to `value` immediately.
    pub fn define(&mut self, name: &str, kind: BindingKind, value: JsValue) {
        self.bindings.insert(
            name.to_string(),
            Binding {
                value,
                kind,
                initialized: true,
            },
        );
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &JsValue> {
        self.bindings.values().map(|b| &b.value)
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// §9.1.1.1.4 InitializeBinding
    pub fn initialize_binding(&mut self, name: &str, value: JsValue) -> Result<(), EnvError> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| EnvError::Missing(name.to_string()))?;
        if binding.initialized {
            return Err(EnvError::AlreadyInitialized(name.to_string()));
        }
        binding.value = value;
        binding.initialized = true;
        Ok(())
    }

    /// §9.1.1.1.5 SetMutableBinding
    pub fn set_mutable_binding(&mut self, name: &str, value: JsValue) -> Result<(), EnvError> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| EnvError::Missing(name.to_string()))?;
        if !binding.initialized {
            return Err(EnvError::Uninitialized(name.to_string()));
        }
        if binding.kind == BindingKind::Const {
            return Err(EnvError::ConstAssignment(name.to_string()));
        }
        binding.value = value;
        Ok(())
    }

    /// §9.1.1.1.6 GetBindingValue
    pub fn get_binding_value(&self, name: &str) -> Result<JsValue, EnvError> {
        match self.bindings.get(name) {
            Some(binding) if binding.initialized => Ok(binding.value.clone()),
            Some(_) => Err(EnvError::Uninitialized(name.to_string())),
            None => Err(EnvError::Missing(name.to_string())),
        }
    }

    /// Walks the scope chain and returns an initialized binding's value.
    pub fn get(&self, name: &str) -> Option<JsValue> {
        if let Some(binding) = self.bindings.get(name) {
            if !binding.initialized {
                return None; // TDZ
            }
            Some(binding.value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(name)
        } else {
            None
        }
    }
}

pub type NativeFn = Rc<dyn Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion>;

#[derive(Clone)]
pub struct JsFunction {
    pub name: String,
    pub arity: usize,
    pub behavior: NativeFn,
}

impl JsFunction {
    pub fn native(
        name: impl Into<String>,
        arity: usize,
        f: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        JsFunction {
            name: name.into(),
            arity,
            behavior: Rc::new(f),
        }
    }
}

impl fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsFunction({:?}, {})", self.name, self.arity)
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    pub fn accessor(get: Option<JsValue>, set: Option<JsValue>, enumerable: bool) -> Self {
        Self {
            value: None,
            writable: None,
            get: Some(get.unwrap_or(JsValue::Undefined)),
            set: Some(set.unwrap_or(JsValue::Undefined)),
            enumerable: Some(enumerable),
            configurable: Some(true),
        }
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_enumerable(&self) -> bool {
        self.enumerable.unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub enum IteratorState {
    ArrayIterator {
        target: JsObject,
        index: usize,
        done: bool,
    },
    StringIterator {
        string: JsString,
        position: usize,
        done: bool,
    },
    List {
        values: Vec<JsValue>,
        index: usize,
    },
}

/// Which intrinsic `next` a function object is, so stepping can skip the
/// result object when the record still uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuiltinIterator {
    Array,
    String,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Ordinary,
    Array,
    Function,
    Error,
    Primitive,
}

pub struct JsObjectData {
    pub id: Option<u64>,
    pub properties: FxHashMap<PropertyKey, PropertyDescriptor>,
    pub property_order: Vec<PropertyKey>,
    pub prototype: Option<Rc<RefCell<JsObjectData>>>,
    pub callable: Option<JsFunction>,
    pub class: ObjectClass,
    pub primitive_value: Option<JsValue>,
    pub iterator_state: Option<IteratorState>,
}

impl JsObjectData {
    pub(crate) fn new(class: ObjectClass) -> Self {
        Self {
            id: None,
            properties: FxHashMap::default(),
            property_order: Vec::new(),
            prototype: None,
            callable: None,
            class,
            primitive_value: None,
            iterator_state: None,
        }
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn insert_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) {
        if !self.properties.contains_key(&key) {
            self.property_order.push(key.clone());
        }
        self.properties.insert(key, desc);
    }

    pub fn insert_value(&mut self, key: PropertyKey, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data_default(value));
    }

    pub fn insert_builtin(&mut self, key: PropertyKey, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data(value, true, false, true));
    }

    /// §10.1.11.1 OrdinaryOwnPropertyKeys: array indices ascending, then
    /// strings in creation order, then symbols in creation order.
    pub fn own_property_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<(u32, &PropertyKey)> = self
            .property_order
            .iter()
            .filter_map(|k| k.as_array_index().map(|i| (i, k)))
            .collect();
        indices.sort_by_key(|(i, _)| *i);
        let mut keys: Vec<PropertyKey> = indices.into_iter().map(|(_, k)| k.clone()).collect();
        keys.extend(
            self.property_order
                .iter()
                .filter(|k| !k.is_symbol() && k.as_array_index().is_none())
                .cloned(),
        );
        keys.extend(self.property_order.iter().filter(|k| k.is_symbol()).cloned());
        keys
    }
}

impl fmt::Debug for JsObjectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObjectData")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("keys", &self.property_order)
            .finish()
    }
}

/// §7.4.1 Iterator Record
#[derive(Debug, Clone)]
pub struct IteratorRecord {
    pub iterator: JsValue,
    pub next_method: JsValue,
    pub done: bool,
}

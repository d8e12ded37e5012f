use crate::types::{JsString, JsSymbol, JsValue, PropertyKey};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

mod types;
pub use types::*;

mod diagnostics;
mod eval;
mod gc;
mod helpers;
mod iterators;
mod params;
mod patterns;
mod references;
mod spread;

pub use references::Reference;

/// Host configuration for an [`Interpreter`].
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Upper bound on evaluation steps before the host aborts with
    /// [`Interrupt::Timeout`]. `None` means unbounded.
    pub max_ticks: Option<u64>,
    /// Strict mode reference semantics: assigning to an unresolvable name
    /// throws a ReferenceError instead of creating a global.
    pub strict: bool,
}

pub struct Interpreter {
    global_env: EnvRef,
    running_env: EnvRef,
    objects: Vec<Option<Rc<RefCell<JsObjectData>>>>,
    free_list: Vec<usize>,
    object_prototype: Option<Rc<RefCell<JsObjectData>>>,
    function_prototype: Option<Rc<RefCell<JsObjectData>>>,
    array_prototype: Option<Rc<RefCell<JsObjectData>>>,
    string_prototype: Option<Rc<RefCell<JsObjectData>>>,
    number_prototype: Option<Rc<RefCell<JsObjectData>>>,
    boolean_prototype: Option<Rc<RefCell<JsObjectData>>>,
    symbol_prototype: Option<Rc<RefCell<JsObjectData>>>,
    bigint_prototype: Option<Rc<RefCell<JsObjectData>>>,
    iterator_prototype: Option<Rc<RefCell<JsObjectData>>>,
    array_iterator_prototype: Option<Rc<RefCell<JsObjectData>>>,
    string_iterator_prototype: Option<Rc<RefCell<JsObjectData>>>,
    type_error_prototype: Option<Rc<RefCell<JsObjectData>>>,
    reference_error_prototype: Option<Rc<RefCell<JsObjectData>>>,
    builtin_next: FxHashMap<u64, BuiltinIterator>,
    list_iterator_next: JsValue,
    symbol_iterator: JsSymbol,
    next_symbol_id: u64,
    options: Options,
    ticks: u64,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        let global = Environment::new(None);

        {
            let mut env = global.borrow_mut();
            for (name, value) in [
                ("undefined", JsValue::Undefined),
                ("NaN", JsValue::Number(f64::NAN)),
                ("Infinity", JsValue::Number(f64::INFINITY)),
            ] {
                env.define(name, BindingKind::Const, value);
            }
        }

        let mut interp = Self {
            running_env: global.clone(),
            global_env: global,
            objects: Vec::new(),
            free_list: Vec::new(),
            object_prototype: None,
            function_prototype: None,
            array_prototype: None,
            string_prototype: None,
            number_prototype: None,
            boolean_prototype: None,
            symbol_prototype: None,
            bigint_prototype: None,
            iterator_prototype: None,
            array_iterator_prototype: None,
            string_iterator_prototype: None,
            type_error_prototype: None,
            reference_error_prototype: None,
            builtin_next: FxHashMap::default(),
            list_iterator_next: JsValue::Undefined,
            symbol_iterator: JsSymbol {
                id: 0,
                description: Some(JsString::from_str("Symbol.iterator")),
            },
            next_symbol_id: 1,
            options,
            ticks: 0,
        };
        interp.setup_intrinsics();
        interp
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn global_env(&self) -> EnvRef {
        self.global_env.clone()
    }

    /// The LexicalEnvironment of the running execution context. Identifier
    /// references in initializers and assignment targets resolve here.
    pub fn running_env(&self) -> EnvRef {
        self.running_env.clone()
    }

    /// Swaps in a new running environment and returns the previous one.
    pub fn enter_env(&mut self, env: EnvRef) -> EnvRef {
        std::mem::replace(&mut self.running_env, env)
    }

    pub fn symbol_iterator(&self) -> JsSymbol {
        self.symbol_iterator.clone()
    }

    pub fn create_symbol(&mut self, description: Option<&str>) -> JsValue {
        let id = self.next_symbol_id;
        self.next_symbol_id += 1;
        JsValue::Symbol(JsSymbol {
            id,
            description: description.map(JsString::from_str),
        })
    }

    /// Cooperative budget check, charged once per evaluation step.
    ///
    /// Once the budget is exhausted every subsequent check fails as well, so
    /// an aborted evaluation cannot resume by accident.
    pub fn check_timeout(&mut self) -> Completion<()> {
        self.ticks += 1;
        if let Some(limit) = self.options.max_ticks
            && self.ticks > limit
        {
            if self.ticks == limit + 1 {
                tracing::debug!(limit, "execution budget exhausted");
            }
            return Err(Interrupt::Timeout { ticks: self.ticks });
        }
        Ok(())
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn reset_budget(&mut self) {
        self.ticks = 0;
    }

    fn setup_intrinsics(&mut self) {
        let object_proto = Rc::new(RefCell::new(JsObjectData::new(ObjectClass::Ordinary)));
        self.allocate_object_slot(object_proto.clone());
        self.object_prototype = Some(object_proto);

        let function_proto = self.create_object();
        self.function_prototype = Some(function_proto);

        // Prototypes for ToObject wrappers.
        self.string_prototype = Some(self.create_object());
        self.number_prototype = Some(self.create_object());
        self.boolean_prototype = Some(self.create_object());
        self.symbol_prototype = Some(self.create_object());
        self.bigint_prototype = Some(self.create_object());

        let iterator_proto = self.create_object();
        let return_this = self.create_function(JsFunction::native(
            "[Symbol.iterator]",
            0,
            |_interp, this, _args| Ok(this.clone()),
        ));
        iterator_proto.borrow_mut().insert_builtin(
            PropertyKey::Symbol(self.symbol_iterator.clone()),
            return_this,
        );
        self.iterator_prototype = Some(iterator_proto.clone());

        let array_iterator_proto = self.create_object();
        array_iterator_proto.borrow_mut().prototype = Some(iterator_proto.clone());
        let next = self.builtin_next_function(BuiltinIterator::Array);
        array_iterator_proto
            .borrow_mut()
            .insert_builtin(PropertyKey::from("next"), next);
        self.array_iterator_prototype = Some(array_iterator_proto);

        let string_iterator_proto = self.create_object();
        string_iterator_proto.borrow_mut().prototype = Some(iterator_proto);
        let next = self.builtin_next_function(BuiltinIterator::String);
        string_iterator_proto
            .borrow_mut()
            .insert_builtin(PropertyKey::from("next"), next);
        self.string_iterator_prototype = Some(string_iterator_proto);
        self.list_iterator_next = self.builtin_next_function(BuiltinIterator::List);

        let array_proto = self.create_object();
        let values = self.create_function(JsFunction::native("values", 0, |interp, this, _args| {
            interp.create_array_iterator(this)
        }));
        array_proto.borrow_mut().insert_builtin(
            PropertyKey::Symbol(self.symbol_iterator.clone()),
            values.clone(),
        );
        array_proto
            .borrow_mut()
            .insert_builtin(PropertyKey::from("values"), values);
        self.array_prototype = Some(array_proto);

        if let Some(string_proto) = self.string_prototype.clone() {
            let iter = self.create_function(JsFunction::native(
                "[Symbol.iterator]",
                0,
                |interp, this, _args| interp.create_string_iterator(this),
            ));
            string_proto
                .borrow_mut()
                .insert_builtin(PropertyKey::Symbol(self.symbol_iterator.clone()), iter);
        }

        self.type_error_prototype = Some(self.create_error_prototype("TypeError"));
        self.reference_error_prototype = Some(self.create_error_prototype("ReferenceError"));
    }

    fn builtin_next_function(&mut self, kind: BuiltinIterator) -> JsValue {
        let next = self.create_function(JsFunction::native("next", 0, move |interp, this, _args| {
            interp.builtin_iterator_next(kind, this)
        }));
        if let JsValue::Object(o) = &next {
            self.builtin_next.insert(o.id, kind);
        }
        next
    }

    fn create_error_prototype(&mut self, name: &str) -> Rc<RefCell<JsObjectData>> {
        let proto = self.create_object();
        {
            let mut p = proto.borrow_mut();
            p.insert_builtin(PropertyKey::from("name"), JsValue::from(name));
            p.insert_builtin(PropertyKey::from("message"), JsValue::from(""));
        }
        proto
    }
}

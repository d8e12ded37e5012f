use super::*;

/// §6.2.5 Reference Record, restricted to identifier references.
#[derive(Debug, Clone)]
pub enum Reference {
    Binding { env: EnvRef, name: String },
    Unresolvable { name: String },
}

impl Reference {
    pub fn name(&self) -> &str {
        match self {
            Reference::Binding { name, .. } | Reference::Unresolvable { name } => name,
        }
    }
}

impl Interpreter {
    /// §9.4.2 ResolveBinding. With no environment the running execution
    /// context's LexicalEnvironment is searched.
    pub fn resolve_binding(&mut self, name: &str, env: Option<&EnvRef>) -> Reference {
        let mut current = Some(env.cloned().unwrap_or_else(|| self.running_env.clone()));
        while let Some(scope) = current {
            if scope.borrow().has_binding(name) {
                return Reference::Binding {
                    env: scope,
                    name: name.to_string(),
                };
            }
            current = scope.borrow().parent();
        }
        Reference::Unresolvable {
            name: name.to_string(),
        }
    }

    /// §6.2.5.5 GetValue
    pub fn get_value(&mut self, reference: &Reference) -> Completion {
        match reference {
            Reference::Unresolvable { name } => {
                Err(self.throw_reference_error(format!("{name} is not defined")))
            }
            Reference::Binding { env, name } => {
                let value = env.borrow().get_binding_value(name);
                value.map_err(|e| self.env_error(e))
            }
        }
    }

    /// §6.2.5.6 PutValue
    pub fn put_value(&mut self, reference: &Reference, value: JsValue) -> Completion<()> {
        match reference {
            Reference::Unresolvable { name } => {
                if self.options.strict {
                    return Err(self.throw_reference_error(format!("{name} is not defined")));
                }
                self.global_env
                    .borrow_mut()
                    .define(name, BindingKind::Var, value);
                Ok(())
            }
            Reference::Binding { env, name } => {
                let result = env.borrow_mut().set_mutable_binding(name, value);
                result.map_err(|e| self.env_error(e))
            }
        }
    }

    /// §6.2.5.8 InitializeReferencedBinding
    pub fn initialize_referenced_binding(
        &mut self,
        reference: &Reference,
        value: JsValue,
    ) -> Completion<()> {
        match reference {
            Reference::Unresolvable { name } => Err(self.throw_reference_error(format!(
                "{name} is not declared in the target environment"
            ))),
            Reference::Binding { env, name } => {
                let result = env.borrow_mut().initialize_binding(name, value);
                result.map_err(|e| self.env_error(e))
            }
        }
    }

    /// Binds `value` to a resolved identifier: InitializeReferencedBinding
    /// when an environment is supplied, PutValue otherwise. In binding mode
    /// the name must be declared in `env` itself; a binding found further out
    /// is never initialized from here.
    pub(crate) fn bind_reference(
        &mut self,
        reference: &Reference,
        value: JsValue,
        env: Option<&EnvRef>,
    ) -> Completion<()> {
        match (env, reference) {
            (Some(target), Reference::Binding { env, name }) if !Rc::ptr_eq(env, target) => Err(
                self.throw_reference_error(format!("{name} is not declared in the target environment")),
            ),
            (Some(_), _) => self.initialize_referenced_binding(reference, value),
            (None, _) => self.put_value(reference, value),
        }
    }

    fn env_error(&mut self, error: EnvError) -> Interrupt {
        let message = error.to_string();
        match error {
            EnvError::ConstAssignment(_) => self.throw_type_error(message),
            EnvError::Uninitialized(_) | EnvError::Missing(_) | EnvError::AlreadyInitialized(_) => {
                self.throw_reference_error(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_through_parent_chain() {
        let mut interp = Interpreter::new();
        let outer = Environment::new(None);
        outer.borrow_mut().declare("x", BindingKind::Let);
        let inner = Environment::new(Some(outer.clone()));
        let reference = interp.resolve_binding("x", Some(&inner));
        assert!(matches!(&reference, Reference::Binding { env, .. } if Rc::ptr_eq(env, &outer)));
        assert!(matches!(
            interp.resolve_binding("nope", Some(&inner)),
            Reference::Unresolvable { .. }
        ));
    }

    #[test]
    fn sloppy_put_value_creates_global() {
        let mut interp = Interpreter::new();
        let reference = interp.resolve_binding("fresh", None);
        interp.put_value(&reference, JsValue::Number(7.0)).unwrap();
        assert_eq!(interp.global_env().borrow().get("fresh"), Some(JsValue::Number(7.0)));
    }

    #[test]
    fn strict_put_value_throws_reference_error() {
        let mut interp = Interpreter::with_options(Options {
            strict: true,
            ..Options::default()
        });
        let reference = interp.resolve_binding("fresh", None);
        let err = interp.put_value(&reference, JsValue::Null).unwrap_err();
        let thrown = err.thrown().unwrap().clone();
        assert_eq!(interp.error_name(&thrown).as_deref(), Some("ReferenceError"));
    }

    #[test]
    fn put_value_into_tdz_throws() {
        let mut interp = Interpreter::new();
        let env = interp.running_env();
        env.borrow_mut().declare("later", BindingKind::Let);
        let reference = interp.resolve_binding("later", None);
        let err = interp.put_value(&reference, JsValue::Null).unwrap_err();
        let thrown = err.thrown().unwrap().clone();
        assert_eq!(
            interp.error_message(&thrown).as_deref(),
            Some("Cannot access 'later' before initialization")
        );
    }

    #[test]
    fn binding_mode_ignores_outer_scopes() {
        let mut interp = Interpreter::new();
        let env = Environment::new(Some(interp.global_env()));
        let reference = interp.resolve_binding("undefined", Some(&env));
        let err = interp
            .bind_reference(&reference, JsValue::Number(5.0), Some(&env))
            .unwrap_err();
        let thrown = err.thrown().unwrap().clone();
        assert_eq!(interp.error_name(&thrown).as_deref(), Some("ReferenceError"));
        assert_eq!(interp.global_env().borrow().get("undefined"), Some(JsValue::Undefined));
    }

    #[test]
    fn binding_mode_initializes_once() {
        let mut interp = Interpreter::new();
        let env = Environment::new(Some(interp.global_env()));
        env.borrow_mut().declare("x", BindingKind::Const);
        let reference = interp.resolve_binding("x", Some(&env));
        interp.bind_reference(&reference, JsValue::Number(1.0), Some(&env)).unwrap();
        let err = interp
            .bind_reference(&reference, JsValue::Number(2.0), Some(&env))
            .unwrap_err();
        let thrown = err.thrown().unwrap().clone();
        assert_eq!(interp.error_name(&thrown).as_deref(), Some("ReferenceError"));
        assert_eq!(env.borrow().get("x"), Some(JsValue::Number(1.0)));
    }

    #[test]
    fn const_assignment_is_type_error() {
        let mut interp = Interpreter::new();
        let reference = interp.resolve_binding("undefined", None);
        let err = interp.put_value(&reference, JsValue::Null).unwrap_err();
        let thrown = err.thrown().unwrap().clone();
        assert_eq!(interp.error_name(&thrown).as_deref(), Some("TypeError"));
    }
}

use super::*;
use crate::ast::{FormalParameters, PatternArena};

impl Interpreter {
    /// IteratorBindingInitialization of a formal parameter list over the
    /// call's arguments. The list iterator is never observable, so it is not
    /// closed when a parameter fails.
    #[tracing::instrument(level = "trace", skip_all, fields(params = params.elements.len(), args = args.len()))]
    pub fn initialize_parameters(
        &mut self,
        arena: &PatternArena,
        params: &FormalParameters,
        args: &[JsValue],
        env: Option<&EnvRef>,
    ) -> Completion<()> {
        self.check_timeout()?;
        let mut record = self.create_list_iterator_record(args.to_vec());
        for &element in &params.elements {
            self.initialize_iterator_binding(arena, element, &mut record, env)?;
        }
        if let Some(rest) = params.rest {
            self.initialize_iterator_binding(arena, rest, &mut record, env)?;
        }
        Ok(())
    }

    /// Declares every bound parameter name in `env` and binds the arguments,
    /// evaluating defaults with `env` as the running environment so later
    /// parameters can see earlier ones.
    ///
    /// Names stay in their TDZ until their own slot is bound, so a default
    /// that reads a later parameter throws a ReferenceError.
    pub fn instantiate_parameters(
        &mut self,
        arena: &PatternArena,
        params: &FormalParameters,
        args: &[JsValue],
        env: &EnvRef,
    ) -> Completion<()> {
        for name in &params.facts.bound_names {
            if !env.borrow().has_binding(name) {
                env.borrow_mut().declare(name, BindingKind::Let);
            }
        }
        let previous = self.enter_env(env.clone());
        let result = self.initialize_parameters(arena, params, args, Some(env));
        self.enter_env(previous);
        result
    }
}

use super::*;
use crate::ast::{Argument, ArrayElement, Expression, Literal, PatternArena, PropertyName};
use crate::types::number_ops;

impl Interpreter {
    pub fn eval_expr(&mut self, arena: &PatternArena, expr: &Expression) -> Completion {
        self.check_timeout()?;
        match expr {
            Expression::Literal(lit) => Ok(match lit {
                Literal::Undefined => JsValue::Undefined,
                Literal::Null => JsValue::Null,
                Literal::Boolean(b) => JsValue::Boolean(*b),
                Literal::Number(n) => JsValue::Number(*n),
                Literal::String(s) => JsValue::from(s.as_str()),
            }),
            Expression::Identifier(name) => {
                let reference = self.resolve_binding(name, None);
                self.get_value(&reference)
            }
            Expression::Array(elements) => self.eval_array_literal(arena, elements),
            Expression::Object(properties) => {
                let obj = self.new_object([]);
                for property in properties {
                    let key = self.eval_property_name(arena, &property.key)?;
                    let value = if property.value.is_anonymous_function_definition() {
                        self.eval_named(arena, &property.value, &key.to_string())?
                    } else {
                        self.eval_expr(arena, &property.value)?
                    };
                    self.create_data_property(&obj, key, value)?;
                }
                Ok(obj)
            }
            Expression::Call(callee, arguments) => {
                let func = self.eval_expr(arena, callee)?;
                let args = self.eval_arguments(arena, arguments)?;
                self.call_function(&func, &JsValue::Undefined, &args)
            }
            Expression::Function(literal) => {
                let name = literal.name.clone().unwrap_or_default();
                Ok(self.create_function(JsFunction {
                    name,
                    arity: literal.arity,
                    behavior: literal.body.clone(),
                }))
            }
            Expression::Assign(name, value) => {
                let reference = self.resolve_binding(name, None);
                let value = self.eval_named(arena, value, name)?;
                self.put_value(&reference, value.clone())?;
                Ok(value)
            }
        }
    }

    /// §8.4.5 NamedEvaluation for anonymous function definitions; any other
    /// expression is evaluated normally.
    pub(crate) fn eval_named(&mut self, arena: &PatternArena, expr: &Expression, name: &str) -> Completion {
        let value = self.eval_expr(arena, expr)?;
        if expr.is_anonymous_function_definition() {
            self.set_function_name(&value, name);
        }
        Ok(value)
    }

    /// §13.2.5.4 Evaluation of an ObjectLiteral PropertyName.
    pub(crate) fn eval_property_name(
        &mut self,
        arena: &PatternArena,
        name: &PropertyName,
    ) -> Completion<PropertyKey> {
        Ok(match name {
            PropertyName::Identifier(s) | PropertyName::String(s) => PropertyKey::from(s.as_str()),
            PropertyName::Number(n) => PropertyKey::from(number_ops::to_string(*n).as_str()),
            PropertyName::Computed(id) => self.evaluate_property_name(arena, *id)?,
        })
    }

    /// §13.2.4.1 ArrayAccumulation over an ArrayLiteral.
    fn eval_array_literal(&mut self, arena: &PatternArena, elements: &[ArrayElement]) -> Completion {
        let array = self.create_array(Vec::new());
        let mut next_index = 0usize;
        for element in elements {
            match element {
                ArrayElement::Hole => {
                    next_index += 1;
                    self.set_array_length(&array, next_index)?;
                }
                ArrayElement::Expression(expr) => {
                    let value = self.eval_expr(arena, expr)?;
                    let key = PropertyKey::from(number_ops::to_uint32(next_index as f64));
                    self.create_data_property(&array, key, value)?;
                    next_index += 1;
                }
                ArrayElement::Spread(id) => {
                    next_index = self.accumulate_array(arena, *id, &array, next_index)?;
                }
            }
        }
        Ok(array)
    }

    /// §13.3.8.1 ArgumentListEvaluation
    pub(crate) fn eval_arguments(
        &mut self,
        arena: &PatternArena,
        arguments: &[Argument],
    ) -> Completion<Vec<JsValue>> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            match argument {
                Argument::Expression(expr) => values.push(self.eval_expr(arena, expr)?),
                Argument::Spread(id) => values.extend(self.evaluate_spread(arena, *id)?),
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunctionLiteral, ObjectProperty};

    #[test]
    fn identifiers_read_the_running_environment() {
        let mut interp = Interpreter::new();
        let env = interp.running_env();
        env.borrow_mut().define("n", BindingKind::Var, JsValue::Number(3.0));
        let arena = PatternArena::new();
        assert_eq!(
            interp.eval_expr(&arena, &Expression::identifier("n")).unwrap(),
            JsValue::Number(3.0)
        );
        let err = interp.eval_expr(&arena, &Expression::identifier("missing")).unwrap_err();
        let thrown = err.thrown().unwrap().clone();
        assert_eq!(interp.error_name(&thrown).as_deref(), Some("ReferenceError"));
    }

    #[test]
    fn array_literal_holes_extend_length() {
        let mut interp = Interpreter::new();
        let arena = PatternArena::new();
        let expr = Expression::Array(vec![
            ArrayElement::Expression(Expression::number(1.0)),
            ArrayElement::Hole,
        ]);
        let array = interp.eval_expr(&arena, &expr).unwrap();
        assert_eq!(interp.get_property(&array, "length").unwrap(), JsValue::Number(2.0));
        assert_eq!(interp.get_property(&array, "1").unwrap(), JsValue::Undefined);
    }

    #[test]
    fn object_literal_names_anonymous_functions() {
        let mut interp = Interpreter::new();
        let arena = PatternArena::new();
        let expr = Expression::Object(vec![ObjectProperty {
            key: PropertyName::Identifier("greet".into()),
            value: Expression::Function(FunctionLiteral::new(None, 0, |_i, _t, _a| {
                Ok(JsValue::Undefined)
            })),
        }]);
        let obj = interp.eval_expr(&arena, &expr).unwrap();
        let func = interp.get_property(&obj, "greet").unwrap();
        assert_eq!(interp.get_property(&func, "name").unwrap(), JsValue::from("greet"));
    }

    #[test]
    fn assignment_writes_through_put_value() {
        let mut interp = Interpreter::new();
        let arena = PatternArena::new();
        let expr = Expression::assign("hits", Expression::number(1.0));
        assert_eq!(interp.eval_expr(&arena, &expr).unwrap(), JsValue::Number(1.0));
        assert_eq!(interp.global_env().borrow().get("hits"), Some(JsValue::Number(1.0)));
    }

    #[test]
    fn calls_pass_evaluated_arguments() {
        let mut interp = Interpreter::new();
        let add = interp.create_native_function("add", 2, |_i, _t, args| {
            let sum = args
                .iter()
                .map(|a| if let JsValue::Number(n) = a { *n } else { 0.0 })
                .sum::<f64>();
            Ok(JsValue::Number(sum))
        });
        let env = interp.running_env();
        env.borrow_mut().define("add", BindingKind::Var, add);
        let arena = PatternArena::new();
        let expr = Expression::call(
            Expression::identifier("add"),
            vec![
                Argument::Expression(Expression::number(2.0)),
                Argument::Expression(Expression::number(5.0)),
            ],
        );
        assert_eq!(interp.eval_expr(&arena, &expr).unwrap(), JsValue::Number(7.0));
    }
}

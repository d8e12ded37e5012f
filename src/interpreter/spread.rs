//! SpreadElement and ComputedPropertyName evaluation.

use super::*;
use crate::ast::{NodeId, NodeKind, PatternArena};
use crate::types::number_ops;

impl Interpreter {
    /// §13.2.5.4 Evaluation of `[ AssignmentExpression ]`: evaluates the
    /// expression and coerces it with ToPropertyKey.
    #[tracing::instrument(level = "trace", skip_all, fields(node = %id))]
    pub fn evaluate_property_name(&mut self, arena: &PatternArena, id: NodeId) -> Completion<PropertyKey> {
        self.check_timeout()?;
        let result = match arena.kind(id) {
            NodeKind::ComputedPropertyName(expr) => self
                .eval_expr(arena, expr)
                .and_then(|value| self.to_property_key(&value)),
            other => Err(self.throw_type_error(format!("{} is not a property name", other.name()))),
        };
        result.map_err(|e| e.at_node(arena, id))
    }

    /// §13.3.8.1 ArgumentListEvaluation of `... AssignmentExpression`: every
    /// value the operand's iterator produces, in order.
    #[tracing::instrument(level = "trace", skip_all, fields(node = %id))]
    pub fn evaluate_spread(&mut self, arena: &PatternArena, id: NodeId) -> Completion<Vec<JsValue>> {
        self.check_timeout()?;
        let mut values = Vec::new();
        self.spread_each(arena, id, |_, value| {
            values.push(value);
            Ok(())
        })
        .map_err(|e| e.at_node(arena, id))?;
        Ok(values)
    }

    /// §13.2.4.1 ArrayAccumulation of a SpreadElement: writes each produced
    /// value to `array` starting at `next_index` and returns the index one past
    /// the last slot written.
    #[tracing::instrument(level = "trace", skip_all, fields(node = %id, next_index = next_index))]
    pub fn accumulate_array(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        array: &JsValue,
        next_index: usize,
    ) -> Completion<usize> {
        self.check_timeout()?;
        let mut index = next_index;
        self.spread_each(arena, id, |interp, value| {
            let key = PropertyKey::from(number_ops::to_uint32(index as f64));
            interp.create_data_property(array, key, value)?;
            index += 1;
            Ok(())
        })
        .map_err(|e| e.at_node(arena, id))?;
        Ok(index)
    }

    /// Evaluates the spread operand and feeds each iterated value to `sink`.
    /// The iterator is not closed when `sink` or a step fails.
    fn spread_each(
        &mut self,
        arena: &PatternArena,
        id: NodeId,
        mut sink: impl FnMut(&mut Self, JsValue) -> Completion<()>,
    ) -> Completion<()> {
        let NodeKind::SpreadElement(expr) = arena.kind(id) else {
            return Err(self.throw_type_error(format!(
                "{} is not a spread element",
                arena.kind(id).name()
            )));
        };
        let spread_obj = self.eval_expr(arena, expr)?;
        let mut record = self.get_iterator(&spread_obj)?;
        while let Some(value) = self.iterator_step_value(&mut record)? {
            sink(self, value)?;
        }
        Ok(())
    }
}

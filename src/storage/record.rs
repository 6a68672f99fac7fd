//! Positional Record Updates
//!
//! Increment, Unshift, Shift and Swap all edit fields of a stored record. They
//! share one shape: copy the record's field handles into a working copy,
//! apply every op to the working copy, and only if all ops succeed build a new
//! record from it and retire what was replaced. An invalid op anywhere in the
//! batch leaves the stored record untouched.
//!
//! Positions are 1-based. Results are collected by prepending, so they come
//! back in reverse op order.

use crate::error::{Result, TableError};
use crate::storage::arena::{Arena, Number, Term};
use crate::value::Value;

/// A working copy of one stored record.
pub(crate) struct RecordUpdate<'a> {
    arena: &'a mut Arena,
    fields: Vec<Term>,
    retired: Vec<Term>,
}

impl<'a> RecordUpdate<'a> {
    pub(crate) fn new(arena: &'a mut Arena, fields: Vec<Term>) -> Self {
        Self {
            arena,
            fields,
            retired: Vec::new(),
        }
    }

    /// Consumes the update, returning the new field list and the retired terms.
    pub(crate) fn finish(self) -> (Vec<Term>, Vec<Term>) {
        (self.fields, self.retired)
    }

    fn slot(&self, position: usize) -> Result<usize> {
        if position == 0 || position > self.fields.len() {
            return Err(TableError::invalid(format!(
                "position {} out of range for record of arity {}",
                position,
                self.fields.len()
            )));
        }
        Ok(position - 1)
    }

    fn list_slot(&self, position: usize) -> Result<usize> {
        let slot = self.slot(position)?;
        if !self.arena.is_list(self.fields[slot]) {
            return Err(TableError::invalid(format!(
                "field {} is not a list",
                position
            )));
        }
        Ok(slot)
    }

    /// Adds `delta` to each numeric field named by `ops`.
    pub(crate) fn increment(&mut self, ops: &[(usize, i64)]) -> Result<Vec<Value>> {
        let mut results = Vec::with_capacity(ops.len());
        for &(position, delta) in ops {
            let slot = self.slot(position)?;
            let old = self.fields[slot];
            let new = match self.arena.number(old) {
                Some(Number::Int(n)) => {
                    let sum = n.checked_add(delta).ok_or_else(|| {
                        TableError::invalid(format!("increment of field {} overflows", position))
                    })?;
                    self.arena.int(sum)
                }
                Some(Number::Float(n)) => self.arena.float(n + delta as f64),
                None => {
                    return Err(TableError::invalid(format!(
                        "field {} is not a number",
                        position
                    )))
                }
            };
            self.retired.push(old);
            self.fields[slot] = new;
            results.push(self.arena.copy_out(new));
        }
        results.reverse();
        Ok(results)
    }

    /// Pushes values one at a time onto the front of list fields.
    ///
    /// Pushing `[a, b, c]` onto `[]` leaves `[c, b, a]`. Returns each field's
    /// new length.
    pub(crate) fn unshift(&mut self, ops: &[(usize, Vec<Value>)]) -> Result<Vec<usize>> {
        let mut results = Vec::with_capacity(ops.len());
        for (position, values) in ops {
            let slot = self.list_slot(*position)?;
            let mut list = self.fields[slot];
            for value in values {
                let head = self.arena.copy_in(value);
                list = self.arena.cons(head, list);
            }
            self.fields[slot] = list;
            results.push(self.arena.list_len(list));
        }
        results.reverse();
        Ok(results)
    }

    /// Pops elements off the front of list fields.
    ///
    /// `count > 0` pops up to `count` elements, `count == 0` pops nothing, and
    /// any negative `count` pops the whole list. Popped elements are collected
    /// by prepending, so the most recently popped comes first.
    pub(crate) fn shift(&mut self, ops: &[(usize, i64)]) -> Result<Vec<Vec<Value>>> {
        let mut results = Vec::with_capacity(ops.len());
        for &(position, count) in ops {
            let slot = self.list_slot(position)?;
            let limit = if count < 0 {
                usize::MAX
            } else {
                usize::try_from(count).unwrap_or(usize::MAX)
            };

            let mut list = self.fields[slot];
            let mut shifted = Vec::new();
            while shifted.len() < limit {
                let Some((head, tail)) = self.arena.uncons(list) else {
                    break;
                };
                shifted.push(self.arena.copy_out(head));
                self.retired.push(head);
                list = tail;
            }
            shifted.reverse();

            self.fields[slot] = list;
            results.push(shifted);
        }
        results.reverse();
        Ok(results)
    }

    /// Replaces fields, returning what each position held before.
    pub(crate) fn swap(&mut self, ops: &[(usize, Value)]) -> Result<Vec<Value>> {
        let mut results = Vec::with_capacity(ops.len());
        for (position, value) in ops {
            let slot = self.slot(*position)?;
            let old = self.fields[slot];
            results.push(self.arena.copy_out(old));
            self.retired.push(old);
            self.fields[slot] = self.arena.copy_in(value);
        }
        results.reverse();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_record<R>(
        record: Value,
        apply: impl FnOnce(&mut RecordUpdate<'_>) -> Result<R>,
    ) -> (Result<R>, Value, usize) {
        let mut arena = Arena::new(0);
        let term = arena.copy_in(&record);
        let fields = arena.tuple_fields(term).unwrap().to_vec();
        let mut update = RecordUpdate::new(&mut arena, fields);
        let result = apply(&mut update);
        let (fields, retired) = update.finish();
        let committed = arena.tuple(fields);
        (result, arena.copy_out(committed), retired.len())
    }

    #[test]
    fn test_increment_results_in_reverse_op_order() {
        let record = Value::tuple(vec![Value::atom("k"), Value::int(5), Value::int(10)]);
        let (result, after, retired) = with_record(record, |r| r.increment(&[(2, 1), (3, 2)]));

        assert_eq!(result.unwrap(), vec![Value::int(12), Value::int(6)]);
        assert_eq!(
            after,
            Value::tuple(vec![Value::atom("k"), Value::int(6), Value::int(12)])
        );
        assert_eq!(retired, 2);
    }

    #[test]
    fn test_increment_same_field_twice() {
        let record = Value::tuple(vec![Value::int(0)]);
        let (result, after, _) = with_record(record, |r| r.increment(&[(1, 3), (1, 4)]));
        assert_eq!(result.unwrap(), vec![Value::int(7), Value::int(3)]);
        assert_eq!(after, Value::tuple(vec![Value::int(7)]));
    }

    #[test]
    fn test_increment_float_field() {
        let record = Value::tuple(vec![Value::float(0.5)]);
        let (result, _, _) = with_record(record, |r| r.increment(&[(1, 2)]));
        assert_eq!(result.unwrap(), vec![Value::float(2.5)]);
    }

    #[test]
    fn test_increment_rejects_bad_ops() {
        let record = Value::tuple(vec![Value::atom("k"), Value::int(5)]);
        let (result, _, _) = with_record(record.clone(), |r| r.increment(&[(0, 1)]));
        assert!(matches!(result, Err(TableError::InvalidArgument(_))));

        let (result, _, _) = with_record(record.clone(), |r| r.increment(&[(3, 1)]));
        assert!(matches!(result, Err(TableError::InvalidArgument(_))));

        let (result, _, _) = with_record(record, |r| r.increment(&[(1, 1)]));
        assert!(matches!(result, Err(TableError::InvalidArgument(_))));

        let record = Value::tuple(vec![Value::int(i64::MAX)]);
        let (result, _, _) = with_record(record, |r| r.increment(&[(1, 1)]));
        assert!(matches!(result, Err(TableError::InvalidArgument(_))));
    }

    #[test]
    fn test_unshift_reverses_input() {
        let record = Value::tuple(vec![Value::atom("q"), Value::list(vec![])]);
        let (result, after, _) = with_record(record, |r| {
            r.unshift(&[(
                2,
                vec![Value::atom("a"), Value::atom("b"), Value::atom("c")],
            )])
        });

        assert_eq!(result.unwrap(), vec![3]);
        assert_eq!(
            after.field(2),
            Some(&Value::list(vec![
                Value::atom("c"),
                Value::atom("b"),
                Value::atom("a"),
            ]))
        );
    }

    #[test]
    fn test_unshift_lengths_in_reverse_op_order() {
        let record = Value::tuple(vec![Value::list(vec![Value::int(0)]), Value::list(vec![])]);
        let (result, _, _) = with_record(record, |r| {
            r.unshift(&[(1, vec![Value::int(1)]), (2, vec![Value::int(2); 4])])
        });
        assert_eq!(result.unwrap(), vec![4, 2]);
    }

    #[test]
    fn test_unshift_rejects_non_list_field() {
        let record = Value::tuple(vec![Value::int(1)]);
        let (result, _, _) = with_record(record, |r| r.unshift(&[(1, vec![Value::int(2)])]));
        assert!(matches!(result, Err(TableError::InvalidArgument(_))));
    }

    #[test]
    fn test_shift_pops_from_front() {
        let list = Value::list(vec![Value::atom("c"), Value::atom("b"), Value::atom("a")]);
        let record = Value::tuple(vec![list]);
        let (result, after, retired) = with_record(record, |r| r.shift(&[(1, 2)]));

        assert_eq!(
            result.unwrap(),
            vec![vec![Value::atom("b"), Value::atom("c")]]
        );
        assert_eq!(after, Value::tuple(vec![Value::list(vec![Value::atom("a")])]));
        assert_eq!(retired, 2);
    }

    #[test]
    fn test_shift_count_larger_than_list() {
        let record = Value::tuple(vec![Value::list(vec![Value::int(1)])]);
        let (result, after, _) = with_record(record, |r| r.shift(&[(1, 10)]));
        assert_eq!(result.unwrap(), vec![vec![Value::int(1)]]);
        assert_eq!(after, Value::tuple(vec![Value::list(vec![])]));
    }

    #[test]
    fn test_shift_zero_count_is_noop() {
        let record = Value::tuple(vec![Value::list(vec![Value::int(1)])]);
        let (result, after, _) = with_record(record.clone(), |r| r.shift(&[(1, 0)]));
        assert_eq!(result.unwrap(), vec![Vec::<Value>::new()]);
        assert_eq!(after, record);
    }

    // A negative count drains the whole list no matter its magnitude; it does
    // not pop from the other end.
    #[test]
    fn test_shift_negative_count_drains_entire_list() {
        let items = vec![Value::int(1), Value::int(2), Value::int(3), Value::int(4)];
        let record = Value::tuple(vec![Value::list(items)]);
        let (result, after, _) = with_record(record, |r| r.shift(&[(1, -1)]));

        assert_eq!(
            result.unwrap(),
            vec![vec![Value::int(4), Value::int(3), Value::int(2), Value::int(1)]]
        );
        assert_eq!(after, Value::tuple(vec![Value::list(vec![])]));
    }

    #[test]
    fn test_swap_returns_previous_values() {
        let record = Value::tuple(vec![Value::int(1), Value::atom("old")]);
        let (result, after, retired) = with_record(record, |r| {
            r.swap(&[(2, Value::atom("new")), (1, Value::int(9))])
        });

        assert_eq!(result.unwrap(), vec![Value::int(1), Value::atom("old")]);
        assert_eq!(after, Value::tuple(vec![Value::int(9), Value::atom("new")]));
        assert_eq!(retired, 2);
    }
}

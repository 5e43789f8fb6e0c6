use crate::{InterpreterError, StackFault, Value};

/// The evaluation stack.
///
/// Backed by one buffer sized at load time from the method's declared max
/// depth; `depth` is the cursor. Push, pop and peek never allocate, and every
/// access is bounds-checked.
#[derive(Debug, Clone)]
pub struct EvalStack {
    slots: Box<[Value]>,
    depth: usize,
}

impl EvalStack {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Value::ZERO; capacity].into_boxed_slice(),
            depth: 0,
        }
    }

    /// Returns the active portion of the stack, bottom first.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.slots[..self.depth]
    }

    /// Returns the current stack depth
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Pushes a value onto the stack
    #[inline]
    pub fn push(&mut self, value: Value) -> Result<(), InterpreterError> {
        let Some(slot) = self.slots.get_mut(self.depth) else {
            return Err(InterpreterError::StackImbalance(StackFault::Overflow {
                capacity: self.slots.len(),
            }));
        };
        *slot = value;
        self.depth += 1;
        Ok(())
    }

    /// Pops a value from the stack
    #[inline]
    pub fn pop(&mut self) -> Result<Value, InterpreterError> {
        if self.depth == 0 {
            return Err(InterpreterError::underflow(1, 0));
        }
        self.depth -= 1;
        Ok(self.slots[self.depth])
    }

    /// Pops the top two values as `(second, top)`, the order a binary
    /// operator consumes them in.
    #[inline]
    pub fn pop2(&mut self) -> Result<(Value, Value), InterpreterError> {
        if self.depth < 2 {
            return Err(InterpreterError::underflow(2, self.depth));
        }
        self.depth -= 2;
        Ok((self.slots[self.depth], self.slots[self.depth + 1]))
    }

    /// The top value, without removing it.
    #[inline]
    pub fn peek(&self) -> Result<Value, InterpreterError> {
        self.peek_nth(0)
    }

    /// Gets the nth value from the top of the stack (0-indexed)
    pub fn peek_nth(&self, n: usize) -> Result<Value, InterpreterError> {
        if n >= self.depth {
            return Err(InterpreterError::underflow(n + 1, self.depth));
        }
        Ok(self.slots[self.depth - 1 - n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifo_order() {
        let mut stack = EvalStack::new(3);
        stack.push(Value::Int32(1)).unwrap();
        stack.push(Value::Int32(2)).unwrap();
        assert_eq!(stack.peek(), Ok(Value::Int32(2)));
        assert_eq!(stack.peek_nth(1), Ok(Value::Int32(1)));
        assert_eq!(stack.as_slice(), &[Value::Int32(1), Value::Int32(2)]);
        assert_eq!(stack.pop(), Ok(Value::Int32(2)));
        assert_eq!(stack.pop(), Ok(Value::Int32(1)));
        assert!(stack.is_empty());
    }

    #[test]
    fn push_on_full_fails() {
        let mut stack = EvalStack::new(1);
        stack.push(Value::Int32(1)).unwrap();
        assert_eq!(
            stack.push(Value::Int32(2)),
            Err(InterpreterError::StackImbalance(StackFault::Overflow { capacity: 1 }))
        );
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn pop_and_peek_on_empty_fail() {
        let mut stack = EvalStack::new(4);
        assert!(matches!(stack.pop(), Err(InterpreterError::StackImbalance(_))));
        assert!(matches!(stack.peek(), Err(InterpreterError::StackImbalance(_))));
    }

    #[test]
    fn zero_capacity_stack() {
        let mut stack = EvalStack::new(0);
        assert_eq!(stack.capacity(), 0);
        assert!(stack.push(Value::Int32(0)).is_err());
    }

    #[test]
    fn pop2_keeps_operand_order() {
        let mut stack = EvalStack::new(2);
        stack.push(Value::Int32(10)).unwrap();
        stack.push(Value::Int32(3)).unwrap();
        assert_eq!(stack.pop2(), Ok((Value::Int32(10), Value::Int32(3))));
        assert_eq!(stack.pop2(), Err(InterpreterError::underflow(2, 0)));
    }
}

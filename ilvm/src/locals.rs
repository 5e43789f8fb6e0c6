use crate::{InterpreterError, Value};

/// The local variable bank of one method activation.
///
/// Sized from the method's declared local count; every slot starts as
/// `Int32(0)` and the bank is never resized.
#[derive(Debug, Clone)]
pub struct LocalBank {
    slots: Box<[Value]>,
}

impl LocalBank {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![Value::ZERO; len].into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.slots
    }

    #[inline]
    pub fn get(&self, index: usize) -> Result<Value, InterpreterError> {
        self.slots.get(index).copied().ok_or(InterpreterError::IndexOutOfRange {
            index,
            len: self.slots.len(),
        })
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), InterpreterError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(InterpreterError::IndexOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// `ldloca.s`: the local's index as an `Address` value.
    pub fn address_of(&self, index: usize) -> Result<Value, InterpreterError> {
        if index >= self.slots.len() {
            return Err(InterpreterError::IndexOutOfRange {
                index,
                len: self.slots.len(),
            });
        }
        Ok(Value::Address(index))
    }
}

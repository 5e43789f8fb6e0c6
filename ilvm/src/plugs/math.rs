use crate::{InterpreterError, PlugContext, Value};

pub fn sqrt(ctx: &mut PlugContext<'_>) -> Result<(), InterpreterError> {
    let x = ctx.pop_float()?;
    ctx.push(Value::Float(x.sqrt()))
}

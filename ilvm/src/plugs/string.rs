use crate::{InterpreterError, PlugContext};

/// `String.Length` counts UTF-16 code units.
pub fn length(ctx: &mut PlugContext<'_>) -> Result<(), InterpreterError> {
    let text = ctx.pop_string()?;
    let len = text.encode_utf16().count();
    let len =
        i32::try_from(len).map_err(|_| InterpreterError::plug("string length overflows int32"))?;
    ctx.push(len)
}

pub fn concat(ctx: &mut PlugContext<'_>) -> Result<(), InterpreterError> {
    let second = ctx.pop_string()?;
    let first = ctx.pop_string()?;
    let joined = format!("{first}{second}");
    ctx.push_string(&joined)
}

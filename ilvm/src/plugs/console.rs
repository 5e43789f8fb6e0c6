use std::io::{self, Write};

use crate::{InterpreterError, PlugContext};

fn io_error(err: io::Error) -> InterpreterError {
    InterpreterError::plug(format!("console write failed: {err}"))
}

pub fn write_line_string(ctx: &mut PlugContext<'_>) -> Result<(), InterpreterError> {
    let text = ctx.pop_string()?;
    writeln!(ctx.console, "{text}").map_err(io_error)
}

pub fn write_line_int32(ctx: &mut PlugContext<'_>) -> Result<(), InterpreterError> {
    let value = ctx.pop_int32()?;
    writeln!(ctx.console, "{value}").map_err(io_error)
}

pub fn write_line(ctx: &mut PlugContext<'_>) -> Result<(), InterpreterError> {
    writeln!(ctx.console).map_err(io_error)
}

pub fn write_string(ctx: &mut PlugContext<'_>) -> Result<(), InterpreterError> {
    let text = ctx.pop_string()?;
    write!(ctx.console, "{text}").map_err(io_error)
}

pub fn write_int32(ctx: &mut PlugContext<'_>) -> Result<(), InterpreterError> {
    let value = ctx.pop_int32()?;
    write!(ctx.console, "{value}").map_err(io_error)
}

//! Console API
//!
//! console.log/info/warn/error/debug routed to tracing, tagged with the
//! component the script belongs to.

use std::fmt::Write;
use std::rc::Rc;

use rquickjs::function::Rest;
use rquickjs::{Ctx, Function, Object, Value};

/// Install console API into the global object
pub fn install_console(ctx: &Ctx, component: &str) -> Result<(), rquickjs::Error> {
    let component: Rc<str> = Rc::from(component);
    let console = Object::new(ctx.clone())?;

    for level in ["log", "info", "warn", "error", "debug"] {
        console.set(level, level_fn(ctx, level, component.clone())?)?;
    }

    ctx.globals().set("console", console)?;
    Ok(())
}

fn level_fn<'js>(ctx: &Ctx<'js>, level: &'static str, component: Rc<str>) -> Result<Function<'js>, rquickjs::Error> {
    Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
        log_with_level(level, &component, &ctx, &args.0);
    })
}

/// Log values with a specific level
fn log_with_level<'js>(level: &str, component: &str, ctx: &Ctx<'js>, values: &[Value<'js>]) {
    let mut output = String::new();

    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        format_value(&mut output, ctx, value);
    }

    match level {
        "error" => tracing::error!(component, "[JS] {}", output),
        "warn" => tracing::warn!(component, "[JS] {}", output),
        "debug" => tracing::debug!(component, "[JS] {}", output),
        _ => tracing::info!(component, "[JS] {}", output),
    }
}

/// Format a JavaScript value for logging
fn format_value<'js>(out: &mut String, ctx: &Ctx<'js>, value: &Value<'js>) {
    if value.is_undefined() {
        out.push_str("undefined");
    } else if value.is_null() {
        out.push_str("null");
    } else if let Some(b) = value.as_bool() {
        write!(out, "{}", b).ok();
    } else if let Some(n) = value.as_int() {
        write!(out, "{}", n).ok();
    } else if let Some(n) = value.as_float() {
        write!(out, "{}", n).ok();
    } else if let Some(s) = value.as_string() {
        if let Ok(s) = s.to_string() {
            out.push_str(&s);
        }
    } else if value.is_function() {
        out.push_str("[Function]");
    } else if value.is_object() {
        match ctx.json_stringify(value.clone()).ok().flatten().and_then(|s| s.to_string().ok()) {
            Some(json) => out.push_str(&json),
            None if value.is_array() => out.push_str("[Array]"),
            None => out.push_str("[Object]"),
        }
    } else {
        out.push_str("[unknown]");
    }
}

use crate::cont::{Continuation, Step};
use crate::env::Env;
use crate::symbol::SymbolTable;
use crate::value::Value;

/// Render a value to a string. `quote` selects the write-style rendering
/// (strings quoted); `display` passes false for raw text.
pub fn stringify(val: &Value, quote: bool, symbols: &SymbolTable, globals: &Env) -> String {
    let mut out = String::new();
    write_value(&mut out, val, quote, symbols, globals, 0);
    out
}

fn write_value(
    out: &mut String,
    val: &Value,
    quote: bool,
    symbols: &SymbolTable,
    globals: &Env,
    depth: usize,
) {
    if depth > 1000 {
        out.push_str("...");
        return;
    }

    match val {
        Value::Nil => out.push_str("()"),
        Value::Bool(true) => out.push_str("#t"),
        Value::Bool(false) => out.push_str("#f"),
        Value::Num(n) => out.push_str(&n.to_string()),
        Value::Str(s) => {
            if quote {
                out.push('"');
                out.push_str(s);
                out.push('"');
            } else {
                out.push_str(s);
            }
        }
        Value::Sym(id) => out.push_str(symbols.name(*id)),
        Value::Pair(p) => {
            out.push('(');
            write_value(out, &p.car, quote, symbols, globals, depth + 1);
            let mut cur = p.cdr.clone();
            loop {
                match cur {
                    Value::Nil => break,
                    Value::Pair(q) => {
                        out.push(' ');
                        write_value(out, &q.car, quote, symbols, globals, depth + 1);
                        cur = q.cdr.clone();
                    }
                    other => {
                        out.push_str(" . ");
                        write_value(out, &other, quote, symbols, globals, depth + 1);
                        break;
                    }
                }
            }
            out.push(')');
        }
        Value::Closure(c) => {
            out.push_str("#<");
            write_value(out, &c.params, quote, symbols, globals, depth + 1);
            out.push(':');
            write_value(out, &c.body, quote, symbols, globals, depth + 1);
            out.push(':');
            out.push_str(&env_to_string(&c.env, symbols, globals));
            out.push('>');
        }
        Value::Intrinsic(p) => {
            out.push_str(&format!("#<{}:{}>", symbols.name(p.name), p.arity));
        }
        Value::Cont(_) => out.push_str("#<continuation>"),
        Value::Void => out.push_str("#<VOID>"),
        Value::Eof => out.push_str("#<EOF>"),
    }
}

/// Render an environment as its bound names, `|` for frame markers, ending
/// with the `GlobalEnv` sentinel once the global chain head is reached.
pub fn env_to_string(env: &Env, symbols: &SymbolTable, globals: &Env) -> String {
    let mut parts = Vec::new();
    for node in env.nodes() {
        if std::rc::Rc::ptr_eq(&node, globals.head_node()) {
            parts.push("GlobalEnv".to_string());
            break;
        }
        match node.symbol() {
            Some(id) => parts.push(symbols.name(id).to_string()),
            None => parts.push("|".to_string()),
        }
    }
    parts.join(" ")
}

/// Dump the pending steps of a continuation, top of stack first. Shown with
/// evaluation errors that are not raised by user code.
pub fn stack_trace(k: &Continuation, symbols: &SymbolTable, globals: &Env) -> String {
    let mut out = String::from("-- continuation --");
    for step in k.steps_top_down() {
        out.push_str("\n  at ");
        out.push_str(step.name());
        out.push_str(": ");
        match step {
            Step::Then(v)
            | Step::Begin(v)
            | Step::Apply(v)
            | Step::ApplyFun(v)
            | Step::EvalArg(v)
            | Step::ConsArgs(v) => {
                out.push_str(&stringify(v, true, symbols, globals));
            }
            Step::Define(id) => out.push_str(symbols.name(*id)),
            Step::SetQ(node) => match node.symbol() {
                Some(id) => out.push_str(symbols.name(id)),
                None => out.push('|'),
            },
            Step::RestoreEnv(env) => out.push_str(&env_to_string(env, symbols, globals)),
        }
    }
    out
}

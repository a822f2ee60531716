use std::fmt;
use std::rc::Rc;

use crate::cont::Continuation;
use crate::env::Env;
use crate::error::{ScmError, ScmResult};
use crate::eval::Interp;
use crate::number::Num;
use crate::symbol::SymbolId;

/// Native implementation of a built-in procedure.
pub type IntrinsicFn = fn(&mut Interp, &[Value]) -> ScmResult<Value>;

/// The fundamental runtime value. Heap shapes are shared through Rc; the
/// host's reference counting is the only memory management.
#[derive(Clone)]
pub enum Value {
    /// The empty list.
    Nil,
    /// Only `#f` is falsy in `if`.
    Bool(bool),
    Num(Num),
    Str(Rc<str>),
    Sym(SymbolId),
    Pair(Rc<Pair>),
    Closure(Rc<Closure>),
    Intrinsic(Rc<Intrinsic>),
    /// A snapshot of the evaluator's step stack, first-class via `call/cc`.
    Cont(Rc<Continuation>),
    /// Result of statements without a meaningful value.
    Void,
    /// Returned by `read` at stream end.
    Eof,
}

pub struct Pair {
    pub car: Value,
    pub cdr: Value,
}

pub struct Closure {
    /// Proper list of parameter symbols.
    pub params: Value,
    /// List of body expressions.
    pub body: Value,
    /// The defining environment.
    pub env: Env,
}

pub struct Intrinsic {
    pub name: SymbolId,
    /// Fixed argument count, or -1 for variadic.
    pub arity: i32,
    pub func: IntrinsicFn,
}

impl Value {
    pub fn cons(car: Value, cdr: Value) -> Value {
        Value::Pair(Rc::new(Pair { car, cdr }))
    }

    /// Build a proper list from a slice.
    pub fn list(items: &[Value]) -> Value {
        let mut out = Value::Nil;
        for item in items.iter().rev() {
            out = Value::cons(item.clone(), out);
        }
        out
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Value::Pair(_))
    }

    /// The one and only falsy value.
    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    pub fn car(&self) -> ScmResult<Value> {
        match self {
            Value::Pair(p) => Ok(p.car.clone()),
            _ => Err(ScmError::Type("car of a non-pair".into())),
        }
    }

    pub fn cdr(&self) -> ScmResult<Value> {
        match self {
            Value::Pair(p) => Ok(p.cdr.clone()),
            _ => Err(ScmError::Type("cdr of a non-pair".into())),
        }
    }

    /// Collect a proper list into a Vec; errors on an improper tail.
    pub fn list_to_vec(&self) -> ScmResult<Vec<Value>> {
        let mut out = Vec::new();
        let mut cur = self.clone();
        loop {
            match cur {
                Value::Nil => return Ok(out),
                Value::Pair(p) => {
                    out.push(p.car.clone());
                    cur = p.cdr.clone();
                }
                _ => return Err(ScmError::ImproperList("expected a proper list".into())),
            }
        }
    }

    /// Reverse a proper list.
    pub fn reversed(&self) -> ScmResult<Value> {
        let mut out = Value::Nil;
        let mut cur = self.clone();
        loop {
            match cur {
                Value::Nil => return Ok(out),
                Value::Pair(p) => {
                    out = Value::cons(p.car.clone(), out);
                    cur = p.cdr.clone();
                }
                _ => return Err(ScmError::ImproperList("expected a proper list".into())),
            }
        }
    }

    /// Identity comparison (`eq?`). Immediates are identical when equal;
    /// heap values compare by reference.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Sym(a), Value::Sym(b)) => a == b,
            (Value::Num(Num::Int(a)), Value::Num(Num::Int(b))) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Intrinsic(a), Value::Intrinsic(b)) => Rc::ptr_eq(a, b),
            (Value::Cont(a), Value::Cont(b)) => Rc::ptr_eq(a, b),
            (Value::Void, Value::Void) => true,
            (Value::Eof, Value::Eof) => true,
            _ => false,
        }
    }
}

/// Structural equality, used by tests and nothing in the language itself
/// (`eq?` is identity, `eqv?` adds numeric comparison).
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Sym(a), Value::Sym(b)) => a == b,
            (Value::Pair(a), Value::Pair(b)) => a.car == b.car && a.cdr == b.cdr,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Intrinsic(a), Value::Intrinsic(b)) => Rc::ptr_eq(a, b),
            (Value::Cont(a), Value::Cont(b)) => Rc::ptr_eq(a, b),
            (Value::Void, Value::Void) => true,
            (Value::Eof, Value::Eof) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Num(n) => write!(f, "Num({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Sym(id) => write!(f, "Sym({})", id.0),
            Value::Pair(p) => write!(f, "({:?} . {:?})", p.car, p.cdr),
            Value::Closure(_) => write!(f, "Closure"),
            Value::Intrinsic(p) => write!(f, "Intrinsic({})", p.name.0),
            Value::Cont(k) => write!(f, "Cont({})", k.len()),
            Value::Void => write!(f, "Void"),
            Value::Eof => write!(f, "Eof"),
        }
    }
}

use std::io::Write;
use std::rc::Rc;

use crate::error::{ScmError, ScmResult};
use crate::eval::Interp;
use crate::number::Num;
use crate::symbol::{sym, SymbolId};
use crate::value::{Intrinsic, IntrinsicFn, Value};

/// Install every built-in procedure into the global environment, plus the
/// literal `apply` and `call/cc` symbol bindings the evaluator unwraps at
/// application time.
pub fn install(interp: &mut Interp) -> ScmResult<()> {
    def(interp, sym::CAR, 1, prim_car)?;
    def(interp, sym::CDR, 1, prim_cdr)?;
    def(interp, sym::CONS, 2, prim_cons)?;
    def(interp, sym::EQ_P, 2, prim_eq)?;
    def(interp, sym::EQV_P, 2, prim_eqv)?;
    def(interp, sym::PAIR_P, 1, prim_pair_p)?;
    def(interp, sym::NULL_P, 1, prim_null_p)?;
    def(interp, sym::NOT, 1, prim_not)?;
    def(interp, sym::SYMBOL_P, 1, prim_symbol_p)?;
    def(interp, sym::EOF_OBJECT_P, 1, prim_eof_object_p)?;
    def(interp, sym::LIST, -1, prim_list)?;
    def(interp, sym::DISPLAY, 1, prim_display)?;
    def(interp, sym::NEWLINE, 0, prim_newline)?;
    def(interp, sym::READ, 0, prim_read)?;
    def(interp, sym::PLUS, 2, prim_add)?;
    def(interp, sym::MINUS, 2, prim_sub)?;
    def(interp, sym::TIMES, 2, prim_mul)?;
    def(interp, sym::LESS, 2, prim_less)?;
    def(interp, sym::NUM_EQ, 2, prim_num_eq)?;
    def(interp, sym::NUMBER_P, 1, prim_number_p)?;
    def(interp, sym::ERROR, 2, prim_error)?;
    def(interp, sym::GLOBALS, 0, prim_globals)?;

    interp
        .globals
        .define_here(sym::APPLY, Value::Sym(sym::APPLY))?;
    interp
        .globals
        .define_here(sym::CALLCC, Value::Sym(sym::CALLCC))?;
    Ok(())
}

fn def(interp: &mut Interp, name: SymbolId, arity: i32, func: IntrinsicFn) -> ScmResult<()> {
    let value = Value::Intrinsic(Rc::new(Intrinsic { name, arity, func }));
    interp.globals.define_here(name, value)
}

fn prim_car(interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    match &args[0] {
        Value::Pair(p) => Ok(p.car.clone()),
        other => Err(ScmError::Type(format!(
            "car: not a pair: {}",
            interp.stringify(other)
        ))),
    }
}

fn prim_cdr(interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    match &args[0] {
        Value::Pair(p) => Ok(p.cdr.clone()),
        other => Err(ScmError::Type(format!(
            "cdr: not a pair: {}",
            interp.stringify(other)
        ))),
    }
}

fn prim_cons(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Ok(Value::cons(args[0].clone(), args[1].clone()))
}

fn prim_eq(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Ok(Value::Bool(args[0].identical(&args[1])))
}

/// Identity, widened to numeric equality when both sides are numbers.
fn prim_eqv(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    let eqv = match (&args[0], &args[1]) {
        (Value::Num(a), Value::Num(b)) => a.compare(b) == std::cmp::Ordering::Equal,
        (a, b) => a.identical(b),
    };
    Ok(Value::Bool(eqv))
}

fn prim_pair_p(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Ok(Value::Bool(args[0].is_pair()))
}

fn prim_null_p(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Ok(Value::Bool(args[0].is_nil()))
}

fn prim_not(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Ok(Value::Bool(args[0].is_false()))
}

fn prim_symbol_p(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Sym(_))))
}

fn prim_eof_object_p(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Eof)))
}

fn prim_number_p(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Num(_))))
}

fn prim_list(_interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Ok(Value::list(args))
}

fn prim_display(interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    let text = interp.display_string(&args[0]);
    interp
        .output
        .write_all(text.as_bytes())
        .and_then(|_| interp.output.flush())
        .map_err(|e| ScmError::Io(e.to_string()))?;
    Ok(Value::Void)
}

fn prim_newline(interp: &mut Interp, _args: &[Value]) -> ScmResult<Value> {
    interp
        .output
        .write_all(b"\n")
        .and_then(|_| interp.output.flush())
        .map_err(|e| ScmError::Io(e.to_string()))?;
    Ok(Value::Void)
}

fn prim_read(interp: &mut Interp, _args: &[Value]) -> ScmResult<Value> {
    interp.read_from_stdin()
}

fn numeric(interp: &Interp, v: &Value, op: &str) -> ScmResult<Num> {
    match v {
        Value::Num(n) => Ok(n.clone()),
        other => Err(ScmError::Type(format!(
            "{}: not a number: {}",
            op,
            interp.stringify(other)
        ))),
    }
}

fn prim_add(interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    let a = numeric(interp, &args[0], "+")?;
    let b = numeric(interp, &args[1], "+")?;
    Ok(Value::Num(a.add(&b)))
}

fn prim_sub(interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    let a = numeric(interp, &args[0], "-")?;
    let b = numeric(interp, &args[1], "-")?;
    Ok(Value::Num(a.sub(&b)))
}

fn prim_mul(interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    let a = numeric(interp, &args[0], "*")?;
    let b = numeric(interp, &args[1], "*")?;
    Ok(Value::Num(a.mul(&b)))
}

fn prim_less(interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    let a = numeric(interp, &args[0], "<")?;
    let b = numeric(interp, &args[1], "<")?;
    Ok(Value::Bool(a.compare(&b) == std::cmp::Ordering::Less))
}

fn prim_num_eq(interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    let a = numeric(interp, &args[0], "=")?;
    let b = numeric(interp, &args[1], "=")?;
    Ok(Value::Bool(a.compare(&b) == std::cmp::Ordering::Equal))
}

fn prim_error(interp: &mut Interp, args: &[Value]) -> ScmResult<Value> {
    Err(ScmError::User(format!(
        "Error: {}: {}",
        interp.display_string(&args[0]),
        interp.stringify(&args[1])
    )))
}

/// Every symbol bound in the global environment, as a proper list.
fn prim_globals(interp: &mut Interp, _args: &[Value]) -> ScmResult<Value> {
    let names: Vec<Value> = interp
        .globals
        .nodes()
        .filter_map(|node| node.symbol().map(Value::Sym))
        .collect();
    Ok(Value::list(&names))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    use super::*;
    use crate::reader;

    /// Captures everything `display`/`newline` write.
    #[derive(Clone)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        fn new() -> SharedBuf {
            SharedBuf(Rc::new(RefCell::new(Vec::new())))
        }

        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn run(interp: &mut Interp, src: &str) -> ScmResult<Value> {
        let exprs = reader::read_all(src, &mut interp.symbols)?;
        let mut last = Value::Void;
        for exp in exprs {
            last = interp.eval_global(exp)?;
        }
        Ok(last)
    }

    fn run_to_string(src: &str) -> String {
        let mut interp = Interp::new().unwrap();
        let v = run(&mut interp, src).unwrap();
        interp.stringify(&v)
    }

    fn unwrap_traced(err: ScmError) -> ScmError {
        match err {
            ScmError::Traced { error, .. } => *error,
            other => other,
        }
    }

    #[test]
    fn pair_accessors() {
        assert_eq!(run_to_string("(car '(1 2))"), "1");
        assert_eq!(run_to_string("(cdr '(1 2))"), "(2)");
        assert_eq!(run_to_string("(cons 'a 'b)"), "(a . b)");
        assert_eq!(run_to_string("(cons 'a (cons 'b 'c))"), "(a b . c)");

        let mut interp = Interp::new().unwrap();
        let err = unwrap_traced(run(&mut interp, "(car 5)").unwrap_err());
        assert!(matches!(err, ScmError::Type(_)));
    }

    #[test]
    fn identity_and_equivalence() {
        assert_eq!(run_to_string("(eq? 'a 'a)"), "#t");
        assert_eq!(run_to_string("(eq? '(a) '(a))"), "#f");
        assert_eq!(run_to_string("(eq? '() '())"), "#t");
        assert_eq!(run_to_string("(eqv? 2 2)"), "#t");
        assert_eq!(run_to_string("(eqv? 2 2.0)"), "#t");
        assert_eq!(run_to_string("(eqv? 2 'two)"), "#f");
        assert_eq!(run_to_string("(eqv? 'a 'a)"), "#t");
    }

    #[test]
    fn predicates() {
        assert_eq!(run_to_string("(pair? '(1))"), "#t");
        assert_eq!(run_to_string("(pair? '())"), "#f");
        assert_eq!(run_to_string("(null? '())"), "#t");
        assert_eq!(run_to_string("(null? '(1))"), "#f");
        assert_eq!(run_to_string("(not #f)"), "#t");
        assert_eq!(run_to_string("(not '())"), "#f");
        assert_eq!(run_to_string("(symbol? 'a)"), "#t");
        assert_eq!(run_to_string("(symbol? \"a\")"), "#f");
        assert_eq!(run_to_string("(number? 1.5)"), "#t");
        assert_eq!(run_to_string("(number? 'a)"), "#f");
        assert_eq!(run_to_string("(eof-object? 'a)"), "#f");
    }

    #[test]
    fn list_is_variadic() {
        assert_eq!(run_to_string("(list)"), "()");
        assert_eq!(run_to_string("(list 1 2 3)"), "(1 2 3)");
        assert_eq!(run_to_string("(list 1 (list 2 3))"), "(1 (2 3))");
    }

    #[test]
    fn arithmetic_and_comparison() {
        assert_eq!(run_to_string("(+ 5 6)"), "11");
        assert_eq!(run_to_string("(- 5 6)"), "-1");
        assert_eq!(run_to_string("(* 5 6)"), "30");
        assert_eq!(run_to_string("(+ 1 2.5)"), "3.5");
        assert_eq!(run_to_string("(< 1 2)"), "#t");
        assert_eq!(run_to_string("(< 2 1)"), "#f");
        assert_eq!(run_to_string("(= 3 3)"), "#t");
        assert_eq!(run_to_string("(= 3 3.0)"), "#t");

        let mut interp = Interp::new().unwrap();
        let err = unwrap_traced(run(&mut interp, "(+ 1 'a)").unwrap_err());
        assert!(matches!(err, ScmError::Type(_)));
    }

    #[test]
    fn intrinsic_arity_is_enforced() {
        let mut interp = Interp::new().unwrap();
        let err = unwrap_traced(run(&mut interp, "(car '(1) '(2))").unwrap_err());
        assert!(matches!(err, ScmError::Arity(_)));
        let err = unwrap_traced(run(&mut interp, "(newline 1)").unwrap_err());
        assert!(matches!(err, ScmError::Arity(_)));
    }

    #[test]
    fn error_formats_reason_unquoted_and_arg_quoted() {
        let mut interp = Interp::new().unwrap();
        let err = run(&mut interp, "(error \"bad thing\" \"detail\")").unwrap_err();
        assert_eq!(err.to_string(), "Error: bad thing: \"detail\"");
    }

    #[test]
    fn globals_lists_every_bound_symbol() {
        let mut interp = Interp::new().unwrap();
        let v = run(&mut interp, "(define mine 1) (globals)").unwrap();
        let names: Vec<String> = v
            .list_to_vec()
            .unwrap()
            .into_iter()
            .map(|s| {
                let Value::Sym(id) = s else { panic!("non-symbol in globals") };
                interp.symbols.name(id).to_string()
            })
            .collect();
        for expected in ["car", "+", "apply", "call/cc", "mine"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[test]
    fn display_writes_raw_text_and_returns_void() {
        let buf = SharedBuf::new();
        let mut interp = Interp::with_output(Box::new(buf.clone())).unwrap();
        let v = run(&mut interp, "(display \"hi\") (display 'sym) (newline)").unwrap();
        assert!(v.is_void());
        assert_eq!(buf.contents(), "hisym\n");
    }

    #[test]
    fn display_side_effects_observe_argument_order() {
        let buf = SharedBuf::new();
        let mut interp = Interp::with_output(Box::new(buf.clone())).unwrap();
        let v = run(
            &mut interp,
            "((lambda (a b) (list a b))
              (begin (display 1) 1)
              (begin (display 2) 2))",
        )
        .unwrap();
        assert_eq!(String::from_utf8(buf.0.borrow().clone()).unwrap(), "12");
        assert_eq!(interp.stringify(&v), "(1 2)");
    }
}

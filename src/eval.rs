use std::io::Write;
use std::rc::Rc;

use crate::cont::{Continuation, Step};
use crate::env::Env;
use crate::error::{ScmError, ScmResult};
use crate::intrinsics;
use crate::printer;
use crate::reader::StdinSource;
use crate::symbol::{sym, SymbolTable};
use crate::value::{Closure, Value};

/// The evaluation machine. All interpreter state lives here: the symbol
/// table, the global environment, the stdin token source for `read`, and
/// the sink `display`/`newline` write to.
pub struct Interp {
    pub symbols: SymbolTable,
    pub globals: Env,
    pub(crate) stdin: StdinSource,
    pub(crate) output: Box<dyn Write>,
}

impl Interp {
    pub fn new() -> ScmResult<Interp> {
        Interp::with_output(Box::new(std::io::stdout()))
    }

    /// Build an interpreter whose program output goes to `output` instead of
    /// stdout.
    pub fn with_output(output: Box<dyn Write>) -> ScmResult<Interp> {
        let mut interp = Interp {
            symbols: SymbolTable::new(),
            globals: Env::new_global(),
            stdin: StdinSource::new(),
            output,
        };
        intrinsics::install(&mut interp)?;
        Ok(interp)
    }

    /// Write-style rendering of a value.
    pub fn stringify(&self, val: &Value) -> String {
        printer::stringify(val, true, &self.symbols, &self.globals)
    }

    /// Display-style rendering (strings raw).
    pub fn display_string(&self, val: &Value) -> String {
        printer::stringify(val, false, &self.symbols, &self.globals)
    }

    /// Evaluate one expression in the global environment.
    pub fn eval_global(&mut self, exp: Value) -> ScmResult<Value> {
        let env = self.globals.clone();
        self.evaluate(exp, &env)
    }

    /// Evaluate one expression in the given environment. Errors other than
    /// those raised by user code carry a dump of the pending continuation.
    pub fn evaluate(&mut self, exp: Value, env: &Env) -> ScmResult<Value> {
        let mut k = Continuation::new();
        match self.run(exp, env.clone(), &mut k) {
            Ok(v) => Ok(v),
            Err(e @ ScmError::User(_)) => Err(e),
            Err(e) => Err(ScmError::Traced {
                error: Box::new(e),
                trace: printer::stack_trace(&k, &self.symbols, &self.globals),
            }),
        }
    }

    pub(crate) fn read_from_stdin(&mut self) -> ScmResult<Value> {
        let Interp { stdin, symbols, .. } = self;
        stdin.read_value(symbols)
    }

    /// The trampoline: reduce `exp` until it is a value (phase 1), then
    /// drive the continuation stack (phase 2), with no host recursion for
    /// evaluation itself.
    fn run(&mut self, mut exp: Value, mut env: Env, k: &mut Continuation) -> ScmResult<Value> {
        'eval: loop {
            // Phase 1: reduce the current expression.
            loop {
                match exp {
                    Value::Pair(p) => {
                        let head = p.car.clone();
                        let rest = p.cdr.clone();
                        match head {
                            Value::Sym(id) if id == sym::QUOTE => {
                                exp = rest.car()?;
                                break;
                            }
                            Value::Sym(id) if id == sym::IF => {
                                k.push(Step::Then(rest.cdr()?));
                                exp = rest.car()?;
                            }
                            Value::Sym(id) if id == sym::BEGIN => {
                                let first = rest.car()?;
                                let more = rest.cdr()?;
                                if !more.is_nil() {
                                    k.push(Step::Begin(more));
                                }
                                exp = first;
                            }
                            Value::Sym(id) if id == sym::LAMBDA => {
                                exp = Value::Closure(Rc::new(Closure {
                                    params: rest.car()?,
                                    body: rest.cdr()?,
                                    env: env.clone(),
                                }));
                                break;
                            }
                            Value::Sym(id) if id == sym::DEFINE => {
                                let name = rest.car()?;
                                let Value::Sym(name_id) = &name else {
                                    return Err(ScmError::Type(format!(
                                        "define expects a symbol, got {}",
                                        self.stringify(&name)
                                    )));
                                };
                                k.push(Step::Define(*name_id));
                                exp = rest.cdr()?.car()?;
                            }
                            Value::Sym(id) if id == sym::SET_BANG => {
                                let name = rest.car()?;
                                let Value::Sym(name_id) = &name else {
                                    return Err(ScmError::Type(format!(
                                        "set! expects a symbol, got {}",
                                        self.stringify(&name)
                                    )));
                                };
                                let name_id = *name_id;
                                // Resolve now, before the value expression runs.
                                let node = env.lookup(name_id).ok_or_else(|| {
                                    ScmError::Unbound(self.symbols.name(name_id).to_string())
                                })?;
                                k.push(Step::SetQ(node));
                                exp = rest.cdr()?.car()?;
                            }
                            operator => {
                                k.push(Step::Apply(rest));
                                exp = operator;
                            }
                        }
                    }
                    Value::Sym(id) => {
                        let node = env.lookup(id).ok_or_else(|| {
                            ScmError::Unbound(self.symbols.name(id).to_string())
                        })?;
                        exp = node.value();
                        break;
                    }
                    other => {
                        exp = other;
                        break;
                    }
                }
            }

            // Phase 2: drive the pending steps until the stack is empty.
            loop {
                let Some(step) = k.pop() else {
                    return Ok(exp);
                };
                tracing::trace!(step = step.name(), depth = k.len(), "drive");
                match step {
                    Step::Then(clauses) => {
                        if exp.is_false() {
                            let else_clause = clauses.cdr()?;
                            if else_clause.is_nil() {
                                exp = Value::Void;
                            } else {
                                exp = else_clause.car()?;
                                continue 'eval;
                            }
                        } else {
                            exp = clauses.car()?;
                            continue 'eval;
                        }
                    }
                    Step::Begin(rest) => {
                        let first = rest.car()?;
                        let more = rest.cdr()?;
                        if !more.is_nil() {
                            k.push(Step::Begin(more));
                        }
                        exp = first;
                        continue 'eval;
                    }
                    Step::Define(name) => {
                        env.define_here(name, exp)?;
                        exp = Value::Void;
                    }
                    Step::SetQ(node) => {
                        node.set_value(exp);
                        exp = Value::Void;
                    }
                    Step::Apply(args) => {
                        let fun = exp;
                        if args.is_nil() {
                            let (result, next_env) =
                                self.apply_function(fun, Value::Nil, k, env)?;
                            exp = result;
                            env = next_env;
                        } else {
                            // Evaluate arguments left to right: the first
                            // argument becomes `exp`, the rest wait as
                            // EvalArg steps with the second on top.
                            let argv = args.list_to_vec()?;
                            k.push(Step::ApplyFun(fun));
                            for arg in argv.iter().skip(1).rev() {
                                k.push(Step::EvalArg(arg.clone()));
                            }
                            k.push(Step::ConsArgs(Value::Nil));
                            exp = argv[0].clone();
                            continue 'eval;
                        }
                    }
                    Step::ConsArgs(acc) => {
                        // Prepending keeps the accumulator in reverse of
                        // call order; it is put right once ApplyFun arrives.
                        let acc = Value::cons(exp, acc);
                        match k.pop() {
                            Some(Step::EvalArg(next)) => {
                                k.push(Step::ConsArgs(acc));
                                exp = next;
                                continue 'eval;
                            }
                            Some(Step::ApplyFun(fun)) => {
                                let args = acc.reversed()?;
                                let (result, next_env) =
                                    self.apply_function(fun, args, k, env)?;
                                exp = result;
                                env = next_env;
                            }
                            _ => {
                                return Err(ScmError::Internal(
                                    "argument collection without a pending application".into(),
                                ))
                            }
                        }
                    }
                    Step::RestoreEnv(saved) => {
                        env = saved;
                    }
                    Step::EvalArg(_) | Step::ApplyFun(_) => {
                        return Err(ScmError::Internal("dangling argument step".into()));
                    }
                }
            }
        }
    }

    /// Apply a function to already-evaluated arguments. Returns the next
    /// (exp, env) pair for the trampoline.
    fn apply_function(
        &mut self,
        fun: Value,
        args: Value,
        k: &mut Continuation,
        env: Env,
    ) -> ScmResult<(Value, Env)> {
        let mut fun = fun;
        let mut args = args;
        // call/cc and apply are bound to their own symbols and unwrapped
        // here rather than special-cased in the dispatch above.
        loop {
            match fun {
                Value::Sym(id) if id == sym::CALLCC => {
                    k.push_restore_env_unless_tail(&env);
                    fun = args.car()?;
                    args = Value::cons(Value::Cont(Rc::new(k.snapshot())), Value::Nil);
                }
                Value::Sym(id) if id == sym::APPLY => {
                    let target = args.car()?;
                    args = args.cdr()?.car()?;
                    fun = target;
                }
                other => {
                    fun = other;
                    break;
                }
            }
        }
        match fun {
            Value::Intrinsic(p) => {
                let argv = args.list_to_vec()?;
                if p.arity >= 0 && argv.len() != p.arity as usize {
                    return Err(ScmError::Arity(format!(
                        "{} expects {} arguments, got {}",
                        self.symbols.name(p.name),
                        p.arity,
                        argv.len()
                    )));
                }
                let result = (p.func)(self, &argv)?;
                Ok((result, env))
            }
            Value::Closure(c) => {
                k.push_restore_env_unless_tail(&env);
                k.push(Step::Begin(c.body.clone()));
                let next_env = c.env.prepend(&c.params, &args)?.new_frame();
                Ok((Value::Void, next_env))
            }
            Value::Cont(snapshot) => {
                k.copy_from(&snapshot);
                Ok((args.car()?, env))
            }
            other => Err(ScmError::NotAProcedure(self.stringify(&other))),
        }
    }
}

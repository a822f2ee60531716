use std::rc::Rc;

use crate::env::{Env, EnvNode};
use crate::symbol::SymbolId;
use crate::value::Value;

/// One pending unit of work on the evaluator's stack.
#[derive(Clone)]
pub enum Step {
    /// Branches `(e2 [e3])` of a pending `if`.
    Then(Value),
    /// Remaining expressions of a `begin`.
    Begin(Value),
    /// Symbol being defined; the evaluated right-hand side arrives as `exp`.
    Define(SymbolId),
    /// Environment node whose value to overwrite, resolved at push time.
    SetQ(Rc<EnvNode>),
    /// Unevaluated argument expressions; `exp` holds the evaluated operator.
    Apply(Value),
    /// The already-evaluated function to apply.
    ApplyFun(Value),
    /// An argument expression still to evaluate.
    EvalArg(Value),
    /// Arguments evaluated so far, in reverse of call order.
    ConsArgs(Value),
    /// Environment to restore on return from a non-tail call.
    RestoreEnv(Env),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Then(_) => "Then",
            Step::Begin(_) => "Begin",
            Step::Define(_) => "Define",
            Step::SetQ(_) => "SetQ",
            Step::Apply(_) => "Apply",
            Step::ApplyFun(_) => "ApplyFun",
            Step::EvalArg(_) => "EvalArg",
            Step::ConsArgs(_) => "ConsArgs",
            Step::RestoreEnv(_) => "RestoreEnv",
        }
    }
}

/// The evaluator's pending-work stack, reified. Snapshots duplicate the step
/// vector, so a captured continuation and the live stack never interfere;
/// payloads may alias since the evaluator treats them as read-only.
#[derive(Clone, Default)]
pub struct Continuation {
    steps: Vec<Step>,
}

impl Continuation {
    pub fn new() -> Continuation {
        Continuation { steps: Vec::new() }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn pop(&mut self) -> Option<Step> {
        self.steps.pop()
    }

    pub fn peek(&self) -> Option<&Step> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// A fresh copy, for `call/cc`.
    pub fn snapshot(&self) -> Continuation {
        self.clone()
    }

    /// Replace this stack's contents with a snapshot of another; this is
    /// what invoking a captured continuation does to the live stack.
    pub fn copy_from(&mut self, other: &Continuation) {
        self.steps = other.steps.clone();
    }

    /// Arrange for `env` to be restored when the current call returns. If a
    /// restore is already on top, the caller is in tail position and the
    /// pending one suffices, so the stack does not grow with tail depth.
    pub fn push_restore_env_unless_tail(&mut self, env: &Env) {
        if !matches!(self.peek(), Some(Step::RestoreEnv(_))) {
            self.push(Step::RestoreEnv(env.clone()));
        }
    }

    /// Steps from the top of the stack down, for error traces.
    pub fn steps_top_down(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Num;

    fn num(i: i32) -> Value {
        Value::Num(Num::Int(i))
    }

    #[test]
    fn push_pop_is_lifo() {
        let mut k = Continuation::new();
        k.push(Step::Begin(num(1)));
        k.push(Step::Then(num(2)));
        assert_eq!(k.len(), 2);
        assert!(matches!(k.pop(), Some(Step::Then(_))));
        assert!(matches!(k.pop(), Some(Step::Begin(_))));
        assert!(k.pop().is_none());
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let mut k = Continuation::new();
        k.push(Step::Begin(num(1)));
        let snap = k.snapshot();
        k.push(Step::Then(num(2)));
        k.pop();
        k.pop();
        assert!(k.is_empty());
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn copy_from_replaces_contents_wholesale() {
        let mut live = Continuation::new();
        live.push(Step::Then(num(1)));
        live.push(Step::Then(num(2)));

        let mut saved = Continuation::new();
        saved.push(Step::Begin(num(3)));

        live.copy_from(&saved);
        assert_eq!(live.len(), 1);
        assert!(matches!(live.pop(), Some(Step::Begin(_))));
        // The snapshot survives, so it can be applied again.
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn restore_env_is_not_stacked_in_tail_position() {
        let env = Env::new_global();
        let mut k = Continuation::new();
        k.push_restore_env_unless_tail(&env);
        assert_eq!(k.len(), 1);
        // A second request while a restore is pending is a tail call.
        k.push_restore_env_unless_tail(&env);
        assert_eq!(k.len(), 1);
        // After something else intervenes, a restore is pushed again.
        k.push(Step::Begin(num(1)));
        k.push_restore_env_unless_tail(&env);
        assert_eq!(k.len(), 3);
    }
}

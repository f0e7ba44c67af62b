//! Program evaluation
//!
//! The evaluator threads a data stack and an effect-handler stack through a
//! program, with backtracking failure semantics: any step may fail, and
//! failure unwinds to the nearest transactional boundary — a `cond` try, a
//! loop condition, or the toplevel run — restoring both stacks and aborting
//! the effect sink's frame. Values are persistent, so a snapshot is a pair
//! of `Vec` clones of `Arc` handles.
//!
//! Failure is boolean (`Option`), never carries a payload, and is the only
//! runtime error: structural misuse is rejected by `parse` before
//! evaluation starts, and nothing here panics.
//!
//! Loops are iterative — one Rust frame per loop, not per iteration — so
//! evaluation depth is bounded by program nesting, not input size.
//!
//! # Effects
//!
//! `eff` pops a request and dispatches to the top handler frame, running
//! the handler program in a fresh environment `( request state -- response
//! state' )` over the remaining handler stack. With no handlers installed,
//! the request goes to the external sink. Handler state lives in the frame
//! and is restored by the same snapshots that restore the data stack.

use crate::effects::EffectSink;
use crate::program::{Op, Prog};
use glas_core::{Value, num, record};
use std::sync::Arc;

/// One installed effect handler: the handler program and its state
/// register.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerFrame {
    pub with: Arc<Prog>,
    pub state: Value,
}

/// Evaluator environment: data stack and handler stack, both listed
/// bottom-to-top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunEnv {
    pub ds: Vec<Value>,
    pub es: Vec<HandlerFrame>,
}

impl RunEnv {
    pub fn new(ds: Vec<Value>) -> RunEnv {
        RunEnv {
            ds,
            es: Vec::new(),
        }
    }
}

/// Run a program. Returns the new environment on success; on failure the
/// caller's environment is untouched and the sink has been rolled back to
/// the entry state (the whole run is one transaction).
pub fn interpret(p: &Prog, env: &RunEnv, io: &mut dyn EffectSink) -> Option<RunEnv> {
    let mut m = Machine {
        ds: env.ds.clone(),
        es: env.es.clone(),
        io,
    };
    m.io.begin();
    if m.eval(p).is_some() {
        m.io.commit();
        Some(RunEnv { ds: m.ds, es: m.es })
    } else {
        m.io.abort();
        None
    }
}

struct Machine<'a> {
    ds: Vec<Value>,
    es: Vec<HandlerFrame>,
    io: &'a mut dyn EffectSink,
}

impl Machine<'_> {
    fn eval(&mut self, p: &Prog) -> Option<()> {
        match p {
            Prog::Op(op) => self.step(*op),
            Prog::Data(v) => {
                self.ds.push(v.clone());
                Some(())
            }
            Prog::Seq(items) => {
                for item in items {
                    self.eval(item)?;
                }
                Some(())
            }
            Prog::Dip(body) => {
                let top = self.ds.pop()?;
                self.eval(body)?;
                self.ds.push(top);
                Some(())
            }
            Prog::Cond { try_, then_, else_ } => {
                let ds = self.ds.clone();
                let es = self.es.clone();
                self.io.begin();
                if self.eval(try_).is_some() {
                    self.io.commit();
                    self.eval(then_)
                } else {
                    self.io.abort();
                    self.ds = ds;
                    self.es = es;
                    self.eval(else_)
                }
            }
            Prog::While { cond, body } => loop {
                let ds = self.ds.clone();
                let es = self.es.clone();
                self.io.begin();
                if self.eval(cond).is_some() {
                    self.io.commit();
                    self.eval(body)?;
                } else {
                    self.io.abort();
                    self.ds = ds;
                    self.es = es;
                    return Some(());
                }
            },
            Prog::Until { cond, body } => loop {
                let ds = self.ds.clone();
                let es = self.es.clone();
                self.io.begin();
                if self.eval(cond).is_some() {
                    self.io.commit();
                    return Some(());
                }
                self.io.abort();
                self.ds = ds;
                self.es = es;
                self.eval(body)?;
            },
            Prog::Env { with, body } => {
                self.es.push(HandlerFrame {
                    with: with.clone(),
                    state: Value::unit(),
                });
                self.eval(body)?;
                self.es.pop();
                Some(())
            }
            Prog::Note { body, .. } => self.eval(body),
        }
    }

    fn step(&mut self, op: Op) -> Option<()> {
        match op {
            Op::Copy => {
                let top = self.ds.last()?.clone();
                self.ds.push(top);
                Some(())
            }
            Op::Drop => self.ds.pop().map(|_| ()),
            Op::Swap => {
                let n = self.ds.len();
                if n < 2 {
                    return None;
                }
                self.ds.swap(n - 1, n - 2);
                Some(())
            }
            // ( a a -- a a ): fail unless equal, preserve both
            Op::Eq => {
                let n = self.ds.len();
                if n < 2 {
                    return None;
                }
                (self.ds[n - 1] == self.ds[n - 2]).then_some(())
            }
            // ( k r -- v )
            Op::Get => {
                let r = self.ds.pop()?;
                let k = self.ds.pop()?.to_bits()?;
                let v = record::lookup(&k, &r)?;
                self.ds.push(v);
                Some(())
            }
            // ( k r v -- r' )
            Op::Put => {
                let v = self.ds.pop()?;
                let r = self.ds.pop()?;
                let k = self.ds.pop()?.to_bits()?;
                self.ds.push(record::insert(&k, v, &r));
                Some(())
            }
            // ( k r -- r' )
            Op::Del => {
                let r = self.ds.pop()?;
                let k = self.ds.pop()?.to_bits()?;
                self.ds.push(record::delete(&k, &r));
                Some(())
            }
            // ( v l -- v:l )
            Op::Pushl => {
                let l = self.ds.pop()?;
                let v = self.ds.pop()?;
                self.ds.push(Value::list_pushl(v, &l));
                Some(())
            }
            // ( v:l -- v l )
            Op::Popl => {
                let l = self.ds.pop()?;
                let (head, tail) = l.list_popl()?;
                self.ds.push(head);
                self.ds.push(tail);
                Some(())
            }
            // ( v l -- l++[v] )
            Op::Pushr => {
                let l = self.ds.pop()?;
                let v = self.ds.pop()?;
                self.ds.push(l.list_pushr(v)?);
                Some(())
            }
            // ( l++[v] -- v l )
            Op::Popr => {
                let l = self.ds.pop()?;
                let (last, init) = l.list_popr()?;
                self.ds.push(last);
                self.ds.push(init);
                Some(())
            }
            // ( l r -- l++r )
            Op::Join => {
                let r = self.ds.pop()?;
                let l = self.ds.pop()?;
                self.ds.push(l.list_append(&r)?);
                Some(())
            }
            // ( n l -- left right )
            Op::Split => {
                let l = self.ds.pop()?;
                let n = self.ds.pop()?.to_nat64()?;
                let (left, right) = l.list_split(usize::try_from(n).ok()?)?;
                self.ds.push(left);
                self.ds.push(right);
                Some(())
            }
            // ( l -- l n )
            Op::Len => {
                let n = self.ds.last()?.list_len()?;
                self.ds.push(Value::of_nat(n as u64));
                Some(())
            }
            // ( l r -- l++r )
            Op::BJoin => {
                let r = self.ds.pop()?.to_bits()?;
                let l = self.ds.pop()?.to_bits()?;
                self.ds
                    .push(Value::of_bits(&glas_core::Bits::concat(&l, &r)));
                Some(())
            }
            // ( n b -- left right )
            Op::BSplit => {
                let b = self.ds.pop()?.to_bits()?;
                let n = usize::try_from(self.ds.pop()?.to_nat64()?).ok()?;
                if n > b.len() {
                    return None;
                }
                let (left, right) = b.split_at(n);
                self.ds.push(Value::of_bits(&left));
                self.ds.push(Value::of_bits(&right));
                Some(())
            }
            // ( b -- b n )
            Op::BLen => {
                let n = self.ds.last()?.to_bits()?.len();
                self.ds.push(Value::of_nat(n as u64));
                Some(())
            }
            // ( b -- ~b )
            Op::BNeg => {
                let b = self.ds.pop()?.to_bits()?;
                self.ds.push(Value::of_bits(&b.not()));
                Some(())
            }
            Op::BMax => self.bitwise(|a, b| a.or(b)),
            Op::BMin => self.bitwise(|a, b| a.and(b)),
            Op::BEq => self.bitwise(|a, b| a.xnor(b)),
            // ( a b -- sum carry )
            Op::Add => {
                let b = self.ds.pop()?;
                let a = self.ds.pop()?;
                let (sum, carry) = num::add(&a, &b)?;
                self.ds.push(sum);
                self.ds.push(carry);
                Some(())
            }
            // ( a b -- prod overflow )
            Op::Mul => {
                let b = self.ds.pop()?;
                let a = self.ds.pop()?;
                let (prod, overflow) = num::mul(&a, &b)?;
                self.ds.push(prod);
                self.ds.push(overflow);
                Some(())
            }
            // ( a b -- a-b ); fail if negative
            Op::Sub => {
                let b = self.ds.pop()?;
                let a = self.ds.pop()?;
                let d = num::sub(&a, &b)?;
                self.ds.push(d);
                Some(())
            }
            // ( a b -- q r ); fail if b is zero
            Op::Div => {
                let b = self.ds.pop()?;
                let a = self.ds.pop()?;
                let (q, r) = num::divmod(&a, &b)?;
                self.ds.push(q);
                self.ds.push(r);
                Some(())
            }
            // ( request -- response )
            Op::Eff => self.eff(),
            Op::Fail => None,
        }
    }

    /// Equal-length bitwise ops. `( a b -- c )`
    fn bitwise(
        &mut self,
        f: impl Fn(&glas_core::Bits, &glas_core::Bits) -> Option<glas_core::Bits>,
    ) -> Option<()> {
        let b = self.ds.pop()?.to_bits()?;
        let a = self.ds.pop()?.to_bits()?;
        self.ds.push(Value::of_bits(&f(&a, &b)?));
        Some(())
    }

    fn eff(&mut self) -> Option<()> {
        let request = self.ds.pop()?;
        match self.es.pop() {
            None => {
                let response = self.io.handle(&request)?;
                self.ds.push(response);
                Some(())
            }
            Some(frame) => {
                // handler environment: ( request state ) over the remaining
                // handler stack, against the same sink
                let caller_ds =
                    std::mem::replace(&mut self.ds, vec![request, frame.state.clone()]);
                let outcome = self.eval(&frame.with);
                let handler_ds = std::mem::replace(&mut self.ds, caller_ds);
                match outcome {
                    Some(()) => {
                        // the handler must leave exactly [response, state']
                        let [response, state] = <[Value; 2]>::try_from(handler_ds).ok()?;
                        self.ds.push(response);
                        self.es.push(HandlerFrame {
                            with: frame.with,
                            state,
                        });
                        Some(())
                    }
                    None => None,
                }
            }
        }
    }
}

//! End-to-end evaluator scenarios
//!
//! Full programs — built as ASTs or parsed from their value encoding — run
//! against real sinks, exercising backtracking, loops, effect handlers and
//! transactional logging together.

use glas_core::{Bits, Value, record};
use glas_runtime::effects::TxnBuffer;
use glas_runtime::{
    EffectSink, HostSink, LogLevel, NullSink, Op, Prog, RunEnv, interpret, log_request, parse,
    print,
};
use num_bigint::BigUint;
use std::sync::Arc;

fn seq(items: Vec<Prog>) -> Prog {
    Prog::Seq(items)
}

fn op(o: Op) -> Prog {
    Prog::Op(o)
}

fn data(v: Value) -> Prog {
    Prog::Data(v)
}

fn run_pure(p: &Prog, ds: Vec<Value>) -> Option<Vec<Value>> {
    interpret(p, &RunEnv::new(ds), &mut NullSink).map(|env| env.ds)
}

/// Outer sink for handler tests: records every request, answers unit,
/// honors transactions.
#[derive(Default)]
struct RecordingSink {
    buffer: TxnBuffer<Value>,
    seen: Vec<Value>,
}

impl RecordingSink {
    fn flush(&mut self) {
        self.seen.extend(self.buffer.drain_delivered());
    }
}

impl EffectSink for RecordingSink {
    fn handle(&mut self, request: &Value) -> Option<Value> {
        self.buffer.record(request.clone());
        self.flush();
        Some(Value::unit())
    }
    fn begin(&mut self) {
        self.buffer.begin();
    }
    fn commit(&mut self) {
        self.buffer.commit();
        self.flush();
    }
    fn abort(&mut self) {
        self.buffer.abort();
    }
}

fn fixed(n: u64, width: usize) -> Value {
    Value::of_bits(&Bits::from_biguint(&BigUint::from(n), width))
}

#[test]
fn scenario_stack_swap() {
    let out = run_pure(
        &op(Op::Swap),
        vec![Value::of_byte(0x01), Value::of_byte(0x02)],
    );
    assert_eq!(out, Some(vec![Value::of_byte(0x02), Value::of_byte(0x01)]));
}

fn abs_difference() -> Prog {
    Prog::Cond {
        try_: Box::new(op(Op::Sub)),
        then_: Box::new(seq(Vec::new())),
        else_: Box::new(seq(vec![op(Op::Swap), op(Op::Sub)])),
    }
}

#[test]
fn scenario_conditional_absolute_difference() {
    let p = abs_difference();
    assert_eq!(
        run_pure(&p, vec![Value::of_nat(5), Value::of_nat(12)]),
        Some(vec![Value::of_nat(7)])
    );
    assert_eq!(
        run_pure(&p, vec![Value::of_nat(12), Value::of_nat(5)]),
        Some(vec![Value::of_nat(7)])
    );
}

#[test]
fn scenario_absolute_difference_parses_from_value() {
    // the same program built as a value, the homoiconic way
    let p = parse(&print(&abs_difference())).unwrap();
    assert_eq!(
        run_pure(&p, vec![Value::of_nat(5), Value::of_nat(12)]),
        Some(vec![Value::of_nat(7)])
    );
}

/// Strip leading zero bits: while the first bit is 0, drop it.
fn strip_zeros() -> Prog {
    let zero_bit = Value::left(Value::unit());
    Prog::While {
        cond: Box::new(seq(vec![
            data(Value::of_nat(1)),
            op(Op::Swap),
            op(Op::BSplit),
            op(Op::Swap),
            data(zero_bit),
            op(Op::Eq),
            op(Op::Drop),
            op(Op::Drop),
        ])),
        body: Box::new(seq(Vec::new())),
    }
}

#[test]
fn scenario_gcd_by_euclidean_loop() {
    // (a, b) -> (b, a mod b) until the divisor is zero
    let reduce = Prog::While {
        cond: Box::new(seq(vec![
            op(Op::Copy),
            Prog::Dip(Box::new(op(Op::Swap))),
            op(Op::Div),
            op(Op::Swap),
            op(Op::Drop),
        ])),
        body: Box::new(seq(Vec::new())),
    };
    let p = seq(vec![reduce, op(Op::Drop), strip_zeros()]);
    let ds = vec![fixed(462, 32), fixed(1071, 64)];
    assert_eq!(run_pure(&p, ds), Some(vec![Value::of_nat(21)]));
}

#[test]
fn scenario_list_filter_loop() {
    // keep bytes in [32, 126]
    let keep = seq(vec![
        op(Op::Copy),
        data(Value::of_nat(32)),
        op(Op::Sub),
        op(Op::Drop),
        op(Op::Copy),
        data(Value::of_nat(126)),
        op(Op::Swap),
        op(Op::Sub),
        op(Op::Drop),
        op(Op::Swap),
        op(Op::Pushr),
    ]);
    let p = seq(vec![
        data(Value::unit()), // output accumulator
        Prog::While {
            cond: Box::new(seq(vec![op(Op::Swap), op(Op::Popl)])),
            body: Box::new(seq(vec![
                op(Op::Swap),
                Prog::Dip(Box::new(op(Op::Swap))),
                Prog::Cond {
                    try_: Box::new(keep),
                    then_: Box::new(seq(Vec::new())),
                    else_: Box::new(op(Op::Drop)),
                },
            ])),
        },
        op(Op::Swap),
        op(Op::Drop),
    ]);

    let input: Vec<u8> = (0..100u32).map(|i| ((i * 37 + 11) % 256) as u8).collect();
    let expected: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| (32..=126).contains(b))
        .collect();
    let out = run_pure(&p, vec![Value::of_bytes(&input)]).unwrap();
    assert_eq!(out, vec![Value::of_bytes(&expected)]);
}

#[test]
fn scenario_transactional_log() {
    let p = seq(vec![
        data(log_request(LogLevel::Info, "first")),
        op(Op::Eff),
        Prog::Cond {
            try_: Box::new(seq(vec![
                data(log_request(LogLevel::Info, "speculative")),
                op(Op::Eff),
                op(Op::Fail),
            ])),
            then_: Box::new(seq(Vec::new())),
            else_: Box::new(seq(Vec::new())),
        },
        data(log_request(LogLevel::Info, "third")),
        op(Op::Eff),
    ]);
    let mut sink = HostSink::new();
    let out = interpret(&p, &RunEnv::default(), &mut sink);
    assert!(out.is_some());
    let texts: Vec<&str> = sink.committed().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "third"]);
}

#[test]
fn scenario_failed_run_commits_nothing() {
    // the toplevel run is itself a transaction
    let p = seq(vec![
        data(log_request(LogLevel::Info, "doomed")),
        op(Op::Eff),
        op(Op::Fail),
    ]);
    let mut sink = HostSink::new();
    assert!(interpret(&p, &RunEnv::default(), &mut sink).is_none());
    assert!(sink.committed().is_empty());
}

/// Handler that renames log <-> oops, forwards the renamed request, counts
/// invocations in its register, and responds with the count.
fn renaming_counter_handler() -> Prog {
    let rename = |from: &str, to: &str| {
        seq(vec![
            data(Value::symbol(from)),
            op(Op::Swap),
            op(Op::Get),
            data(Value::symbol(to)),
            op(Op::Swap),
            data(Value::unit()),
            op(Op::Swap),
            op(Op::Put),
        ])
    };
    seq(vec![
        // ( request n -- request n+1 ), canonicalized: carry ++ sum can
        // carry a leading zero
        data(Value::of_nat(1)),
        op(Op::Add),
        op(Op::Swap),
        op(Op::BJoin),
        strip_zeros(),
        op(Op::Swap),
        // rename the request tag
        Prog::Cond {
            try_: Box::new(rename("log", "oops")),
            then_: Box::new(seq(Vec::new())),
            else_: Box::new(rename("oops", "log")),
        },
        // forward outward, then answer with the count
        op(Op::Eff),
        op(Op::Drop),
        op(Op::Copy),
    ])
}

#[test]
fn scenario_env_handler_remap() {
    let body = seq(vec![
        data(Value::variant("log", Value::of_str("one"))),
        op(Op::Eff),
        data(Value::variant("oops", Value::of_str("two"))),
        op(Op::Eff),
        data(Value::variant("log", Value::of_str("three"))),
        op(Op::Eff),
    ]);
    let p = Prog::Env {
        with: Arc::new(renaming_counter_handler()),
        body: Box::new(body),
    };
    let mut sink = RecordingSink::default();
    let out = interpret(&p, &RunEnv::default(), &mut sink).unwrap();

    // the outer sink saw the renamed requests, in order
    assert_eq!(
        sink.seen,
        vec![
            Value::variant("oops", Value::of_str("one")),
            Value::variant("log", Value::of_str("two")),
            Value::variant("oops", Value::of_str("three")),
        ]
    );
    // responses carry the running count: three handler invocations
    assert_eq!(
        out.ds,
        vec![Value::of_nat(1), Value::of_nat(2), Value::of_nat(3)]
    );
    // the handler frame is gone once the env scope closes
    assert!(out.es.is_empty());
}

#[test]
fn handler_state_rolls_back_with_the_condition() {
    // a cond try that invokes the handler then fails must not advance the
    // counter observed by later invocations
    let body = seq(vec![
        data(Value::variant("log", Value::of_str("a"))),
        op(Op::Eff),
        Prog::Cond {
            try_: Box::new(seq(vec![
                data(Value::variant("log", Value::of_str("b"))),
                op(Op::Eff),
                op(Op::Fail),
            ])),
            then_: Box::new(seq(Vec::new())),
            else_: Box::new(seq(Vec::new())),
        },
        data(Value::variant("log", Value::of_str("c"))),
        op(Op::Eff),
    ]);
    let p = Prog::Env {
        with: Arc::new(renaming_counter_handler()),
        body: Box::new(body),
    };
    let mut sink = RecordingSink::default();
    let out = interpret(&p, &RunEnv::default(), &mut sink).unwrap();
    // counts: 1 for "a", then the rolled-back "b", then 2 for "c"
    assert_eq!(out.ds, vec![Value::of_nat(1), Value::of_nat(2)]);
    // the aborted forward never reached the outer sink
    assert_eq!(
        sink.seen,
        vec![
            Value::variant("oops", Value::of_str("a")),
            Value::variant("oops", Value::of_str("c")),
        ]
    );
}

#[test]
fn backtracking_restores_everything_for_else() {
    // try mangles the stack, installs a handler, logs, then fails
    let try_ = seq(vec![
        op(Op::Drop),
        data(Value::of_nat(99)),
        Prog::Env {
            with: Arc::new(seq(vec![op(Op::Drop), op(Op::Copy)])),
            body: Box::new(seq(vec![
                data(log_request(LogLevel::Warn, "inside")),
                op(Op::Eff),
            ])),
        },
        op(Op::Fail),
    ]);
    let p = Prog::Cond {
        try_: Box::new(try_),
        then_: Box::new(seq(Vec::new())),
        else_: Box::new(seq(Vec::new())),
    };
    let ds = vec![Value::of_nat(1), Value::of_nat(2)];
    let mut sink = HostSink::new();
    let out = interpret(&p, &RunEnv::new(ds.clone()), &mut sink).unwrap();
    assert_eq!(out.ds, ds);
    assert!(out.es.is_empty());
    assert!(sink.committed().is_empty());
}

#[test]
fn interpreter_is_deterministic() {
    let p = abs_difference();
    let env = RunEnv::new(vec![Value::of_nat(3), Value::of_nat(10)]);
    let a = interpret(&p, &env, &mut NullSink);
    let b = interpret(&p, &env, &mut NullSink);
    assert_eq!(a, b);
    // the input environment is untouched either way
    assert_eq!(env.ds, vec![Value::of_nat(3), Value::of_nat(10)]);
}

#[test]
fn load_effect_reaches_module_environment() {
    let p = seq(vec![
        data(Value::variant(
            "load",
            Value::variant("global", Value::of_str("answer")),
        )),
        op(Op::Eff),
    ]);
    let mut sink = HostSink::new();
    sink.define_global("answer", Value::of_nat(42));
    let out = interpret(&p, &RunEnv::default(), &mut sink).unwrap();
    assert_eq!(out.ds, vec![Value::of_nat(42)]);

    // unknown module: the effect is denied and the run fails
    let p = seq(vec![
        data(Value::variant(
            "load",
            Value::variant("global", Value::of_str("unknown")),
        )),
        op(Op::Eff),
    ]);
    assert!(interpret(&p, &RunEnv::default(), &mut sink).is_none());
}

#[test]
fn printed_programs_survive_the_wire() {
    // print -> serialize -> deserialize -> parse -> run
    let p = abs_difference();
    let bytes = glas_core::to_bytes(&print(&p)).unwrap();
    let back = parse(&glas_core::from_bytes(&bytes).unwrap()).unwrap();
    assert_eq!(back, p);
    assert_eq!(
        run_pure(&back, vec![Value::of_nat(2), Value::of_nat(9)]),
        Some(vec![Value::of_nat(7)])
    );
}

#[test]
fn record_primitives_clear_a_record() {
    let r = record::put(
        "c",
        Value::of_nat(3),
        &record::put("b", Value::of_nat(2), &record::put("a", Value::of_nat(1), &Value::unit())),
    );
    let p = seq(vec![
        data(Value::symbol("a")),
        op(Op::Swap),
        op(Op::Del),
        data(Value::symbol("b")),
        op(Op::Swap),
        op(Op::Del),
        data(Value::symbol("c")),
        op(Op::Swap),
        op(Op::Del),
    ]);
    let out = run_pure(&p, vec![r]).unwrap();
    assert_eq!(out, vec![Value::unit()]);
}

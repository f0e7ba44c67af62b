//! Program AST
//!
//! Programs are ordinary values; this module gives them structure. Each
//! composite node is a variant (single-key record) in the value world:
//!
//! ```text
//! swap                          primitive op, a bare symbol
//! data:<v>                      push literal
//! seq:[p1, p2, ...]             sequence
//! dip:<p>                       run under the top of stack
//! cond:(try:t, then:th, else:el)
//! loop:(while:c, do:b)          also loop:(until:c, do:b)
//! env:(with:h, do:b)            effect handler scope
//! prog:(do:b, ...)              annotation wrapper
//! ```
//!
//! `parse` and `print` are mutual inverses: `parse(print(p)) == Ok(p)` for
//! every AST. A value that fails to parse is structural misuse and is
//! reported with a description before evaluation ever starts; it is never a
//! runtime failure.

use glas_core::{Value, record};
use std::sync::Arc;

/// Primitive instruction with a fixed stack effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Copy,
    Drop,
    Swap,
    Eq,
    Get,
    Put,
    Del,
    Pushl,
    Popl,
    Pushr,
    Popr,
    Join,
    Split,
    Len,
    BJoin,
    BSplit,
    BLen,
    BNeg,
    BMax,
    BMin,
    BEq,
    Add,
    Mul,
    Sub,
    Div,
    Eff,
    Fail,
}

impl Op {
    pub const ALL: [Op; 27] = [
        Op::Copy,
        Op::Drop,
        Op::Swap,
        Op::Eq,
        Op::Get,
        Op::Put,
        Op::Del,
        Op::Pushl,
        Op::Popl,
        Op::Pushr,
        Op::Popr,
        Op::Join,
        Op::Split,
        Op::Len,
        Op::BJoin,
        Op::BSplit,
        Op::BLen,
        Op::BNeg,
        Op::BMax,
        Op::BMin,
        Op::BEq,
        Op::Add,
        Op::Mul,
        Op::Sub,
        Op::Div,
        Op::Eff,
        Op::Fail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Op::Copy => "copy",
            Op::Drop => "drop",
            Op::Swap => "swap",
            Op::Eq => "eq",
            Op::Get => "get",
            Op::Put => "put",
            Op::Del => "del",
            Op::Pushl => "pushl",
            Op::Popl => "popl",
            Op::Pushr => "pushr",
            Op::Popr => "popr",
            Op::Join => "join",
            Op::Split => "split",
            Op::Len => "len",
            Op::BJoin => "bjoin",
            Op::BSplit => "bsplit",
            Op::BLen => "blen",
            Op::BNeg => "bneg",
            Op::BMax => "bmax",
            Op::BMin => "bmin",
            Op::BEq => "beq",
            Op::Add => "add",
            Op::Mul => "mul",
            Op::Sub => "sub",
            Op::Div => "div",
            Op::Eff => "eff",
            Op::Fail => "fail",
        }
    }

    pub fn of_name(name: &str) -> Option<Op> {
        Op::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Static stack effect `( in -- out )` of the primitive.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Op::Copy => (1, 2),
            Op::Drop => (1, 0),
            Op::Swap => (2, 2),
            // eq preserves both operands
            Op::Eq => (2, 2),
            Op::Get => (2, 1),
            Op::Put => (3, 1),
            Op::Del => (2, 1),
            Op::Pushl => (2, 1),
            Op::Popl => (1, 2),
            Op::Pushr => (2, 1),
            Op::Popr => (1, 2),
            Op::Join => (2, 1),
            Op::Split => (2, 2),
            Op::Len => (1, 2),
            Op::BJoin => (2, 1),
            Op::BSplit => (2, 2),
            Op::BLen => (1, 2),
            Op::BNeg => (1, 1),
            Op::BMax => (2, 1),
            Op::BMin => (2, 1),
            Op::BEq => (2, 1),
            Op::Add => (2, 2),
            Op::Mul => (2, 2),
            Op::Sub => (2, 1),
            Op::Div => (2, 2),
            Op::Eff => (1, 1),
            Op::Fail => (0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prog {
    Op(Op),
    /// Push a literal value.
    Data(Value),
    /// Run in order; fail as soon as any step fails.
    Seq(Vec<Prog>),
    /// Pop the top, run the body on the remainder, push the top back.
    Dip(Box<Prog>),
    /// Run `try_` transactionally; commit into `then_` on success, roll
    /// back into `else_` on failure.
    Cond {
        try_: Box<Prog>,
        then_: Box<Prog>,
        else_: Box<Prog>,
    },
    /// Repeat body while the condition succeeds; each condition attempt is
    /// transactional.
    While { cond: Box<Prog>, body: Box<Prog> },
    /// Repeat body until the condition succeeds.
    Until { cond: Box<Prog>, body: Box<Prog> },
    /// Push an effect handler for the duration of the body. Shared so
    /// installing a handler frame is cheap.
    Env { with: Arc<Prog>, body: Box<Prog> },
    /// Annotation wrapper; semantically the body alone.
    Note { anno: Value, body: Box<Prog> },
}

/// Structural misuse: a value that does not encode a program.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A symbol that names no primitive
    UnknownOp(String),
    /// A composite node missing a required field
    MissingKey(&'static str, &'static str),
    /// A field that must be a list of programs but is not a list
    NotAList(&'static str),
    /// A value with no program reading at all
    Unrecognized(Value),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnknownOp(name) => write!(f, "unknown primitive op '{}'", name),
            ParseError::MissingKey(node, key) => {
                write!(f, "{} node is missing its '{}' field", node, key)
            }
            ParseError::NotAList(node) => write!(f, "{} node requires a list of programs", node),
            ParseError::Unrecognized(v) => write!(f, "value is not a program: {}", v),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a value into a program, describing the first defect found.
///
/// Composite tags take precedence over primitive names: the bare symbol
/// `data` is the same value as `data:()` and parses as `Data(unit)`.
pub fn parse(v: &Value) -> Result<Prog, ParseError> {
    let (tag, payload) = match record::as_variant(v) {
        Some(tv) => tv,
        None => return Err(ParseError::Unrecognized(v.clone())),
    };
    match tag.as_str() {
        "data" => Ok(Prog::Data(payload)),
        "seq" => {
            let mut items = Vec::new();
            let iter = payload
                .list_iter()
                .ok_or(ParseError::NotAList("seq"))?;
            for item in iter {
                items.push(parse(&item)?);
            }
            Ok(Prog::Seq(items))
        }
        "dip" => Ok(Prog::Dip(Box::new(parse(&payload)?))),
        "cond" => {
            let try_ = field(&payload, "cond", "try")?;
            let then_ = field(&payload, "cond", "then")?;
            let else_ = field(&payload, "cond", "else")?;
            Ok(Prog::Cond {
                try_: Box::new(parse(&try_)?),
                then_: Box::new(parse(&then_)?),
                else_: Box::new(parse(&else_)?),
            })
        }
        "loop" => {
            let body = field(&payload, "loop", "do")?;
            let body = Box::new(parse(&body)?);
            if let Some(cond) = record::get("while", &payload) {
                Ok(Prog::While {
                    cond: Box::new(parse(&cond)?),
                    body,
                })
            } else if let Some(cond) = record::get("until", &payload) {
                Ok(Prog::Until {
                    cond: Box::new(parse(&cond)?),
                    body,
                })
            } else {
                Err(ParseError::MissingKey("loop", "while"))
            }
        }
        "env" => {
            let with = field(&payload, "env", "with")?;
            let body = field(&payload, "env", "do")?;
            Ok(Prog::Env {
                with: Arc::new(parse(&with)?),
                body: Box::new(parse(&body)?),
            })
        }
        "prog" => {
            let body = field(&payload, "prog", "do")?;
            let anno = record::remove("do", &payload);
            Ok(Prog::Note {
                anno,
                body: Box::new(parse(&body)?),
            })
        }
        name => {
            if payload.is_unit() {
                match Op::of_name(name) {
                    Some(op) => Ok(Prog::Op(op)),
                    None => Err(ParseError::UnknownOp(name.to_string())),
                }
            } else {
                Err(ParseError::Unrecognized(v.clone()))
            }
        }
    }
}

fn field(payload: &Value, node: &'static str, key: &'static str) -> Result<Value, ParseError> {
    record::get(key, payload).ok_or(ParseError::MissingKey(node, key))
}

/// Parse, discarding the defect description.
pub fn try_parse(v: &Value) -> Option<Prog> {
    parse(v).ok()
}

/// Serialize a program back into its value encoding.
pub fn print(p: &Prog) -> Value {
    match p {
        Prog::Op(op) => Value::symbol(op.name()),
        Prog::Data(v) => Value::variant("data", v.clone()),
        Prog::Seq(items) => Value::variant(
            "seq",
            Value::of_list(items.iter().map(print).collect()),
        ),
        Prog::Dip(body) => Value::variant("dip", print(body)),
        Prog::Cond { try_, then_, else_ } => {
            let mut r = Value::unit();
            r = record::put("try", print(try_), &r);
            r = record::put("then", print(then_), &r);
            r = record::put("else", print(else_), &r);
            Value::variant("cond", r)
        }
        Prog::While { cond, body } => {
            let mut r = Value::unit();
            r = record::put("while", print(cond), &r);
            r = record::put("do", print(body), &r);
            Value::variant("loop", r)
        }
        Prog::Until { cond, body } => {
            let mut r = Value::unit();
            r = record::put("until", print(cond), &r);
            r = record::put("do", print(body), &r);
            Value::variant("loop", r)
        }
        Prog::Env { with, body } => {
            let mut r = Value::unit();
            r = record::put("with", print(with), &r);
            r = record::put("do", print(body), &r);
            Value::variant("env", r)
        }
        Prog::Note { anno, body } => {
            let r = record::put("do", print(body), anno);
            Value::variant("prog", r)
        }
    }
}

impl std::fmt::Display for Prog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", print(self))
    }
}

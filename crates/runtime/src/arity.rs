//! Static stack-effect analysis
//!
//! Computes the `( in -- out )` arity of a program when it has one. The
//! analysis is conservative: dynamically-shaped programs — branches with
//! mismatched effects, loops whose body is not balanced against the
//! condition — report `None` rather than a guess.
//!
//! Composition tracks how deep a step reaches below the running output:
//! composing `(i1, o1)` then `(i2, o2)` needs `i1 + max(0, i2 - o1)` inputs
//! and leaves `o2 + max(0, o1 - i2)`.

use crate::program::Prog;

/// Arity of a program, or `None` when it has no static stack effect.
pub fn static_arity(p: &Prog) -> Option<(usize, usize)> {
    match p {
        Prog::Op(op) => Some(op.arity()),
        Prog::Data(_) => Some((0, 1)),
        Prog::Seq(items) => {
            let mut acc = (0, 0);
            for item in items {
                acc = compose(acc, static_arity(item)?);
            }
            Some(acc)
        }
        Prog::Dip(body) => {
            let (i, o) = static_arity(body)?;
            Some((i + 1, o + 1))
        }
        Prog::Cond { try_, then_, else_ } => {
            let pass = compose(static_arity(try_)?, static_arity(then_)?);
            let alt = static_arity(else_)?;
            (pass == alt).then_some(pass)
        }
        Prog::While { cond, body } => {
            // one iteration must be stack-neutral or the loop has no
            // static arity; on exit the failed condition is rolled back
            let (i, o) = compose(static_arity(cond)?, static_arity(body)?);
            (i == o).then_some((i, i))
        }
        Prog::Until { cond, body } => {
            // failed condition attempts are rolled back, so only the final
            // successful attempt contributes; the body must be balanced
            let (bi, bo) = static_arity(body)?;
            if bi != bo {
                return None;
            }
            Some(compose((bi, bo), static_arity(cond)?))
        }
        Prog::Env { with, body } => {
            // handler runs on [request, state] and must leave [response, state']
            (static_arity(with)? == (2, 2))
                .then(|| static_arity(body))
                .flatten()
        }
        Prog::Note { body, .. } => static_arity(body),
    }
}

fn compose(a: (usize, usize), b: (usize, usize)) -> (usize, usize) {
    let (i1, o1) = a;
    let (i2, o2) = b;
    (i1 + i2.saturating_sub(o1), o2 + o1.saturating_sub(i2))
}

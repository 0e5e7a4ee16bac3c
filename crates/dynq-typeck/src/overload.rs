//! Overload resolution.
//!
//! Candidates are anything with a parameter list: host methods,
//! constructors, indexers, operator signatures, aggregate signatures and
//! lambda invocations all go through [`resolve`].

use std::cmp::Ordering;

use crate::promote::compare_conversions;
use crate::ty::Ty;

pub trait Candidate {
    fn param_types(&self) -> &[Ty];
}

/// An argument at a call site: something with a static type.
pub trait Argument {
    fn ty(&self) -> &Ty;
}

impl Argument for Ty {
    fn ty(&self) -> &Ty {
        self
    }
}

#[derive(Debug)]
pub enum Resolution<C, A> {
    /// No candidate accepts the arguments.
    NoMatch,
    /// Several candidates accept them and none is better than all others.
    Ambiguous,
    /// The unique best candidate, with each argument promoted to its
    /// parameter type.
    Found { candidate: C, args: Vec<A> },
}

struct Applicable<'c, C, A> {
    candidate: &'c C,
    args: Vec<A>,
}

/// Pick the best candidate for `args`.
///
/// `promote(arg, ty)` returns the argument converted to `ty`, or `None` when
/// it does not convert. A candidate is applicable when the arity matches
/// and every argument promotes. Among several applicable candidates the
/// result is the one better than each of the others; if no single one is,
/// the call is ambiguous.
pub fn resolve<'c, C, A>(
    candidates: impl IntoIterator<Item = &'c C>,
    args: &[A],
    mut promote: impl FnMut(&A, &Ty) -> Option<A>,
) -> Resolution<C, A>
where
    C: Candidate + Clone + 'c,
    A: Argument,
{
    let mut applicable: Vec<Applicable<'c, C, A>> = Vec::new();
    'candidates: for candidate in candidates {
        let params = candidate.param_types();
        if params.len() != args.len() {
            continue;
        }
        let mut promoted = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(params) {
            match promote(arg, param) {
                Some(p) => promoted.push(p),
                None => continue 'candidates,
            }
        }
        applicable.push(Applicable {
            candidate,
            args: promoted,
        });
    }

    tracing::trace!(applicable = applicable.len(), "overload candidates filtered");

    if applicable.len() > 1 {
        let best: Vec<usize> = (0..applicable.len())
            .filter(|&i| {
                (0..applicable.len()).all(|j| {
                    i == j || is_better_than(args, applicable[i].candidate, applicable[j].candidate)
                })
            })
            .collect();
        // No single best among several applicable candidates is ambiguous
        // whether the best set is empty or holds more than one.
        if best.len() != 1 {
            return Resolution::Ambiguous;
        }
        let winner = applicable.swap_remove(best[0]);
        return Resolution::Found {
            candidate: winner.candidate.clone(),
            args: winner.args,
        };
    }

    match applicable.pop() {
        Some(only) => Resolution::Found {
            candidate: only.candidate.clone(),
            args: only.args,
        },
        None => Resolution::NoMatch,
    }
}

/// `m1` is better than `m2` when no argument converts worse to `m1`'s
/// parameter than to `m2`'s, and at least one converts strictly better.
fn is_better_than<C: Candidate, A: Argument>(args: &[A], m1: &C, m2: &C) -> bool {
    let mut better = false;
    for ((arg, p1), p2) in args.iter().zip(m1.param_types()).zip(m2.param_types()) {
        match compare_conversions(arg.ty(), p1, p2) {
            Ordering::Less => return false,
            Ordering::Greater => better = true,
            Ordering::Equal => {}
        }
    }
    better
}

//! Reference evaluator for dynq expression trees.
//!
//! A parsed [`Lambda`] is compiled into a [`CompiledLambda`] and invoked
//! with one [`Value`] per parameter. Evaluation walks the typed tree
//! directly: operators follow the lifted semantics of their operand types,
//! host members run through the closures in their capability tables, and
//! aggregates materialize their sequences.

pub mod error;
pub mod eval;
pub mod ops;

use std::cmp::Ordering;
use std::sync::Arc;

use dynq_parser::{Expr, Lambda, OrderingKey, Param};
use dynq_typeck::Value;

pub use error::{EvalError, EvalResult};
pub use eval::Evaluator;

/// A lambda ready to be invoked any number of times.
#[derive(Debug, Clone)]
pub struct CompiledLambda {
    lambda: Arc<Lambda>,
}

/// Prepare `lambda` for invocation.
pub fn compile(lambda: &Lambda) -> CompiledLambda {
    tracing::debug!(params = lambda.params.len(), ty = %lambda.body.ty, "compiled lambda");
    CompiledLambda {
        lambda: Arc::new(lambda.clone()),
    }
}

impl CompiledLambda {
    pub fn params(&self) -> &[Param] {
        &self.lambda.params
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    /// Evaluate the body with `args` bound to the parameters in order.
    pub fn invoke(&self, args: &[Value]) -> EvalResult<Value> {
        let mut eval = Evaluator::with_bindings(&self.lambda.params, args)?;
        let result = eval.evaluate(&self.lambda.body);
        tracing::trace!(ok = result.is_ok(), "invoked lambda");
        result
    }
}

/// Evaluate a tree that refers to no parameters.
pub fn evaluate(expr: &Expr) -> EvalResult<Value> {
    Evaluator::new().evaluate(expr)
}

/// Stable sort of `items` by an ordering list whose selectors are written
/// over `param`.
pub fn sort_by_keys(
    items: Vec<Value>,
    param: &Param,
    keys: &[OrderingKey],
) -> EvalResult<Vec<Value>> {
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let mut eval = Evaluator::with_bindings(std::slice::from_ref(param), std::slice::from_ref(&item))?;
        let values = keys
            .iter()
            .map(|k| eval.evaluate(&k.selector))
            .collect::<EvalResult<Vec<_>>>()?;
        keyed.push((values, item));
    }
    keyed.sort_by(|(a, _), (b, _)| {
        keys.iter()
            .zip(a.iter().zip(b))
            .map(|(key, (x, y))| {
                let ord = ops::sort_order(x, y);
                if key.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

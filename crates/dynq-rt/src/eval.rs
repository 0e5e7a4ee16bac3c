//! Tree-walking evaluation of typed expression trees.

use dynq_parser::{BinaryOp, Expr, ExprKind, Lambda, Param, UnaryOp};
use dynq_typeck::builtins::{element_type, enumerate};
use dynq_typeck::signatures::AggregateKind;
use dynq_typeck::{HostError, RecordValue, Ty, Value};
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;

use crate::error::{EvalError, EvalResult};
use crate::ops;

/// Evaluates expressions against a stack of parameter bindings.
///
/// Lambda invocations and aggregate selectors push their parameters for the
/// duration of the body and pop them afterwards; lookups search from the
/// innermost binding out.
#[derive(Default)]
pub struct Evaluator {
    scope: Vec<(Param, Value)>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An evaluator with `params` bound to `args`, positionally.
    pub fn with_bindings(params: &[Param], args: &[Value]) -> EvalResult<Self> {
        if params.len() != args.len() {
            return Err(EvalError::ArgumentCount {
                expected: params.len(),
                actual: args.len(),
            });
        }
        Ok(Evaluator {
            scope: params.iter().cloned().zip(args.iter().cloned()).collect(),
        })
    }

    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Constant { value, .. } => Ok(value.clone()),
            ExprKind::Parameter(param) => self.lookup(param),

            ExprKind::Member {
                target,
                owner,
                property,
            } => {
                let receiver = self.receiver(target.as_deref(), owner)?;
                Ok((property.get)(&receiver)?)
            }
            ExprKind::Call {
                target,
                owner,
                method,
                args,
            } => {
                let receiver = self.receiver(target.as_deref(), owner)?;
                let args = self.evaluate_all(args)?;
                Ok((method.call)(&receiver, &args)?)
            }
            ExprKind::Index {
                target,
                indexer,
                args,
            } => {
                let receiver = self.receiver(Some(&**target), &target.ty)?;
                let args = self.evaluate_all(args)?;
                Ok((indexer.call)(&receiver, &args)?)
            }
            ExprKind::ArrayIndex { array, index } => {
                let array = self.evaluate(array)?;
                let index = self.evaluate(index)?;
                array_element(&array, &index)
            }

            ExprKind::Unary { op, operand } => {
                let value = self.evaluate(operand)?;
                match op {
                    UnaryOp::Negate => ops::negate(&value),
                    UnaryOp::Not => ops::not(&value),
                }
            }
            ExprKind::Binary { op, left, right } => self.binary(*op, left, right),
            ExprKind::Convert { operand, checked } => {
                let value = self.evaluate(operand)?;
                Ok(value.convert(&expr.ty, *checked)?)
            }
            ExprKind::Conditional {
                test,
                then,
                otherwise,
            } => match self.evaluate(test)? {
                Value::Bool(true) => self.evaluate(then),
                Value::Bool(false) => self.evaluate(otherwise),
                other => Err(EvalError::InvalidOperand {
                    op: "?:",
                    operand: other.ty().to_string(),
                }),
            },

            ExprKind::Invoke { lambda, args } => {
                let args = self.evaluate_all(args)?;
                self.invoke(lambda, &args)
            }
            ExprKind::New { constructor, args } => {
                let args = self.evaluate_all(args)?;
                Ok((constructor.call)(&args)?)
            }
            ExprKind::Record { record, fields } => {
                let values = self.evaluate_all(fields)?;
                Ok(Value::Record(RecordValue::new(record.clone(), values)))
            }
            ExprKind::Aggregate {
                kind,
                source,
                selector,
            } => {
                let source = self.evaluate(source)?;
                let items = enumerate(&source)?;
                self.aggregate(*kind, items, selector.as_deref(), &expr.ty)
            }
        }
    }

    /// Bind `args` to the lambda's parameters and evaluate its body.
    pub fn invoke(&mut self, lambda: &Lambda, args: &[Value]) -> EvalResult<Value> {
        if lambda.params.len() != args.len() {
            return Err(EvalError::ArgumentCount {
                expected: lambda.params.len(),
                actual: args.len(),
            });
        }
        let mark = self.scope.len();
        self.scope
            .extend(lambda.params.iter().cloned().zip(args.iter().cloned()));
        let result = self.evaluate(&lambda.body);
        self.scope.truncate(mark);
        result
    }

    fn lookup(&self, param: &Param) -> EvalResult<Value> {
        self.scope
            .iter()
            .rev()
            .find(|(p, _)| p == param)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| EvalError::UnboundParameter(param.name().unwrap_or("it").to_string()))
    }

    fn evaluate_all(&mut self, exprs: &[Expr]) -> EvalResult<Vec<Value>> {
        exprs.iter().map(|e| self.evaluate(e)).collect()
    }

    /// The receiver of a member access. Static members get `null`; an
    /// instance member on `null` fails unless the owner is a nullable type,
    /// whose members are defined on the absent value too.
    fn receiver(&mut self, target: Option<&Expr>, owner: &Ty) -> EvalResult<Value> {
        let Some(target) = target else {
            return Ok(Value::Null);
        };
        let value = self.evaluate(target)?;
        if value.is_null() && !owner.is_nullable() {
            return Err(HostError::NullReference.into());
        }
        Ok(value)
    }

    // ── Operators ──────────────────────────────────────────────────────

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> EvalResult<Value> {
        match op {
            BinaryOp::AndAlso => {
                let l = ops::truth(op, &self.evaluate(left)?)?;
                if l == Some(false) {
                    return Ok(Value::Bool(false));
                }
                let r = ops::truth(op, &self.evaluate(right)?)?;
                Ok(match (l, r) {
                    (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                })
            }
            BinaryOp::OrElse => {
                let l = ops::truth(op, &self.evaluate(left)?)?;
                if l == Some(true) {
                    return Ok(Value::Bool(true));
                }
                let r = ops::truth(op, &self.evaluate(right)?)?;
                Ok(match (l, r) {
                    (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                })
            }
            _ if op.is_comparison() => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                ops::compare(op, &l, &r)
            }
            _ => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                ops::arithmetic(op, &l, &r, false)
            }
        }
    }

    // ── Aggregates ─────────────────────────────────────────────────────

    fn apply(&mut self, selector: &Lambda, item: &Value) -> EvalResult<Value> {
        self.invoke(selector, std::slice::from_ref(item))
    }

    /// The selector's value for each item, or the items themselves.
    fn project(&mut self, selector: Option<&Lambda>, items: Vec<Value>) -> EvalResult<Vec<Value>> {
        match selector {
            Some(s) => items.iter().map(|item| self.apply(s, item)).collect(),
            None => Ok(items),
        }
    }

    /// Items the predicate holds for; all of them without one.
    fn filter(&mut self, predicate: Option<&Lambda>, items: Vec<Value>) -> EvalResult<Vec<Value>> {
        let Some(predicate) = predicate else {
            return Ok(items);
        };
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if self.apply(predicate, &item)? == Value::Bool(true) {
                kept.push(item);
            }
        }
        Ok(kept)
    }

    fn aggregate(
        &mut self,
        kind: AggregateKind,
        items: Vec<Value>,
        selector: Option<&Lambda>,
        result: &Ty,
    ) -> EvalResult<Value> {
        use AggregateKind::*;
        match kind {
            Where => Ok(sequence(result, self.filter(selector, items)?)),
            Select => Ok(sequence(result, self.project(selector, items)?)),
            OrderBy | OrderByDescending => {
                let keys = self.project(selector, items.clone())?;
                let mut keyed: Vec<(Value, Value)> = keys.into_iter().zip(items).collect();
                keyed.sort_by(|(a, _), (b, _)| {
                    let ord = ops::sort_order(a, b);
                    if kind == OrderBy {
                        ord
                    } else {
                        ord.reverse()
                    }
                });
                Ok(sequence(result, keyed.into_iter().map(|(_, v)| v).collect()))
            }
            Distinct => {
                let mut seen = FxHashSet::default();
                let unique = items.into_iter().filter(|v| seen.insert(v.clone())).collect();
                Ok(sequence(result, unique))
            }
            Any => Ok(Value::Bool(!self.filter(selector, items)?.is_empty())),
            All => {
                let total = items.len();
                Ok(Value::Bool(self.filter(selector, items)?.len() == total))
            }
            Count => {
                let n = self.filter(selector, items)?.len();
                i32::try_from(n)
                    .map(Value::Int32)
                    .map_err(|_| HostError::Overflow("Int32".to_string()).into())
            }
            Min | Max => {
                let values = present(self.project(selector, items)?);
                let best = values.into_iter().reduce(|best, v| {
                    let ord = ops::sort_order(&v, &best);
                    let better = if kind == Min { ord.is_lt() } else { ord.is_gt() };
                    if better {
                        v
                    } else {
                        best
                    }
                });
                best.map_or_else(|| empty(result), Ok)
            }
            Sum => {
                let values = present(self.project(selector, items)?);
                let mut total = Value::default_for(result.non_nullable());
                for v in &values {
                    total = ops::arithmetic(BinaryOp::Add, &total, v, true)?;
                }
                Ok(total)
            }
            Average => {
                let values = present(self.project(selector, items)?);
                if values.is_empty() {
                    return empty(result);
                }
                average(&values, result.non_nullable())
            }
            First | FirstOrDefault | Last | LastOrDefault => {
                let mut matching = self.filter(selector, items)?;
                let found = if matches!(kind, First | FirstOrDefault) {
                    (!matching.is_empty()).then(|| matching.swap_remove(0))
                } else {
                    matching.pop()
                };
                match (found, kind) {
                    (Some(v), _) => Ok(v),
                    (None, FirstOrDefault | LastOrDefault) => Ok(Value::default_for(result)),
                    (None, _) => Err(HostError::EmptySequence.into()),
                }
            }
        }
    }
}

fn array_element(array: &Value, index: &Value) -> EvalResult<Value> {
    let Value::Array(array) = array else {
        return Err(HostError::NullReference.into());
    };
    let Value::Int32(i) = index else {
        return Err(HostError::TypeMismatch {
            expected: "Int32".to_string(),
            found: index.ty().to_string(),
        }
        .into());
    };
    usize::try_from(*i)
        .ok()
        .and_then(|i| array.items.get(i))
        .cloned()
        .ok_or_else(|| HostError::IndexOutOfRange.into())
}

/// A materialized `IEnumerable<T>` result.
fn sequence(ty: &Ty, items: Vec<Value>) -> Value {
    let elem = element_type(ty).unwrap_or(Ty::Object);
    Value::array(elem, items)
}

fn present(values: Vec<Value>) -> Vec<Value> {
    values.into_iter().filter(|v| !v.is_null()).collect()
}

/// The result of `Min`, `Max` or `Average` over no values: `null` where the
/// result type admits it.
fn empty(result: &Ty) -> EvalResult<Value> {
    if result.is_value_type() && !result.is_nullable() {
        Err(HostError::EmptySequence.into())
    } else {
        Ok(Value::Null)
    }
}

fn average(values: &[Value], result: &Ty) -> EvalResult<Value> {
    let n = values.len();
    match result {
        Ty::Decimal => {
            let total = values
                .iter()
                .filter_map(Value::as_decimal)
                .try_fold(Decimal::ZERO, |acc, d| acc.checked_add(d))
                .ok_or_else(|| EvalError::from(HostError::Overflow("Decimal".to_string())))?;
            Ok(Value::Decimal(total / Decimal::from(n)))
        }
        _ => {
            let total: f64 = values.iter().filter_map(Value::as_f64).sum();
            let mean = total / n as f64;
            Ok(match result {
                Ty::Single => Value::Single(mean as f32),
                _ => Value::Double(mean),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynq_common::span::Span;

    fn constant(v: i32) -> Expr {
        Expr::constant(Value::Int32(v), Ty::Int32, Span::new(0, 1))
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr, ty: Ty) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            Span::new(0, 1),
        )
    }

    #[test]
    fn unbound_parameter() {
        let x = Param::named("x", Ty::Int32);
        let err = Evaluator::new()
            .evaluate(&Expr::parameter(&x, Span::new(0, 1)))
            .unwrap_err();
        assert_eq!(err, EvalError::UnboundParameter("x".into()));
    }

    #[test]
    fn bindings_shadow_from_the_inside() {
        let x = Param::named("x", Ty::Int32);
        let body = binary(
            BinaryOp::Multiply,
            Expr::parameter(&x, Span::new(0, 1)),
            constant(2),
            Ty::Int32,
        );
        let lambda = Lambda::new(vec![x.clone()], body);
        let mut eval = Evaluator::with_bindings(&[x.clone()], &[Value::Int32(1)]).unwrap();
        assert_eq!(eval.invoke(&lambda, &[Value::Int32(21)]), Ok(Value::Int32(42)));
        assert_eq!(
            eval.evaluate(&Expr::parameter(&x, Span::new(0, 1))),
            Ok(Value::Int32(1))
        );
    }

    #[test]
    fn three_valued_logic() {
        let null = || Expr::constant(Value::Null, Ty::nullable(Ty::Bool), Span::new(0, 1));
        let bool_ = |b| Expr::constant(Value::Bool(b), Ty::nullable(Ty::Bool), Span::new(0, 1));
        let nb = Ty::nullable(Ty::Bool);
        let mut eval = Evaluator::new();
        let and = binary(BinaryOp::AndAlso, null(), bool_(false), nb.clone());
        assert_eq!(eval.evaluate(&and), Ok(Value::Bool(false)));
        let and = binary(BinaryOp::AndAlso, null(), bool_(true), nb.clone());
        assert_eq!(eval.evaluate(&and), Ok(Value::Null));
        let or = binary(BinaryOp::OrElse, null(), bool_(true), nb.clone());
        assert_eq!(eval.evaluate(&or), Ok(Value::Bool(true)));
        let or = binary(BinaryOp::OrElse, bool_(false), null(), nb);
        assert_eq!(eval.evaluate(&or), Ok(Value::Null));
    }

    #[test]
    fn short_circuit_skips_the_right_side() {
        let divide = binary(BinaryOp::Divide, constant(1), constant(0), Ty::Int32);
        let failing = binary(BinaryOp::Equal, divide, constant(1), Ty::Bool);
        let f = Expr::constant(Value::Bool(false), Ty::Bool, Span::new(0, 1));
        let and = binary(BinaryOp::AndAlso, f, failing, Ty::Bool);
        assert_eq!(Evaluator::new().evaluate(&and), Ok(Value::Bool(false)));
    }

    #[test]
    fn array_bounds() {
        let array = Value::array(Ty::Int32, vec![Value::Int32(5)]);
        assert_eq!(array_element(&array, &Value::Int32(0)), Ok(Value::Int32(5)));
        assert_eq!(
            array_element(&array, &Value::Int32(1)),
            Err(EvalError::Host(HostError::IndexOutOfRange))
        );
        assert_eq!(
            array_element(&array, &Value::Int32(-1)),
            Err(EvalError::Host(HostError::IndexOutOfRange))
        );
    }
}

//! Instrumentation engine
//!
//! Rewrites a parsed body in place:
//!
//! - every `if` branch, including a synthesized `else`, starts with a
//!   coverage point;
//! - the conditionally evaluated operand of `&&`/`||` and both arms of `?:`
//!   are preceded by a coverage point through a comma sequence;
//! - assignments to watched fields of the current instance pass their
//!   right-hand side through the toggle counter, which adds the Hamming
//!   distance between the stored and the new value.
//!
//! The accepted node shapes are closed. Anything else is a
//! [`VriError::Unsupported`] error carrying the regenerated fragment.

use crate::config::InstrumentConfig;
use crate::result::{VriError, VriResult};
use crate::syntax::{print_statement, AssignOp, Expr, Stmt};
use rand::RngCore;
use serde::Serialize;
use tracing::trace;

/// Counts of injected operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstrumentStats {
    /// Coverage point calls emitted
    pub coverage_points: usize,
    /// Toggle counter updates emitted
    pub toggle_counters: usize,
}

impl InstrumentStats {
    /// Add another body's counts
    pub fn merge(&mut self, other: Self) {
        self.coverage_points += other.coverage_points;
        self.toggle_counters += other.toggle_counters;
    }
}

/// Tree rewriter for one module's bodies
pub struct Instrumenter<'a> {
    config: &'a InstrumentConfig,
    watched: &'a [String],
    rng: &'a mut dyn RngCore,
    stats: InstrumentStats,
}

impl std::fmt::Debug for Instrumenter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrumenter")
            .field("watched", &self.watched)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<'a> Instrumenter<'a> {
    /// Create an instrumenter for a module whose watched fields are `watched`
    pub fn new(
        config: &'a InstrumentConfig,
        watched: &'a [String],
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            config,
            watched,
            rng,
            stats: InstrumentStats::default(),
        }
    }

    /// Counts of everything injected so far
    #[must_use]
    pub const fn stats(&self) -> InstrumentStats {
        self.stats
    }

    /// Statement-list rule: every statement must be an `if`, an assignment or a call
    pub fn instrument_block(&mut self, stmts: &mut [Stmt]) -> VriResult<()> {
        for stmt in stmts.iter_mut() {
            match stmt {
                Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                } => self.instrument_if(cond, then_branch, else_branch)?,
                Stmt::Expr(expr @ Expr::Assign { .. }) => self.instrument_assignment(expr)?,
                Stmt::Expr(expr @ Expr::Call { .. }) => self.instrument_expr(expr)?,
                other => {
                    return Err(VriError::unsupported(
                        other.kind(),
                        print_statement(other, 0),
                    ))
                }
            }
        }
        Ok(())
    }

    fn instrument_if(
        &mut self,
        cond: &mut Expr,
        then_branch: &mut Box<Stmt>,
        else_branch: &mut Option<Box<Stmt>>,
    ) -> VriResult<()> {
        self.instrument_expr(cond)?;
        self.instrument_branch(then_branch)?;
        let else_branch = else_branch.get_or_insert_with(|| Box::new(Stmt::Compound(Vec::new())));
        self.instrument_branch(else_branch)
    }

    /// Turns a branch into `{ coverage_point(); <instrumented statements> }`
    fn instrument_branch(&mut self, branch: &mut Stmt) -> VriResult<()> {
        let mut stmts = match std::mem::replace(branch, Stmt::Empty) {
            Stmt::Compound(stmts) => stmts,
            single => vec![single],
        };
        self.instrument_block(&mut stmts)?;
        stmts.insert(0, Stmt::Expr(self.coverage_point()));
        *branch = Stmt::Compound(stmts);
        Ok(())
    }

    /// Expression rule
    pub fn instrument_expr(&mut self, expr: &mut Expr) -> VriResult<()> {
        match expr {
            Expr::Ident(_) | Expr::Constant(_) | Expr::Field { .. } => Ok(()),
            Expr::Unary { operand, .. } => self.instrument_expr(operand),
            Expr::Index { base, index } => {
                self.instrument_expr(base)?;
                self.instrument_expr(index)
            }
            Expr::Call { callee, args } => {
                self.instrument_expr(callee)?;
                args.iter_mut().try_for_each(|arg| self.instrument_expr(arg))
            }
            Expr::Sequence(items) => items
                .iter_mut()
                .try_for_each(|item| self.instrument_expr(item)),
            Expr::Binary { op, lhs, rhs } => {
                self.instrument_expr(lhs)?;
                self.instrument_expr(rhs)?;
                if op.is_short_circuit() {
                    self.guard(rhs);
                }
                Ok(())
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.instrument_expr(cond)?;
                self.instrument_expr(then_expr)?;
                self.instrument_expr(else_expr)?;
                self.guard(then_expr);
                self.guard(else_expr);
                Ok(())
            }
            Expr::Assign { .. } => Err(VriError::unsupported(
                format!("{} in expression", expr.kind()),
                expr.to_string(),
            )),
        }
    }

    /// Assignment rule
    ///
    /// A store to a watched field goes through the toggle counter, which
    /// evaluates the right-hand side once, counts the bits that change in the
    /// field's storage type and yields the value unchanged: `t = rhs` becomes
    /// `t = __vri_bfcntr.Assign(t, rhs)` and `t -= rhs` becomes
    /// `t -= __vri_bfcntr.SubAssign(t, rhs)`.
    pub fn instrument_assignment(&mut self, expr: &mut Expr) -> VriResult<()> {
        let Expr::Assign { op, target, value } = expr else {
            return Err(VriError::unsupported(expr.kind(), expr.to_string()));
        };
        self.instrument_expr(value)?;
        if !self.is_watched_target(target) {
            return Ok(());
        }

        let method = match *op {
            AssignOp::Assign => self.config.toggle_method.clone(),
            AssignOp::Compound(binary) => {
                format!("{}{}", binary.name(), self.config.toggle_method)
            }
        };
        let original = std::mem::replace(&mut **value, Expr::Sequence(Vec::new()));
        **value = Expr::ident(&self.config.toggle_counter)
            .dot(method)
            .call(vec![(**target).clone(), original]);

        self.stats.toggle_counters += 1;
        trace!(assignee = %target, "toggle counter");
        Ok(())
    }

    /// Whether the base of `target`, below any subscripts, is a watched field of `self`
    fn is_watched_target(&self, target: &Expr) -> bool {
        let mut base = target;
        while let Expr::Index { base: inner, .. } = base {
            base = inner;
        }
        match base {
            Expr::Field {
                base: owner, name, ..
            } => {
                matches!(owner.as_ref(), Expr::Ident(id) if *id == self.config.self_name)
                    && self.watched.iter().any(|field| field == name)
            }
            _ => false,
        }
    }

    /// Replaces `slot` with `(coverage_point(), slot)`
    fn guard(&mut self, slot: &mut Expr) {
        let original = std::mem::replace(slot, Expr::Sequence(Vec::new()));
        *slot = Expr::Sequence(vec![self.coverage_point(), original]);
    }

    /// `__vri_covmap.AddPoint(0x...ULL)` with a fresh identifier
    fn coverage_point(&mut self) -> Expr {
        let id = self.rng.next_u64();
        self.stats.coverage_points += 1;
        trace!("coverage point {id:#018x}");
        Expr::ident(&self.config.coverage_map)
            .dot(&self.config.coverage_method)
            .call(vec![Expr::constant(format!("{id:#018x}ULL"))])
    }
}

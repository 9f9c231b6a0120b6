//! Fixpoint driver over a set of variables.

use crate::relation::Tuple;
use crate::variable::Variable;

/// Default ceiling on fixpoint rounds.
pub const DEFAULT_MAX_ITERATIONS: usize = 1_000_000;

/// Owns a family of [`Variable`]s and drives the semi-naive fixpoint.
///
/// ```rust
/// use arbor_logic::{join_into, ExecutionContext, Iteration};
///
/// let edges: &[(u32, u32)] = &[(1, 2), (2, 3), (3, 4)];
/// let ctx = ExecutionContext::new();
/// let mut iteration = Iteration::new();
/// let edge_var = iteration.variable();
/// let reachable = iteration.variable();
/// edge_var.insert_slice(edges);
/// reachable.insert_slice(edges);
///
/// while iteration.changed() {
///     // reachable(a, c) :- reachable(a, b), edge(b, c)
///     join_into(
///         &reachable,
///         &edge_var,
///         &reachable,
///         |&(_, b)| b,
///         |&(b, _)| b,
///         |&(a, _), &(_, c)| (a, c),
///         &ctx,
///     );
/// }
/// assert_eq!(reachable.complete().len(), 6);
/// ```
pub struct Iteration<T: Tuple> {
    variables: Vec<Variable<T>>,
    max_iterations: usize,
    current: usize,
}

impl<T: Tuple> Default for Iteration<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tuple> Iteration<T> {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            current: 0,
        }
    }

    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::new()
        }
    }

    /// Allocate a variable managed by this iteration.
    pub fn variable(&mut self) -> Variable<T> {
        let variable = Variable::new();
        self.variables.push(variable.clone());
        variable
    }

    /// Step every variable once. Returns `true` while any of them still
    /// derives new facts; returns `false` without stepping once the
    /// iteration cap is reached.
    pub fn changed(&mut self) -> bool {
        if self.current >= self.max_iterations {
            tracing::warn!(
                max_iterations = self.max_iterations,
                "iteration cap reached; fixpoint loop stopped"
            );
            return false;
        }
        self.current += 1;

        let mut any = false;
        for variable in &self.variables {
            if variable.changed() {
                any = true;
            }
        }
        any
    }

    pub fn current_iteration(&self) -> usize {
        self.current
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Reset every variable and the round counter.
    pub fn reset(&mut self) {
        for variable in &self.variables {
            variable.reset();
        }
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_reports_activity_across_variables() {
        let mut iteration: Iteration<u32> = Iteration::new();
        let a = iteration.variable();
        let b = iteration.variable();
        a.insert(1);

        assert!(iteration.changed()); // a moved
        b.insert(2);
        assert!(iteration.changed()); // b moved
        assert!(!iteration.changed()); // quiescent
        assert_eq!(iteration.current_iteration(), 3);
    }

    #[test]
    fn iteration_cap_stops_the_loop_quietly() {
        let mut iteration: Iteration<u32> = Iteration::with_max_iterations(3);
        let v = iteration.variable();

        let mut rounds = 0;
        let mut next = 1_u32;
        while iteration.changed() || rounds == 0 {
            // Keep feeding new facts so the loop would never converge.
            v.insert(next);
            next += 1;
            rounds += 1;
            if rounds > 10 {
                break;
            }
        }
        assert!(rounds <= 4, "cap did not stop the loop ({rounds} rounds)");
        assert_eq!(iteration.current_iteration(), 3);
    }

    #[test]
    fn reset_restarts_the_counter() {
        let mut iteration: Iteration<u32> = Iteration::new();
        let v = iteration.variable();
        v.insert(1);
        assert!(iteration.changed());
        iteration.reset();
        assert_eq!(iteration.current_iteration(), 0);
        assert!(v.stable().is_empty());
    }
}

//! Common traits defining interfaces between planning components

/// A single weighted term of a behaviour cost function
///
/// `C` is whatever the planner scores: for the behaviour layer it is a
/// candidate maneuver together with the scene it was built from.
pub trait CostFunction<C> {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Weight applied to the raw cost
    fn weight(&self) -> f64;

    /// Raw, unweighted cost of the candidate
    fn evaluate(&self, candidate: &C) -> f64;

    /// Weighted contribution to the total cost
    fn weighted(&self, candidate: &C) -> f64 {
        self.weight() * self.evaluate(candidate)
    }
}

use std::fmt::Debug;

use serde::Serialize;

use crate::dispatch::headway::HeadwayPlan;

/// Ranks routes against each other when the fleet cannot cover every route.
///
/// Implementations must be monotonically non decreasing in both demand and
/// importance. Higher scores are served first.
pub trait PriorityScore: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn score(&self, predicted_passengers: u32, importance: f64) -> f64;
}

/// `demand * (1 + importance)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedDemand;

impl PriorityScore for WeightedDemand {
    fn name(&self) -> &'static str {
        "weighted-demand"
    }

    fn score(&self, predicted_passengers: u32, importance: f64) -> f64 {
        f64::from(predicted_passengers) * (1.0 + importance)
    }
}

/// Ignores importance entirely.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemandOnly;

impl PriorityScore for DemandOnly {
    fn name(&self) -> &'static str {
        "demand-only"
    }

    fn score(&self, predicted_passengers: u32, _importance: f64) -> f64 {
        f64::from(predicted_passengers)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedPlan {
    pub plan: HeadwayPlan,
    pub score: f64,
}

/// Orders plans by descending score, ties broken by ascending route id.
pub fn rank(plans: Vec<HeadwayPlan>, scorer: &dyn PriorityScore) -> Vec<RankedPlan> {
    let mut ranked: Vec<RankedPlan> = plans
        .into_iter()
        .map(|plan| {
            let score = scorer.score(plan.predicted_passengers, plan.importance);
            RankedPlan { plan, score }
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.plan.route_id.cmp(&b.plan.route_id))
    });
    ranked
}

/// Whether the fleet is too small for every plan.
pub fn is_scarce(plans: &[HeadwayPlan], available: usize) -> bool {
    let required: u64 = plans.iter().map(|plan| u64::from(plan.required)).sum();
    required > available as u64
}

use bitvec::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::{
    dispatch::priority::RankedPlan,
    shared::{Coordinate, Distance, Headway},
    store::{RouteId, Vehicle, VehicleId},
};

/// The vehicles available at cycle start, with a mask of the ones already
/// claimed this cycle.
///
/// A pool lives for exactly one cycle. Claims made here are tentative until the
/// schedule is committed to the store.
pub struct VehiclePool {
    vehicles: Vec<Vehicle>,
    claimed: BitVec<usize, Lsb0>,
    remaining: usize,
}

impl VehiclePool {
    /// Builds a pool from available vehicles. Vehicles are ordered by id and
    /// duplicate ids are dropped.
    pub fn new(mut vehicles: Vec<Vehicle>) -> Self {
        vehicles.retain(Vehicle::is_available);
        vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        vehicles.dedup_by(|a, b| a.id == b.id);
        let len = vehicles.len();
        Self {
            vehicles,
            claimed: bitvec!(usize, Lsb0; 0; len),
            remaining: len,
        }
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Vehicles not yet claimed this cycle.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Claims the unclaimed vehicle closest to `target`, ties going to the
    /// smaller vehicle id.
    pub fn claim_nearest(&mut self, target: &Coordinate) -> Option<(VehicleId, Distance)> {
        if self.remaining == 0 {
            return None;
        }
        let claimed = &self.claimed;
        // Vehicles are sorted by id, so the index orders ties the same way.
        let (index, distance) = self
            .vehicles
            .par_iter()
            .enumerate()
            .filter(|(index, _)| !claimed[*index])
            .map(|(index, vehicle)| (index, vehicle.location.geodesic_distance(target)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))?;

        self.claimed.set(index, true);
        self.remaining -= 1;
        Some((self.vehicles[index].id.clone(), distance))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAssignment {
    /// Zero based departure slot within the hour.
    pub slot: u32,
    pub vehicle_id: VehicleId,
    /// Empty travel from the vehicle's location to the route start.
    pub deadhead: Distance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteAssignment {
    pub route_id: RouteId,
    pub required: u32,
    pub headway: Option<Headway>,
    pub slots: Vec<SlotAssignment>,
}

impl RouteAssignment {
    /// Slots the pool could not fill.
    pub fn shortfall(&self) -> u32 {
        self.required - self.slots.len() as u32
    }
}

/// Greedy nearest vehicle assignment in the order of `ranked`.
///
/// Routes are served one after another so every route observes the claims of
/// the routes ranked above it.
pub fn assign(ranked: &[RankedPlan], pool: &mut VehiclePool) -> Vec<RouteAssignment> {
    let mut assignments = Vec::with_capacity(ranked.len());
    for RankedPlan { plan, .. } in ranked {
        if plan.required == 0 {
            continue;
        }
        let mut slots = Vec::with_capacity(plan.required as usize);
        for slot in 0..plan.required {
            let Some((vehicle_id, deadhead)) = pool.claim_nearest(&plan.start) else {
                break;
            };
            slots.push(SlotAssignment {
                slot,
                vehicle_id,
                deadhead,
            });
        }

        let assignment = RouteAssignment {
            route_id: plan.route_id.clone(),
            required: plan.required,
            headway: plan.headway,
            slots,
        };
        if assignment.shortfall() > 0 {
            warn!(
                "Route {} short by {} of {} vehicles",
                assignment.route_id,
                assignment.shortfall(),
                assignment.required
            );
        }
        assignments.push(assignment);
    }
    assignments
}

pub use crate::{
    config::Config,
    demand::{DemandForecast, DemandSource},
    dispatch::{
        CancelToken, CycleState, Dispatcher, Rounding, Stage, Trigger,
        priority::{DemandOnly, PriorityScore, WeightedDemand},
        report::{CycleReport, UnmetDemand, UnmetReason},
    },
    feed::Feed,
    shared::{Coordinate, Distance, Headway},
    store::{
        DispatchTrip, FleetStore, MemoryStore, Prediction, Route, TripStatus, Vehicle,
        VehicleStatus,
    },
};

use headway::{shared::Coordinate, store::RouteOverview};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDto {
    pub id: String,
    pub name: String,
    pub density: u32,
    pub active_buses: u32,
}

impl RouteDto {
    pub fn from(overview: &RouteOverview) -> Self {
        Self {
            id: overview.route_id.to_string(),
            name: overview.short_name.clone(),
            density: overview.density,
            active_buses: overview.active_vehicles,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryDto {
    pub route_id: String,
    pub points: Vec<Coordinate>,
}

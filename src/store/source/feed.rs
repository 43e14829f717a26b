use std::{collections::HashMap, sync::Arc, time::Instant};

use tracing::debug;

use crate::{
    config::DEFAULT_CAPACITY,
    feed::{self, Feed},
    shared::Coordinate,
    store::{Depot, MemoryStore, Prediction, Route, Vehicle, is_valid_importance},
};

impl MemoryStore {
    /// Loads a static feed into the store.
    /// Depending on the size of the feed this can be a long blocking function.
    pub fn load_feed(mut self, feed: Feed) -> Result<Self, feed::Error> {
        let stops = self.load_stops(&feed)?;
        self.load_routes(&feed, &stops)?;
        self.load_depots(&feed)?;
        self.load_vehicles(&feed)?;
        self.load_shapes(&feed)?;
        self.load_predictions(&feed)?;
        Ok(self)
    }

    fn load_stops(&self, feed: &Feed) -> Result<HashMap<String, Coordinate>, feed::Error> {
        debug!("Loading stops...");
        let now = Instant::now();
        let mut stops: HashMap<String, Coordinate> = HashMap::new();
        feed.stream_stops(|(_, stop)| {
            stops.insert(stop.stop_id, Coordinate::from((stop.stop_lat, stop.stop_lon)));
        })?;
        debug!("Loading {} stops took {:?}", stops.len(), now.elapsed());
        Ok(stops)
    }

    fn load_routes(
        &mut self,
        feed: &Feed,
        stops: &HashMap<String, Coordinate>,
    ) -> Result<(), feed::Error> {
        debug!("Loading routes...");
        let now = Instant::now();
        let mut routes: Vec<Route> = Vec::new();
        let mut dangling: Option<String> = None;
        let mut invalid: Option<(String, f64)> = None;
        feed.stream_routes(|(_, route)| {
            let importance = route.importance.unwrap_or(0.0);
            if !is_valid_importance(importance) {
                invalid.get_or_insert((route.route_id, importance));
                return;
            }
            let start = stops.get(&route.start_stop_id);
            let end = stops.get(&route.end_stop_id);
            match (start, end) {
                (Some(start), Some(end)) => routes.push(Route {
                    index: 0,
                    id: route.route_id.into(),
                    short_name: route.route_short_name.into(),
                    start: *start,
                    end: *end,
                    importance,
                    capacity: route.capacity.filter(|capacity| *capacity > 0),
                }),
                (None, _) => {
                    dangling.get_or_insert(route.start_stop_id);
                }
                (_, None) => {
                    dangling.get_or_insert(route.end_stop_id);
                }
            }
        })?;
        if let Some((route, importance)) = invalid {
            return Err(feed::Error::InvalidImportance { route, importance });
        }
        if let Some(id) = dangling {
            return Err(feed::Error::DanglingReference {
                table: "routes",
                kind: "stop",
                id,
            });
        }
        routes.into_iter().for_each(|route| {
            self.add_route(route);
        });
        debug!("Loading routes took {:?}", now.elapsed());
        Ok(())
    }

    fn load_depots(&mut self, feed: &Feed) -> Result<(), feed::Error> {
        debug!("Loading depots...");
        let now = Instant::now();
        let mut depots: Vec<Depot> = Vec::new();
        feed.stream_depots(|(_, depot)| {
            depots.push(Depot {
                index: 0,
                id: depot.depot_id.into(),
                name: depot.depot_name.into(),
                coordinate: Coordinate::from((depot.depot_lat, depot.depot_lon)),
            });
        })?;
        depots.into_iter().for_each(|depot| {
            self.add_depot(depot);
        });
        debug!("Loading depots took {:?}", now.elapsed());
        Ok(())
    }

    /// Vehicles start at their home depot.
    fn load_vehicles(&mut self, feed: &Feed) -> Result<(), feed::Error> {
        debug!("Loading vehicles...");
        let now = Instant::now();
        let mut vehicles: Vec<Vehicle> = Vec::new();
        let mut dangling: Option<String> = None;
        feed.stream_vehicles(|(_, vehicle)| match self.depot_by_id(&vehicle.home_depot_id) {
            Some(depot) => vehicles.push(Vehicle {
                index: 0,
                id: vehicle.vehicle_id.into(),
                status: vehicle.status.unwrap_or_default(),
                location: depot.coordinate,
                cell: depot.coordinate.to_grid(),
                home_depot: depot.id.clone(),
                trip: None,
                capacity: vehicle
                    .capacity
                    .filter(|capacity| *capacity > 0)
                    .unwrap_or(DEFAULT_CAPACITY),
            }),
            None => {
                dangling.get_or_insert(vehicle.home_depot_id);
            }
        })?;
        if let Some(id) = dangling {
            return Err(feed::Error::DanglingReference {
                table: "vehicles",
                kind: "depot",
                id,
            });
        }
        vehicles.into_iter().for_each(|vehicle| {
            self.add_vehicle(vehicle);
        });
        debug!("Loading vehicles took {:?}", now.elapsed());
        Ok(())
    }

    fn load_shapes(&mut self, feed: &Feed) -> Result<(), feed::Error> {
        debug!("Loading shapes...");
        let now = Instant::now();
        let mut points: HashMap<Arc<str>, Vec<(u32, Coordinate)>> = HashMap::new();
        let mut dangling: Option<String> = None;
        feed.stream_shapes(|(_, shape)| match self.route_by_id(&shape.route_id) {
            Some(route) => points.entry(route.id.clone()).or_default().push((
                shape.shape_pt_sequence,
                Coordinate::from((shape.shape_pt_lat, shape.shape_pt_lon)),
            )),
            None => {
                dangling.get_or_insert(shape.route_id);
            }
        })?;
        if let Some(id) = dangling {
            return Err(feed::Error::DanglingReference {
                table: "shapes",
                kind: "route",
                id,
            });
        }
        self.shapes = points
            .into_iter()
            .map(|(route_id, mut points)| {
                points.sort_by_key(|(sequence, _)| *sequence);
                let line: Box<[Coordinate]> = points.into_iter().map(|(_, point)| point).collect();
                (route_id, line)
            })
            .collect();
        debug!("Loading shapes took {:?}", now.elapsed());
        Ok(())
    }

    /// Seed predictions go through the same supersede rule as live ones.
    fn load_predictions(&mut self, feed: &Feed) -> Result<(), feed::Error> {
        debug!("Loading predictions...");
        let now = Instant::now();
        let mut predictions: Vec<Prediction> = Vec::new();
        let mut dangling: Option<String> = None;
        feed.stream_predictions(|(_, prediction)| {
            match self.route_by_id(&prediction.route_id) {
                Some(route) => predictions.push(Prediction {
                    route_id: route.id.clone(),
                    target_hour: crate::shared::truncate_to_hour(prediction.target_hour),
                    predicted_passengers: prediction.predicted_passengers,
                    generated_at: prediction.generated_at,
                }),
                None => {
                    dangling.get_or_insert(prediction.route_id);
                }
            }
        })?;
        if let Some(id) = dangling {
            return Err(feed::Error::DanglingReference {
                table: "predictions",
                kind: "route",
                id,
            });
        }
        predictions.into_iter().for_each(|prediction| {
            self.upsert_prediction(prediction);
        });
        debug!("Loading predictions took {:?}", now.elapsed());
        Ok(())
    }
}

pub struct Config {
    pub stops_file_name: String,
    pub routes_file_name: String,
    pub depots_file_name: String,
    pub vehicles_file_name: String,
    pub shapes_file_name: String,
    pub predictions_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stops_file_name: "stops.txt".into(),
            routes_file_name: "routes.txt".into(),
            depots_file_name: "depots.txt".into(),
            vehicles_file_name: "vehicles.txt".into(),
            shapes_file_name: "shapes.txt".into(),
            predictions_file_name: "predictions.txt".into(),
        }
    }
}

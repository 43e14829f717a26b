//! Static fleet feed: stops, routes, depots, vehicles and optional shapes and
//! seed predictions, stored as CSV tables in a zip archive or a directory.

use serde::de::DeserializeOwned;
use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};
use thiserror::Error;
use zip::ZipArchive;

mod config;
pub mod models;
pub use config::*;
pub use models::*;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Could not find file with name: {0}")]
    FileNotFound(String),
    #[error("{table} references unknown {kind} {id}")]
    DanglingReference {
        table: &'static str,
        kind: &'static str,
        id: String,
    },
    #[error("Route {route} has invalid importance {importance}")]
    InvalidImportance { route: String, importance: f64 },
}

#[derive(Default)]
pub enum StorageType {
    #[default]
    None,
    Zip(PathBuf),
    Directory(PathBuf),
}

#[derive(Default)]
pub struct Feed {
    config: Config,
    storage: StorageType,
}

impl Feed {
    pub fn new(config: self::Config) -> Self {
        Self {
            config,
            storage: Default::default(),
        }
    }

    pub fn from_zip<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.storage = StorageType::Zip(path.as_ref().to_path_buf());
        self
    }

    pub fn from_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.storage = StorageType::Directory(path.as_ref().to_path_buf());
        self
    }

    pub fn stream_stops<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, FeedStop)),
    {
        self.stream_table(&self.config.stops_file_name, true, f)
    }

    pub fn stream_routes<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, FeedRoute)),
    {
        self.stream_table(&self.config.routes_file_name, true, f)
    }

    pub fn stream_depots<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, FeedDepot)),
    {
        self.stream_table(&self.config.depots_file_name, true, f)
    }

    pub fn stream_vehicles<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, FeedVehicle)),
    {
        self.stream_table(&self.config.vehicles_file_name, true, f)
    }

    /// Optional, routes without a shape fall back to their two terminals.
    pub fn stream_shapes<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, FeedShape)),
    {
        self.stream_table(&self.config.shapes_file_name, false, f)
    }

    /// Optional seed predictions.
    pub fn stream_predictions<F>(&self, f: F) -> Result<(), self::Error>
    where
        F: FnMut((usize, FeedPrediction)),
    {
        self.stream_table(&self.config.predictions_file_name, false, f)
    }

    fn stream_table<T, F>(&self, file_name: &str, required: bool, f: F) -> Result<(), self::Error>
    where
        T: DeserializeOwned,
        F: FnMut((usize, T)),
    {
        match &self.storage {
            StorageType::None => Ok(()),
            StorageType::Zip(path) => {
                let mut archive = ZipArchive::new(File::open(path)?)?;
                match archive.index_for_name(file_name) {
                    Some(index) => read_csv(archive.by_index(index)?, f),
                    None if required => Err(self::Error::FileNotFound(file_name.to_string())),
                    None => Ok(()),
                }
            }
            StorageType::Directory(path) => {
                let path = path.join(file_name);
                if path.is_file() {
                    read_csv(File::open(path)?, f)
                } else if required {
                    Err(self::Error::FileNotFound(file_name.to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn read_csv<R, T, F>(reader: R, mut f: F) -> Result<(), self::Error>
where
    R: Read,
    T: DeserializeOwned,
    F: FnMut((usize, T)),
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    for (i, record) in reader.deserialize().enumerate() {
        f((i, record?));
    }
    Ok(())
}

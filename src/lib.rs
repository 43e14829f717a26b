pub mod config;
pub mod demand;
pub mod dispatch;
pub mod feed;
pub mod prelude;
pub mod shared;
pub mod store;

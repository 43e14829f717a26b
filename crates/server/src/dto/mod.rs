mod cycle;
mod dispatch;
mod route;
mod vehicle;

pub use cycle::*;
pub use dispatch::*;
pub use route::*;
pub use vehicle::*;

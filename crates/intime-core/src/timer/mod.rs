mod driver;
mod scheduler;

pub use driver::{CountdownDriver, DriverCommand};
pub use scheduler::{CountdownScheduler, SchedulerState, TickToken};

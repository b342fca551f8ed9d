// src/health/mod.rs
mod checker;
mod scheduler;

pub use checker::{health_url, HealthCheckError, HealthCheckOutcome, HealthProbe, HttpHealthCheck, HEALTH_PATH};
pub use scheduler::{ScheduleError, Scheduler, SchedulerHandle};

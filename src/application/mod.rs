pub mod alert_engine;
pub mod monitor;
pub mod prediction_backend;
pub mod prediction_gateway;
pub mod scheduler;
pub mod simulator;

#[cfg(test)]
pub(crate) mod testing;

// Application state for HTTP handlers
use crate::application::monitor::Monitor;
use crate::application::scheduler::UpdateScheduler;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub scheduler: Arc<UpdateScheduler>,
}

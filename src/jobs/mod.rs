use crate::app_context::AppContext;

mod config_reload;
mod maintenance;
mod monitor;

pub fn start_background_jobs(app_context: AppContext) {
    monitor::start_monitor_job(app_context.clone());
    config_reload::start_config_hot_reload_job(app_context.clone());
    maintenance::start_maintenance_job(app_context);
}

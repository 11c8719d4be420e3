pub mod get_samples;
pub mod previous_step;
pub mod route;

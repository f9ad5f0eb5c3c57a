pub mod cloudcorr_errors;
pub mod constants;
pub mod correlation;
pub mod ground;
pub mod platform;
pub mod reporting;
pub mod scenes;
pub mod session;
pub mod station;
pub mod statistics;
pub mod time;

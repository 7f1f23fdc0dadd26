pub mod config;
pub mod model;
pub mod net;
pub mod options;
pub mod report;
pub mod sim;

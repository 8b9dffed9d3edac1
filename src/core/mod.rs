pub mod config;
pub mod feed;
pub mod outage;
pub mod sensor;

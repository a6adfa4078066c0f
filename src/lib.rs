pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod ops;
pub mod output;
pub mod paths;
pub mod report;
pub mod stats;
pub mod timefmt;
pub mod timer;
pub mod validate;
pub mod view;

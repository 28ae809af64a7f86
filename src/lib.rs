pub mod api;
pub mod clock;
pub mod config;
pub mod normalize;
pub mod observability;
pub mod reports;
pub mod storage;
pub mod timefmt;
pub mod upstream;

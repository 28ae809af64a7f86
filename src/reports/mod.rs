//! Report descriptors and the path router that selects them.
//!
//! ## Key Components
//!
//! - [`Report`] - Closed set of upstream report types
//! - [`ReportRouter`] - Ordered path pattern bindings
//! - [`FetchResult`] - Payload plus cache lifetime hint
//! - [`ReportError`] - Validation and upstream failures

mod registry;
mod report;
mod stations;

pub use registry::{PathParams, ReportRouter, RouteMatch};
pub use report::{
    FetchResult, MIN_SERVICE_DATE, Report, ReportError, historical_lifetime, predictive_lifetime,
};
pub use stations::stations_to_json;

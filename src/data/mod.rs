//! Daily-report data model: canonical names, schema resolution, row
//! parsing, hierarchical aggregation and the rolling world summary.

pub mod aggregate;
pub mod canonical;
pub mod row;
pub mod schema;
pub mod summary;

pub mod assignment_routes;
pub mod stats_routes;

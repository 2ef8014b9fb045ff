//! API route declarations (e.g., /api/v1/*)

pub mod jobs_map_routes;
pub mod system_routes;

pub mod dashboard;
pub mod jobs_map;
pub mod system;

pub mod jobs_map;
pub mod map;
pub mod query;

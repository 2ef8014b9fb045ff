pub mod jobs_map_service;
pub mod statements;

pub mod dto;
pub mod jobs_map_error;
pub mod model;
pub mod service;

pub mod jobs_map_request;

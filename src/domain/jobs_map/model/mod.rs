pub mod hex_job_table;
pub mod jobs_map_view;
pub mod records;

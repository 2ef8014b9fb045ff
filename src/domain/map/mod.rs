pub mod kepler_config;
pub mod map_renderer;

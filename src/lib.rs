pub mod config;
pub mod fetch_error;
pub mod fetcher;
pub mod normals;
pub mod output_writer;
pub mod services;
pub mod utils;

// BigQuery REST client
pub mod bigquery_client;
pub mod bigquery_dto;

pub mod credentials;
pub mod warehouse_client;
pub mod warehouse_error;

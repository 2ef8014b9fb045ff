pub mod query_executor;

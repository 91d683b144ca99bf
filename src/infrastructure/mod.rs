// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_response;
pub mod ndjson_stream;
pub mod prediction_client;

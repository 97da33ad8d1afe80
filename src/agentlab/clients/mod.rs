pub mod azure_openai;
pub mod http_pool;

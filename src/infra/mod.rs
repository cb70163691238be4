pub mod document_output_adapter;
pub mod http_url_verifier;
pub mod schema_validator;

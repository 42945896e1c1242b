mod headers;
mod http_transport;

pub use headers::build_request_headers;
pub use http_transport::HttpTransport;

//! Adapters for HTTP-shaped triggers and the parsing they share

pub mod alb;
pub mod api_gateway;
pub mod helpers;
pub mod parsing;
pub mod websocket;

pub use alb::AlbAdapter;
pub use api_gateway::{ApiGatewayAdapter, ApiVersion};
pub use websocket::WebSocketAdapter;

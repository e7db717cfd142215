//! Realtime channel layer: transport, framing, dispatch and connection
//! lifecycle.
//!
//! The channel is a persistent WebSocket to the marketplace hub carrying
//! server → client listing events. Nothing is sent client → server.

pub mod connection;
pub mod dispatcher;
pub mod messages;
pub mod policy;
pub mod transport;

pub use connection::{ChannelConfig, ConnectionManager, ConnectionState, RealtimeChannel};
pub use dispatcher::{BindingOwner, EventDispatcher, Handler, HandlerTable};
pub use policy::ReconnectPolicy;
pub use transport::{Frame, FrameStream, Transport, WsTransport};

pub mod transport;

pub use transport::{
    transport, PlaybackState, TransportCommand, TransportEndpoint, TransportEvent, TransportHandle,
};

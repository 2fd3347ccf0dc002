//! Transport contract for the GDS protocol engine.
//!
//! The engine treats the physical channel as an external collaborator: a
//! [`Communicator`] opens and closes the link, carries raw frames, and
//! raises attach/detach/frame notifications through a [`TransportObserver`].
//! Concrete implementations (USB HID, serial) live with the platform's
//! hardware integration layer, not here.

pub mod cancel;
pub mod error;
pub mod identity;
pub mod traits;

pub use cancel::CancelToken;
pub use error::{Result, TransportError};
pub use identity::DeviceIdentity;
pub use traits::{Communicator, TransportObserver};

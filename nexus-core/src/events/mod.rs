//! Typed plugin lifecycle events
//!
//! Every observable plugin transition (load pass, install, uninstall, update,
//! health sweep) is published as a [`PluginEvent`] on an [`EventBus`].
//! Subscribers get a live broadcast stream; late joiners can replay from a
//! sequence number.

mod bus;
mod memory;
mod types;

pub use bus::{EventBus, EventSeq};
pub use memory::MemoryEventBus;
pub use types::PluginEvent;

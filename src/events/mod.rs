//! # Events Module
//!
//! Event-driven progress reporting.
//!
//! ## Design
//! The engine emits events through a channel rather than logging to a
//! process-wide singleton, so any front end (CLI progress bar, log sink,
//! test harness) can subscribe.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Validate(ValidateEvent::FileChecked { path, status, .. }) => {
//!                 println!("{}: {:?}", path.display(), status)
//!             }
//!             _ => {}
//!         }
//!     }
//! });
//!
//! engine.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;

// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

use std::sync::{Arc, Mutex, PoisonError, Weak};

use derive_more::Display;
use thiserror::Error;

mod message;
pub use self::message::{status, MidiChannel, MidiMessage, MidiMessageError, MidiMessageKind};

mod mock;
pub use self::mock::MockMidiAdapter;

mod queue;
pub use self::queue::{
    midi_input_queue, MidiInputQueue, MidiInputQueueReceiver, ReceivedMidiMessage,
};

#[cfg(feature = "midir")]
mod midir;
#[cfg(feature = "midir")]
pub use self::midir::{MidirDeviceManager, MidirInputAdapter};


/// Identifies the port a message has been received from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{name}")]
pub struct MidiPortDescriptor {
    pub name: String,
}

#[derive(Debug, Error)]
pub enum MidiDeviceError {
    #[error("port \"{name}\" not found")]
    PortNotFound { name: String },

    #[cfg(feature = "midir")]
    #[error(transparent)]
    Init(#[from] ::midir::InitError),

    #[cfg(feature = "midir")]
    #[error(transparent)]
    Connect(#[from] ::midir::ConnectError<::midir::MidiInput>),

    #[cfg(feature = "midir")]
    #[error(transparent)]
    PortInfo(#[from] ::midir::PortInfoError),
}

/// Consumer of incoming MIDI messages.
///
/// Invoked synchronously by the device. Hardware devices invoke it from
/// a driver thread that is neither the UI thread nor any other thread
/// under the control of the caller.
pub trait MidiInputCallback: Send {
    /// The `source` is `None` if the message did not originate from
    /// a hardware port, e.g. when injected by a test.
    fn handle_incoming_midi_message(
        &mut self,
        source: Option<&MidiPortDescriptor>,
        message: &MidiMessage,
    );
}

impl<F> MidiInputCallback for F
where
    F: FnMut(Option<&MidiPortDescriptor>, &MidiMessage) + Send,
{
    fn handle_incoming_midi_message(
        &mut self,
        source: Option<&MidiPortDescriptor>,
        message: &MidiMessage,
    ) {
        self(source, message);
    }
}

/// Callback owned by the caller.
pub type SharedMidiInputCallback = Arc<Mutex<dyn MidiInputCallback>>;

/// Non-owning reference to a [`SharedMidiInputCallback`] held by devices.
///
/// Messages are silently skipped after the owner has dropped the callback.
pub type MidiInputCallbackRef = Weak<Mutex<dyn MidiInputCallback>>;

/// Obtain a non-owning reference for registering a callback at a device.
#[must_use]
pub fn callback_ref<C>(callback: &Arc<Mutex<C>>) -> MidiInputCallbackRef
where
    C: MidiInputCallback + 'static,
{
    let callback: Weak<Mutex<C>> = Arc::downgrade(callback);
    callback
}

/// Invoke the callback if it is still alive.
///
/// Returns `true` if the callback has been invoked.
pub(crate) fn dispatch_midi_message(
    callback: &MidiInputCallbackRef,
    source: Option<&MidiPortDescriptor>,
    message: &MidiMessage,
) -> bool {
    let Some(callback) = callback.upgrade() else {
        log::trace!("Dropped MIDI message {message:x?}: callback is gone");
        return false;
    };
    // A panicking callback must not stop the delivery of subsequent messages
    let mut callback = callback.lock().unwrap_or_else(PoisonError::into_inner);
    callback.handle_incoming_midi_message(source, message);
    true
}

/// Input device with a start/stop lifecycle.
///
/// Devices are either active (started) or inactive (stopped). Both
/// transitions are idempotent. Messages are only delivered while
/// the device is active.
pub trait MidiDeviceAdapter {
    /// Start listening for incoming messages.
    fn start(&mut self) -> Result<(), MidiDeviceError>;

    /// Stop listening for incoming messages.
    ///
    /// The callback is not invoked anymore after this function returns.
    fn stop(&mut self);

    #[must_use]
    fn is_started(&self) -> bool;

    /// Device name
    ///
    /// Immutable during the lifetime of the device.
    #[must_use]
    fn identifier(&self) -> &str;

    /// Register a callback, replacing the previous one.
    ///
    /// The previous callback is not notified.
    fn set_callback(&mut self, callback: MidiInputCallbackRef);

    fn clear_callback(&mut self);

    /// Feed a message into the device as if it was received.
    ///
    /// Only supported by test doubles, hardware devices ignore it.
    /// The `timestamp` in seconds must not be negative.
    fn inject_message(&mut self, message: &MidiMessage, timestamp: f64);
}

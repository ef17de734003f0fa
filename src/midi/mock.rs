// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

use super::{
    dispatch_midi_message, MidiDeviceAdapter, MidiDeviceError, MidiInputCallbackRef, MidiMessage,
};

const DEFAULT_IDENTIFIER: &str = "MockMIDIDevice";

/// Test double for MIDI input devices.
///
/// Messages are injected explicitly instead of being received from
/// hardware and are dispatched synchronously on the calling thread.
///
/// Not synchronized, supposed to be used from a single thread.
#[derive(Debug)]
pub struct MockMidiAdapter {
    identifier: String,
    callback: Option<MidiInputCallbackRef>,
    started: bool,
    message_count: u64,
}

impl MockMidiAdapter {
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            callback: None,
            started: false,
            message_count: 0,
        }
    }

    /// Number of messages accepted while started.
    ///
    /// Counts messages regardless of whether a callback was registered.
    #[must_use]
    pub const fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn reset_message_count(&mut self) {
        self.message_count = 0;
    }
}

impl Default for MockMidiAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTIFIER)
    }
}

impl MidiDeviceAdapter for MockMidiAdapter {
    fn start(&mut self) -> Result<(), MidiDeviceError> {
        if !self.started {
            log::debug!("{identifier}: started", identifier = self.identifier);
            self.started = true;
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.started {
            log::debug!("{identifier}: stopped", identifier = self.identifier);
            self.started = false;
        }
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn set_callback(&mut self, callback: MidiInputCallbackRef) {
        self.callback = Some(callback);
    }

    fn clear_callback(&mut self) {
        self.callback = None;
    }

    fn inject_message(&mut self, message: &MidiMessage, timestamp: f64) {
        debug_assert!(timestamp >= 0.0);
        if !self.started {
            // Stopped devices don't deliver anything
            return;
        }
        self.message_count += 1;
        // TODO: Record the timestamp for verifying time-dependent behavior
        // like channel auto-hiding or latency in tests.
        log::trace!(
            "{identifier}@{timestamp}: injected {message:x?}",
            identifier = self.identifier
        );
        if let Some(callback) = &self.callback {
            dispatch_midi_message(callback, None, message);
        }
    }
}

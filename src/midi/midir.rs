// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};

use super::{
    dispatch_midi_message, MidiDeviceAdapter, MidiDeviceError, MidiInputCallbackRef, MidiMessage,
    MidiPortDescriptor,
};

const DEFAULT_CLIENT_NAME: &str = "midiview";

#[derive(Debug, Default)]
struct DispatchState {
    started: bool,
    callback: Option<MidiInputCallbackRef>,
}

/// State shared between the device and the driver thread.
///
/// The lock is held while dispatching a message. Acquiring it on the
/// other side thus waits for an in-flight callback invocation to finish.
#[derive(Debug, Default)]
struct SharedDispatchState(Mutex<DispatchState>);

impl SharedDispatchState {
    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Owned by the midir connection and moved into the driver thread
struct DriverContext {
    port: MidiPortDescriptor,
    state: Arc<SharedDispatchState>,
}

// Adapter for the midir callback closure
fn handle_input(micros: u64, input: &[u8], context: &mut DriverContext) {
    let message = match MidiMessage::from_bytes(input) {
        Ok(message) => message,
        Err(err) => {
            log::warn!(
                "{port}@{micros}: Failed to decode MIDI input {input:x?}: {err}",
                port = context.port
            );
            return;
        }
    };
    log::trace!("{port}@{micros}: Received MIDI input {input:x?}", port = context.port);
    let state = context.state.lock();
    if !state.started {
        return;
    }
    if let Some(callback) = &state.callback {
        dispatch_midi_message(callback, Some(&context.port), &message);
    }
}

/// MIDI input device driven by [`midir`].
///
/// The registered callback is invoked on the thread of the MIDI driver.
#[allow(missing_debug_implementations)]
pub struct MidirInputAdapter {
    client_name: String,
    port: MidiPortDescriptor,
    input_port: MidiInputPort,
    state: Arc<SharedDispatchState>,
    connection: Option<MidiInputConnection<DriverContext>>,
}

impl MidirInputAdapter {
    #[must_use]
    pub fn new(
        client_name: impl Into<String>,
        port_name: String,
        input_port: MidiInputPort,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            port: MidiPortDescriptor { name: port_name },
            input_port,
            state: Default::default(),
            connection: None,
        }
    }

    #[must_use]
    pub const fn port(&self) -> &MidiPortDescriptor {
        &self.port
    }

    /// Check if the port of this device is still present.
    #[must_use]
    pub fn is_available(&self, device_manager: &MidirDeviceManager) -> bool {
        device_manager.is_available(&self.port.name)
    }
}

impl MidiDeviceAdapter for MidirInputAdapter {
    fn start(&mut self) -> Result<(), MidiDeviceError> {
        if self.connection.is_some() {
            return Ok(());
        }
        let mut input = MidiInput::new(&self.client_name)?;
        input.ignore(Ignore::None);
        // Enable dispatching before connecting to not miss any messages
        self.state.lock().started = true;
        let context = DriverContext {
            port: self.port.clone(),
            state: Arc::clone(&self.state),
        };
        let connection =
            match input.connect(&self.input_port, &self.port.name, handle_input, context) {
                Ok(connection) => connection,
                Err(err) => {
                    self.state.lock().started = false;
                    return Err(err.into());
                }
            };
        log::debug!("{port}: started", port = self.port);
        self.connection = Some(connection);
        Ok(())
    }

    fn stop(&mut self) {
        // Blocks until a pending dispatch has finished, every
        // subsequent invocation of the driver callback is a no-op.
        self.state.lock().started = false;
        let Some(connection) = self.connection.take() else {
            return;
        };
        // Closing the connection tears down the driver callback
        let (_input, _context) = connection.close();
        log::debug!("{port}: stopped", port = self.port);
    }

    fn is_started(&self) -> bool {
        self.connection.is_some()
    }

    fn identifier(&self) -> &str {
        &self.port.name
    }

    fn set_callback(&mut self, callback: MidiInputCallbackRef) {
        self.state.lock().callback = Some(callback);
    }

    fn clear_callback(&mut self) {
        self.state.lock().callback = None;
    }

    fn inject_message(&mut self, message: &MidiMessage, _timestamp: f64) {
        log::debug!(
            "{port}: Ignoring injected message {message:x?}",
            port = self.port
        );
    }
}

impl Drop for MidirInputAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Enumerates input ports and creates [`MidirInputAdapter`]s.
#[allow(missing_debug_implementations)]
pub struct MidirDeviceManager {
    client_name: String,
    input: MidiInput,
}

impl MidirDeviceManager {
    pub fn new() -> Result<Self, MidiDeviceError> {
        Self::with_client_name(DEFAULT_CLIENT_NAME)
    }

    pub fn with_client_name(client_name: impl Into<String>) -> Result<Self, MidiDeviceError> {
        let client_name = client_name.into();
        let mut input = MidiInput::new(&format!("{client_name} port watcher"))?;
        input.ignore(Ignore::None);
        Ok(Self { client_name, input })
    }

    fn named_input_ports(&self) -> impl Iterator<Item = (String, MidiInputPort)> + '_ {
        self.input.ports().into_iter().filter_map(move |port| {
            let port_name = self.input.port_name(&port).ok()?;
            Some((port_name, port))
        })
    }

    #[must_use]
    pub fn input_port_names(&self) -> Vec<String> {
        self.named_input_ports()
            .map(|(port_name, _)| port_name)
            .collect()
    }

    /// Check if an input port with the given name is present.
    ///
    /// Used for detecting when a disconnected device reappears.
    #[must_use]
    pub fn is_available(&self, port_name: &str) -> bool {
        self.named_input_ports()
            .any(|(name, _)| name == port_name)
    }

    /// Create a device for the input port with the given name.
    pub fn input_adapter(&self, port_name: &str) -> Result<MidirInputAdapter, MidiDeviceError> {
        let Some((port_name, input_port)) = self
            .named_input_ports()
            .find(|(name, _)| name == port_name)
        else {
            return Err(MidiDeviceError::PortNotFound {
                name: port_name.to_owned(),
            });
        };
        log::debug!("Found MIDI input port \"{port_name}\"");
        Ok(MidirInputAdapter::new(
            self.client_name.clone(),
            port_name,
            input_port,
        ))
    }

    /// Create a device for each input port.
    #[must_use]
    pub fn input_adapters(&self) -> Vec<MidirInputAdapter> {
        self.named_input_ports()
            .map(|(port_name, input_port)| {
                log::debug!("Found MIDI input port \"{port_name}\"");
                MidirInputAdapter::new(self.client_name.clone(), port_name, input_port)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{callback_ref, MidiInputCallback};

    const NOTE_ON: [u8; 3] = [0x90, 60, 100];

    #[derive(Debug, Default)]
    struct RecordingCallback {
        received: Vec<(Option<MidiPortDescriptor>, Vec<u8>)>,
    }

    impl MidiInputCallback for RecordingCallback {
        fn handle_incoming_midi_message(
            &mut self,
            source: Option<&MidiPortDescriptor>,
            message: &MidiMessage,
        ) {
            self.received
                .push((source.cloned(), message.raw_data().to_vec()));
        }
    }

    fn driver_context(callback: &Arc<Mutex<RecordingCallback>>) -> DriverContext {
        let state = Arc::new(SharedDispatchState::default());
        state.lock().callback = Some(callback_ref(callback));
        DriverContext {
            port: MidiPortDescriptor {
                name: "Keyboard".to_owned(),
            },
            state,
        }
    }

    #[test]
    fn dispatch_only_while_started() {
        let callback = Arc::new(Mutex::new(RecordingCallback::default()));
        let mut context = driver_context(&callback);

        handle_input(0, &NOTE_ON, &mut context);
        assert!(callback.lock().unwrap().received.is_empty());

        context.state.lock().started = true;
        handle_input(1, &NOTE_ON, &mut context);

        context.state.lock().started = false;
        handle_input(2, &NOTE_ON, &mut context);

        let callback = callback.lock().unwrap();
        assert_eq!(
            vec![(
                Some(MidiPortDescriptor {
                    name: "Keyboard".to_owned(),
                }),
                NOTE_ON.to_vec(),
            )],
            callback.received
        );
    }

    #[test]
    fn undecodable_input_is_not_dispatched() {
        let callback = Arc::new(Mutex::new(RecordingCallback::default()));
        let mut context = driver_context(&callback);
        context.state.lock().started = true;

        handle_input(0, &[], &mut context);
        // Running status without a preceding status byte
        handle_input(1, &[60, 100], &mut context);

        assert!(callback.lock().unwrap().received.is_empty());
    }

    #[test]
    fn dispatch_without_callback() {
        let callback = Arc::new(Mutex::new(RecordingCallback::default()));
        let mut context = driver_context(&callback);
        context.state.lock().started = true;
        context.state.lock().callback = None;

        handle_input(0, &NOTE_ON, &mut context);

        assert!(callback.lock().unwrap().received.is_empty());
    }
}

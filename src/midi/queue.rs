// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

//! Hand over received messages from the driver thread to the consumer thread.

use crossbeam_channel::{Receiver, Sender};

use super::{MidiInputCallback, MidiMessage, MidiPortDescriptor};
use crate::TimeSource;

/// A message stamped with the time of arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMidiMessage {
    /// Time of arrival in seconds, see [`TimeSource`].
    pub ts: f64,
    pub source: Option<MidiPortDescriptor>,
    pub message: MidiMessage,
}

/// Sending side, registered as the callback of one or more devices.
#[derive(Debug)]
pub struct MidiInputQueue<T> {
    time_source: T,
    sender: Sender<ReceivedMidiMessage>,
}

/// Receiving side, drained by the consumer.
#[derive(Debug)]
pub struct MidiInputQueueReceiver {
    receiver: Receiver<ReceivedMidiMessage>,
}

/// Create a new unbounded queue.
///
/// Messages are stamped with the current time of `time_source`
/// when they are received.
#[must_use]
pub fn midi_input_queue<T>(time_source: T) -> (MidiInputQueue<T>, MidiInputQueueReceiver)
where
    T: TimeSource + Send,
{
    let (sender, receiver) = crossbeam_channel::unbounded();
    (
        MidiInputQueue {
            time_source,
            sender,
        },
        MidiInputQueueReceiver { receiver },
    )
}

impl<T> MidiInputCallback for MidiInputQueue<T>
where
    T: TimeSource + Send,
{
    fn handle_incoming_midi_message(
        &mut self,
        source: Option<&MidiPortDescriptor>,
        message: &MidiMessage,
    ) {
        let received = ReceivedMidiMessage {
            ts: self.time_source.current_time(),
            source: source.cloned(),
            message: message.clone(),
        };
        if let Err(err) = self.sender.try_send(received) {
            log::debug!("Discarding received MIDI message: {err}");
        }
    }
}

impl MidiInputQueueReceiver {
    /// Receive the next pending message without blocking.
    ///
    /// Returns `None` if the queue is empty or if all senders are gone.
    #[must_use]
    pub fn try_recv(&self) -> Option<ReceivedMidiMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all currently pending messages without blocking.
    pub fn drain(&self) -> impl Iterator<Item = ReceivedMidiMessage> + '_ {
        self.receiver.try_iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

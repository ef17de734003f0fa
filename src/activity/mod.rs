// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

//! Per-port and per-channel activity of received messages
//!
//! All times are in seconds as provided by a [`TimeSource`].

use std::collections::BTreeMap;

use crate::{
    midi::ReceivedMidiMessage, MidiChannel, MidiInputCallback, MidiMessage, MidiMessageKind,
    MidiPortDescriptor, TimeSource,
};

#[cfg(test)]
mod tests;

/// Key for messages that have not been received from a port.
pub const UNNAMED_PORT: &str = "";

const CLOCK_TICKS_PER_BEAT: u32 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityMonitorConfig {
    /// Channels without any message for longer than this duration
    /// in seconds are hidden.
    pub channel_timeout: f64,
}

impl ActivityMonitorConfig {
    pub const DEFAULT_CHANNEL_TIMEOUT: f64 = 2.0;
}

impl Default for ActivityMonitorConfig {
    fn default() -> Self {
        Self {
            channel_timeout: Self::DEFAULT_CHANNEL_TIMEOUT,
        }
    }
}

/// A value together with the time it has been received.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamped<T> {
    pub ts: f64,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteActivity {
    pub velocity: u8,
    /// `false` after a note off has been received
    pub on: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelActivity {
    pub last_activity: f64,
    /// Indexed by note number
    pub notes: BTreeMap<u8, Stamped<NoteActivity>>,
    /// Indexed by controller number
    pub controllers: BTreeMap<u8, Stamped<u8>>,
    pub program: Option<Stamped<u8>>,
    /// 14-bit value, 8192 is the center position
    pub pitch_bend: Option<Stamped<u16>>,
    pub pressure: Option<Stamped<u8>>,
}

impl ChannelActivity {
    fn record(&mut self, ts: f64, message: &MidiMessage) {
        self.last_activity = ts;
        let stamped = |value| Stamped { ts, value };
        match message.kind() {
            kind @ (MidiMessageKind::NoteOn | MidiMessageKind::NoteOff) => {
                let (Some(note), Some(velocity)) = (message.note_number(), message.velocity())
                else {
                    return;
                };
                let on = kind == MidiMessageKind::NoteOn;
                self.notes.insert(
                    note,
                    Stamped {
                        ts,
                        value: NoteActivity { velocity, on },
                    },
                );
            }
            MidiMessageKind::ControlChange => {
                if let (Some(controller), Some(value)) =
                    (message.controller_number(), message.controller_value())
                {
                    self.controllers.insert(controller, stamped(value));
                }
            }
            MidiMessageKind::ProgramChange => {
                self.program = message.program_number().map(stamped);
            }
            MidiMessageKind::ChannelPressure | MidiMessageKind::PolyAftertouch => {
                self.pressure = message.pressure_value().map(stamped);
            }
            MidiMessageKind::PitchBend => {
                self.pitch_bend = message
                    .pitch_bend_value()
                    .map(|value| Stamped { ts, value });
            }
            _ => (),
        }
    }

    #[must_use]
    pub fn is_visible(&self, now: f64, timeout: f64) -> bool {
        now - self.last_activity <= timeout
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClockActivity {
    pub last_tick: f64,
    pub tick_count: u64,
    /// `Some(true)` after start/continue, `Some(false)` after stop
    pub running: Option<bool>,
    /// Tempo measured over the last complete beat
    pub bpm: Option<f64>,
    beat_start: Option<f64>,
    beat_ticks: u32,
}

impl ClockActivity {
    fn tick(&mut self, ts: f64) {
        self.last_tick = ts;
        self.tick_count += 1;
        let Some(beat_start) = self.beat_start else {
            self.beat_start = Some(ts);
            return;
        };
        self.beat_ticks += 1;
        if self.beat_ticks < CLOCK_TICKS_PER_BEAT {
            return;
        }
        let beat_duration = ts - beat_start;
        if beat_duration > 0.0 {
            self.bpm = Some(60.0 / beat_duration);
        }
        self.beat_start = Some(ts);
        self.beat_ticks = 0;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortActivity {
    pub last_activity: f64,
    pub message_count: u64,
    pub channels: BTreeMap<MidiChannel, ChannelActivity>,
    pub clock: Option<ClockActivity>,
    /// The most recent system exclusive payload
    pub sysex: Option<Stamped<Box<[u8]>>>,
}

impl PortActivity {
    fn record(&mut self, ts: f64, message: &MidiMessage) {
        self.last_activity = ts;
        self.message_count += 1;
        if let Some(channel) = message.channel() {
            self.channels
                .entry(channel)
                .or_default()
                .record(ts, message);
            return;
        }
        match message.kind() {
            MidiMessageKind::Clock => {
                self.clock.get_or_insert_with(Default::default).tick(ts);
            }
            MidiMessageKind::Start | MidiMessageKind::Continue => {
                self.clock.get_or_insert_with(Default::default).running = Some(true);
            }
            MidiMessageKind::Stop => {
                self.clock.get_or_insert_with(Default::default).running = Some(false);
            }
            MidiMessageKind::SystemExclusive => {
                self.sysex = message.sysex_data().map(|data| Stamped {
                    ts,
                    value: data.into(),
                });
            }
            _ => (),
        }
    }

    pub fn visible_channels(
        &self,
        now: f64,
        timeout: f64,
    ) -> impl Iterator<Item = MidiChannel> + '_ {
        self.channels
            .iter()
            .filter(move |(_, activity)| activity.is_visible(now, timeout))
            .map(|(channel, _)| *channel)
    }
}

/// Collects the activity of received messages for display.
///
/// Could either be registered as the callback of devices or be
/// fed with messages that have been drained from a
/// [`crate::midi::MidiInputQueue`].
#[derive(Debug)]
pub struct ActivityMonitor<T> {
    config: ActivityMonitorConfig,
    time_source: T,
    ports: BTreeMap<String, PortActivity>,
}

impl<T> ActivityMonitor<T>
where
    T: TimeSource,
{
    #[must_use]
    pub fn new(config: ActivityMonitorConfig, time_source: T) -> Self {
        Self {
            config,
            time_source,
            ports: Default::default(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ActivityMonitorConfig {
        &self.config
    }

    #[must_use]
    pub const fn time_source(&self) -> &T {
        &self.time_source
    }

    /// Record a message that has been received just now.
    pub fn record(&mut self, port_name: &str, message: &MidiMessage) {
        let ts = self.time_source.current_time();
        self.record_at(port_name, ts, message);
    }

    /// Record a message that has been received at the given time.
    pub fn record_at(&mut self, port_name: &str, ts: f64, message: &MidiMessage) {
        debug_assert!(ts >= 0.0);
        if let Some(port) = self.ports.get_mut(port_name) {
            port.record(ts, message);
            return;
        }
        log::debug!("First message from port \"{port_name}\"");
        let mut port = PortActivity::default();
        port.record(ts, message);
        self.ports.insert(port_name.to_owned(), port);
    }

    pub fn record_received(&mut self, received: &ReceivedMidiMessage) {
        let port_name = received
            .source
            .as_ref()
            .map_or(UNNAMED_PORT, |source| source.name.as_str());
        self.record_at(port_name, received.ts, &received.message);
    }

    #[must_use]
    pub fn port(&self, port_name: &str) -> Option<&PortActivity> {
        self.ports.get(port_name)
    }

    pub fn ports(&self) -> impl Iterator<Item = (&str, &PortActivity)> {
        self.ports
            .iter()
            .map(|(port_name, activity)| (port_name.as_str(), activity))
    }

    /// Channels of a port with recent activity, in ascending order.
    #[must_use]
    pub fn visible_channels(&self, port_name: &str) -> Vec<MidiChannel> {
        let Some(port) = self.ports.get(port_name) else {
            return Vec::new();
        };
        let now = self.time_source.current_time();
        port.visible_channels(now, self.config.channel_timeout)
            .collect()
    }

    /// Discard the state of all channels that are no longer visible.
    ///
    /// Returns the number of discarded channels.
    pub fn expire(&mut self) -> usize {
        let now = self.time_source.current_time();
        let timeout = self.config.channel_timeout;
        let mut expired = 0;
        for (port_name, port) in &mut self.ports {
            port.channels.retain(|channel, activity| {
                let visible = activity.is_visible(now, timeout);
                if !visible {
                    log::debug!("{port_name}: channel {channel} expired");
                    expired += 1;
                }
                visible
            });
        }
        expired
    }

    /// Forget all ports, e.g. after the devices have been reconnected.
    pub fn clear(&mut self) {
        self.ports.clear();
    }
}

impl<T> MidiInputCallback for ActivityMonitor<T>
where
    T: TimeSource + Send,
{
    fn handle_incoming_midi_message(
        &mut self,
        source: Option<&MidiPortDescriptor>,
        message: &MidiMessage,
    ) {
        let port_name = source.map_or(UNNAMED_PORT, |source| source.name.as_str());
        self.record(port_name, message);
    }
}

// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

use derive_more::{Deref, Display};
use strum::{Display as StrumDisplay, IntoStaticStr};
use thiserror::Error;

/// Status bytes
pub mod status {
    // Channel voice messages (upper nibble, lower nibble is the channel)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_PRESSURE: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    // System common
    pub const SYSEX_START: u8 = 0xF0;
    pub const SYSEX_END: u8 = 0xF7;

    // System real-time
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;
}

const DATA_MASK: u8 = 0x7f;

const PITCH_BEND_MAX: u16 = 0x3fff;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessageError {
    #[error("empty message")]
    Empty,

    #[error("missing status byte (first byte = {first_byte:#04x})")]
    MissingStatus { first_byte: u8 },

    #[error("invalid channel {channel}")]
    InvalidChannel { channel: u8 },
}

/// A MIDI channel in the range 1..=16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct MidiChannel(u8);

impl MidiChannel {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(16);

    #[must_use]
    pub const fn new(number: u8) -> Option<Self> {
        if number >= Self::MIN.0 && number <= Self::MAX.0 {
            Some(Self(number))
        } else {
            None
        }
    }

    /// Extract the channel from the lower nibble of a status byte.
    #[must_use]
    pub const fn from_status(status: u8) -> Self {
        Self((status & 0x0f) + 1)
    }

    /// 1-based channel number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    #[must_use]
    const fn status_nibble(self) -> u8 {
        self.0 - 1
    }

    /// All 16 channels in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN.0..=Self::MAX.0).map(Self)
    }
}

impl TryFrom<u8> for MidiChannel {
    type Error = MidiMessageError;

    fn try_from(channel: u8) -> Result<Self, Self::Error> {
        Self::new(channel).ok_or(MidiMessageError::InvalidChannel { channel })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum MidiMessageKind {
    NoteOn,
    NoteOff,
    PolyAftertouch,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
    SystemExclusive,
    Clock,
    Start,
    Continue,
    Stop,
    Other,
}

/// Immutable MIDI message: a status byte followed by data bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref)]
#[deref(forward)]
pub struct MidiMessage {
    bytes: Box<[u8]>,
}

// Maps [0.0, 1.0] onto [0, 127]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_u7(value: f32) -> u8 {
    (value * 127.0).round().clamp(0.0, 127.0) as u8
}

impl MidiMessage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MidiMessageError> {
        let Some(&first_byte) = bytes.first() else {
            return Err(MidiMessageError::Empty);
        };
        if first_byte & 0x80 == 0 {
            return Err(MidiMessageError::MissingStatus { first_byte });
        }
        Ok(Self {
            bytes: bytes.into(),
        })
    }

    fn channel_voice(
        status: u8,
        channel: u8,
        data: &[u8],
    ) -> Result<Self, MidiMessageError> {
        let channel = MidiChannel::try_from(channel)?;
        let mut bytes = Vec::with_capacity(1 + data.len());
        bytes.push(status | channel.status_nibble());
        bytes.extend(data.iter().map(|byte| byte & DATA_MASK));
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Note on with a velocity in the interval [0, 1].
    pub fn note_on(channel: u8, note: u8, velocity: f32) -> Result<Self, MidiMessageError> {
        Self::channel_voice(status::NOTE_ON, channel, &[note, float_to_u7(velocity)])
    }

    /// Note off with a release velocity in the interval [0, 1].
    pub fn note_off(channel: u8, note: u8, velocity: f32) -> Result<Self, MidiMessageError> {
        Self::channel_voice(status::NOTE_OFF, channel, &[note, float_to_u7(velocity)])
    }

    pub fn aftertouch(channel: u8, note: u8, pressure: u8) -> Result<Self, MidiMessageError> {
        Self::channel_voice(status::POLY_AFTERTOUCH, channel, &[note, pressure])
    }

    pub fn control_change(
        channel: u8,
        controller: u8,
        value: u8,
    ) -> Result<Self, MidiMessageError> {
        Self::channel_voice(status::CONTROL_CHANGE, channel, &[controller, value])
    }

    pub fn program_change(channel: u8, program: u8) -> Result<Self, MidiMessageError> {
        Self::channel_voice(status::PROGRAM_CHANGE, channel, &[program])
    }

    pub fn channel_pressure(channel: u8, pressure: u8) -> Result<Self, MidiMessageError> {
        Self::channel_voice(status::CHANNEL_PRESSURE, channel, &[pressure])
    }

    /// Pitch bend with a 14-bit value, 8192 is the center position.
    ///
    /// Values above 16383 are clamped.
    #[allow(clippy::cast_possible_truncation)]
    pub fn pitch_bend(channel: u8, value: u16) -> Result<Self, MidiMessageError> {
        let value = value.min(PITCH_BEND_MAX);
        let lsb = (value & u16::from(DATA_MASK)) as u8;
        let msb = (value >> 7) as u8;
        Self::channel_voice(status::PITCH_BEND, channel, &[lsb, msb])
    }

    /// System exclusive message framed by start and end bytes.
    #[must_use]
    pub fn sysex(data: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(data.len() + 2);
        bytes.push(status::SYSEX_START);
        bytes.extend(data.iter().map(|byte| byte & DATA_MASK));
        bytes.push(status::SYSEX_END);
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    fn single_byte(status: u8) -> Self {
        Self {
            bytes: Box::new([status]),
        }
    }

    #[must_use]
    pub fn clock() -> Self {
        Self::single_byte(status::TIMING_CLOCK)
    }

    #[must_use]
    pub fn start() -> Self {
        Self::single_byte(status::START)
    }

    #[must_use]
    pub fn continue_() -> Self {
        Self::single_byte(status::CONTINUE)
    }

    #[must_use]
    pub fn stop() -> Self {
        Self::single_byte(status::STOP)
    }

    #[must_use]
    pub fn raw_data(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    fn data_byte(&self, index: usize) -> Option<u8> {
        self.bytes.get(index + 1).copied()
    }

    #[must_use]
    pub fn kind(&self) -> MidiMessageKind {
        let status_byte = self.status();
        let has_data = |len| self.bytes.len() > len;
        match status_byte {
            status::SYSEX_START => return MidiMessageKind::SystemExclusive,
            status::TIMING_CLOCK => return MidiMessageKind::Clock,
            status::START => return MidiMessageKind::Start,
            status::CONTINUE => return MidiMessageKind::Continue,
            status::STOP => return MidiMessageKind::Stop,
            _ => (),
        }
        match status_byte & 0xf0 {
            // Note on with velocity 0 is a note off
            status::NOTE_ON if has_data(2) && self.bytes[2] == 0 => MidiMessageKind::NoteOff,
            status::NOTE_ON if has_data(2) => MidiMessageKind::NoteOn,
            status::NOTE_OFF if has_data(2) => MidiMessageKind::NoteOff,
            status::POLY_AFTERTOUCH if has_data(2) => MidiMessageKind::PolyAftertouch,
            status::CONTROL_CHANGE if has_data(2) => MidiMessageKind::ControlChange,
            status::PROGRAM_CHANGE if has_data(1) => MidiMessageKind::ProgramChange,
            status::CHANNEL_PRESSURE if has_data(1) => MidiMessageKind::ChannelPressure,
            status::PITCH_BEND if has_data(2) => MidiMessageKind::PitchBend,
            _ => MidiMessageKind::Other,
        }
    }

    #[must_use]
    pub fn is_note_on(&self) -> bool {
        self.kind() == MidiMessageKind::NoteOn
    }

    #[must_use]
    pub fn is_note_off(&self) -> bool {
        self.kind() == MidiMessageKind::NoteOff
    }

    /// The channel of channel voice messages.
    #[must_use]
    pub fn channel(&self) -> Option<MidiChannel> {
        let status_byte = self.status();
        (status::NOTE_OFF..status::SYSEX_START)
            .contains(&status_byte)
            .then_some(MidiChannel::from_status(status_byte))
    }

    #[must_use]
    pub fn note_number(&self) -> Option<u8> {
        match self.kind() {
            MidiMessageKind::NoteOn | MidiMessageKind::NoteOff | MidiMessageKind::PolyAftertouch => {
                self.data_byte(0)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn velocity(&self) -> Option<u8> {
        match self.kind() {
            MidiMessageKind::NoteOn | MidiMessageKind::NoteOff => self.data_byte(1),
            _ => None,
        }
    }

    /// Velocity in the interval [0, 1].
    #[must_use]
    pub fn float_velocity(&self) -> Option<f32> {
        self.velocity().map(|velocity| f32::from(velocity) / 127.0)
    }

    #[must_use]
    pub fn controller_number(&self) -> Option<u8> {
        (self.kind() == MidiMessageKind::ControlChange)
            .then(|| self.data_byte(0))
            .flatten()
    }

    #[must_use]
    pub fn controller_value(&self) -> Option<u8> {
        (self.kind() == MidiMessageKind::ControlChange)
            .then(|| self.data_byte(1))
            .flatten()
    }

    #[must_use]
    pub fn program_number(&self) -> Option<u8> {
        (self.kind() == MidiMessageKind::ProgramChange)
            .then(|| self.data_byte(0))
            .flatten()
    }

    /// Pressure of channel pressure and polyphonic aftertouch messages.
    #[must_use]
    pub fn pressure_value(&self) -> Option<u8> {
        match self.kind() {
            MidiMessageKind::ChannelPressure => self.data_byte(0),
            MidiMessageKind::PolyAftertouch => self.data_byte(1),
            _ => None,
        }
    }

    /// 14-bit pitch bend value, 8192 is the center position.
    #[must_use]
    pub fn pitch_bend_value(&self) -> Option<u16> {
        if self.kind() != MidiMessageKind::PitchBend {
            return None;
        }
        let lsb = u16::from(self.bytes[1] & DATA_MASK);
        let msb = u16::from(self.bytes[2] & DATA_MASK);
        Some((msb << 7) | lsb)
    }

    /// Payload of system exclusive messages without the framing bytes.
    #[must_use]
    pub fn sysex_data(&self) -> Option<&[u8]> {
        if self.kind() != MidiMessageKind::SystemExclusive {
            return None;
        }
        let payload = &self.bytes[1..];
        Some(payload.strip_suffix(&[status::SYSEX_END]).unwrap_or(payload))
    }
}

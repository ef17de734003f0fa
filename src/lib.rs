// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

#![allow(rustdoc::invalid_rust_codeblocks)]
#![doc = include_str!("../README.md")]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(rustdoc::broken_intra_doc_links)]
// Repetitions of module/type names occur frequently when using many
// modules for keeping the size of the source files handy. Often
// types have the same name as their parent module.
#![allow(clippy::module_name_repetitions)]
// Repeating the type name in `..Default::default()` expressions
// is not needed since the context is obvious.
#![allow(clippy::default_trait_access)]

pub mod activity;
pub use self::activity::{
    ActivityMonitor, ActivityMonitorConfig, ChannelActivity, ClockActivity, NoteActivity,
    PortActivity, Stamped,
};

pub mod file;
pub use self::file::{file_patterns, is_readable_file, FileSelector, MockFileSelector};

pub mod midi;
pub use self::midi::{
    callback_ref, MidiChannel, MidiDeviceAdapter, MidiDeviceError, MidiInputCallback,
    MidiInputCallbackRef, MidiMessage, MidiMessageError, MidiMessageKind, MidiPortDescriptor,
    MockMidiAdapter, SharedMidiInputCallback,
};

pub mod time;
pub use self::time::{SimulatedTimeSource, SystemTimeSource, TimeError, TimeSource};

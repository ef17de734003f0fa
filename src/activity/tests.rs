// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

use std::sync::{Arc, Mutex};

use float_cmp::approx_eq;

use super::*;
use crate::{
    callback_ref, midi::midi_input_queue, MidiDeviceAdapter as _, MockMidiAdapter,
    SimulatedTimeSource,
};

const PORT: &str = "Keyboard";

type SimulatedActivityMonitor = ActivityMonitor<Arc<SimulatedTimeSource>>;

fn new_monitor() -> (Arc<SimulatedTimeSource>, SimulatedActivityMonitor) {
    let time_source = Arc::new(SimulatedTimeSource::new());
    let monitor = ActivityMonitor::new(Default::default(), Arc::clone(&time_source));
    (time_source, monitor)
}

fn channel(number: u8) -> MidiChannel {
    MidiChannel::new(number).unwrap()
}

#[test]
fn default_config() {
    assert!(approx_eq!(
        f64,
        2.0,
        ActivityMonitorConfig::default().channel_timeout
    ));
}

#[test]
fn channels_are_hidden_after_inactivity() {
    let (time_source, mut monitor) = new_monitor();
    monitor.record(PORT, &MidiMessage::note_on(1, 60, 0.8).unwrap());
    time_source.advance_time(1.0).unwrap();
    monitor.record(PORT, &MidiMessage::control_change(10, 7, 100).unwrap());
    assert_eq!(
        vec![channel(1), channel(10)],
        monitor.visible_channels(PORT)
    );

    // Exactly at the timeout the channel is still visible
    time_source.advance_time(1.0).unwrap();
    assert_eq!(
        vec![channel(1), channel(10)],
        monitor.visible_channels(PORT)
    );

    time_source.advance_time(0.5).unwrap();
    assert_eq!(vec![channel(10)], monitor.visible_channels(PORT));

    time_source.advance_time(1.0).unwrap();
    assert!(monitor.visible_channels(PORT).is_empty());

    // Activity revives the channel
    monitor.record(PORT, &MidiMessage::note_off(1, 60, 0.0).unwrap());
    assert_eq!(vec![channel(1)], monitor.visible_channels(PORT));
}

#[test]
fn expire_discards_hidden_channels() {
    let (time_source, mut monitor) = new_monitor();
    monitor.record(PORT, &MidiMessage::program_change(3, 5).unwrap());
    monitor.record("Pads", &MidiMessage::channel_pressure(4, 20).unwrap());
    time_source.advance_time(1.5).unwrap();
    monitor.record(PORT, &MidiMessage::pitch_bend(5, 0).unwrap());
    time_source.advance_time(1.0).unwrap();

    assert_eq!(2, monitor.expire());

    let port = monitor.port(PORT).unwrap();
    assert_eq!(vec![&channel(5)], port.channels.keys().collect::<Vec<_>>());
    assert!(monitor.port("Pads").unwrap().channels.is_empty());
    assert_eq!(0, monitor.expire());
}

#[test]
fn latest_values_per_channel() {
    let (time_source, mut monitor) = new_monitor();
    monitor.record(PORT, &MidiMessage::note_on(2, 64, 1.0).unwrap());
    monitor.record(PORT, &MidiMessage::control_change(2, 1, 10).unwrap());
    time_source.advance_time(0.25).unwrap();
    monitor.record(PORT, &MidiMessage::note_off(2, 64, 0.5).unwrap());
    monitor.record(PORT, &MidiMessage::control_change(2, 1, 20).unwrap());
    monitor.record(PORT, &MidiMessage::pitch_bend(2, 8192).unwrap());
    monitor.record(PORT, &MidiMessage::program_change(2, 7).unwrap());
    monitor.record(PORT, &MidiMessage::aftertouch(2, 64, 90).unwrap());

    let port = monitor.port(PORT).unwrap();
    assert_eq!(7, port.message_count);
    let activity = &port.channels[&channel(2)];
    assert!(approx_eq!(f64, 0.25, activity.last_activity));

    let note = activity.notes[&64];
    assert!(!note.value.on);
    assert_eq!(64, note.value.velocity);
    assert!(approx_eq!(f64, 0.25, note.ts));

    assert_eq!(20, activity.controllers[&1].value);
    assert_eq!(Some(8192), activity.pitch_bend.map(|stamped| stamped.value));
    assert_eq!(Some(7), activity.program.map(|stamped| stamped.value));
    assert_eq!(Some(90), activity.pressure.map(|stamped| stamped.value));
}

#[test]
fn clock_tempo_and_transport() {
    let (time_source, mut monitor) = new_monitor();
    monitor.record(PORT, &MidiMessage::start());
    // 120 BPM = 0.5 s per beat
    let tick_interval = 0.5 / f64::from(CLOCK_TICKS_PER_BEAT);
    for _ in 0..=CLOCK_TICKS_PER_BEAT {
        monitor.record(PORT, &MidiMessage::clock());
        time_source.advance_time(tick_interval).unwrap();
    }

    let clock = monitor.port(PORT).unwrap().clock.as_ref().unwrap();
    assert_eq!(Some(true), clock.running);
    assert_eq!(u64::from(CLOCK_TICKS_PER_BEAT) + 1, clock.tick_count);
    assert!(approx_eq!(f64, 120.0, clock.bpm.unwrap(), epsilon = 0.001));
    assert!(monitor.visible_channels(PORT).is_empty());

    monitor.record(PORT, &MidiMessage::stop());
    let clock = monitor.port(PORT).unwrap().clock.as_ref().unwrap();
    assert_eq!(Some(false), clock.running);
}

#[test]
fn latest_sysex_payload() {
    let (_, mut monitor) = new_monitor();
    monitor.record(PORT, &MidiMessage::sysex(&[0x43, 0x10]));
    monitor.record(PORT, &MidiMessage::sysex(&[0x7e, 0x00, 0x06]));
    let sysex = monitor.port(PORT).unwrap().sysex.as_ref().unwrap();
    assert_eq!(&[0x7e, 0x00, 0x06], &*sysex.value);
}

#[test]
fn record_drained_messages() {
    let (time_source, mut monitor) = new_monitor();
    let (queue, receiver) = midi_input_queue(Arc::clone(&time_source));
    let queue = Arc::new(Mutex::new(queue));
    let mut device = MockMidiAdapter::new("TestDevice");
    device.set_callback(callback_ref(&queue));
    device.start().unwrap();

    time_source.set_time(10.0).unwrap();
    device.inject_message(&MidiMessage::note_on(6, 40, 0.5).unwrap(), 10.0);
    for received in receiver.drain() {
        monitor.record_received(&received);
    }

    // Injected messages have no source port
    let port = monitor.port(UNNAMED_PORT).unwrap();
    assert!(approx_eq!(f64, 10.0, port.last_activity));
    assert_eq!(vec![channel(6)], monitor.visible_channels(UNNAMED_PORT));
}

#[test]
fn monitor_as_device_callback() {
    let time_source = Arc::new(SimulatedTimeSource::new());
    let monitor = Arc::new(Mutex::new(ActivityMonitor::new(
        ActivityMonitorConfig {
            channel_timeout: 0.5,
        },
        Arc::clone(&time_source),
    )));
    let mut device = MockMidiAdapter::new("TestDevice");
    device.set_callback(callback_ref(&monitor));
    device.start().unwrap();

    device.inject_message(&MidiMessage::note_on(1, 60, 0.8).unwrap(), 0.0);
    time_source.advance_time(0.75).unwrap();
    device.inject_message(&MidiMessage::note_on(2, 62, 0.8).unwrap(), 0.75);

    let monitor = monitor.lock().unwrap();
    assert_eq!(vec![channel(2)], monitor.visible_channels(UNNAMED_PORT));
    assert_eq!(2, monitor.port(UNNAMED_PORT).unwrap().channels.len());
    assert_eq!(1, monitor.ports().count());
}

#[test]
fn unknown_port_has_no_visible_channels() {
    let (_, monitor) = new_monitor();
    assert!(monitor.port("Nowhere").is_none());
    assert!(monitor.visible_channels("Nowhere").is_empty());
}

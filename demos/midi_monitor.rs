// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    io::{stdin, stdout, Write as _},
    sync::{Arc, Mutex},
    time::Duration,
};

use midiview::{
    callback_ref,
    midi::{midi_input_queue, MidirDeviceManager, MidirInputAdapter},
    ActivityMonitor, MidiDeviceAdapter as _, SystemTimeSource, TimeSource as _,
};

const RUN_DURATION_SECS: f64 = 60.0;

fn main() {
    pretty_env_logger::init();
    match run() {
        Ok(()) => (),
        Err(err) => println!("Error: {err}"),
    }
}

fn choose_device(device_manager: &MidirDeviceManager) -> anyhow::Result<MidirInputAdapter> {
    let mut devices = device_manager.input_adapters();
    match devices.len() {
        0 => anyhow::bail!("no input port found"),
        1 => {
            println!(
                "Choosing the only available input port: {port}",
                port = devices[0].port()
            );
            Ok(devices.remove(0))
        }
        _ => {
            println!("\nAvailable input ports:");
            for (i, device) in devices.iter().enumerate() {
                println!("{i}: {port}", port = device.port());
            }
            print!("Please select a port: ");
            stdout().flush()?;
            let mut input = String::new();
            stdin().read_line(&mut input)?;
            let index = input.trim().parse::<usize>()?;
            anyhow::ensure!(index < devices.len(), "invalid port {index}");
            Ok(devices.remove(index))
        }
    }
}

fn run() -> anyhow::Result<()> {
    // Errors of midir are not Sync on all platforms
    let device_manager = MidirDeviceManager::new()
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    let mut device = choose_device(&device_manager)?;

    let time_source = Arc::new(SystemTimeSource::new());
    let (queue, receiver) = midi_input_queue(Arc::clone(&time_source));
    let queue = Arc::new(Mutex::new(queue));
    device.set_callback(callback_ref(&queue));
    let mut monitor = ActivityMonitor::new(Default::default(), Arc::clone(&time_source));

    println!("{port}: starting", port = device.port());
    device.start().map_err(|err| anyhow::anyhow!("{err}"))?;

    println!("Monitoring MIDI input for {RUN_DURATION_SECS} s...");
    while time_source.current_time() < RUN_DURATION_SECS {
        for received in receiver.drain() {
            println!(
                "{ts:>9.3} {port}: {kind} {data:02x?}",
                ts = received.ts,
                port = received
                    .source
                    .as_ref()
                    .map_or("-", |source| source.name.as_str()),
                kind = received.message.kind(),
                data = received.message.raw_data(),
            );
            monitor.record_received(&received);
        }
        monitor.expire();

        match (device.is_available(&device_manager), device.is_started()) {
            (true, false) => {
                println!("{port}: reconnecting", port = device.port());
                device.start().map_err(|err| anyhow::anyhow!("{err}"))?;
            }
            (false, true) => {
                println!("{port}: disconnected", port = device.port());
                device.stop();
                monitor.clear();
            }
            _ => (),
        }

        std::thread::sleep(Duration::from_millis(10));
    }

    device.stop();
    for (port_name, activity) in monitor.ports() {
        let channels = activity
            .channels
            .keys()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        println!(
            "{port_name}: {count} message(s), active channels: [{channels}]",
            count = activity.message_count,
            channels = channels.join(", "),
        );
    }
    Ok(())
}

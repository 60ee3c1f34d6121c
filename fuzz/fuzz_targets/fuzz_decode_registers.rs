#![no_main]
use libfuzzer_sys::fuzz_target;
use solarman_modbus::catalog::{DeviceCatalog, LSW3};
use solarman_modbus::decoder::{decode, decode_partial};

fuzz_target!(|data: &[u8]| {
    let Some((&shift, rest)) = data.split_first() else {
        return;
    };

    // Interpret the input as u16 register stream in big-endian pairs
    let regs: Vec<u16> = rest
        .chunks_exact(2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .collect();

    let Ok(catalog) = DeviceCatalog::builtin() else {
        return;
    };
    let Ok(device) = catalog.device(LSW3) else {
        return;
    };

    // Exercise short blocks and shifted base registers
    let base = device.base_register.wrapping_add(u16::from(shift) % 8);
    let strict = decode(&regs, base, &device.sensors);
    let report = decode_partial(&regs, base, &device.sensors);
    assert_eq!(strict.is_ok(), report.is_complete());
    assert_eq!(
        report.readings.len() + report.failures.len(),
        device.sensors.len()
    );
});

//! Trace replay through the simulated PIO block.

use ifp_spectrum::trace::{Channel, parse_trace, replay};
use ifp_spectrum::{Decoder, Overlay, OverlayWindow, RomcsLatch, ShadowRom};
use rp2350_pio::{PioChannel, SimPio, StateMachine};

const BOOT: &str = r#"
# port read issued before the fetch reaches the capture program
{"channel": "iorq", "access": "read", "address": 31}
{"channel": "mreq", "access": "read", "address": 0}
{"channel": "mreq", "access": "read", "address": 102}
{"channel": "mreq", "access": "write", "address": 32768, "data": 255}
"#;

#[test]
fn memory_cycles_are_answered_first() {
    let rom = ShadowRom::diagnostic(OverlayWindow::SPECTRUM_ROM);
    let pio = SimPio::new();
    let mut decoder = Decoder::new(
        &rom,
        PioChannel::new(&pio, StateMachine::SM0),
        PioChannel::new(&pio, StateMachine::SM1),
        Overlay::new(RomcsLatch::new(), false),
    );

    let events = parse_trace(BOOT).expect("trace");
    let lines = replay(&mut decoder, &pio, &events);

    let order: Vec<(Channel, u16)> = lines.iter().map(|l| (l.channel, l.address)).collect();
    assert_eq!(
        order,
        vec![
            (Channel::Mreq, 0x0000),
            (Channel::Mreq, 0x0066),
            (Channel::Mreq, 0x8000),
            (Channel::Iorq, 0x001F),
        ]
    );

    // Overlay off: the first fetch goes to the host ROM, the NMI vector
    // switches the overlay on.
    assert!(!lines[0].drive);
    assert!(!lines[0].overlay);
    assert!(lines[1].drive);
    assert_eq!(lines[1].data, rom.read(0x0066));
    assert!(lines[1].overlay);
    assert_eq!(lines[2].response, 0);
    assert_eq!(lines[3].response, 0);
    assert_eq!(pio.rx_level(StateMachine::SM0), 0);
    assert_eq!(pio.take_response(StateMachine::SM0), None);
}

#[test]
fn long_trace_overflowing_the_fifos_is_fully_serviced() {
    let rom = ShadowRom::diagnostic(OverlayWindow::SPECTRUM_ROM);
    let pio = SimPio::new();
    let mut decoder = Decoder::new(
        &rom,
        PioChannel::new(&pio, StateMachine::SM2),
        PioChannel::new(&pio, StateMachine::SM3),
        Overlay::new(RomcsLatch::new(), true),
    );

    let text: String = (0..100u16)
        .map(|a| format!("{{\"channel\": \"mreq\", \"access\": \"read\", \"address\": {a}}}\n"))
        .collect();
    let events = parse_trace(&text).expect("trace");
    let lines = replay(&mut decoder, &pio, &events);

    assert_eq!(lines.len(), 100);
    for (address, line) in (0u16..).zip(&lines) {
        assert_eq!(line.address, address);
        assert_eq!(line.data, rom.read(address));
        assert!(line.drive);
    }
    assert_eq!(decoder.stats().memory, 100);
}

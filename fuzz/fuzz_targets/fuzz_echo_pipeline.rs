//! Fuzz target: echo edges → `ranging::evaluate`
//!
//! Plays arbitrary edge sequences through the interrupt handler and
//! evaluates whatever reaches the raw queue.  Asserts that nothing panics,
//! that only `Ok` readings move the filter, and that `Ok` readings stay
//! inside the sensor's range.
//!
//! cargo fuzz run fuzz_echo_pipeline

#![no_main]

use std::cell::RefCell;

use libfuzzer_sys::fuzz_target;
use rangeguide::sensors::{echo_link, EchoIsr, EchoReceiver};
use rangeguide::sensors::ema::EmaFilter;
use rangeguide::sensors::ranging::{self, MAX_DISTANCE_MM, MIN_DISTANCE_MM};
use rangeguide::sensors::MeasurementStatus;

thread_local! {
    // The raw queue is leaked on creation, so build it once.
    static LINK: RefCell<(EchoIsr, EchoReceiver)> = RefCell::new(echo_link());
}

fuzz_target!(|data: &[u8]| LINK.with_borrow_mut(|(isr, rx)| {
    // Close any echo left open by the previous input.
    isr.on_edge(false, 0);
    rx.discard_all();

    let Some((&head, edges)) = data.split_first() else {
        return;
    };
    // -200..=600 tenths of °C.
    let temp = i16::from(head) * 3 - 200;
    let speed = ranging::speed_of_sound_mm_per_s(temp);

    let mut filter = EmaFilter::new(u16::from(head) * 4);
    let mut now = 0u64;

    for chunk in edges.chunks_exact(3) {
        let level_high = chunk[0] & 1 == 1;
        now = now.wrapping_add(u64::from(u16::from_le_bytes([chunk[1], chunk[2]])));
        isr.on_edge(level_high, now);

        while let Some(raw) = rx.try_receive() {
            let before = filter.previous();
            let r = ranging::evaluate(&raw, speed, &mut filter);
            if r.status == MeasurementStatus::Ok {
                assert!((MIN_DISTANCE_MM..=MAX_DISTANCE_MM).contains(&r.distance_mm));
            } else {
                assert_eq!(filter.previous(), before, "{:?} moved the filter", r.status);
            }
        }
    }
}));

//! Fuzz target: `serialize_grb` + `Encoder::encode_frame`
//!
//! Any pixel buffer and brightness must serialize to exactly three bytes
//! per LED and encode to one RMT item per bit plus the latch, with every
//! item equal to either the zero or the one symbol.
//!
//! cargo fuzz run fuzz_strip_encode

#![no_main]

use libfuzzer_sys::fuzz_target;
use rangeguide::drivers::led_strip::Rgb;
use rangeguide::drivers::ws2812::{self, Encoder, BYTES_PER_LED, WS2812_TIMING};
use rangeguide::pins::LED_RMT_RESOLUTION_HZ;

fuzz_target!(|data: &[u8]| {
    let Some((&brightness, rest)) = data.split_first() else {
        return;
    };
    let pixels: Vec<Rgb> = rest
        .chunks_exact(3)
        .map(|c| Rgb::new(c[0], c[1], c[2]))
        .collect();

    let mut wire = Vec::new();
    ws2812::serialize_grb(&pixels, brightness, &mut wire);
    assert_eq!(wire.len(), pixels.len() * BYTES_PER_LED);

    let enc = Encoder::new(&WS2812_TIMING, LED_RMT_RESOLUTION_HZ);
    let mut items = Vec::new();
    enc.encode_frame(&wire, &mut items);
    assert_eq!(items.len(), wire.len() * 8 + 1);

    let (latch, bits) = items.split_last().expect("latch always present");
    assert_eq!(*latch, enc.latch.packed());
    let (zero, one) = (enc.zero.packed(), enc.one.packed());
    assert!(bits.iter().all(|&i| i == zero || i == one));
});

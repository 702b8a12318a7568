fn main() {
    // Only the firmware build links against ESP-IDF; host tests skip the
    // sysenv propagation entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

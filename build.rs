fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (tests, simulation) run without the ESP-IDF toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

fn main() {
    println!("cargo:rerun-if-changed=bindings.h");

    // Host builds (tests, fuzzing) have no ESP-IDF toolchain to describe.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

//! Build script for Microphone Monitor
//!
//! Embeds the application manifest (common controls v6 for balloon tips,
//! per-monitor DPI awareness) and links the Windows libraries used by the
//! tray and Core Audio code.

fn main() {
    println!("cargo:rerun-if-changed=resources/app.rc");
    println!("cargo:rerun-if-changed=resources/app.manifest");

    // Only run on Windows
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    let _ = embed_resource::compile("resources/app.rc", embed_resource::NONE);

    // Link Windows libraries
    println!("cargo:rustc-link-lib=ole32");
    println!("cargo:rustc-link-lib=user32");
    println!("cargo:rustc-link-lib=shell32");
    println!("cargo:rustc-link-lib=advapi32");
}

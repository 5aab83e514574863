use std::{env, path::PathBuf};

// ffmpeg-sys-next does the actual library discovery. On Windows it only
// finds a vcpkg install through FFMPEG_DIR, so point the user at it.
fn main() {
    for var in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!("cargo:warning=FFMPEG_DIR is not set; framestep needs FFmpeg development libraries.");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if candidate.exists() {
        println!(
            "cargo:warning=Found vcpkg FFmpeg at {}; set FFMPEG_DIR to it if linking fails.",
            candidate.display()
        );
    } else {
        println!(
            "cargo:warning=No vcpkg FFmpeg install at {}.",
            candidate.display()
        );
    }
}

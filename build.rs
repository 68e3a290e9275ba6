use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

/// Windows builds find FFmpeg through `FFMPEG_DIR`; point at a vcpkg
/// install when one is around so a missing variable is easy to fix.
fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let building_for_windows = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");
    if !building_for_windows || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!(
            "cargo:warning=imgseq needs FFmpeg: set FFMPEG_DIR, or install ffmpeg with vcpkg and set VCPKG_ROOT."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| String::from("x64-windows"));
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    report_candidate(&candidate);
}

fn report_candidate(candidate: &Path) {
    if !candidate.is_dir() {
        println!(
            "cargo:warning=No vcpkg FFmpeg found under {}; set FFMPEG_DIR explicitly.",
            candidate.display()
        );
        return;
    }

    println!(
        "cargo:warning=Found vcpkg FFmpeg at {0}; export FFMPEG_DIR={0} to use it.",
        candidate.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=Dynamic vcpkg FFmpeg builds also need VCPKGRS_DYNAMIC=1.");
    }
}

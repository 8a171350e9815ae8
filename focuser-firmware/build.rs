//! Build script for focuser-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates focuser.toml at compile time
//! - Generates the board constants included by `src/config.rs`

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// RP2040 flash erase sector size
const FLASH_SECTOR_SIZE: i64 = 4096;

/// Flash size of the supported boards
const FLASH_SIZE: i64 = 2 * 1024 * 1024;

/// The position map needs at least two erase sectors
const MIN_STORAGE_SECTORS: i64 = 2;

/// Longest firmware version string the protocol layer keeps
const MAX_VERSION_LEN: usize = 8;

fn main() {
    setup_linker();
    let config = validate_config();
    generate_constants(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Load and validate focuser.toml, returning the parsed document
fn validate_config() -> toml::Value {
    println!("cargo:rerun-if-changed=focuser.toml");

    let config_path = Path::new("focuser.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: focuser.toml not found!                                  ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a focuser.toml configuration file.        ║\n\
            ║  Please create one in the focuser-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read focuser.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in focuser.toml                      ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_required_sections(&config, &mut errors);
    validate_serial(&config, &mut errors);
    validate_focuser(&config, &mut errors);
    validate_stepper(&config, &mut errors);
    validate_storage(&config, &mut errors);
    report_errors(&errors);

    println!("cargo:warning=focuser.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Abort the build listing every validation error
fn report_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: Invalid focuser.toml                                     ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn validate_required_sections(config: &toml::Value, errors: &mut Vec<String>) {
    for section in ["serial", "focuser", "stepper", "storage"] {
        match config.get(section) {
            Some(toml::Value::Table(_)) => {}
            Some(_) => errors.push(format!("[{}] must be a table", section)),
            None => errors.push(format!("Missing [{}] section", section)),
        }
    }
}

fn integer(config: &toml::Value, section: &str, key: &str) -> Option<i64> {
    config.get(section)?.get(key)?.as_integer()
}

fn validate_serial(config: &toml::Value, errors: &mut Vec<String>) {
    match integer(config, "serial", "baudrate") {
        Some(baud) if (1200..=921_600).contains(&baud) => {}
        Some(_) => errors.push("[serial] baudrate must be 1200-921600".into()),
        None => errors.push("[serial] missing integer 'baudrate'".into()),
    }
}

fn validate_focuser(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(section) = config.get("focuser") else {
        return;
    };

    match section.get("firmware_version").and_then(|v| v.as_str()) {
        Some(v) if v.is_empty() => {
            errors.push("[focuser] firmware_version must not be empty".into())
        }
        Some(v) if v.len() > MAX_VERSION_LEN || !v.is_ascii() => errors.push(format!(
            "[focuser] firmware_version must be ASCII, at most {} chars",
            MAX_VERSION_LEN
        )),
        Some(_) => {}
        None => errors.push("[focuser] missing string 'firmware_version'".into()),
    }

    match integer(config, "focuser", "poll_interval_ms") {
        Some(ms) if (1..=1000).contains(&ms) => {}
        Some(_) => errors.push("[focuser] poll_interval_ms must be 1-1000".into()),
        None => errors.push("[focuser] missing integer 'poll_interval_ms'".into()),
    }

    match integer(config, "focuser", "initial_speed") {
        Some(speed) if (0..=255).contains(&speed) => {}
        Some(_) => errors.push("[focuser] initial_speed must be 0-255".into()),
        None => errors.push("[focuser] missing integer 'initial_speed'".into()),
    }
}

fn validate_stepper(config: &toml::Value, errors: &mut Vec<String>) {
    let inverted = config
        .get("stepper")
        .and_then(|s| s.get("enable_inverted"))
        .and_then(|v| v.as_bool());
    if inverted.is_none() {
        errors.push("[stepper] missing boolean 'enable_inverted'".into());
    }
}

fn validate_storage(config: &toml::Value, errors: &mut Vec<String>) {
    let last_start = FLASH_SIZE - MIN_STORAGE_SECTORS * FLASH_SECTOR_SIZE;
    match integer(config, "storage", "position_offset") {
        Some(offset) if offset % FLASH_SECTOR_SIZE != 0 => {
            errors.push("[storage] position_offset must be 4096-byte aligned".into())
        }
        Some(offset) if !(0..=last_start).contains(&offset) => {
            errors.push("[storage] position_offset must leave two sectors of flash".into())
        }
        Some(_) => {}
        None => errors.push("[storage] missing integer 'position_offset'".into()),
    }
}

/// Write `focuser_config.rs` into OUT_DIR
///
/// Only called after validation, so every lookup succeeds.
fn generate_constants(config: &toml::Value) {
    let baudrate = integer(config, "serial", "baudrate").unwrap();
    let version = config["focuser"]["firmware_version"].as_str().unwrap();
    let poll_interval_ms = integer(config, "focuser", "poll_interval_ms").unwrap();
    let initial_speed = integer(config, "focuser", "initial_speed").unwrap();
    let enable_inverted = config["stepper"]["enable_inverted"].as_bool().unwrap();
    let position_offset = integer(config, "storage", "position_offset").unwrap();

    let generated = format!(
        "// Generated from focuser.toml by build.rs\n\
         pub const UART_BAUDRATE: u32 = {baudrate};\n\
         pub const FIRMWARE_VERSION: &str = {version:?};\n\
         pub const POLL_INTERVAL_MS: u32 = {poll_interval_ms};\n\
         pub const INITIAL_SPEED: u8 = {initial_speed};\n\
         pub const ENABLE_INVERTED: bool = {enable_inverted};\n\
         pub const FLASH_SIZE: usize = {FLASH_SIZE};\n\
         pub const POSITION_FLASH_RANGE: core::ops::Range<u32> = {position_offset:#x}..{FLASH_SIZE:#x};\n"
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("focuser_config.rs"), generated).unwrap();
}

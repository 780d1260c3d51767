use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;

fn write_rom(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("chip8-vm-{}-{}.ch8", name, std::process::id()));
    fs::write(&path, bytes).expect("temp dir is writable");
    path
}

#[test]
fn test_runs_step_limited_program() {
    // LD I, glyph 0; DRW V0, V0, 5; JP 204
    let rom = write_rom("draw", &[0xF0, 0x29, 0xD0, 0x05, 0x12, 0x04]);
    let assert = Command::cargo_bin("chip8-vm")
        .unwrap()
        .args(["--rom", rom.to_str().unwrap(), "--ips", "0", "--steps", "20"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.starts_with("████"));
    let _ = fs::remove_file(rom);
}

#[test]
fn test_listing_flag() {
    let rom = write_rom("list", &[0xA2, 0x2A, 0x12, 0x02]);
    let assert = Command::cargo_bin("chip8-vm")
        .unwrap()
        .args(["--rom", rom.to_str().unwrap(), "--ips", "0", "--steps", "1", "--list"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("200: A22A  LD I, 0x22A"));
    assert!(stdout.contains("202: 1202  JP 0x202"));
    let _ = fs::remove_file(rom);
}

#[test]
fn test_invalid_instruction_fails() {
    let rom = write_rom("invalid", &[0x60, 0x01, 0x51, 0x21]);
    Command::cargo_bin("chip8-vm")
        .unwrap()
        .args(["--rom", rom.to_str().unwrap(), "--ips", "0"])
        .assert()
        .failure();
    let _ = fs::remove_file(rom);
}

#[test]
fn test_missing_rom_fails() {
    Command::cargo_bin("chip8-vm")
        .unwrap()
        .args(["--rom", "no/such/rom.ch8"])
        .assert()
        .failure();
}

#[test]
fn test_key_out_of_range_rejected() {
    let rom = write_rom("key", &[0x12, 0x00]);
    Command::cargo_bin("chip8-vm")
        .unwrap()
        .args(["--rom", rom.to_str().unwrap(), "--key", "16", "--steps", "1"])
        .assert()
        .failure();
    let _ = fs::remove_file(rom);
}

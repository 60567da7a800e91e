use std::fs;
use std::io::Cursor;

use gpnvm::{AttrId, FlashAddress, FlashGeometry, NvmConfig, NvmEngine, RecoveryOutcome};
use gpnvm_persistence::dump::{parse_dump, write_dump};
use gpnvm_persistence::telemetry::init_tracing;
use gpnvm_persistence::{load_config, save_config, FileFlash, PersistenceError};
use tempfile::tempdir;

fn small_geometry() -> FlashGeometry {
    FlashGeometry::new(0x8_0000, 0x20, 0x10)
}

#[test]
fn test_dump_line_format() {
    let mut image = vec![0xFFu8; 0x20];
    image[0x11] = 0xAB;

    let mut out = Vec::new();
    write_dump(&mut out, &small_geometry(), &image).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("0x80000 0xFF 0xFF "));
    assert!(lines[1].starts_with("0x80010 0xFF 0xAB 0xFF "));
    assert_eq!(lines[1].split_whitespace().count(), 17);
}

#[test]
fn test_parse_sparse_dump() {
    // Partial line, out of order, blank line
    let text = "0x80010 0x01 0x02\n\n0x80000 0x00\n";
    let image = parse_dump(Cursor::new(text), &small_geometry()).unwrap();
    assert_eq!(image[0x00], 0x00);
    assert_eq!(image[0x01], 0xFF);
    assert_eq!(&image[0x10..0x13], &[0x01, 0x02, 0xFF]);
}

#[test]
fn test_parse_rejects_malformed_lines() {
    let bad_byte = "0x80000 0xFF\n0x80010 0xFF 0x1FF\n";
    match parse_dump(Cursor::new(bad_byte), &small_geometry()) {
        Err(PersistenceError::InvalidFormat { line, .. }) => assert_eq!(line, 2),
        other => panic!("Expected InvalidFormat, got {:?}", other),
    }

    let outside = "0x80018 0x00 0x00 0x00 0x00 0x00 0x00 0x00 0x00 0x00\n";
    assert!(matches!(
        parse_dump(Cursor::new(outside), &small_geometry()),
        Err(PersistenceError::InvalidFormat { line: 1, .. })
    ));

    assert!(matches!(
        parse_dump(Cursor::new("80000 0xFF\n"), &small_geometry()),
        Err(PersistenceError::InvalidFormat { line: 1, .. })
    ));
}

#[test]
fn test_attributes_survive_reopen() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempdir()?;
    let path = dir.path().join("flash.txt");
    let config = NvmConfig::default();

    let device = FileFlash::open(&path, config.geometry)?;
    let mut engine = NvmEngine::open(&config, device)?;
    engine.set_attribute(AttrId(1), &[0x42; 0xFF])?;
    engine.set_attribute(AttrId(2), &[0x24; 0x10])?;
    assert!(engine.device().is_dirty());
    engine.device_mut().sync()?;
    assert!(!engine.device().is_dirty());
    drop(engine);

    let device = FileFlash::open(&path, config.geometry)?;
    let mut engine = NvmEngine::open(&config, device)?;
    assert_eq!(engine.recovery_outcome(), RecoveryOutcome::Clean);
    assert_eq!(engine.read_attribute(AttrId(1))?, vec![0x42; 0xFF]);
    assert_eq!(&engine.read_attribute(AttrId(2))?[..0x10], &[0x24; 0x10]);
    // Reads leave the image clean
    assert!(!engine.device().is_dirty());
    Ok(())
}

#[test]
fn test_bit_error_in_saved_image_is_healed() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("flash.txt");
    let config = NvmConfig::default();

    let mut engine = NvmEngine::open(&config, FileFlash::open(&path, config.geometry)?)?;
    engine.set_attribute(AttrId(0), &[0x0F; 0xA0])?;
    engine.device_mut().sync()?;
    drop(engine);

    // Flip bit 0 of 0x80005 in the text image
    let text = fs::read_to_string(&path)?;
    let patched = text.replacen("0x80000 0x0F 0x0F 0x0F 0x0F 0x0F 0x0F", "0x80000 0x0F 0x0F 0x0F 0x0F 0x0F 0x0E", 1);
    assert_ne!(text, patched);
    fs::write(&path, patched)?;

    let mut engine = NvmEngine::open(&config, FileFlash::open(&path, config.geometry)?)?;
    assert_eq!(engine.read_attribute(AttrId(0))?, vec![0x0F; 0xA0]);
    assert!(engine.device().is_dirty());
    assert_eq!(engine.device().inner().raw()[5], 0x0F);
    Ok(())
}

#[test]
fn test_sync_writes_fresh_image_once() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("flash.txt");

    let mut device = FileFlash::open(&path, NvmConfig::default().geometry)?;
    assert!(!path.exists());
    device.sync()?;
    assert!(path.exists());
    assert!(!dir.path().join("flash.tmp").exists());

    let text = fs::read_to_string(&path)?;
    assert_eq!(text.lines().count(), 0x2000 / 16);
    assert!(text.lines().all(|l| l.split_whitespace().skip(1).all(|b| b == "0xFF")));
    Ok(())
}

#[test]
fn test_open_rejects_wrong_geometry() {
    let dir = tempdir().unwrap();
    let result = FileFlash::open(dir.path().join("flash.txt"), FlashGeometry::new(0x8_0000, 0x2000, 0));
    assert!(matches!(result, Err(PersistenceError::Config(_))));
}

#[test]
fn test_config_roundtrip() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nvm.json");

    let config = NvmConfig::default();
    save_config(&path, &config)?;
    assert_eq!(load_config(&path)?, config);

    let no_ecc = NvmConfig::default().without_ecc();
    save_config(&path, &no_ecc)?;
    let loaded = load_config(&path)?;
    assert_eq!(loaded.ecc, None);
    assert_eq!(loaded.shadow_page, Some(FlashAddress(0x8_1000)));
    Ok(())
}

#[test]
fn test_config_rejections() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nvm.json");

    let mut overlapping = NvmConfig::default();
    overlapping.blocks.push(overlapping.blocks[0]);
    save_config(&path, &overlapping)?;
    assert!(matches!(load_config(&path), Err(PersistenceError::Config(_))));

    fs::write(&path, "{ \"geometry\": ")?;
    assert!(matches!(load_config(&path), Err(PersistenceError::Json(_))));

    assert!(matches!(
        load_config(dir.path().join("missing.json")),
        Err(PersistenceError::IoError(_))
    ));
    Ok(())
}

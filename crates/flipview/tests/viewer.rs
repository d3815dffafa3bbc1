use std::fs;
use std::path::Path;

use flipview::{cache_key, Error, Viewer, ViewerConfig};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

/// Write a `width`x1 PNG filled with `shade`
fn write_png(dir: &Path, name: &str, width: u32, shade: u8) {
    RgbaImage::from_pixel(width, 1, Rgba([shade, shade, shade, 255]))
        .save(dir.join(name))
        .unwrap();
}

#[test]
fn test_browse_directory_of_pngs() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "b.png", 2, 20);
    write_png(dir.path(), "a.png", 1, 10);
    write_png(dir.path(), "c.PNG", 3, 30);
    fs::write(dir.path().join("readme.txt"), b"not an image").unwrap();

    let mut viewer = Viewer::new(ViewerConfig::with_capacity(8)).unwrap();
    viewer.initialize(dir.path()).unwrap();
    assert_eq!(viewer.len(), 3);

    let mut widths = Vec::new();
    for _ in 0..4 {
        let pixels = viewer.current_pixel_buffer().unwrap();
        widths.push(pixels.width);
        viewer.advance();
    }
    assert_eq!(widths, vec![1, 2, 3, 1]);

    viewer.preloader().wait_idle();
    assert_eq!(viewer.cache_stats(), (3, 8));
}

#[test]
fn test_corrupt_image_does_not_stop_browsing() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "1.png", 4, 0);
    fs::write(dir.path().join("2.jpg"), b"truncated").unwrap();
    write_png(dir.path(), "3.png", 6, 0);

    let mut viewer = Viewer::new(ViewerConfig::with_capacity(2)).unwrap();
    viewer.initialize(dir.path()).unwrap();

    viewer.advance();
    assert!(viewer.current_pixel_buffer().is_none());

    viewer.advance();
    assert_eq!(viewer.current_pixel_buffer().unwrap().width, 6);

    viewer.preloader().wait_idle();
    let (len, capacity) = viewer.cache_stats();
    assert!(len <= capacity);
    assert!(!viewer.cached_keys().contains(&cache_key(&dir.path().join("2.jpg"))));
}

#[test]
fn test_single_file_root() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "only.png", 5, 0);

    let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();
    viewer.initialize(dir.path().join("only.png")).unwrap();

    viewer.retreat();
    assert_eq!(viewer.position(), Some(0));
    assert_eq!(viewer.current_pixel_buffer().unwrap().width, 5);
}

#[test]
fn test_initialize_errors() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), b"x").unwrap();
    let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();

    assert!(matches!(
        viewer.initialize(dir.path().join("missing")),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        viewer.initialize(dir.path().join("notes.txt")),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        viewer.initialize(dir.path()),
        Err(Error::EmptyCollection(_))
    ));

    assert!(viewer.is_empty());
    assert!(viewer.current_pixel_buffer().is_none());
    assert_eq!(viewer.cache_stats(), (0, 100));
}

//! Serde round-trip tests for the core data types (feature = "serde").
#![cfg(feature = "serde")]

use pdfredact_core::{Glyph, Mode, PageGeometry, Rect, Region, RegionOrigin};

#[test]
fn rect_round_trips() {
    let rect = Rect::new(10.0, 20.0, 30.5, 40.25);
    let json = serde_json::to_string(&rect).unwrap();
    let back: Rect = serde_json::from_str(&json).unwrap();
    assert_eq!(back, rect);
}

#[test]
fn region_round_trips() {
    let region = Region::new(
        3,
        Rect::new(1.0, 2.0, 3.0, 4.0),
        RegionOrigin::TextMatch,
    );
    let json = serde_json::to_string(&region).unwrap();
    let back: Region = serde_json::from_str(&json).unwrap();
    assert_eq!(back, region);
}

#[test]
fn glyph_round_trips() {
    let glyph = Glyph {
        page: 1,
        unicode: "é".to_string(),
        code: 0xE9,
        code_bytes: 1,
        x: 72.0,
        y: 100.0,
        width: 6.0,
        height: 12.0,
        page_height: 792.0,
    };
    let json = serde_json::to_string(&glyph).unwrap();
    let back: Glyph = serde_json::from_str(&json).unwrap();
    assert_eq!(back, glyph);
}

#[test]
fn mode_and_geometry_round_trip() {
    let json = serde_json::to_string(&Mode::Preview).unwrap();
    let back: Mode = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Mode::Preview);

    let geometry = PageGeometry::new(270, 612.0, 792.0);
    let json = serde_json::to_string(&geometry).unwrap();
    let back: PageGeometry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, geometry);
}

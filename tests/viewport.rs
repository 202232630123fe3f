// tests/viewport.rs
//
// Viewport fitter: padded bounds over the displayed primaries, debounced on
// the identity of the marker set.

use chrono::{TimeZone, Utc};

use crisis_monitor::model::{ClusterRepresentative, Crisis};
use crisis_monitor::viewport::ViewportFitter;

fn marker(id: &str, lat: f64, lng: f64) -> ClusterRepresentative {
    let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    ClusterRepresentative::single(Crisis {
        id: id.into(),
        title: "t".into(),
        description: String::new(),
        source: "s".into(),
        link: String::new(),
        pub_date: t,
        created_at: t,
        country: None,
        lat: Some(lat),
        lng: Some(lng),
    })
}

#[test]
fn region_covers_all_primaries_with_ten_percent_padding() {
    let mut fitter = ViewportFitter::new();
    let region = fitter
        .fit(&[marker("a", 10.0, 20.0), marker("b", 20.0, 40.0)])
        .expect("first fit fires");

    // Lat span 10 pads by 1, lng span 20 pads by 2.
    assert!((region.south - 9.0).abs() < 1e-9);
    assert!((region.north - 21.0).abs() < 1e-9);
    assert!((region.west - 18.0).abs() < 1e-9);
    assert!((region.east - 42.0).abs() < 1e-9);
}

#[test]
fn unchanged_marker_set_does_not_refit() {
    let mut fitter = ViewportFitter::new();
    let set = [marker("a", 10.0, 20.0), marker("b", 20.0, 40.0)];
    assert!(fitter.fit(&set).is_some());
    assert!(fitter.fit(&set).is_none(), "identical set goes quiet");

    // Same ids in a different order: still the same displayed set.
    let reordered = [marker("b", 20.0, 40.0), marker("a", 10.0, 20.0)];
    assert!(fitter.fit(&reordered).is_none());

    // A genuinely different set fires again.
    let changed = [marker("a", 10.0, 20.0), marker("c", -5.0, 0.0)];
    assert!(fitter.fit(&changed).is_some());
}

#[test]
fn no_located_points_is_a_noop() {
    let mut fitter = ViewportFitter::new();
    assert!(fitter.fit(&[]).is_none());

    let mut nowhere = marker("x", 1.0, 1.0);
    nowhere.primary.lat = None;
    nowhere.primary.lng = None;
    assert!(fitter.fit(&[nowhere]).is_none());

    // And a no-op does not poison the identity memory: the next real set fits.
    assert!(fitter.fit(&[marker("a", 10.0, 20.0)]).is_some());
}

#[test]
fn single_point_fits_to_a_degenerate_region() {
    let mut fitter = ViewportFitter::new();
    let region = fitter.fit(&[marker("a", 12.5, -3.25)]).expect("fit");
    assert_eq!((region.south, region.north), (12.5, 12.5));
    assert_eq!((region.west, region.east), (-3.25, -3.25));
}

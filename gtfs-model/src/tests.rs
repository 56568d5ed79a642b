use crate::objects::*;
use crate::{Error, FeedSource, IdCache};
use chrono::NaiveDate;
use std::io::Write;
use std::path::Path;

fn write_table(dir: &Path, name: &str, content: &[u8]) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn read_directory_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_table(
        dir.path(),
        "stops.txt",
        b"stop_id,stop_name, stop_lat ,stop_lon\nS1, Gare ,48.1,2.3\nS2,Pont,48.2\n",
    );
    write_table(dir.path(), "README.md", b"not a table");

    let mut feed = FeedSource::open(dir.path()).unwrap();
    assert_eq!(None, feed.sha256());
    assert!(feed.has_table("stops.txt"));
    assert!(feed.open_table("trips.txt").unwrap().is_none());

    let rows: Vec<_> = feed
        .open_table("stops.txt")
        .unwrap()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(2, rows.len());
    assert_eq!(2, rows[0].source_ref.line);
    assert_eq!(3, rows[1].source_ref.line);
    assert_eq!(Some("Gare"), rows[0].get("stop_name"));
    assert_eq!(Some("48.1"), rows[0].get("stop_lat"));
    // short rows are kept, the missing value is absent
    assert_eq!(None, rows[1].get("stop_lon"));
    assert_eq!(None, rows[0].get("zone_id"));
}

#[test]
fn bom_and_invalid_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = vec![0xef, 0xbb, 0xbf];
    content.extend_from_slice(b"agency_id,agency_name\nA1,R\xe9seau\n");
    write_table(dir.path(), "agency.txt", &content);

    let mut feed = FeedSource::open(dir.path()).unwrap();
    let rows = feed.open_table("agency.txt").unwrap().unwrap();
    assert!(rows.headers().contains("agency_id"));
    let rows: Vec<_> = rows.collect::<Result<_, _>>().unwrap();
    assert!(rows[0].invalid_utf8);
    assert_eq!(Some("R\u{FFFD}seau"), rows[0].get("agency_name"));
}

#[test]
fn tiny_file_without_bom() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "areas.txt", b"a\n");
    let mut feed = FeedSource::open(dir.path()).unwrap();
    let rows = feed.open_table("areas.txt").unwrap().unwrap();
    assert_eq!(&["a".to_owned()], rows.headers().names());
    assert_eq!(0, rows.count());
}

#[test]
fn read_zip_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.zip");
    let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    zip.start_file("gtfs/trips.txt", zip::write::FileOptions::default())
        .unwrap();
    zip.write_all(b"route_id,service_id,trip_id\nR1,S1,T1\n")
        .unwrap();
    zip.finish().unwrap();

    let mut feed = FeedSource::open(&path).unwrap();
    assert_eq!(64, feed.sha256().unwrap().len());
    assert_eq!(&["trips.txt".to_owned()], feed.file_names());
    let rows: Vec<_> = feed
        .open_table("trips.txt")
        .unwrap()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(Some("T1"), rows[0].get("trip_id"));
}

#[test]
fn missing_and_empty_feeds() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        FeedSource::open(dir.path().join("nope")),
        Err(Error::NotFileNorDirectory(_))
    ));
    assert!(matches!(
        FeedSource::open(dir.path()),
        Err(Error::NoTables(_))
    ));
}

#[test]
fn calendar_weekdays() {
    let cache = IdCache::new();
    let calendar = Calendar {
        id: cache.intern("service1").unwrap(),
        monday: false,
        tuesday: false,
        wednesday: false,
        thursday: false,
        friday: false,
        saturday: true,
        sunday: true,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 14),
        line: 2,
    };
    assert!(calendar.has_active_weekday());
    let dates: Vec<_> = calendar.weekday_dates().collect();
    assert_eq!(4, dates.len());
    assert_eq!(NaiveDate::from_ymd_opt(2024, 1, 6), dates.first().copied());
    assert_eq!("calendar.txt:2", calendar.source_ref().to_string());
}

#[test]
fn composite_keys() {
    let cache = IdCache::new();
    let transfer = |line| Transfer {
        from_stop_id: cache.intern("S1"),
        to_stop_id: cache.intern("S2"),
        from_route_id: None,
        to_route_id: None,
        from_trip_id: None,
        to_trip_id: None,
        transfer_type: TransferType::MinTime,
        min_transfer_time: Some(120),
        line,
    };
    assert_eq!(transfer(2).key(), transfer(3).key());
}

#[test]
fn row_context_copies_the_values_on_demand() {
    use crate::{DataRow, SourceContext, SourceRef, TableHeaders};
    use std::sync::Arc;

    let headers = Arc::new(TableHeaders::new(vec!["stop_id".into(), "timepoint".into()]));
    let row = DataRow {
        source_ref: SourceRef::new("stop_times.txt", 3),
        headers: Arc::clone(&headers),
        fields: vec!["S1".into(), "1".into()],
        invalid_utf8: false,
    };
    let context = SourceContext::of_row(&row, None);
    assert_eq!(Some("1"), context.get("timepoint"));
    assert_eq!(3, context.line());
    let info = context.source_info();
    assert_eq!(Some("S1"), info.get("stop_id"));
    assert!(Arc::ptr_eq(&info, &context.source_info()));

    let seeded = SourceContext::of_row(&row, Some(Arc::clone(&info)));
    assert!(Arc::ptr_eq(&info, &seeded.source_info()));

    let bare = SourceContext::new(SourceRef::new("stops.txt", 2));
    assert_eq!(None, bare.get("stop_id"));
    assert!(bare.source_info().fields.is_empty());
}

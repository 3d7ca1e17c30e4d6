use pricebook_core::ErrorCode;
use pricebook_core::book::NewHeader;
use pricebook_core::exchange::{export_items, import_rows, read_rows, write_rows};
use pricebook_core::model::{Field, PriceItem, RowId};
use pricebook_core::sheet::{BulkPatch, CommitOutcome, PriceChange, PriceSheet};
use pricebook_core::store::{FileStore, Snapshot, SnapshotStore};

use generators::date;

fn seeded_store(dir: &std::path::Path) -> FileStore {
    let store = FileStore::init(dir).unwrap();
    let mut book = store.load().unwrap().book;
    let customer = book.add_customer("GLOBEX", "Globex Facilities").unwrap();
    let header = book
        .add_header(NewHeader {
            customer_id: customer,
            name: "Globex 2027".into(),
            currency: "usd".into(),
            effective_date: date("2027-01-01"),
            expiration_date: Some(date("2027-12-31")),
        })
        .unwrap();
    for (name, price) in [("Paper Towel", 31.0), ("Trash Liner", 22.4)] {
        let id = book.allocate_item_id();
        let mut item = PriceItem::blank(id, header.clone());
        item.product_name = name.into();
        item.unit_price = price;
        book.items.push(item);
    }
    store.save(&Snapshot::new(book)).unwrap();
    store
}

#[test]
fn edit_save_reload_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());

    let mut book = store.load().unwrap().book;
    let mut sheet = PriceSheet::open(&book, Some("PH-0001")).unwrap();
    sheet.begin_edit();

    let towel = RowId::persisted(1);
    sheet.commit_cell(&towel, Field::Notes, "carton of 12").unwrap();
    let draft = sheet.add_draft_row(None).unwrap();
    sheet.commit_cell(&draft, Field::ProductName, "Hand Sanitizer").unwrap();
    let created = sheet.commit_cell(&draft, Field::UnitPrice, "$18.00").unwrap();
    assert_eq!(created, CommitOutcome::Created { id: draft.clone() });

    let report = sheet.save(&mut book).unwrap();
    assert_eq!(report.created, vec![(draft, RowId::persisted(3))]);
    store.save(&Snapshot::new(book)).unwrap();

    let reloaded = FileStore::open(dir.path()).unwrap().load().unwrap().book;
    assert_eq!(reloaded.items.len(), 3);
    assert_eq!(reloaded.item(&towel).unwrap().notes, "carton of 12");
    assert_eq!(reloaded.sequences.item, 3);
    assert_eq!(reloaded.header("PH-0001").unwrap().currency, "USD");
}

#[test]
fn huge_price_commits_as_zero_and_snapshot_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());
    let mut book = store.load().unwrap().book;
    let mut sheet = PriceSheet::open(&book, Some("PH-0001")).unwrap();
    sheet.begin_edit();

    let towel = RowId::persisted(1);
    sheet.commit_cell(&towel, Field::UnitPrice, "1e308").unwrap();
    sheet.commit_cell(&towel, Field::MinimumPrice, "9e307").unwrap();
    let row = sheet.row(&towel).unwrap();
    assert!(row.unit_price.abs() < f64::EPSILON);
    assert_eq!(row.minimum_price, Some(0.0));

    sheet.save(&mut book).unwrap();
    store.save(&Snapshot::new(book)).unwrap();
    let reloaded = FileStore::open(dir.path()).unwrap().load().unwrap().book;
    assert!(reloaded.item(&towel).unwrap().unit_price.abs() < f64::EPSILON);
}

#[test]
fn future_header_rows_delete_and_stay_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());
    let mut book = store.load().unwrap().book;

    let mut sheet = PriceSheet::open(&book, None).unwrap();
    sheet.begin_edit();
    // Rows have no own effective date; the header's 2027 date governs.
    sheet
        .delete_rows(&[RowId::persisted(2)], date("2026-10-16"))
        .unwrap();
    sheet.save(&mut book).unwrap();
    store.save(&Snapshot::new(book)).unwrap();

    let reloaded = store.load().unwrap().book;
    assert!(reloaded.item(&RowId::persisted(2)).is_none());

    let mut sheet = PriceSheet::open(&reloaded, None).unwrap();
    sheet.begin_edit();
    let err = sheet
        .delete_rows(&[RowId::persisted(1)], date("2027-01-01"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DeletionBlocked);
}

#[test]
fn bulk_increase_then_export_and_reimport() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());
    let mut book = store.load().unwrap().book;

    let mut sheet = PriceSheet::open(&book, Some("PH-0001")).unwrap();
    sheet.begin_edit();
    let ids = [RowId::persisted(1), RowId::persisted(2)];
    sheet
        .bulk_edit(
            &ids,
            &BulkPatch {
                unit_price: Some(PriceChange::Percent(5.0)),
                ..BulkPatch::default()
            },
        )
        .unwrap();
    sheet.save(&mut book).unwrap();
    assert!((book.item(&ids[0]).unwrap().unit_price - 32.55).abs() < 1e-9);
    assert!((book.item(&ids[1]).unwrap().unit_price - 23.52).abs() < 1e-9);

    let mut buf = Vec::new();
    write_rows(&mut buf, &export_items(&book.items), b'\t').unwrap();
    let rows = read_rows(buf.as_slice(), b'\t').unwrap();

    let mut fresh = PriceSheet::open(&book, Some("PH-0001")).unwrap();
    fresh.begin_edit();
    let report = import_rows(&mut fresh, None, &rows).unwrap();
    assert!(report.created.is_empty());
    assert!(report.updated.is_empty());
    assert_eq!(report.unchanged, 2);
    assert!(fresh.tracker().is_empty());
}

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use pricebook_core::book::{NewHeader, PriceBook};
use pricebook_core::filter::ItemFilter;
use pricebook_core::model::{PriceItem, RowId, Uom};
use pricebook_core::sheet::{BulkPatch, PriceChange, PriceSheet};

const SIZES: [usize; 3] = [1_000, 10_000, 50_000];

fn synthetic_book(rows: usize) -> PriceBook {
    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default();
    let mut book = PriceBook::new();
    let customer = book.add_customer("BENCH", "Bench Customer").unwrap_or_default();
    let header = book
        .add_header(NewHeader {
            customer_id: customer,
            name: "Bench".into(),
            currency: "USD".into(),
            effective_date: start,
            expiration_date: None,
        })
        .unwrap_or_default();
    for n in 0..rows {
        let id = book.allocate_item_id();
        let mut item = PriceItem::blank(id, header.clone());
        item.product_name = format!("Product {n:05}");
        item.product_code = format!("SKU-{:04}", n % 9_973);
        item.unit_price = 1.0 + (n % 500) as f64 / 4.0;
        item.uom = Some(Uom::ALL[n % Uom::ALL.len()]);
        item.effective_date = start.checked_add_days(chrono::Days::new((n % 900) as u64));
        book.items.push(item);
    }
    book
}

fn bench_sheet(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap_or_default();
    let mut group = c.benchmark_group("sheet");

    for size in SIZES {
        let book = synthetic_book(size);
        let mut sheet = PriceSheet::open(&book, None).unwrap_or_else(|_| {
            PriceSheet::from_parts(book.items.clone(), book.header_index(), None)
        });
        sheet.begin_edit();
        group.throughput(Throughput::Elements(size as u64));

        let filter = ItemFilter {
            search: "sku-00".into(),
            ..ItemFilter::default()
        };
        group.bench_with_input(BenchmarkId::new("filter", size), &sheet, |b, sheet| {
            b.iter(|| black_box(sheet.visible_rows(&filter, today).len()));
        });

        let ids: Vec<RowId> = sheet.rows().iter().map(|r| r.id.clone()).collect();
        let patch = BulkPatch {
            unit_price: Some(PriceChange::Percent(3.0)),
            ..BulkPatch::default()
        };
        group.bench_with_input(BenchmarkId::new("bulk_percent", size), &ids, |b, ids| {
            b.iter_batched(
                || sheet.clone(),
                |mut working| black_box(working.bulk_edit(ids, &patch).map(|r| r.updated.len())),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sheet);
criterion_main!(benches);

use chrondoc::codec::{decode, encode};
use chrondoc::{Anchor, Chron, ChronMarkup, Cursor, ModelClass, Range, Slot, SlotType, TypeRegistry, Value, World};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

struct Doc;
impl ModelClass for Doc {
    const NAME: &'static str = "Doc";
    const SLOTS: &'static [&'static str] = &["text", "markup"];
}

const SIZES: &[usize] = &[100, 1_000, 10_000];

fn build_text(len: usize) -> Chron<char> {
    let mut chron: Chron<char> = Chron::new();
    for i in 0..len {
        let ch = char::from_u32('a' as u32 + (i as u32 % 26)).unwrap();
        let tail = chron.tail();
        chron = chron.insert(tail, ch, None);
    }
    chron
}

fn append_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("chron_append");
    for &len in SIZES {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(BenchmarkId::new("insert_at_tail", len), |b| {
            b.iter(|| black_box(build_text(len)));
        });
    }
    group.finish();
}

fn delete_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("chron_delete");
    for &len in SIZES {
        let base = build_text(len);
        let ids: Vec<_> = base.range_all().map(|e| e.id()).collect();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(BenchmarkId::new("delete_every_entry", len), |b| {
            b.iter(|| {
                let mut chron = base.clone();
                for id in &ids {
                    chron = chron.delete(*id);
                }
                black_box(&chron);
            });
        });
    }
    group.finish();
}

fn markup_enumerate_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("markup_enumerate");
    let chron = build_text(1_000);
    let ids: Vec<_> = chron.range_all().map(|e| e.id()).collect();

    let mut markup: ChronMarkup<u32> = ChronMarkup::new();
    for i in 0..50u32 {
        let head = ids[(i as usize) * 10];
        let tail = ids[(i as usize) * 10 + 5];
        let range = Range::new(Cursor::before(Anchor::Entry(head)), Cursor::after(Anchor::Entry(tail)));
        markup = markup.mark(i, range);
    }

    struct NullSink;
    impl chrondoc::MarkerSet<u32> for NullSink {
        fn add(&mut self, _marker: &u32, _cursor: Cursor) {}
        fn delete(&mut self, _marker: &u32, _cursor: Cursor) {}
        fn covered(&mut self, _marker: &u32, _range: Range) {}
    }

    group.bench_function("enumerate_whole_document", |b| {
        b.iter(|| {
            let mut sink = NullSink;
            black_box(markup.entries(&chron, &mut sink, None));
        });
    });
    group.finish();
}

fn world_chain_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_chain");
    for &depth in &[10usize, 100, 500] {
        group.bench_function(BenchmarkId::new("deep_read_after_lock", depth), |b| {
            b.iter(|| {
                let root = World::new();
                let id = root.create_model("Wide", depth).unwrap();
                root.write_slot(&id, 0, Slot::Value(Value::Primitive(chrondoc::Primitive::I64(0))), None).unwrap();
                let mut current = root;
                for i in 1..depth {
                    let next = current.child();
                    next.write_slot(&id, i, Slot::Value(Value::Primitive(chrondoc::Primitive::I64(i as i64))), None).unwrap();
                    current = next;
                }
                current.lock();
                black_box(current.get_slot(&id, depth - 1).unwrap());
            });
        });
    }
    group.finish();
}

fn codec_roundtrip_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_roundtrip");
    let mut registry = TypeRegistry::new();
    registry.register::<Doc>().unwrap();

    for &len in SIZES {
        let world = World::new();
        let id = world.create_model(Doc::NAME, 1).unwrap();
        let text = build_text(len);
        world.write_slot(&id, 0, Slot::Value(Value::Text(text)), Some(SlotType::Text)).unwrap();

        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(BenchmarkId::new("encode", len), |b| {
            b.iter(|| black_box(encode(&world)));
        });

        let bytes = encode(&world);
        group.bench_function(BenchmarkId::new("decode", len), |b| {
            b.iter(|| black_box(decode(&bytes, |name| registry.resolve_name(name)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    append_benchmarks,
    delete_benchmarks,
    markup_enumerate_benchmarks,
    world_chain_benchmarks,
    codec_roundtrip_benchmarks,
);
criterion_main!(benches);

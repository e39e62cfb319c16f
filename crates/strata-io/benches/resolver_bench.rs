use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use strata_core::Platform;
use strata_io::{BuildContext, Resolver};

/// A root with `items` classes, half of them identical.
fn populated_context(items: usize) -> BuildContext {
    let mut ctx = BuildContext::new(Platform::PC);
    let mut factory = ctx.factory();
    let root = factory.new_class_member("Root", "root");
    let start = factory.next_index();
    let classes: Vec<usize> = (0..items)
        .map(|i| factory.new_class_member("Item", &format!("item{i}")))
        .collect();
    factory.close_composite(root, start, items).unwrap();

    for (i, class) in classes.into_iter().enumerate() {
        let fields = factory.next_index();
        factory.new_bool_member(i % 2 == 0, "visible");
        factory.new_int32_member(if i % 2 == 0 { 7 } else { i as i32 }, "score");
        factory.new_string_member("shared", "tag");
        factory.close_composite(class, fields, 3).unwrap();
    }
    ctx
}

fn bench_resolver(c: &mut Criterion) {
    let mut ctx = populated_context(2_000);
    ctx.prepare().unwrap();
    let blocks = ctx.serialize().unwrap();

    let mut group = c.benchmark_group("Resolver");

    group.bench_function("Finalize (verified)", |b| {
        let resolver = Resolver::new();
        b.iter(|| black_box(resolver.finalize(ctx.strings(), &blocks).unwrap()));
    });

    group.bench_function("Finalize (hash only)", |b| {
        let resolver = Resolver::new().with_verification(false);
        b.iter(|| black_box(resolver.finalize(ctx.strings(), &blocks).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_resolver);
criterion_main!(benches);

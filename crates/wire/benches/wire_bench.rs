use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use vdom::{Node, diff_from_empty};

fn table(rows: usize) -> Node<()> {
    Node::element("table").with_children((0..rows).map(|i| {
        Node::element("tr")
            .with_key(format!("row-{i}"))
            .attr("class", if i % 2 == 0 { "even" } else { "odd" })
            .child(Node::element("td").child(Node::text(format!("{i}"))))
            .child(Node::element("td").child(Node::text("label")))
    }))
}

fn bench_wire(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire");
    for rows in [100usize, 1000] {
        let patches = diff_from_empty(&table(rows));
        let bytes = wire::encode(&patches);
        group.bench_with_input(BenchmarkId::new("encode", rows), &patches, |b, p| {
            b.iter(|| wire::encode(black_box(p)))
        });
        group.bench_with_input(BenchmarkId::new("decode", rows), &bytes, |b, bytes| {
            b.iter(|| wire::decode(black_box(bytes)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_wire);
criterion_main!(benches);

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use vdom::{Node, align, diff};

const ROWS: usize = 1_000;

fn table(keys: impl Iterator<Item = usize>) -> Node<usize> {
    Node::element("tbody").with_children(keys.map(|k| {
        Node::element("tr")
            .with_key(k.to_string())
            .on("click", k)
            .child(Node::element("td").child(Node::text(format!("row {k}"))))
    }))
}

fn bench_noop_rerender(c: &mut Criterion) {
    let prev = table(0..ROWS);
    c.bench_function("bench_noop_rerender", |b| {
        b.iter_batched(
            || table(0..ROWS),
            |next| {
                let next = align(Some(&prev), next);
                black_box(diff(&prev, &next).len());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_reverse_rows(c: &mut Criterion) {
    let prev = table(0..ROWS);
    c.bench_function("bench_reverse_rows", |b| {
        b.iter_batched(
            || table((0..ROWS).rev()),
            |next| {
                let next = align(Some(&prev), next);
                black_box(diff(&prev, &next).len());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_swap_rows(c: &mut Criterion) {
    let prev = table(0..ROWS);
    let swapped = || {
        let mut keys: Vec<usize> = (0..ROWS).collect();
        keys.swap(1, ROWS - 2);
        table(keys.into_iter())
    };
    c.bench_function("bench_swap_rows", |b| {
        b.iter_batched(
            swapped,
            |next| {
                let next = align(Some(&prev), next);
                black_box(diff(&prev, &next).len());
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_noop_rerender,
    bench_reverse_rows,
    bench_swap_rows
);
criterion_main!(benches);

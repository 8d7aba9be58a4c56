//! Flush benchmarks: a root replay against a single-component update.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use parking_lot::Mutex;
use weft_core::{create_element, Component, Props, RenderReason, Runtime, SetState};

const ROWS: usize = 200;

fn table(slot: Arc<Mutex<Option<SetState<i64>>>>) -> Component {
    let cell = Component::new("Cell", move |hooks, _| {
        let (value, set_value) = hooks.use_state(0_i64)?;
        *slot.lock() = Some(set_value);
        Ok(create_element("td", Props::new().child(value)))
    });

    Component::new("Table", move |_, _| {
        let rows = (0..ROWS).map(|n| create_element("tr", Props::new().child(n)));
        Ok(create_element(
            "table",
            Props::new()
                .with_children(rows)
                .child(create_element(&cell, Props::new())),
        ))
    })
}

fn bench_flush(c: &mut Criterion) {
    let runtime = Runtime::new();
    let root = runtime
        .document()
        .map(|document| document.create_element("main"))
        .expect("in-memory document");
    let slot = Arc::new(Mutex::new(None));
    let app = table(Arc::clone(&slot));
    runtime
        .render(create_element(&app, Props::new()), root)
        .unwrap();

    c.bench_function("root_replay", |b| {
        b.iter(|| {
            runtime.request_render(RenderReason::External, None);
            black_box(runtime.run_until_idle().unwrap());
        })
    });

    let set_value = slot.lock().clone().expect("cell rendered");
    let mut next = 0_i64;
    c.bench_function("component_update", |b| {
        b.iter(|| {
            next += 1;
            set_value.set(next);
            black_box(runtime.run_until_idle().unwrap());
        })
    });
}

criterion_group!(benches, bench_flush);
criterion_main!(benches);

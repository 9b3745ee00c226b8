//! Update propagation benchmarks.
//!
//! Measures the per-frame cost of the staleness walk itself: a clean graph
//! must be traversable at negligible cost, and a fully dirty chain should be
//! dominated by the (headless) render work, not by graph bookkeeping.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{Criterion, criterion_group, criterion_main};

use prism::{
    CanvasSize, Filter, FlowGraph, FramePayload, GpuContext, HeadlessContext, NodeKey,
    PictureSource, PixelFormat, RenderContext,
};

const CHAIN_DEPTH: usize = 32;

fn build_chain() -> (FlowGraph, RenderContext, NodeKey, NodeKey) {
    let gpu: Rc<dyn GpuContext> = Rc::new(HeadlessContext::new());
    let mut ctx = RenderContext::new(Rc::clone(&gpu));
    let mut graph = FlowGraph::new();

    let size = CanvasSize::new(64, 64);
    let picture = graph.add_node(PictureSource::with_image(
        "picture",
        FramePayload::new(vec![1; size.pixel_count() * 4], size, PixelFormat::Rgba8),
    ));
    let mut tail = picture;
    for i in 0..CHAIN_DEPTH {
        let filter = graph.add_node(Filter::passthrough(&gpu, &format!("stage_{i}")));
        graph.derive_from(filter, tail).unwrap();
        tail = filter;
    }
    graph.update(&mut ctx, tail).unwrap();
    (graph, ctx, picture, tail)
}

fn bench_noop_update(c: &mut Criterion) {
    let (mut graph, mut ctx, _picture, tail) = build_chain();
    c.bench_function("noop_update_depth_32", |b| {
        b.iter(|| {
            graph.update(&mut ctx, black_box(tail)).unwrap();
        });
    });
}

fn bench_full_rerender(c: &mut Criterion) {
    let (mut graph, mut ctx, picture, tail) = build_chain();
    let size = CanvasSize::new(64, 64);
    let mut seed = 0u8;
    c.bench_function("dirty_update_depth_32", |b| {
        b.iter(|| {
            seed = seed.wrapping_add(1);
            graph
                .node_as_mut::<PictureSource>(picture)
                .unwrap()
                .set_image(FramePayload::new(
                    vec![seed; size.pixel_count() * 4],
                    size,
                    PixelFormat::Rgba8,
                ));
            graph.update(&mut ctx, black_box(tail)).unwrap();
        });
    });
}

criterion_group!(benches, bench_noop_update, bench_full_rerender);
criterion_main!(benches);

//! Filter, Pipeline & Source Tests
//!
//! Tests for:
//! - Filter output adopting input size/format
//! - Content flowing through passthrough chains
//! - Parameter changes making a filter stale
//! - TwoPassFilter: two internal draws, only the final output exposed
//! - FilterPipeline: wiring, mutability, empty-pipeline failure
//! - PictureSource / StreamSource external staleness and mailbox delivery
//! - Stock filter library smoke coverage

use std::rc::Rc;

use prism::graph::Timestamp;
use prism::{
    filters, CanvasSize, Filter, FilterPipeline, FlowGraph, FlowNode, FramePayload, GpuContext,
    HeadlessContext, NodeKey, PictureSource, PixelFormat, PrismError, RenderContext,
    StreamSource,
};

// ============================================================================
// Helpers
// ============================================================================

fn setup() -> (Rc<HeadlessContext>, Rc<dyn GpuContext>, RenderContext) {
    let hw = Rc::new(HeadlessContext::new());
    let gpu: Rc<dyn GpuContext> = hw.clone();
    let ctx = RenderContext::new(Rc::clone(&gpu));
    (hw, gpu, ctx)
}

fn frame(seed: u8, size: CanvasSize) -> FramePayload {
    FramePayload::new(
        vec![seed; size.pixel_count() * 4],
        size,
        PixelFormat::Rgba8,
    )
}

fn content(hw: &HeadlessContext, graph: &FlowGraph, key: NodeKey) -> u64 {
    let canvas = graph.backing_canvas(key).unwrap();
    hw.texture_content(canvas.texture().unwrap()).unwrap()
}

// ============================================================================
// Filter basics
// ============================================================================

#[test]
fn filter_output_adopts_input_size_and_format() -> anyhow::Result<()> {
    let (_hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let size = CanvasSize::new(12, 34);
    let picture = graph.add_node(PictureSource::with_image("picture", frame(1, size)));
    let filter = graph.add_node(Filter::passthrough(&gpu, "copy"));
    graph.derive_from(filter, picture)?;

    graph.update(&mut ctx, filter)?;

    let output = graph.backing_canvas(filter).unwrap();
    assert_eq!(output.size(), size);
    assert_eq!(output.format(), PixelFormat::Rgba8);
    Ok(())
}

#[test]
fn explicit_output_size_is_never_overwritten_by_adoption() {
    let (_hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let picture = graph.add_node(PictureSource::with_image(
        "picture",
        frame(1, CanvasSize::new(64, 64)),
    ));
    let mut filter = Filter::passthrough(&gpu, "thumb");
    filter.output_spec_mut().size = Some(CanvasSize::new(8, 8));
    let filter = graph.add_node(filter);
    graph.derive_from(filter, picture).unwrap();

    graph.update(&mut ctx, filter).unwrap();
    assert_eq!(
        graph.backing_canvas(filter).unwrap().size(),
        CanvasSize::new(8, 8)
    );
}

#[test]
fn new_input_content_changes_the_output() {
    let (hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let size = CanvasSize::new(4, 4);
    let picture = graph.add_node(PictureSource::with_image("picture", frame(1, size)));
    let filter = graph.add_node(Filter::passthrough(&gpu, "copy"));
    graph.derive_from(filter, picture).unwrap();

    graph.update(&mut ctx, filter).unwrap();
    let first = content(&hw, &graph, filter);

    graph
        .node_as_mut::<PictureSource>(picture)
        .unwrap()
        .set_image(frame(2, size));
    graph.update(&mut ctx, filter).unwrap();
    let second = content(&hw, &graph, filter);

    assert_ne!(first, second);
}

#[test]
fn parameter_changes_make_a_filter_stale() {
    let (hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let picture = graph.add_node(PictureSource::with_image(
        "picture",
        frame(1, CanvasSize::new(4, 4)),
    ));
    let filter = graph.add_node(filters::brightness(&gpu));
    graph.derive_from(filter, picture).unwrap();

    graph.update(&mut ctx, filter).unwrap();
    let stamp = graph.last_changed(filter).unwrap();
    let first = content(&hw, &graph, filter);

    graph
        .node_as_mut::<Filter>(filter)
        .unwrap()
        .set_uniform("brightness", 0.4f32)
        .unwrap();
    graph.update(&mut ctx, filter).unwrap();

    assert!(graph.last_changed(filter).unwrap() > stamp);
    assert_ne!(content(&hw, &graph, filter), first);
}

#[test]
fn too_many_inputs_fail_the_render() {
    let (_hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let size = CanvasSize::new(4, 4);
    let a = graph.add_node(PictureSource::with_image("a", frame(1, size)));
    let b = graph.add_node(PictureSource::with_image("b", frame(2, size)));
    let c = graph.add_node(PictureSource::with_image("c", frame(3, size)));
    let blend = graph.add_node(Filter::passthrough(&gpu, "blend"));
    graph.derive_from(blend, a).unwrap();
    graph.derive_from(blend, b).unwrap();
    graph.derive_from(blend, c).unwrap();

    let err = graph.update(&mut ctx, blend).unwrap_err();
    assert!(matches!(err, PrismError::RenderFailed(_)));
}

// ============================================================================
// TwoPassFilter
// ============================================================================

#[test]
fn two_pass_filter_draws_twice_and_exposes_the_final_stage() {
    let (hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let size = CanvasSize::new(8, 8);
    let picture = graph.add_node(PictureSource::with_image("picture", frame(5, size)));
    let blur = graph.add_node(filters::gaussian_blur(&gpu));
    graph.derive_from(blur, picture).unwrap();

    graph.update(&mut ctx, blur).unwrap();
    assert_eq!(hw.draw_count(), 2, "horizontal + vertical stage");
    assert_eq!(graph.len(), 2, "internal stages are not graph nodes");
    assert!(graph.backing_canvas(blur).is_some());

    // Blur size reconfiguration dirties both stages and re-renders.
    filters::set_blur_size(
        graph.node_as_mut::<prism::TwoPassFilter>(blur).unwrap(),
        2.0,
        size,
    )
    .unwrap();
    graph.update(&mut ctx, blur).unwrap();
    assert_eq!(hw.draw_count(), 4);
}

// ============================================================================
// FilterPipeline
// ============================================================================

#[test]
fn pipeline_threads_filters_in_order() {
    let (hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let size = CanvasSize::new(4, 4);
    let picture = graph.add_node(PictureSource::with_image("picture", frame(7, size)));
    let pipeline = graph.add_node(FilterPipeline::new(
        "grade",
        vec![filters::brightness(&gpu), filters::contrast(&gpu)],
    ));
    graph.derive_from(pipeline, picture).unwrap();

    graph.update(&mut ctx, pipeline).unwrap();
    assert_eq!(hw.draw_count(), 2, "one draw per pipeline stage");

    // The pipeline's output is its last filter's output.
    let last_output = {
        let node = graph.node_as::<FilterPipeline>(pipeline).unwrap();
        node.filters().last().unwrap().backing_canvas().unwrap()
    };
    let exposed = graph.backing_canvas(pipeline).unwrap();
    assert_eq!(last_output.texture(), exposed.texture());
}

#[test]
fn pipeline_acts_like_a_single_node_for_staleness() {
    let (hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let size = CanvasSize::new(4, 4);
    let picture = graph.add_node(PictureSource::with_image("picture", frame(7, size)));
    let pipeline = graph.add_node(FilterPipeline::new(
        "grade",
        vec![filters::brightness(&gpu), filters::contrast(&gpu)],
    ));
    graph.derive_from(pipeline, picture).unwrap();
    graph.update(&mut ctx, pipeline).unwrap();
    let draws = hw.draw_count();

    graph.update(&mut ctx, pipeline).unwrap();
    assert_eq!(hw.draw_count(), draws, "clean pipeline must not redraw");

    // Reconfiguring any member filter makes the whole node stale.
    graph
        .node_as_mut::<FilterPipeline>(pipeline)
        .unwrap()
        .filters_mut()[1]
        .set_uniform("contrast", 1.5f32)
        .unwrap();
    graph.update(&mut ctx, pipeline).unwrap();
    assert_eq!(hw.draw_count(), draws + 2);
}

#[test]
fn empty_pipeline_fails_to_render() {
    let (_hw, _gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let picture = graph.add_node(PictureSource::with_image(
        "picture",
        frame(1, CanvasSize::new(4, 4)),
    ));
    let pipeline = graph.add_node(FilterPipeline::new("empty", Vec::new()));
    graph.derive_from(pipeline, picture).unwrap();

    let err = graph.update(&mut ctx, pipeline).unwrap_err();
    assert!(matches!(err, PrismError::RenderFailed(_)));
}

// ============================================================================
// Sources
// ============================================================================

#[test]
fn picture_source_without_an_image_fails_its_consumers() {
    let (_hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let picture = graph.add_node(PictureSource::new("empty"));
    let filter = graph.add_node(filters::brightness(&gpu));
    graph.derive_from(filter, picture).unwrap();

    // The picture is not stale (nothing assigned), vends no canvas, and the
    // stale filter cannot pull an input from it.
    let err = graph.update(&mut ctx, filter).unwrap_err();
    assert!(matches!(err, PrismError::RenderFailed(_)));
}

#[test]
fn stream_source_consumes_the_latest_frame_only() {
    let (hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let size = CanvasSize::new(4, 4);
    let stream = graph.add_node(StreamSource::new("camera"));
    let filter = graph.add_node(Filter::passthrough(&gpu, "copy"));
    graph.derive_from(filter, stream).unwrap();
    let inlet = graph.node_as::<StreamSource>(stream).unwrap().inlet();

    // Two frames arrive before the graph ticks; the older one is dropped.
    inlet.post(frame(1, size));
    inlet.post(frame(2, size));
    graph.update(&mut ctx, filter).unwrap();

    let expected = {
        let reference =
            prism::Canvas::allocate(&ctx, size, PixelFormat::Rgba8).unwrap();
        reference.upload(&frame(2, size).data).unwrap();
        hw.texture_content(reference.texture().unwrap()).unwrap()
    };
    let stream_canvas = graph.backing_canvas(stream).unwrap();
    assert_eq!(
        hw.texture_content(stream_canvas.texture().unwrap()).unwrap(),
        expected
    );

    // Without new frames the stream is not stale.
    let stamp = graph.last_changed(filter).unwrap();
    graph.update(&mut ctx, filter).unwrap();
    assert_eq!(graph.last_changed(filter).unwrap(), stamp);
}

#[test]
fn stream_source_reallocates_when_the_frame_size_changes() {
    let (_hw, _gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let stream = graph.add_node(StreamSource::new("camera"));
    let inlet = graph.node_as::<StreamSource>(stream).unwrap().inlet();

    inlet.post(frame(1, CanvasSize::new(4, 4)));
    graph.update(&mut ctx, stream).unwrap();
    assert_eq!(
        graph.backing_canvas(stream).unwrap().size(),
        CanvasSize::new(4, 4)
    );

    inlet.post(frame(1, CanvasSize::new(8, 8)));
    graph.update(&mut ctx, stream).unwrap();
    assert_eq!(
        graph.backing_canvas(stream).unwrap().size(),
        CanvasSize::new(8, 8)
    );
}

#[test]
fn frames_posted_from_another_thread_reach_the_graph() {
    let (_hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let size = CanvasSize::new(4, 4);
    let stream = graph.add_node(StreamSource::new("camera"));
    let filter = graph.add_node(Filter::passthrough(&gpu, "copy"));
    graph.derive_from(filter, stream).unwrap();
    let inlet = graph.node_as::<StreamSource>(stream).unwrap().inlet();

    let producer = std::thread::spawn(move || {
        inlet.post(frame(42, CanvasSize::new(4, 4)));
    });
    producer.join().unwrap();

    graph.update(&mut ctx, filter).unwrap();
    assert_eq!(graph.backing_canvas(stream).unwrap().size(), size);
    assert!(graph.last_changed(filter).unwrap() > Timestamp::ZERO);
}

// ============================================================================
// Stock filters
// ============================================================================

#[test]
fn stock_filters_render_through_the_standard_contract() {
    let (_hw, gpu, mut ctx) = setup();
    let size = CanvasSize::new(8, 8);

    let build: Vec<(&str, Filter)> = vec![
        ("brightness", filters::brightness(&gpu)),
        ("contrast", filters::contrast(&gpu)),
        ("saturation", filters::saturation(&gpu)),
        ("gamma", filters::gamma(&gpu)),
        ("color_matrix", filters::color_matrix(&gpu)),
        ("convolution", filters::convolution_3x3(&gpu)),
    ];
    for (label, filter) in build {
        let mut graph = FlowGraph::new();
        let picture = graph.add_node(PictureSource::with_image("picture", frame(9, size)));
        let node = graph.add_node(filter);
        graph.derive_from(node, picture).unwrap();
        graph
            .update(&mut ctx, node)
            .unwrap_or_else(|e| panic!("{label} failed: {e}"));
        assert!(graph.backing_canvas(node).is_some(), "{label}");
    }
}

#[test]
fn convolution_texel_size_helper_sets_both_offsets() {
    let (_hw, gpu, _ctx) = setup();
    let mut filter = filters::convolution_3x3(&gpu);
    filters::set_texel_size(&mut filter, CanvasSize::new(100, 50)).unwrap();
    assert_eq!(
        filter.program().symbol("texelWidth").unwrap().uniform_value(),
        Some(&prism::UniformValue::Float(0.01))
    );
    assert_eq!(
        filter
            .program()
            .symbol("texelHeight")
            .unwrap()
            .uniform_value(),
        Some(&prism::UniformValue::Float(0.02))
    );
}

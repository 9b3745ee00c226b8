//! Program & Symbol Binding Tests
//!
//! Tests for:
//! - Lazy symbol discovery from the linked program (types, counts, locations)
//! - Type validation: pre-link values checked at first use, post-discovery
//!   assignments rejected eagerly with state preserved
//! - Dirty tracking: only changed values flushed, equal assignments elided
//! - Dirty-flush vs flush-everything behavioral equivalence
//! - Sampler texture-unit assignment and cross-program rebinding
//! - Compile failure logs and recovery
//! - Orientation texture-coordinate tables

use std::rc::Rc;

use glam::{Vec2, Vec3};

use prism::program::Rotation;
use prism::{
    Canvas, CanvasSize, Filter, FlowGraph, FramePayload, GpuContext, HeadlessContext,
    PictureSource, PixelFormat, PrismError, Program, RenderContext,
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

fn test_canvas(ctx: &RenderContext) -> Canvas {
    Canvas::allocate(ctx, CanvasSize::new(4, 4), PixelFormat::Rgba8).unwrap()
}

const VERTEX_SHADER: &str = "\
attribute vec4 position;
attribute vec4 inputTextureCoordinate;
varying vec2 textureCoordinate;
void main()
{
    gl_Position = position;
    textureCoordinate = inputTextureCoordinate.xy;
}
";

const FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;
uniform lowp float brightness;
uniform sampler2D inputImage;
void main()
{
    gl_FragColor = texture2D(inputImage, textureCoordinate) + vec4(brightness);
}
";

const TWO_SAMPLER_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;
uniform sampler2D inputImage;
uniform sampler2D auxiliaryImage;
void main()
{
    gl_FragColor = texture2D(inputImage, textureCoordinate)
        * texture2D(auxiliaryImage, textureCoordinate);
}
";

// ============================================================================
// Symbol discovery
// ============================================================================

#[test]
fn first_use_discovers_types_locations_and_units() {
    let (_hw, gpu, mut ctx) = setup();
    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, FRAGMENT_SHADER);
    let canvas = test_canvas(&ctx);

    program.set_uniform("brightness", 0.5f32).unwrap();
    program.set_input_canvas("inputImage", &canvas).unwrap();

    // Nothing is known before the first use.
    assert!(program.symbol("brightness").unwrap().info().is_none());
    assert!(program.attribute_location("position").is_none());

    program.use_program(&mut ctx).unwrap();

    let brightness = program.symbol("brightness").unwrap();
    let info = brightness.info().unwrap();
    assert_eq!(info.gpu_type, prism::gpu::GpuType::Float);
    assert_eq!(info.count, 1);

    let sampler = program.symbol("inputImage").unwrap();
    assert_eq!(
        sampler.info().unwrap().gpu_type,
        prism::gpu::GpuType::Sampler2d
    );
    assert_eq!(sampler.texture_unit(), Some(0));

    assert_eq!(program.attribute_location("position"), Some(0));
    assert_eq!(program.attribute_location("inputTextureCoordinate"), Some(1));
}

#[test]
fn sampler_units_are_assigned_in_discovery_order() {
    let (_hw, gpu, mut ctx) = setup();
    let mut program =
        Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, TWO_SAMPLER_FRAGMENT_SHADER);
    let (first, second) = (test_canvas(&ctx), test_canvas(&ctx));
    program.set_input_canvas("inputImage", &first).unwrap();
    program.set_input_canvas("auxiliaryImage", &second).unwrap();

    program.use_program(&mut ctx).unwrap();

    assert_eq!(program.symbol("inputImage").unwrap().texture_unit(), Some(0));
    assert_eq!(
        program.symbol("auxiliaryImage").unwrap().texture_unit(),
        Some(1)
    );
}

// ============================================================================
// Type validation
// ============================================================================

#[test]
fn pre_link_values_are_validated_at_first_use() {
    let (_hw, gpu, mut ctx) = setup();
    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, FRAGMENT_SHADER);
    let canvas = test_canvas(&ctx);

    // Accepted blindly: the GPU type is not known yet.
    program.set_uniform("brightness", Vec3::ONE).unwrap();
    program.set_input_canvas("inputImage", &canvas).unwrap();

    let err = program.use_program(&mut ctx).unwrap_err();
    match err {
        PrismError::TypeMismatch {
            name,
            declared,
            provided,
        } => {
            assert_eq!(name, "brightness");
            assert_eq!(declared, "float");
            assert_eq!(provided, "vec3");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn post_discovery_mismatch_is_rejected_and_preserves_state() {
    let (_hw, gpu, mut ctx) = setup();
    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, FRAGMENT_SHADER);
    let canvas = test_canvas(&ctx);
    program.set_uniform("brightness", 0.5f32).unwrap();
    program.set_input_canvas("inputImage", &canvas).unwrap();
    program.use_program(&mut ctx).unwrap();

    let err = program.set_uniform("brightness", Vec2::ONE).unwrap_err();
    assert!(matches!(err, PrismError::TypeMismatch { .. }));

    let symbol = program.symbol("brightness").unwrap();
    assert!(!symbol.is_dirty(), "rejected assignment must not dirty");
    assert_eq!(
        symbol.uniform_value(),
        Some(&prism::UniformValue::Float(0.5)),
        "rejected assignment must not clobber the previous value"
    );
}

#[test]
fn float_arrays_match_by_total_component_count() {
    let (_hw, gpu, mut ctx) = setup();
    let fragment = "\
varying highp vec2 textureCoordinate;
uniform sampler2D inputImage;
uniform mediump mat3 convolutionKernel;
void main() { gl_FragColor = vec4(convolutionKernel[0], 1.0); }
";
    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, fragment);
    let canvas = test_canvas(&ctx);
    program.set_input_canvas("inputImage", &canvas).unwrap();
    // Nine raw floats satisfy a mat3 slot.
    program
        .set_uniform("convolutionKernel", vec![0.0f32; 9])
        .unwrap();
    program.use_program(&mut ctx).unwrap();

    // Eight do not.
    assert!(matches!(
        program.set_uniform("convolutionKernel", vec![0.0f32; 8]),
        Err(PrismError::TypeMismatch { .. })
    ));
}

// ============================================================================
// Dirty tracking
// ============================================================================

#[test]
fn only_changed_values_are_flushed() {
    let (hw, gpu, mut ctx) = setup();
    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, FRAGMENT_SHADER);
    let canvas = test_canvas(&ctx);
    program.set_uniform("brightness", 0.5f32).unwrap();
    program.set_input_canvas("inputImage", &canvas).unwrap();

    program.use_program(&mut ctx).unwrap();
    let after_first = hw.uniform_upload_count();
    assert_eq!(after_first, 2, "brightness + sampler index");

    // Nothing changed: nothing to flush.
    program.use_program(&mut ctx).unwrap();
    assert_eq!(hw.uniform_upload_count(), after_first);

    // One change: exactly one upload.
    program.set_uniform("brightness", 0.75f32).unwrap();
    program.use_program(&mut ctx).unwrap();
    assert_eq!(hw.uniform_upload_count(), after_first + 1);
}

#[test]
fn assigning_an_equal_value_does_not_dirty() {
    let (hw, gpu, mut ctx) = setup();
    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, FRAGMENT_SHADER);
    let canvas = test_canvas(&ctx);
    program.set_uniform("brightness", 0.5f32).unwrap();
    program.set_input_canvas("inputImage", &canvas).unwrap();
    program.use_program(&mut ctx).unwrap();
    let uploads = hw.uniform_upload_count();

    program.set_uniform("brightness", 0.5f32).unwrap();
    assert!(!program.symbol("brightness").unwrap().is_dirty());
    program.use_program(&mut ctx).unwrap();
    assert_eq!(hw.uniform_upload_count(), uploads);
}

#[test]
fn values_set_for_inactive_names_are_warned_and_skipped() {
    let (hw, gpu, mut ctx) = setup();
    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, FRAGMENT_SHADER);
    let canvas = test_canvas(&ctx);
    program.set_uniform("brightness", 0.5f32).unwrap();
    program.set_uniform("ghost", 1.0f32).unwrap();
    program.set_input_canvas("inputImage", &canvas).unwrap();

    program.use_program(&mut ctx).unwrap();
    // The inactive symbol never reaches the GPU.
    assert_eq!(hw.uniform_upload_count(), 2);
    assert!(program.symbol("ghost").unwrap().info().is_none());
}

// ============================================================================
// Dirty-flush equivalence
// ============================================================================

fn brightness_scenario(force_full_flush: bool) -> Vec<u64> {
    let (hw, gpu, mut ctx) = setup();
    let mut graph = FlowGraph::new();
    let size = CanvasSize::new(4, 4);
    let picture = graph.add_node(PictureSource::with_image(
        "picture",
        FramePayload::new(vec![10; size.pixel_count() * 4], size, PixelFormat::Rgba8),
    ));
    let filter = graph.add_node(prism::filters::brightness(&gpu));
    graph.derive_from(filter, picture).unwrap();

    let step = |graph: &mut FlowGraph, ctx: &mut RenderContext| {
        if force_full_flush {
            graph
                .node_as_mut::<Filter>(filter)
                .unwrap()
                .program_mut()
                .mark_all_dirty();
        }
        graph.update(ctx, filter).unwrap();
    };

    step(&mut graph, &mut ctx);

    graph
        .node_as_mut::<Filter>(filter)
        .unwrap()
        .set_uniform("brightness", 0.3f32)
        .unwrap();
    step(&mut graph, &mut ctx);

    graph
        .node_as_mut::<PictureSource>(picture)
        .unwrap()
        .set_image(FramePayload::new(
            vec![99; size.pixel_count() * 4],
            size,
            PixelFormat::Rgba8,
        ));
    step(&mut graph, &mut ctx);

    hw.draw_log().iter().map(|d| d.output).collect()
}

#[test]
fn flushing_dirty_only_equals_flushing_everything() {
    assert_eq!(brightness_scenario(false), brightness_scenario(true));
}

// ============================================================================
// Sampler rebinding across programs
// ============================================================================

#[test]
fn clean_samplers_are_still_revalidated_through_the_tracker() {
    let (hw, gpu, mut ctx) = setup();
    let mut first = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, FRAGMENT_SHADER);
    let mut second = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, FRAGMENT_SHADER);
    let (ca, cb) = (test_canvas(&ctx), test_canvas(&ctx));
    first.set_uniform("brightness", 0.0f32).unwrap();
    second.set_uniform("brightness", 0.0f32).unwrap();
    first.set_input_canvas("inputImage", &ca).unwrap();
    second.set_input_canvas("inputImage", &cb).unwrap();

    first.use_program(&mut ctx).unwrap();
    assert_eq!(hw.unit_binding(0), ca.texture());

    // Both programs use unit 0; the second clobbers the binding.
    second.use_program(&mut ctx).unwrap();
    assert_eq!(hw.unit_binding(0), cb.texture());

    // The first program's sampler is clean, but unit bindings do not stick
    // to programs: using it again must restore its own binding.
    first.use_program(&mut ctx).unwrap();
    assert_eq!(hw.unit_binding(0), ca.texture());
}

// ============================================================================
// Compile / link failures
// ============================================================================

#[test]
fn compile_failure_surfaces_the_log_and_is_recoverable() {
    let (_hw, gpu, mut ctx) = setup();
    let bad = "\
uniform sampler2D inputImage;
#error not today
void main() { }
";
    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, bad);
    match program.link() {
        Err(PrismError::ShaderCompile { log }) => {
            assert!(log.contains("#error"));
            assert!(log.contains("fragment"));
        }
        other => panic!("expected ShaderCompile, got {other:?}"),
    }

    // Fixing the source makes the same Program usable.
    program.set_source(VERTEX_SHADER, FRAGMENT_SHADER);
    let canvas = test_canvas(&ctx);
    program.set_uniform("brightness", 0.0f32).unwrap();
    program.set_input_canvas("inputImage", &canvas).unwrap();
    program.use_program(&mut ctx).unwrap();
    assert!(program.is_linked());
}

#[test]
fn sampler_without_a_bound_input_fails_the_render() {
    let (_hw, gpu, mut ctx) = setup();
    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, FRAGMENT_SHADER);
    program.set_uniform("brightness", 0.0f32).unwrap();
    let err = program.use_program(&mut ctx).unwrap_err();
    assert!(matches!(err, PrismError::RenderFailed(_)));
}

#[test]
fn too_many_samplers_exhaust_the_texture_units() {
    let (_hw, gpu, mut ctx) = setup();
    // Eight samplers against seven usable units (one is the scratch unit).
    let mut fragment = String::from("varying highp vec2 textureCoordinate;\n");
    for i in 0..8 {
        fragment.push_str(&format!("uniform sampler2D image{i};\n"));
    }
    fragment.push_str("void main() { gl_FragColor = vec4(1.0); }\n");

    let mut program = Program::with_source(Rc::clone(&gpu), VERTEX_SHADER, &fragment);
    let canvases: Vec<Canvas> = (0..8).map(|_| test_canvas(&ctx)).collect();
    for (i, c) in canvases.iter().enumerate() {
        program.set_input_canvas(&format!("image{i}"), c).unwrap();
    }
    let err = program.use_program(&mut ctx).unwrap_err();
    assert!(matches!(err, PrismError::OutOfResources(_)));
}

// ============================================================================
// Orientation tables
// ============================================================================

#[test]
fn orientation_tables_are_fixed_corner_permutations() {
    assert_eq!(
        Rotation::None.texture_coordinates(),
        &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0]
    );
    assert_eq!(
        Rotation::RotateLeft.texture_coordinates(),
        &[1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0]
    );
    assert_eq!(
        Rotation::RotateRight.texture_coordinates(),
        &[0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0]
    );
    assert_eq!(
        Rotation::FlipVertical.texture_coordinates(),
        &[0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]
    );
    assert_eq!(
        Rotation::FlipHorizontal.texture_coordinates(),
        &[1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0]
    );
    assert_eq!(
        Rotation::RotateRightFlipVertical.texture_coordinates(),
        &[0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]
    );
}

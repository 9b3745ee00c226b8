//! Headless Reference Context
//!
//! [`HeadlessContext`] is an in-memory implementation of [`GpuContext`] that
//! models the full binding state machine without touching any real hardware.
//! The test suite runs entirely against it, and embedders can use it for dry
//! runs and diagnostics.
//!
//! ## Pixel content model
//!
//! Image contents are modeled as a deterministic 64-bit signature rather than
//! real pixels: uploads hash the incoming bytes, and a draw mixes the program
//! source, the resident uniform values and the signatures of every sampled
//! input into the render target's signature. Two render paths that would
//! produce identical pixels on real hardware produce identical signatures
//! here, which is exactly what the equivalence tests need.
//!
//! ## Symbol discovery
//!
//! Active uniforms and attributes are discovered by scanning `uniform` /
//! `attribute` declarations in the GLSL source (precision qualifiers are
//! skipped, `name[N]` arrays are honored). A source line starting with
//! `#error` fails the compile and surfaces a compiler-style log, which is how
//! tests exercise the failure path.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::Vec4;
use rustc_hash::FxHashMap;

use crate::errors::{PrismError, Result};

use super::context::{FramebufferId, GpuContext, ProgramId, RenderbufferId, TextureId};
use super::types::{CanvasSize, GpuType, PixelFormat, SymbolInfo, SymbolSlot, TextureParams, UniformValue};

const TEXTURE_UNITS: u32 = 8;
const MAX_TEXTURE_SIZE: u32 = 4096;

/// One recorded draw call with its complete resident state.
///
/// Comparing sequences of these is how the dirty-flush equivalence property
/// is verified: two runs are behaviorally identical iff their draw records
/// are identical.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub source_hash: u64,
    /// Resident uniform values at draw time, sorted by location.
    pub uniforms: Vec<(u32, UniformValue)>,
    /// Content signature of the texture bound at each sampled unit.
    pub sampler_contents: Vec<(u32, u64)>,
    pub target: Option<FramebufferId>,
    /// Signature written into the render target.
    pub output: u64,
}

#[derive(Debug)]
struct TextureRecord {
    size: CanvasSize,
    format: PixelFormat,
    params: TextureParams,
    content: u64,
}

#[derive(Debug)]
struct RenderbufferRecord {
    size: CanvasSize,
    content: u64,
}

#[derive(Debug, Clone, Copy)]
enum Attachment {
    Texture(TextureId),
    Renderbuffer(RenderbufferId),
}

#[derive(Debug, Default)]
struct FramebufferRecord {
    attachment: Option<Attachment>,
}

#[derive(Debug)]
struct ProgramRecord {
    source_hash: u64,
    symbols: Vec<SymbolInfo>,
    resident: FxHashMap<u32, UniformValue>,
}

#[derive(Debug, Default)]
struct Counters {
    draws: usize,
    texture_binds: usize,
    uniform_uploads: usize,
    unit_selects: usize,
}

#[derive(Debug)]
struct HeadlessState {
    next_id: u32,
    textures: FxHashMap<u32, TextureRecord>,
    renderbuffers: FxHashMap<u32, RenderbufferRecord>,
    framebuffers: FxHashMap<u32, FramebufferRecord>,
    programs: FxHashMap<u32, ProgramRecord>,
    bound_framebuffer: Option<FramebufferId>,
    current_program: Option<ProgramId>,
    active_unit: u32,
    unit_bindings: Vec<Option<TextureId>>,
    attributes: FxHashMap<u32, (u32, Vec<f32>)>,
    viewport: CanvasSize,
    counters: Counters,
    draw_log: Vec<DrawRecord>,
    /// Number of upcoming allocations that should fail (test hook).
    fail_allocs: u32,
}

/// In-memory [`GpuContext`] implementation.
#[derive(Debug)]
pub struct HeadlessContext {
    state: RefCell<HeadlessState>,
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RefCell::new(HeadlessState {
                next_id: 1,
                textures: FxHashMap::default(),
                renderbuffers: FxHashMap::default(),
                framebuffers: FxHashMap::default(),
                programs: FxHashMap::default(),
                bound_framebuffer: None,
                current_program: None,
                active_unit: 0,
                unit_bindings: vec![None; TEXTURE_UNITS as usize],
                attributes: FxHashMap::default(),
                viewport: CanvasSize::new(0, 0),
                counters: Counters::default(),
                draw_log: Vec::new(),
                fail_allocs: 0,
            }),
        }
    }

    // ========================================================================
    // Test / diagnostic surface
    // ========================================================================

    /// Force the next `n` resource allocations to fail with `OutOfResources`.
    pub fn fail_allocations(&self, n: u32) {
        self.state.borrow_mut().fail_allocs = n;
    }

    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.state.borrow().counters.draws
    }

    #[must_use]
    pub fn texture_bind_count(&self) -> usize {
        self.state.borrow().counters.texture_binds
    }

    #[must_use]
    pub fn uniform_upload_count(&self) -> usize {
        self.state.borrow().counters.uniform_uploads
    }

    #[must_use]
    pub fn unit_select_count(&self) -> usize {
        self.state.borrow().counters.unit_selects
    }

    /// Snapshot of every draw issued so far.
    #[must_use]
    pub fn draw_log(&self) -> Vec<DrawRecord> {
        self.state.borrow().draw_log.clone()
    }

    /// Reset counters and the draw log (resources and bindings are kept).
    pub fn reset_stats(&self) {
        let mut st = self.state.borrow_mut();
        st.counters = Counters::default();
        st.draw_log.clear();
    }

    /// Content signature of a texture, if it is alive.
    #[must_use]
    pub fn texture_content(&self, texture: TextureId) -> Option<u64> {
        self.state.borrow().textures.get(&texture.0).map(|t| t.content)
    }

    /// Sampling parameters currently resident on a texture object.
    #[must_use]
    pub fn texture_params(&self, texture: TextureId) -> Option<TextureParams> {
        self.state.borrow().textures.get(&texture.0).map(|t| t.params)
    }

    /// Allocated size of a texture, if it is alive.
    #[must_use]
    pub fn texture_size(&self, texture: TextureId) -> Option<CanvasSize> {
        self.state.borrow().textures.get(&texture.0).map(|t| t.size)
    }

    /// Base pixel format of a texture, if it is alive.
    #[must_use]
    pub fn texture_format(&self, texture: TextureId) -> Option<PixelFormat> {
        self.state.borrow().textures.get(&texture.0).map(|t| t.format)
    }

    /// The most recently set viewport.
    #[must_use]
    pub fn viewport(&self) -> CanvasSize {
        self.state.borrow().viewport
    }

    /// Texture currently bound to the given unit.
    #[must_use]
    pub fn unit_binding(&self, unit: u32) -> Option<TextureId> {
        self.state
            .borrow()
            .unit_bindings
            .get(unit as usize)
            .copied()
            .flatten()
    }

    #[must_use]
    pub fn live_texture_count(&self) -> usize {
        self.state.borrow().textures.len()
    }

    #[must_use]
    pub fn live_renderbuffer_count(&self) -> usize {
        self.state.borrow().renderbuffers.len()
    }

    #[must_use]
    pub fn live_framebuffer_count(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    #[must_use]
    pub fn live_program_count(&self) -> usize {
        self.state.borrow().programs.len()
    }
}

// ============================================================================
// Hashing helpers (content signature model)
// ============================================================================

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut h = DefaultHasher::new();
    bytes.hash(&mut h);
    h.finish()
}

fn hash_uniform<H: Hasher>(value: &UniformValue, h: &mut H) {
    std::mem::discriminant(value).hash(h);
    match value {
        UniformValue::Float(f) => f.to_bits().hash(h),
        UniformValue::Int(i) => i.hash(h),
        UniformValue::Vec2(v) => {
            for c in v.to_array() {
                c.to_bits().hash(h);
            }
        }
        UniformValue::Vec3(v) => {
            for c in v.to_array() {
                c.to_bits().hash(h);
            }
        }
        UniformValue::Vec4(v) => {
            for c in v.to_array() {
                c.to_bits().hash(h);
            }
        }
        UniformValue::Mat2(m) => {
            for c in m.to_cols_array() {
                c.to_bits().hash(h);
            }
        }
        UniformValue::Mat3(m) => {
            for c in m.to_cols_array() {
                c.to_bits().hash(h);
            }
        }
        UniformValue::Mat4(m) => {
            for c in m.to_cols_array() {
                c.to_bits().hash(h);
            }
        }
        UniformValue::Floats(v) => {
            for c in v {
                c.to_bits().hash(h);
            }
        }
        UniformValue::Sampler(u) => u.hash(h),
    }
}

// ============================================================================
// GLSL declaration scanning
// ============================================================================

fn parse_type(keyword: &str) -> Option<GpuType> {
    Some(match keyword {
        "float" => GpuType::Float,
        "int" => GpuType::Int,
        "vec2" => GpuType::Vec2,
        "vec3" => GpuType::Vec3,
        "vec4" => GpuType::Vec4,
        "mat2" => GpuType::Mat2,
        "mat3" => GpuType::Mat3,
        "mat4" => GpuType::Mat4,
        "sampler2D" => GpuType::Sampler2d,
        _ => return None,
    })
}

fn is_precision_qualifier(token: &str) -> bool {
    matches!(token, "lowp" | "mediump" | "highp")
}

/// Scan one GLSL source for `#error` directives; returns a compiler-style log.
fn scan_for_errors(stage: &str, source: &str) -> Option<String> {
    for (lineno, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("#error") {
            return Some(format!(
                "ERROR: {stage} shader, line {}: #error{rest}",
                lineno + 1
            ));
        }
    }
    None
}

/// Collect `uniform` / `attribute` declarations from one source into `out`.
fn scan_declarations(source: &str, out: &mut Vec<(SymbolSlot, GpuType, String, u32)>) {
    for line in source.lines() {
        let trimmed = line.trim().trim_end_matches(';');
        let mut tokens = trimmed.split_whitespace();
        let slot = match tokens.next() {
            Some("uniform") => SymbolSlot::Uniform,
            Some("attribute") => SymbolSlot::Attribute,
            _ => continue,
        };
        let mut ty_token = match tokens.next() {
            Some(t) => t,
            None => continue,
        };
        if is_precision_qualifier(ty_token) {
            ty_token = match tokens.next() {
                Some(t) => t,
                None => continue,
            };
        }
        let Some(gpu_type) = parse_type(ty_token) else {
            continue;
        };
        let Some(name_token) = tokens.next() else {
            continue;
        };
        let (name, count) = match name_token.split_once('[') {
            Some((n, rest)) => {
                let count = rest
                    .trim_end_matches(']')
                    .parse::<u32>()
                    .unwrap_or(1);
                (n, count)
            }
            None => (name_token, 1),
        };
        out.push((slot, gpu_type, name.to_string(), count));
    }
}

fn discover_symbols(vertex: &str, fragment: &str) -> Vec<SymbolInfo> {
    let mut raw = Vec::new();
    scan_declarations(vertex, &mut raw);
    scan_declarations(fragment, &mut raw);

    let mut symbols: Vec<SymbolInfo> = Vec::new();
    let mut next_uniform = 0u32;
    let mut next_attribute = 0u32;
    for (slot, gpu_type, name, count) in raw {
        if symbols.iter().any(|s| s.name == name) {
            continue;
        }
        let location = match slot {
            SymbolSlot::Uniform => {
                let l = next_uniform;
                next_uniform += 1;
                l
            }
            SymbolSlot::Attribute => {
                let l = next_attribute;
                next_attribute += 1;
                l
            }
        };
        symbols.push(SymbolInfo {
            name,
            slot,
            gpu_type,
            count,
            location,
        });
    }
    symbols
}

// ============================================================================
// GpuContext implementation
// ============================================================================

impl HeadlessState {
    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn take_alloc_failure(&mut self, what: &str) -> Result<()> {
        if self.fail_allocs > 0 {
            self.fail_allocs -= 1;
            return Err(PrismError::OutOfResources(format!(
                "simulated allocation failure ({what})"
            )));
        }
        Ok(())
    }

    fn write_attachment(&mut self, content: u64) {
        let Some(fbo) = self.bound_framebuffer else {
            return;
        };
        let Some(attachment) = self.framebuffers.get(&fbo.0).and_then(|f| f.attachment) else {
            return;
        };
        match attachment {
            Attachment::Texture(t) => {
                if let Some(rec) = self.textures.get_mut(&t.0) {
                    rec.content = content;
                }
            }
            Attachment::Renderbuffer(r) => {
                if let Some(rec) = self.renderbuffers.get_mut(&r.0) {
                    rec.content = content;
                }
            }
        }
    }

    fn attachment_content(&self) -> Option<u64> {
        let fbo = self.bound_framebuffer?;
        let attachment = self.framebuffers.get(&fbo.0)?.attachment?;
        match attachment {
            Attachment::Texture(t) => self.textures.get(&t.0).map(|r| r.content),
            Attachment::Renderbuffer(r) => self.renderbuffers.get(&r.0).map(|r| r.content),
        }
    }
}

impl GpuContext for HeadlessContext {
    fn max_texture_units(&self) -> u32 {
        TEXTURE_UNITS
    }

    fn max_texture_size(&self) -> u32 {
        MAX_TEXTURE_SIZE
    }

    fn create_texture(&self, size: CanvasSize, format: PixelFormat) -> Result<TextureId> {
        let mut st = self.state.borrow_mut();
        st.take_alloc_failure("texture")?;
        if size.width > MAX_TEXTURE_SIZE || size.height > MAX_TEXTURE_SIZE {
            return Err(PrismError::OutOfResources(format!(
                "texture size {}x{} exceeds device limit {MAX_TEXTURE_SIZE}",
                size.width, size.height
            )));
        }
        let id = st.fresh_id();
        st.textures.insert(
            id,
            TextureRecord {
                size,
                format,
                params: TextureParams::default(),
                content: 0,
            },
        );
        Ok(TextureId(id))
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut st = self.state.borrow_mut();
        st.textures.remove(&texture.0);
        // GL semantics: deleting a texture unbinds it everywhere
        for slot in &mut st.unit_bindings {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
    }

    fn upload_texture(
        &self,
        texture: TextureId,
        size: CanvasSize,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<()> {
        let mut st = self.state.borrow_mut();
        let Some(rec) = st.textures.get_mut(&texture.0) else {
            return Err(PrismError::RenderFailed(
                "upload to deleted texture".into(),
            ));
        };
        let expected = size.pixel_count() * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(PrismError::RenderFailed(format!(
                "upload size mismatch: got {} bytes, expected {expected}",
                pixels.len()
            )));
        }
        rec.size = size;
        rec.format = format;
        rec.content = hash_bytes(pixels);
        Ok(())
    }

    fn set_texture_params(&self, texture: TextureId, params: TextureParams) {
        if let Some(rec) = self.state.borrow_mut().textures.get_mut(&texture.0) {
            rec.params = params;
        }
    }

    fn create_renderbuffer(&self, size: CanvasSize, _format: PixelFormat) -> Result<RenderbufferId> {
        let mut st = self.state.borrow_mut();
        st.take_alloc_failure("renderbuffer")?;
        let id = st.fresh_id();
        st.renderbuffers
            .insert(id, RenderbufferRecord { size, content: 0 });
        Ok(RenderbufferId(id))
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId) {
        self.state.borrow_mut().renderbuffers.remove(&renderbuffer.0);
    }

    fn create_framebuffer(&self) -> Result<FramebufferId> {
        let mut st = self.state.borrow_mut();
        st.take_alloc_failure("framebuffer")?;
        let id = st.fresh_id();
        st.framebuffers.insert(id, FramebufferRecord::default());
        Ok(FramebufferId(id))
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        let mut st = self.state.borrow_mut();
        st.framebuffers.remove(&framebuffer.0);
        if st.bound_framebuffer == Some(framebuffer) {
            st.bound_framebuffer = None;
        }
    }

    fn attach_texture(&self, framebuffer: FramebufferId, texture: TextureId) -> Result<()> {
        let mut st = self.state.borrow_mut();
        let size = st
            .textures
            .get(&texture.0)
            .map(|r| r.size)
            .ok_or_else(|| PrismError::RenderFailed("attach of deleted texture".into()))?;
        if size.is_empty() {
            return Err(PrismError::RenderFailed(
                "framebuffer incomplete: zero-sized attachment".into(),
            ));
        }
        let Some(fbo) = st.framebuffers.get_mut(&framebuffer.0) else {
            return Err(PrismError::RenderFailed("attach to deleted framebuffer".into()));
        };
        fbo.attachment = Some(Attachment::Texture(texture));
        Ok(())
    }

    fn attach_renderbuffer(
        &self,
        framebuffer: FramebufferId,
        renderbuffer: RenderbufferId,
    ) -> Result<()> {
        let mut st = self.state.borrow_mut();
        let size = st
            .renderbuffers
            .get(&renderbuffer.0)
            .map(|r| r.size)
            .ok_or_else(|| PrismError::RenderFailed("attach of deleted renderbuffer".into()))?;
        if size.is_empty() {
            return Err(PrismError::RenderFailed(
                "framebuffer incomplete: zero-sized attachment".into(),
            ));
        }
        let Some(fbo) = st.framebuffers.get_mut(&framebuffer.0) else {
            return Err(PrismError::RenderFailed("attach to deleted framebuffer".into()));
        };
        fbo.attachment = Some(Attachment::Renderbuffer(renderbuffer));
        Ok(())
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        self.state.borrow_mut().bound_framebuffer = framebuffer;
    }

    fn set_viewport(&self, size: CanvasSize) {
        self.state.borrow_mut().viewport = size;
    }

    fn clear(&self, color: Vec4) {
        let mut st = self.state.borrow_mut();
        let mut h = DefaultHasher::new();
        "clear".hash(&mut h);
        for c in color.to_array() {
            c.to_bits().hash(&mut h);
        }
        let content = h.finish();
        st.write_attachment(content);
    }

    fn read_pixels(&self, size: CanvasSize, format: PixelFormat) -> Result<Vec<u8>> {
        let st = self.state.borrow();
        let content = st.attachment_content().ok_or_else(|| {
            PrismError::RenderFailed("read_pixels with no complete framebuffer bound".into())
        })?;
        let bytes = content.to_le_bytes();
        let len = size.pixel_count() * format.bytes_per_pixel();
        Ok((0..len).map(|i| bytes[i % 8]).collect())
    }

    fn select_texture_unit(&self, unit: u32) {
        let mut st = self.state.borrow_mut();
        st.active_unit = unit.min(TEXTURE_UNITS - 1);
        st.counters.unit_selects += 1;
    }

    fn bind_texture(&self, texture: TextureId) {
        let mut st = self.state.borrow_mut();
        let unit = st.active_unit as usize;
        st.unit_bindings[unit] = Some(texture);
        st.counters.texture_binds += 1;
    }

    fn compile_program(&self, vertex: &str, fragment: &str) -> Result<ProgramId> {
        if let Some(log) = scan_for_errors("vertex", vertex) {
            return Err(PrismError::ShaderCompile { log });
        }
        if let Some(log) = scan_for_errors("fragment", fragment) {
            return Err(PrismError::ShaderCompile { log });
        }
        let symbols = discover_symbols(vertex, fragment);
        let mut h = DefaultHasher::new();
        vertex.hash(&mut h);
        fragment.hash(&mut h);
        let source_hash = h.finish();

        let mut st = self.state.borrow_mut();
        let id = st.fresh_id();
        st.programs.insert(
            id,
            ProgramRecord {
                source_hash,
                symbols,
                resident: FxHashMap::default(),
            },
        );
        Ok(ProgramId(id))
    }

    fn delete_program(&self, program: ProgramId) {
        let mut st = self.state.borrow_mut();
        st.programs.remove(&program.0);
        if st.current_program == Some(program) {
            st.current_program = None;
        }
    }

    fn use_program(&self, program: ProgramId) {
        self.state.borrow_mut().current_program = Some(program);
    }

    fn active_symbols(&self, program: ProgramId) -> Vec<SymbolInfo> {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .map(|p| p.symbols.clone())
            .unwrap_or_default()
    }

    fn set_uniform(&self, location: u32, value: &UniformValue) {
        let mut st = self.state.borrow_mut();
        st.counters.uniform_uploads += 1;
        let Some(program) = st.current_program else {
            log::error!("set_uniform with no program in use");
            return;
        };
        if let Some(rec) = st.programs.get_mut(&program.0) {
            rec.resident.insert(location, value.clone());
        }
    }

    fn set_attribute(&self, location: u32, components: u32, data: &[f32]) {
        self.state
            .borrow_mut()
            .attributes
            .insert(location, (components, data.to_vec()));
    }

    fn draw_quad(&self) {
        let mut st = self.state.borrow_mut();
        let Some(program) = st.current_program else {
            log::error!("draw_quad with no program in use");
            return;
        };
        let Some(rec) = st.programs.get(&program.0) else {
            log::error!("draw_quad with deleted program");
            return;
        };
        let source_hash = rec.source_hash;

        let mut uniforms: Vec<(u32, UniformValue)> =
            rec.resident.iter().map(|(l, v)| (*l, v.clone())).collect();
        uniforms.sort_by_key(|(l, _)| *l);

        let mut sampler_contents: Vec<(u32, u64)> = Vec::new();
        for (_, value) in &uniforms {
            if let UniformValue::Sampler(unit) = value {
                let content = st
                    .unit_bindings
                    .get(*unit as usize)
                    .copied()
                    .flatten()
                    .and_then(|t| st.textures.get(&t.0).map(|r| r.content))
                    .unwrap_or(0);
                sampler_contents.push((*unit, content));
            }
        }

        let mut h = DefaultHasher::new();
        source_hash.hash(&mut h);
        for (location, value) in &uniforms {
            location.hash(&mut h);
            hash_uniform(value, &mut h);
        }
        for (unit, content) in &sampler_contents {
            unit.hash(&mut h);
            content.hash(&mut h);
        }
        let mut attrs: Vec<(&u32, &(u32, Vec<f32>))> = st.attributes.iter().collect();
        attrs.sort_by_key(|(l, _)| **l);
        for (location, (components, data)) in attrs {
            location.hash(&mut h);
            components.hash(&mut h);
            for c in data {
                c.to_bits().hash(&mut h);
            }
        }
        let output = h.finish();

        let target = st.bound_framebuffer;
        st.write_attachment(output);
        st.counters.draws += 1;
        st.draw_log.push(DrawRecord {
            program,
            source_hash,
            uniforms,
            sampler_contents,
            target,
            output,
        });
    }
}

//! 着色器程序与符号绑定
//!
//! [`Program`] 持有一对顶点/片段着色器与一张具名符号表：
//! - 按名称赋值不要求调用方预知 GPU 类型；符号在首次赋值时惰性创建
//! - 链接后的首次 `use_program` 向程序对象查询每个活跃符号的真实
//!   类型/数组长度/位置，并校验已缓存值的形状（不匹配报 `TypeMismatch`）
//! - `use_program` 激活程序并一趟下发所有脏符号，逐个清除脏标记
//! - 采样器符号持有上游 Canvas；下发时向纹理单元跟踪器申请绑定，
//!   已绑定时不产生冗余调用。纹理单元绑定不依附程序对象，因此采样器
//!   绑定每次 use 都要经过跟踪器复核，而不是只看脏标记
//!
//! 标准命名约定（默认 `draw` 消费）：顶点属性 `position` 与
//! `inputTextureCoordinate`，主采样器 `inputImage`，次采样器
//! `auxiliaryImage`。

pub mod coords;
pub mod symbol;

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::canvas::Canvas;
use crate::context::RenderContext;
use crate::errors::{PrismError, Result};
use crate::gpu::{GpuContext, GpuType, ProgramId, SymbolInfo, SymbolSlot, UniformValue};

pub use coords::{QUAD_VERTICES, Rotation};
pub use symbol::{Symbol, SymbolValue};

/// 标准顶点位置属性名
pub const ATTRIBUTE_POSITION: &str = "position";
/// 标准纹理坐标属性名
pub const ATTRIBUTE_TEXTURE_COORDINATE: &str = "inputTextureCoordinate";
/// 标准主输入采样器名
pub const UNIFORM_INPUT_IMAGE: &str = "inputImage";
/// 标准次输入采样器名（可选）
pub const UNIFORM_AUXILIARY_IMAGE: &str = "auxiliaryImage";

fn declared_name(info: &SymbolInfo) -> String {
    if info.count > 1 {
        format!("{}[{}]", info.gpu_type.glsl_name(), info.count)
    } else {
        info.gpu_type.glsl_name().to_string()
    }
}

/// 一个已编译（或待编译）的着色器程序及其符号状态
pub struct Program {
    gpu: Rc<dyn GpuContext>,
    vertex_source: Option<String>,
    fragment_source: Option<String>,
    handle: Option<ProgramId>,
    /// 符号按首次出现顺序排列，下发顺序因此是确定的
    symbols: Vec<Symbol>,
    lookup: FxHashMap<String, usize>,
    /// 链接后查询到的顶点属性位置
    attributes: FxHashMap<String, u32>,
    next_texture_unit: u32,
    introspected: bool,
}

impl Program {
    #[must_use]
    pub fn new(gpu: Rc<dyn GpuContext>) -> Self {
        Self {
            gpu,
            vertex_source: None,
            fragment_source: None,
            handle: None,
            symbols: Vec::new(),
            lookup: FxHashMap::default(),
            attributes: FxHashMap::default(),
            next_texture_unit: 0,
            introspected: false,
        }
    }

    /// 便捷构造：直接给定着色器源
    #[must_use]
    pub fn with_source(gpu: Rc<dyn GpuContext>, vertex: &str, fragment: &str) -> Self {
        let mut p = Self::new(gpu);
        p.set_source(vertex, fragment);
        p
    }

    // ========================================================================
    // 着色器源与链接
    // ========================================================================

    /// 设置着色器源。已链接的程序会被废弃，已赋值符号全部置脏。
    pub fn set_source(&mut self, vertex: &str, fragment: &str) {
        self.vertex_source = Some(vertex.to_string());
        self.fragment_source = Some(fragment.to_string());
        self.unlink();
    }

    fn unlink(&mut self) {
        if let Some(h) = self.handle.take() {
            self.gpu.delete_program(h);
        }
        self.introspected = false;
        self.attributes.clear();
        self.next_texture_unit = 0;
        for s in &mut self.symbols {
            s.info = None;
            s.unit = None;
            if s.value.is_some() {
                s.dirty = true;
            }
        }
    }

    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.handle.is_some()
    }

    /// 编译并链接。失败时错误携带编译器/链接器日志，
    /// 不影响进程，调用方修正着色器源后可重试。
    pub fn link(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        let vertex = self.vertex_source.as_deref().ok_or_else(|| {
            PrismError::ProgramLink {
                log: "no vertex shader source set".into(),
            }
        })?;
        let fragment = self.fragment_source.as_deref().ok_or_else(|| {
            PrismError::ProgramLink {
                log: "no fragment shader source set".into(),
            }
        })?;
        self.handle = Some(self.gpu.compile_program(vertex, fragment)?);
        Ok(())
    }

    // ========================================================================
    // 具名符号访问
    // ========================================================================

    fn ensure_symbol(&mut self, name: &str) -> usize {
        if let Some(&i) = self.lookup.get(name) {
            return i;
        }
        let i = self.symbols.len();
        self.symbols.push(Symbol::new(name));
        self.lookup.insert(name.to_string(), i);
        i
    }

    /// 按名称赋一个普通 uniform 值。
    ///
    /// 类型已知（链接并查询过）时立即做形状校验；不匹配返回
    /// `TypeMismatch` 且符号原值与脏标记不变。赋相同值不置脏。
    pub fn set_uniform<V: Into<UniformValue>>(&mut self, name: &str, value: V) -> Result<()> {
        let value = value.into();
        let idx = self.ensure_symbol(name);
        let symbol = &mut self.symbols[idx];
        if let Some(info) = &symbol.info {
            if !value.matches(info.gpu_type, info.count) {
                return Err(PrismError::TypeMismatch {
                    name: name.to_string(),
                    declared: declared_name(info),
                    provided: value.shape_name(),
                });
            }
        }
        let new_value = SymbolValue::Value(value);
        if symbol.value.as_ref().is_some_and(|v| v.same_as(&new_value)) {
            return Ok(());
        }
        symbol.value = Some(new_value);
        symbol.dirty = true;
        Ok(())
    }

    /// 把上游 Canvas 绑到一个采样器符号上
    pub fn set_input_canvas(&mut self, name: &str, canvas: &Canvas) -> Result<()> {
        let idx = self.ensure_symbol(name);
        let symbol = &mut self.symbols[idx];
        if let Some(info) = &symbol.info {
            if info.gpu_type != GpuType::Sampler2d {
                return Err(PrismError::TypeMismatch {
                    name: name.to_string(),
                    declared: declared_name(info),
                    provided: "sampler2D".into(),
                });
            }
        }
        let new_value = SymbolValue::Input(canvas.clone());
        if symbol.value.as_ref().is_some_and(|v| v.same_as(&new_value)) {
            return Ok(());
        }
        symbol.value = Some(new_value);
        symbol.dirty = true;
        Ok(())
    }

    /// 查看一个符号的本地状态
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.lookup.get(name).map(|&i| &self.symbols[i])
    }

    /// 链接后查询到的顶点属性位置
    #[must_use]
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    /// 把所有已赋值符号置脏，下次 `use_program` 全量重新下发。
    /// 在外部 GPU 代码可能改写过程序驻留状态之后使用。
    pub fn mark_all_dirty(&mut self) {
        for s in &mut self.symbols {
            if s.value.is_some() {
                s.dirty = true;
            }
        }
    }

    /// 是否还有待下发的符号。
    ///
    /// 持有本程序的节点以此作为外部陈旧条件：参数改过就需要重渲。
    /// 已确认在程序中不活跃的符号不算（它们永远不会被下发）。
    #[must_use]
    pub fn has_dirty_symbols(&self) -> bool {
        self.symbols
            .iter()
            .any(|s| s.dirty && (!self.introspected || s.info.is_some()))
    }

    // ========================================================================
    // 激活与下发
    // ========================================================================

    /// 链接后首次使用：查询活跃符号，补全类型元数据，
    /// 给采样器按发现顺序分配纹理单元，并校验已缓存值的形状。
    fn introspect(&mut self, handle: ProgramId) -> Result<()> {
        let infos = self.gpu.active_symbols(handle);
        for info in infos {
            match info.slot {
                SymbolSlot::Attribute => {
                    self.attributes.insert(info.name.clone(), info.location);
                }
                SymbolSlot::Uniform => {
                    let idx = self.ensure_symbol(&info.name);
                    if info.gpu_type == GpuType::Sampler2d && self.symbols[idx].unit.is_none() {
                        self.symbols[idx].unit = Some(self.next_texture_unit);
                        self.next_texture_unit += 1;
                    }
                    match &self.symbols[idx].value {
                        Some(SymbolValue::Value(v)) => {
                            if !v.matches(info.gpu_type, info.count) {
                                return Err(PrismError::TypeMismatch {
                                    name: info.name.clone(),
                                    declared: declared_name(&info),
                                    provided: v.shape_name(),
                                });
                            }
                        }
                        Some(SymbolValue::Input(_)) => {
                            if info.gpu_type != GpuType::Sampler2d {
                                return Err(PrismError::TypeMismatch {
                                    name: info.name.clone(),
                                    declared: declared_name(&info),
                                    provided: "sampler2D".into(),
                                });
                            }
                        }
                        None => {}
                    }
                    self.symbols[idx].info = Some(info);
                }
            }
        }
        for s in &self.symbols {
            if s.info.is_none() && s.value.is_some() {
                log::warn!(
                    "Value set for '{}' but it is not active in the linked program",
                    s.name
                );
            }
        }
        self.introspected = true;
        Ok(())
    }

    /// 激活程序并把所有脏符号一趟下发到 GPU。
    ///
    /// 采样器绑定无论脏否都经过纹理单元跟踪器复核（冗余绑定被
    /// 跟踪器而不是脏标记省掉）。任何绘制之前必须先调用本方法。
    pub fn use_program(&mut self, ctx: &mut RenderContext) -> Result<()> {
        self.link()?;
        let handle = self.handle.ok_or_else(|| PrismError::ProgramLink {
            log: "program has no linked handle".into(),
        })?;
        self.gpu.use_program(handle);
        if !self.introspected {
            self.introspect(handle)?;
        }

        for i in 0..self.symbols.len() {
            let (info, value, dirty) = {
                let s = &self.symbols[i];
                (s.info.clone(), s.value.clone(), s.dirty)
            };
            let Some(info) = info else {
                // 程序中不活跃的符号永远不下发
                continue;
            };
            match value {
                None => {
                    if info.gpu_type == GpuType::Sampler2d {
                        return Err(PrismError::RenderFailed(format!(
                            "sampler '{}' has no input bound",
                            self.symbols[i].name
                        )));
                    }
                }
                Some(SymbolValue::Input(canvas)) => {
                    let unit = self.symbols[i].unit.ok_or_else(|| {
                        PrismError::RenderFailed(format!(
                            "sampler '{}' has no texture unit assigned",
                            self.symbols[i].name
                        ))
                    })?;
                    ctx.units_mut().bind(self.gpu.as_ref(), unit, &canvas)?;
                    if dirty {
                        self.gpu
                            .set_uniform(info.location, &UniformValue::Sampler(unit));
                        self.symbols[i].dirty = false;
                    }
                }
                Some(SymbolValue::Value(v)) => {
                    if dirty {
                        self.gpu.set_uniform(info.location, &v);
                        self.symbols[i].dirty = false;
                    }
                }
            }
        }
        Ok(())
    }

    /// 标准双三角形全画布绘制。
    ///
    /// `position` 属性来自固定顶点表，`inputTextureCoordinate`
    /// 来自朝向坐标表（程序未声明该属性时跳过）。
    pub fn draw(&mut self, ctx: &mut RenderContext, rotation: Rotation) -> Result<()> {
        self.use_program(ctx)?;
        let position = self
            .attributes
            .get(ATTRIBUTE_POSITION)
            .copied()
            .ok_or_else(|| {
                PrismError::RenderFailed(format!(
                    "program has no '{ATTRIBUTE_POSITION}' attribute"
                ))
            })?;
        self.gpu.set_attribute(position, 2, &QUAD_VERTICES);
        if let Some(texcoord) = self.attributes.get(ATTRIBUTE_TEXTURE_COORDINATE).copied() {
            self.gpu
                .set_attribute(texcoord, 2, rotation.texture_coordinates());
        }
        self.gpu.draw_quad();
        Ok(())
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            self.gpu.delete_program(h);
        }
    }
}

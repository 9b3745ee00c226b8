//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`PrismError`] covers all failure modes including:
//! - Graph wiring violations (arity, cycles, stale node keys)
//! - GPU resource exhaustion
//! - Shader compile / program link failures (with compiler logs)
//! - Uniform type mismatches
//! - Generic render failures propagated through `update()`
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, PrismError>`.
//!
//! Render failures are frame-local: `update()` starts every frame clean, and a
//! failed frame leaves the previously rendered state in place rather than
//! crashing the process.

use thiserror::Error;

/// The main error type for the Prism engine.
///
/// This enum covers all possible error conditions that can occur
/// during engine operation. Each variant provides specific context
/// about what went wrong.
#[derive(Error, Debug)]
pub enum PrismError {
    // ========================================================================
    // Graph & Topology Errors
    // ========================================================================
    /// Wiring violation detected at edge-creation time: arity exceeded,
    /// duplicate edge, or a dependency cycle. The graph is left unchanged.
    #[error("Invalid graph topology: {0}")]
    InvalidTopology(String),

    /// A node key no longer resolves to a live node in the graph.
    #[error("Unknown graph node (key is no longer valid)")]
    UnknownNode,

    // ========================================================================
    // GPU Resource Errors
    // ========================================================================
    /// GPU image/framebuffer allocation failed. Recoverable: the caller may
    /// free unused canvases and retry, or skip the frame.
    #[error("GPU resource allocation failed: {0}")]
    OutOfResources(String),

    // ========================================================================
    // Shader & Program Errors
    // ========================================================================
    /// A shader stage failed to compile. Carries the GPU compiler log.
    #[error("Shader compilation failed:\n{log}")]
    ShaderCompile {
        /// Compiler output for the offending stage
        log: String,
    },

    /// The program failed to link. Carries the GPU linker log.
    #[error("Program link failed:\n{log}")]
    ProgramLink {
        /// Linker output
        log: String,
    },

    /// A value assigned to a named program symbol does not match the type
    /// the compiled program declares for that slot.
    #[error("Uniform '{name}' type mismatch: shader declares {declared}, value is {provided}")]
    TypeMismatch {
        /// Symbol name
        name: String,
        /// Type declared by the compiled program
        declared: String,
        /// Shape of the value that was assigned
        provided: String,
    },

    // ========================================================================
    // Render Errors
    // ========================================================================
    /// Generic render failure, propagated up through `update()`. The frame
    /// is skipped; no timestamp in the aborted subtree is mutated.
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// Alias for `Result<T, PrismError>`.
pub type Result<T> = std::result::Result<T, PrismError>;

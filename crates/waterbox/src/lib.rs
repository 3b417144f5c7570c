//! Interactive real-time liquid: MLS-MPM on the GPU with screen-space
//! surface reconstruction.
//!
//! The `gpu` module holds the device context and the compute/render
//! pipelines; `app` is the winit shell and per-frame driver. The
//! simulation semantics live in the `mpm3d` crate, which this crate's
//! WGSL ports stage for stage.

pub mod app;
pub mod gpu;

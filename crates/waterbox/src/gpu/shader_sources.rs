//! Composed WGSL sources.
//!
//! Shaders are built from shared snippets plus a per-stage body, so the
//! scatter and gather passes compile against one kernel definition and
//! the render passes against one uniform-block definition. The pipeline
//! modules and the validation test build the same strings: what ships is
//! what gets validated.

const MPM_COMMON: &str = include_str!("shaders/mpm_common.wgsl");
const RENDER_COMMON: &str = include_str!("shaders/render_common.wgsl");
const FULLSCREEN: &str = include_str!("shaders/fullscreen.wgsl");

pub fn clear_grid() -> String {
    [MPM_COMMON, include_str!("shaders/clear_grid.wgsl")].concat()
}

pub fn p2g_1() -> String {
    [MPM_COMMON, include_str!("shaders/p2g_1.wgsl")].concat()
}

pub fn p2g_2() -> String {
    [MPM_COMMON, include_str!("shaders/p2g_2.wgsl")].concat()
}

pub fn update_grid() -> String {
    [
        MPM_COMMON,
        RENDER_COMMON,
        include_str!("shaders/update_grid.wgsl"),
    ]
    .concat()
}

pub fn g2p() -> String {
    [MPM_COMMON, include_str!("shaders/g2p.wgsl")].concat()
}

pub fn copy_position() -> String {
    [MPM_COMMON, include_str!("shaders/copy_position.wgsl")].concat()
}

pub fn clear_density_grid() -> String {
    [MPM_COMMON, include_str!("shaders/clear_density_grid.wgsl")].concat()
}

pub fn p2g_density() -> String {
    [MPM_COMMON, include_str!("shaders/p2g_density.wgsl")].concat()
}

pub fn cast_density_grid() -> String {
    [MPM_COMMON, include_str!("shaders/cast_density_grid.wgsl")].concat()
}

pub fn depth_map() -> String {
    [RENDER_COMMON, include_str!("shaders/depth_map.wgsl")].concat()
}

pub fn thickness_map() -> String {
    [RENDER_COMMON, include_str!("shaders/thickness_map.wgsl")].concat()
}

pub fn sphere() -> String {
    [RENDER_COMMON, include_str!("shaders/sphere.wgsl")].concat()
}

pub fn bilateral() -> String {
    [FULLSCREEN, include_str!("shaders/bilateral.wgsl")].concat()
}

pub fn gaussian() -> String {
    [FULLSCREEN, include_str!("shaders/gaussian.wgsl")].concat()
}

pub fn composite() -> String {
    [
        RENDER_COMMON,
        FULLSCREEN,
        include_str!("shaders/composite.wgsl"),
    ]
    .concat()
}

pub fn raymarch() -> String {
    [
        RENDER_COMMON,
        FULLSCREEN,
        include_str!("shaders/raymarch.wgsl"),
    ]
    .concat()
}

/// Every composed module, for validation.
pub fn all() -> Vec<(&'static str, String)> {
    vec![
        ("clear_grid", clear_grid()),
        ("p2g_1", p2g_1()),
        ("p2g_2", p2g_2()),
        ("update_grid", update_grid()),
        ("g2p", g2p()),
        ("copy_position", copy_position()),
        ("clear_density_grid", clear_density_grid()),
        ("p2g_density", p2g_density()),
        ("cast_density_grid", cast_density_grid()),
        ("depth_map", depth_map()),
        ("thickness_map", thickness_map()),
        ("sphere", sphere()),
        ("bilateral", bilateral()),
        ("gaussian", gaussian()),
        ("composite", composite()),
        ("raymarch", raymarch()),
    ]
}

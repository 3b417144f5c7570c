//! Parse and validate every composed WGSL module with naga.
//!
//! The pipeline modules build their shader sources through
//! `gpu::shader_sources`, so this validates exactly what ships, without
//! needing a GPU.

use waterbox::gpu::shader_sources;

#[test]
fn all_shaders_parse_and_validate() {
    let mut failures = Vec::new();

    for (name, source) in shader_sources::all() {
        let module = match naga::front::wgsl::parse_str(&source) {
            Ok(module) => module,
            Err(e) => {
                failures.push(format!("{}: parse error: {}", name, e.emit_to_string(&source)));
                continue;
            }
        };

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        if let Err(e) = validator.validate(&module) {
            failures.push(format!("{}: validation error: {:?}", name, e));
        }
    }

    assert!(
        failures.is_empty(),
        "shader validation failed:\n{}",
        failures.join("\n")
    );
}

#[test]
fn compute_shaders_have_main_entry() {
    for name in [
        "clear_grid",
        "p2g_1",
        "p2g_2",
        "update_grid",
        "g2p",
        "copy_position",
        "clear_density_grid",
        "p2g_density",
        "cast_density_grid",
    ] {
        let source = shader_sources::all()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| s)
            .unwrap();
        let module = naga::front::wgsl::parse_str(&source).unwrap();
        assert!(
            module.entry_points.iter().any(|e| e.name == "main"),
            "{} is missing its main entry point",
            name
        );
    }
}

#[test]
fn scatter_and_gather_share_one_kernel_definition() {
    // The weight function is defined once in the common snippet; the
    // composed scatter and gather sources must contain byte-identical
    // kernel text.
    let sources = shader_sources::all();
    let get = |name: &str| {
        sources
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| s.clone())
            .unwrap()
    };
    let needle = "fn quadratic_weights";
    for name in ["p2g_1", "p2g_2", "g2p", "p2g_density"] {
        let source = get(name);
        assert_eq!(
            source.matches(needle).count(),
            1,
            "{} must contain exactly one kernel definition",
            name
        );
    }
}

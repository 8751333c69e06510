//! Runtime emission.
//!
//! The generated project's `runtime` module is not rendered, it is copied:
//! the sources under `src/beacon/` are compiled (and unit-tested) inside the
//! compiler and embedded here verbatim at build time. Only the module root is
//! generated, so it can carry the usual generation header.
//!
//! This is what keeps the emitted evaluator self-contained: the runtime text
//! is std-only and references nothing but its own siblings, so the generated
//! tree has no dependency on the compiler.

/// `(file name, contents)` pairs for the generated `src/runtime/` directory.
pub(crate) fn files() -> Vec<(&'static str, String)> {
    vec![
        ("mod.rs", mod_root()),
        ("buffers.rs", include_str!("../beacon/buffers.rs").to_string()),
        ("cycle.rs", include_str!("../beacon/cycle.rs").to_string()),
        ("math.rs", include_str!("../beacon/math.rs").to_string()),
        ("values.rs", include_str!("../beacon/values.rs").to_string()),
    ]
}

fn mod_root() -> String {
    format!(
        "// Generated by pulsar {}. Do not edit.\n\
         //\n\
         // Beacon runtime support: value maps, temporal buffers, math\n\
         // whitelist, and the cycle loop with its store/host/evaluate\n\
         // contracts.\n\
         \n\
         pub mod buffers;\n\
         pub mod cycle;\n\
         pub mod math;\n\
         pub mod values;\n\
         \n\
         pub use buffers::{{Sample, SensorBuffers, TemporalBuffer}};\n\
         pub use cycle::{{CycleError, CycleRunner, EvalError, Evaluate, Host, Store, StoreError}};\n\
         pub use values::SensorValues;\n",
        env!("CARGO_PKG_VERSION")
    )
}

//! Source emission.
//!
//! The emitter turns a compiled [`Program`] into the Beacon project tree:
//!
//! ```text
//! <out>/
//!   manifest.yaml              provenance document, written last
//!   src/
//!     lib.rs                   module declarations
//!     runtime/…                verbatim copy of src/beacon/ (runtime.rs)
//!     groups/group_XXX.rs      one file per group (groups.rs)
//!     groups/mod.rs
//!     coordinator.rs           group sequencing + buffer plan (coordinator.rs)
//! ```
//!
//! Emission is all-or-nothing in the only way that matters downstream: file
//! write failures are fatal, and the manifest is written only after every
//! code file succeeded, so a tree with a manifest is always a complete tree.
//! Auxiliary build metadata (the generated project's own Cargo manifest) is
//! deliberately not emitted; that belongs to the build system wrapping the
//! compiler.

#[path = "emitter/coordinator.rs"]
mod coordinator;
#[path = "emitter/groups.rs"]
mod groups;
#[path = "emitter/manifest.rs"]
mod manifest;
#[path = "emitter/runtime.rs"]
mod runtime;

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::compiler::Program;
use crate::diagnostics::{CompileError, Diagnostics};

/// Emit the full Beacon tree. Returns the code files (in write order) and
/// the manifest path; findings land in `diags`.
pub(crate) fn emit_project(
    program: &Program,
    sensors: &[String],
    cycle_time_ms: u64,
    buffer_capacity: Option<usize>,
    out_dir: &Path,
    diags: &mut Diagnostics,
) -> Result<(Vec<PathBuf>, PathBuf), CompileError> {
    let src = out_dir.join("src");
    std::fs::create_dir_all(src.join("runtime"))?;
    std::fs::create_dir_all(src.join("groups"))?;

    let mut files: Vec<PathBuf> = Vec::new();
    let write = |path: PathBuf, text: &str, files: &mut Vec<PathBuf>| -> Result<(), CompileError> {
        std::fs::write(&path, text)?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "wrote artifact");
        files.push(path);
        Ok(())
    };

    for (name, text) in runtime::files() {
        write(src.join("runtime").join(name), &text, &mut files)?;
    }

    for group in &program.groups {
        let text = groups::render(group, diags);
        let path = src.join("groups").join(format!("{}.rs", groups::module_name(group.index)));
        write(path, &text, &mut files)?;
    }
    write(src.join("groups").join("mod.rs"), &groups_mod(program), &mut files)?;

    let plan = coordinator::buffer_plan(&program.rules, cycle_time_ms, buffer_capacity);
    let text = coordinator::render(&program.groups, &plan, sensors, cycle_time_ms);
    write(src.join("coordinator.rs"), &text, &mut files)?;

    write(src.join("lib.rs"), &lib_root(), &mut files)?;

    // Every code file is on disk; the manifest can now vouch for the tree.
    let manifest_path = out_dir.join("manifest.yaml");
    let document = manifest::build(program, Utc::now());
    let yaml = manifest::to_yaml(&document)
        .map_err(|err| CompileError::Config(format!("manifest serialization failed: {err}")))?;
    std::fs::write(&manifest_path, &yaml)?;
    tracing::debug!(path = %manifest_path.display(), "wrote manifest");

    Ok((files, manifest_path))
}

fn groups_mod(program: &Program) -> String {
    let mut out = String::new();
    out.push_str(&format!("// Generated by pulsar {}. Do not edit.\n\n", env!("CARGO_PKG_VERSION")));
    for group in &program.groups {
        out.push_str(&format!("pub mod {};\n", groups::module_name(group.index)));
    }
    if !program.groups.is_empty() {
        out.push('\n');
    }
    for group in &program.groups {
        out.push_str(&format!(
            "pub use {}::{};\n",
            groups::module_name(group.index),
            groups::struct_name(group.index)
        ));
    }
    out
}

fn lib_root() -> String {
    format!(
        "// Generated by pulsar {}. Do not edit.\n\
         //\n\
         // Beacon: ahead-of-time compiled rule evaluator.\n\
         \n\
         pub mod coordinator;\n\
         pub mod groups;\n\
         pub mod runtime;\n\
         \n\
         pub use coordinator::Coordinator;\n",
        env!("CARGO_PKG_VERSION")
    )
}

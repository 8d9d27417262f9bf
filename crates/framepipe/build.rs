//! Build script for the framepipe crate
//!
//! Validates the WGSL program used by the GPU stage and embeds a minified copy of it
//! in the build output, so an invalid shader fails the build instead of the first frame.

/// Path of the swirl shader relative to the crate root
const SWIRL_SHADER: &str = "shaders/swirl.wgsl";

/// Parses, validates and minifies WGSL shader source code
///
/// Uses naga to parse, validate, and regenerate the WGSL code in a more compact form.
/// Entry point names survive minification.
fn minify_wgsl(shader: &str) -> String {
    let mut module = naga::front::wgsl::parse_str(shader).expect("Failed to parse WGSL shader");

    wgsl_minifier::minify_module(&mut module);

    let mut validator = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all());
    let info = validator.validate(&module).expect("Failed to validate WGSL shader");
    let output = naga::back::wgsl::write_string(&module, &info, naga::back::wgsl::WriterFlags::empty()).expect("Failed to write WGSL shader");

    wgsl_minifier::minify_wgsl_source(&output)
}

fn main() {
    println!("cargo:rerun-if-changed={SWIRL_SHADER}");

    let source = std::fs::read_to_string(SWIRL_SHADER).expect("Failed to read swirl shader");
    let minified = minify_wgsl(&source);

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR not set");
    let output_path = std::path::PathBuf::from(out_dir).join("swirl.min.wgsl");
    std::fs::write(output_path, minified).expect("Failed to write minified swirl shader");
}

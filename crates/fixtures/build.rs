use projex_codegen::CodeGenerator;
use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=schema/blog.yaml");

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    CodeGenerator::from_path("schema/blog.yaml")?.generate_to(out_dir)?;
    Ok(())
}

//! Build script for carebridge.
//!
//! Compiles `proto/care_plan.proto` when the `grpc` feature is enabled. Generated code is
//! written to `$OUT_DIR/careplan.v1.rs` and included from `src/proto/mod.rs`.
//!
//! This requires the `protoc` compiler on the build host.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "grpc")]
    {
        let manifest_dir = std::path::PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
        let proto_root = manifest_dir.join("proto");
        let proto_file = proto_root.join("care_plan.proto");

        println!("cargo:rerun-if-changed={}", proto_file.display());
        tonic_build::configure()
            .build_server(true)
            .build_client(true)
            .compile_protos(std::slice::from_ref(&proto_file), &[proto_root])?;
    }

    Ok(())
}

fn main() {
    // Compile proto files using tonic-build.
    // This generates both the message types and the gRPC service traits.
    tonic_build::compile_protos("../protos/catalog.proto")
        .expect("Failed to compile catalog.proto");
    tonic_build::compile_protos("../protos/auth.proto")
        .expect("Failed to compile auth.proto");
}

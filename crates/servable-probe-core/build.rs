/// Builds the gRPC client and server code for the TensorFlow Serving
/// `PredictionService` subset using `tonic-prost-build`.
///
/// # Files and Paths
///
/// - Proto file: `proto/tensorflow_serving/apis/prediction_service.proto`
///   (which imports `predict.proto` and `model.proto`)
/// - Includes: `proto/`
///
/// # Output
///
/// Generated code will be accessible in Rust via:
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("tensorflow.serving");
/// }
/// ```
///
/// The server half is only used by tests as a mock serving endpoint, but is
/// generated unconditionally so downstream crates can do the same.
fn main() {
    println!("cargo:rerun-if-changed=proto");

    tonic_prost_build::configure()
        .compile_protos(
            &["proto/tensorflow_serving/apis/prediction_service.proto"],
            &["proto"],
        )
        .unwrap();
}

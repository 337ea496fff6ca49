//! Plugins available without any settings file

use super::{PluginDep, PluginSpec};

/// Built-in plugins in registration order
pub fn builtin_plugins() -> Vec<PluginSpec> {
    vec![
        PluginSpec::new("go", "go")
            .with_naming("{unit}_go")
            .with_well_known("@io_bazel_rules_go//proto/wkt:{stem}_go_proto"),
        PluginSpec::new("grpc_go", "go")
            .with_output_kind("go_grpc")
            .with_naming("{unit}_go_grpc")
            .with_dep(PluginDep::Plugin("go".into()))
            .with_dep(PluginDep::Label(
                "@org_golang_google_grpc//:go_default_library".into(),
            )),
        PluginSpec::new("py", "python")
            .with_naming("{unit}_py")
            .with_well_known("@com_google_protobuf//:{stem}_py_proto"),
        PluginSpec::new("grpc_py", "python")
            .with_output_kind("py_grpc")
            .with_naming("{unit}_py_grpc")
            .with_dep(PluginDep::Plugin("py".into()))
            .with_dep(PluginDep::Label("@pypi//grpcio".into())),
        PluginSpec::new("java", "java")
            .with_naming("{unit}_java")
            .with_well_known("@com_google_protobuf//:protobuf_java"),
        PluginSpec::new("cpp", "cpp")
            .with_output_kind("cc")
            .with_naming("{unit}_cc")
            .with_well_known("@com_google_protobuf//:protobuf"),
        PluginSpec::new("ts", "typescript")
            .with_naming("{unit}_ts")
            .merging_directories(),
    ]
}

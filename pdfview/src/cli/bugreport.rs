use bugreport::{
    bugreport,
    collector::{CompileTimeInformation, EnvironmentVariables, OperatingSystem, SoftwareVersion},
    format::Markdown,
};

pub fn run() {
    bugreport!()
        .info(SoftwareVersion::default())
        .info(OperatingSystem::default())
        .info(EnvironmentVariables::list(&[
            "PDFVIEW_BUCKET",
            "PDFVIEW_TABLE",
            "PDFVIEW_DATA_DIR",
            "PDFVIEW_DATA_FILE",
            "PDFVIEW_PORT",
            "PDFVIEW_PUBLIC_URL",
            "RUST_LOG",
        ]))
        .info(CompileTimeInformation::default())
        .print::<Markdown>();
}

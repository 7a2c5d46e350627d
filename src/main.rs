fn main() -> std::process::ExitCode {
    labsight_lib::run()
}

use std::process;

fn main() {
    if let Err(e) = kiln::cli::run() {
        kiln::cli::report_error(&e);
        process::exit(1);
    }
}

use cz_shortcut::{cli, ui};

fn main() {
    if let Err(e) = cli::main() {
        ui::print_error(&format!("Error: {e:#}"));
        std::process::exit(1);
    }
}

//! Version information.

use console::style;

pub fn run() {
    println!(
        "{} {}",
        style("weft").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("workflow state-machine runtime");
}

//! `xkengine version` command

pub fn execute() {
    println!("xkengine {}", env!("CARGO_PKG_VERSION"));
}

// Build script to ensure Cargo rebuilds when embedded assets change.
// rust-embed embeds files at compile time, but Cargo's incremental compilation
// may not notice edits to the page templates or static files on its own.

fn main() {
    println!("cargo:rerun-if-changed=src/assets/");
    println!("cargo:rerun-if-changed=templates/");
}

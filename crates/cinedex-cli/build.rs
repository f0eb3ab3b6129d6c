use vergen_git2::{BuildBuilder, Emitter, Git2Builder, RustcBuilder};

/// Emits `VERGEN_*` variables read by `cinedex --version`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let git = Git2Builder::default().sha(true).dirty(false).build()?;
    let build = BuildBuilder::default().build_date(true).build()?;
    let rustc = RustcBuilder::default()
        .semver(true)
        .host_triple(true)
        .build()?;

    Emitter::default()
        .add_instructions(&git)?
        .add_instructions(&build)?
        .add_instructions(&rustc)?
        .emit()?;
    Ok(())
}

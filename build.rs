use vergen_gitcl::{Emitter, GitclBuilder};

// emits VERGEN_GIT_SHA, reported by the health endpoint
fn main() -> anyhow::Result<()> {
    let gitcl = GitclBuilder::default().sha(true).build()?;
    Emitter::default().add_instructions(&gitcl)?.emit()?;

    Ok(())
}

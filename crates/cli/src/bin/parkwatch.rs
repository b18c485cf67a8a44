//! Parkwatch CLI binary entrypoint.

fn main() -> anyhow::Result<()> {
    parkwatch_cli::app::run()?;
    Ok(())
}

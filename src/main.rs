use anyhow::Result;

fn main() -> Result<()> {
    tablescope::cli::run()
}

fn main() -> anyhow::Result<()> {
    trellis::cli::run_cli()
}

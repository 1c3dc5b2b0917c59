fn main() -> anyhow::Result<()> {
    triage_lib::run()
}

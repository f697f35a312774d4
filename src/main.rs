fn main() -> anyhow::Result<()> {
    assistive_select_lib::run()
}
